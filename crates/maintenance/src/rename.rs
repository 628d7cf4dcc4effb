//! In-tree identifier renaming and removal for variable updates.

use analyzer::mark_stmt_uses;
use codegen::logic::change_event_name;
use parser::ast::{ContractDef, ContractPart, Expr, Stmt};
use smol_str::SmolStr;

/// Rewrite every reference to `old` inside the contract's executable parts.
/// The mapping change event named after `old` is renamed along with it.
pub fn rename_in_contract(contract: &mut ContractDef, old: &str, new: &SmolStr) {
    let old_event = change_event_name(old);
    let new_event = change_event_name(new);

    for part in &mut contract.parts {
        match part {
            ContractPart::Function(def) => {
                if let Some(body) = &mut def.body {
                    for stmt in body {
                        rename_in_stmt(stmt, old, new, &old_event, &new_event);
                    }
                }
            }
            ContractPart::Modifier(def) => {
                for stmt in &mut def.body {
                    rename_in_stmt(stmt, old, new, &old_event, &new_event);
                }
            }
            ContractPart::Event(def) => {
                if def.name == old_event {
                    def.name = new_event.clone();
                }
            }
            ContractPart::Variable(_)
            | ContractPart::Struct(_)
            | ContractPart::Enum(_)
            | ContractPart::Unsupported(_) => {}
        }
    }
}

/// Drop the variable's declaration, its change event, and every statement
/// that touches it. Functions whose bodies are emptied by the scrub are
/// removed outright.
pub fn strip_from_contract(contract: &mut ContractDef, name: &str) {
    let event = change_event_name(name);
    contract.parts.retain_mut(|part| match part {
        ContractPart::Variable(decl) => decl.name != name,
        ContractPart::Event(def) => def.name != event,
        ContractPart::Function(def) => match &mut def.body {
            Some(body) if !body.is_empty() => {
                body.retain(|stmt| !stmt_touches(stmt, name, &event));
                !body.is_empty()
            }
            _ => true,
        },
        ContractPart::Modifier(_)
        | ContractPart::Struct(_)
        | ContractPart::Enum(_)
        | ContractPart::Unsupported(_) => true,
    });
}

fn stmt_touches(stmt: &Stmt, name: &str, event: &str) -> bool {
    if matches!(stmt, Stmt::Emit { event: emitted, .. } if emitted == event) {
        return true;
    }
    let mut found = vec![false];
    mark_stmt_uses(stmt, &[name], &mut found);
    found[0]
}

fn rename_in_stmt(stmt: &mut Stmt, old: &str, new: &SmolStr, old_event: &str, new_event: &SmolStr) {
    match stmt {
        Stmt::Expr(expr) => rename_in_expr(expr, old, new),
        Stmt::Return(value) => {
            if let Some(value) = value {
                rename_in_expr(value, old, new);
            }
        }
        Stmt::VarDecl { value, .. } => {
            if let Some(value) = value {
                rename_in_expr(value, old, new);
            }
        }
        Stmt::DestructureDecl { value, .. } => rename_in_expr(value, old, new),
        Stmt::If {
            condition,
            body,
            or_else,
        } => {
            rename_in_expr(condition, old, new);
            for stmt in body.iter_mut().chain(or_else.iter_mut()) {
                rename_in_stmt(stmt, old, new, old_event, new_event);
            }
        }
        Stmt::For {
            init,
            condition,
            step,
            body,
        } => {
            if let Some(init) = init {
                rename_in_stmt(init, old, new, old_event, new_event);
            }
            if let Some(condition) = condition {
                rename_in_expr(condition, old, new);
            }
            if let Some(step) = step {
                rename_in_expr(step, old, new);
            }
            for stmt in body {
                rename_in_stmt(stmt, old, new, old_event, new_event);
            }
        }
        Stmt::Emit { event, args } => {
            if event == old_event {
                *event = new_event.clone();
            }
            for arg in args {
                rename_in_expr(arg, old, new);
            }
        }
        Stmt::InlineAssembly(text) => {
            *text = replace_word(text, old, new);
        }
        Stmt::Unsupported(_) => {}
    }
}

fn rename_in_expr(expr: &mut Expr, old: &str, new: &SmolStr) {
    match expr {
        Expr::Ident(name) => {
            if name == old {
                *name = new.clone();
            }
        }
        Expr::Binary { left, right, .. } => {
            rename_in_expr(left, old, new);
            rename_in_expr(right, old, new);
        }
        Expr::Unary { operand, .. } => rename_in_expr(operand, old, new),
        Expr::Assign { target, value, .. } => {
            rename_in_expr(target, old, new);
            rename_in_expr(value, old, new);
        }
        Expr::Call { func, args } => {
            rename_in_expr(func, old, new);
            for arg in args {
                rename_in_expr(arg, old, new);
            }
        }
        Expr::CallWithOptions {
            func,
            options,
            args,
        } => {
            rename_in_expr(func, old, new);
            for (_, value) in options {
                rename_in_expr(value, old, new);
            }
            for arg in args {
                rename_in_expr(arg, old, new);
            }
        }
        Expr::Member { value, .. } => rename_in_expr(value, old, new),
        Expr::Index { base, index } => {
            rename_in_expr(base, old, new);
            rename_in_expr(index, old, new);
        }
        Expr::Tuple(elts) => {
            for elt in elts {
                rename_in_expr(elt, old, new);
            }
        }
        Expr::Number(_)
        | Expr::HexNumber(_)
        | Expr::Bool(_)
        | Expr::Str(_)
        | Expr::ElementaryType(_)
        | Expr::Unsupported(_) => {}
    }
}

/// Whole-word replacement inside opaque assembly text.
fn replace_word(text: &str, old: &str, new: &str) -> String {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$';
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(old) {
        let before = if pos == 0 {
            out.chars().next_back()
        } else {
            rest[..pos].chars().next_back()
        };
        let before_ok = !before.is_some_and(is_ident);
        let after = &rest[pos + old.len()..];
        let after_ok = !after.chars().next().is_some_and(is_ident);
        out.push_str(&rest[..pos]);
        if before_ok && after_ok {
            out.push_str(new);
        } else {
            out.push_str(old);
        }
        rest = after;
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::replace_word;

    #[test]
    fn replaces_whole_words_only() {
        assert_eq!(replace_word("sload(owner) new_owner", "owner", "holder"), "sload(holder) new_owner");
        assert_eq!(replace_word("owner owner", "owner", "holder"), "holder holder");
    }
}
