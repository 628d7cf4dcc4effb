//! The tree walk behind [`crate::analyze`].
//!
//! Dispatch is an exhaustive match per syntax category; `Unsupported` nodes
//! contribute nothing rather than falling through silently.

use indexmap::IndexMap;
use parser::ast::{EnumDef, EventDef, Expr, FunctionDef, ModifierDef, Stmt, StructDef, TypeDesc};
use smol_str::SmolStr;

use crate::model::DependencySet;

pub(crate) struct UsageWalker<'a> {
    variable_names: &'a [&'a str],
    events: &'a IndexMap<SmolStr, EventDef>,
    modifiers: &'a IndexMap<SmolStr, ModifierDef>,
    structs: &'a IndexMap<SmolStr, StructDef>,
    enums: &'a IndexMap<SmolStr, EnumDef>,
    uses: Vec<bool>,
    deps: DependencySet,
}

impl<'a> UsageWalker<'a> {
    pub(crate) fn new(
        variable_names: &'a [&'a str],
        events: &'a IndexMap<SmolStr, EventDef>,
        modifiers: &'a IndexMap<SmolStr, ModifierDef>,
        structs: &'a IndexMap<SmolStr, StructDef>,
        enums: &'a IndexMap<SmolStr, EnumDef>,
    ) -> Self {
        UsageWalker {
            variable_names,
            events,
            modifiers,
            structs,
            enums,
            uses: vec![false; variable_names.len()],
            deps: DependencySet::default(),
        }
    }

    pub(crate) fn finish(self) -> (Vec<bool>, DependencySet) {
        (self.uses, self.deps)
    }

    pub(crate) fn walk_function(&mut self, def: &FunctionDef) {
        for name in &def.modifiers {
            if self.modifiers.contains_key(name) {
                self.deps.modifiers.insert(name.clone());
            }
        }
        for param in def.params.iter().chain(def.returns.iter()) {
            self.walk_type(&param.typ);
        }
        if let Some(body) = &def.body {
            for stmt in body {
                self.walk_stmt(stmt);
            }
        }
    }

    fn walk_type(&mut self, typ: &TypeDesc) {
        match typ {
            TypeDesc::Elementary(_) | TypeDesc::Unsupported(_) => {}
            TypeDesc::UserDefined(name) => {
                if self.structs.contains_key(name) {
                    self.deps.structs.insert(name.clone());
                } else if self.enums.contains_key(name) {
                    self.deps.enums.insert(name.clone());
                }
            }
            TypeDesc::Mapping { key, value } => {
                self.walk_type(key);
                self.walk_type(value);
            }
            TypeDesc::Array { base, .. } => self.walk_type(base),
        }
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(expr) => self.walk_expr(expr),
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.walk_expr(value);
                }
            }
            Stmt::VarDecl { typ, value, .. } => {
                self.walk_type(typ);
                if let Some(value) = value {
                    self.walk_expr(value);
                }
            }
            Stmt::DestructureDecl { components, value } => {
                for component in components.iter().flatten() {
                    self.walk_type(&component.0);
                }
                self.walk_expr(value);
            }
            Stmt::If {
                condition,
                body,
                or_else,
            } => {
                self.walk_expr(condition);
                for stmt in body.iter().chain(or_else.iter()) {
                    self.walk_stmt(stmt);
                }
            }
            Stmt::For {
                init,
                condition,
                step,
                body,
            } => {
                if let Some(init) = init {
                    self.walk_stmt(init);
                }
                if let Some(condition) = condition {
                    self.walk_expr(condition);
                }
                if let Some(step) = step {
                    self.walk_expr(step);
                }
                for stmt in body {
                    self.walk_stmt(stmt);
                }
            }
            Stmt::Emit { event, args } => {
                if self.events.contains_key(event) {
                    self.deps.events.insert(event.clone());
                }
                for arg in args {
                    self.walk_expr(arg);
                }
            }
            // assembly is opaque text; a whole-word scan still catches
            // state variable reads like `sload(slot_of(owner))`
            Stmt::InlineAssembly(text) => {
                for (i, name) in self.variable_names.iter().enumerate() {
                    if contains_word(text, name) {
                        self.uses[i] = true;
                    }
                }
            }
            Stmt::Unsupported(_) => {}
        }
    }

    fn walk_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident(name) => {
                if let Some(i) = self.variable_names.iter().position(|n| n == name) {
                    self.uses[i] = true;
                }
            }
            Expr::Binary { left, right, .. } => {
                self.walk_expr(left);
                self.walk_expr(right);
            }
            Expr::Unary { operand, .. } => self.walk_expr(operand),
            Expr::Assign { target, value, .. } => {
                self.walk_expr(target);
                self.walk_expr(value);
            }
            Expr::Call { func, args } => {
                self.walk_expr(func);
                for arg in args {
                    self.walk_expr(arg);
                }
            }
            Expr::CallWithOptions {
                func,
                options,
                args,
            } => {
                self.walk_expr(func);
                for (_, value) in options {
                    self.walk_expr(value);
                }
                for arg in args {
                    self.walk_expr(arg);
                }
            }
            // only the base can reference contract state; the member name
            // itself never names a state variable of this contract
            Expr::Member { value, .. } => self.walk_expr(value),
            Expr::Index { base, index } => {
                self.walk_expr(base);
                self.walk_expr(index);
            }
            Expr::Tuple(elts) => {
                for elt in elts {
                    self.walk_expr(elt);
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
}

/// Mark, in `found`, every state variable the expression references.
pub fn mark_expr_uses(expr: &Expr, names: &[&str], found: &mut Vec<bool>) {
    bare_walker(names, found, |walker| walker.walk_expr(expr));
}

/// Statement-level variant of [`mark_expr_uses`].
pub fn mark_stmt_uses(stmt: &Stmt, names: &[&str], found: &mut Vec<bool>) {
    bare_walker(names, found, |walker| walker.walk_stmt(stmt));
}

fn bare_walker(names: &[&str], found: &mut Vec<bool>, walk: impl FnOnce(&mut UsageWalker<'_>)) {
    let events = IndexMap::new();
    let modifiers = IndexMap::new();
    let structs = IndexMap::new();
    let enums = IndexMap::new();
    let mut walker = UsageWalker::new(names, &events, &modifiers, &structs, &enums);
    walk(&mut walker);
    let (uses, _) = walker.finish();
    for (slot, used) in found.iter_mut().zip(uses) {
        *slot |= used;
    }
}

fn contains_word(text: &str, word: &str) -> bool {
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$';
    let mut rest = text;
    while let Some(pos) = rest.find(word) {
        let before_ok = pos == 0 || !rest[..pos].chars().next_back().is_some_and(is_ident);
        let after = &rest[pos + word.len()..];
        let after_ok = !after.chars().next().is_some_and(is_ident);
        if before_ok && after_ok {
            return true;
        }
        rest = &rest[pos + word.len()..];
    }
    false
}

#[cfg(test)]
mod tests {
    use super::contains_word;

    #[test]
    fn word_boundaries() {
        assert!(contains_word("sload(owner_slot) owner", "owner"));
        assert!(!contains_word("new_owner old_owner", "owner"));
        assert!(contains_word("x := total", "total"));
    }
}
