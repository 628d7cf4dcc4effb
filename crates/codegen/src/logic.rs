//! Logic contract generation.
//!
//! The variable header mirrors the state contract's declarations (without
//! initializers) behind the same forwarding-address placeholder, so both
//! sides agree on the storage layout the delegate-call executes against.

use analyzer::{ContractModel, DependencySet, FunctionInfo, StateVariable};
use indexmap::IndexSet;
use parser::ast::{
    ContractDef, ContractKind, ContractPart, EventDef, EventField, Expr, FunctionDef, Stmt,
    TypeDesc, VariableDecl,
};
use smol_str::SmolStr;

use crate::accessors;
use crate::state::forwarding_field;

pub fn change_event_name(var: &str) -> SmolStr {
    format!("{var}Event").into()
}

/// Build one slot's logic contract.
pub fn logic_contract(
    name: &str,
    variables: &[&StateVariable],
    functions: &[&FunctionInfo],
    deps: &DependencySet,
    model: &ContractModel,
) -> ContractDef {
    let mut parts = vec![forwarding_field()];
    for var in variables {
        parts.push(ContractPart::Variable(VariableDecl {
            typ: var.typ.clone(),
            visibility: var.visibility,
            is_constant: var.is_constant,
            name: var.name.clone(),
            value: None,
        }));
    }

    // one change-notification event per mapping, fired on every write
    let mappings: IndexSet<SmolStr> = variables
        .iter()
        .filter(|var| var.typ.is_mapping())
        .map(|var| var.name.clone())
        .collect();
    for var in variables {
        if let TypeDesc::Mapping { key, .. } = &var.typ {
            parts.push(ContractPart::Event(EventDef {
                name: change_event_name(&var.name),
                fields: vec![
                    EventField {
                        typ: TypeDesc::elementary("string"),
                        is_indexed: false,
                        name: "contractname".into(),
                    },
                    EventField {
                        typ: (**key).clone(),
                        is_indexed: false,
                        name: "key".into(),
                    },
                ],
            }));
        }
    }

    for var in variables {
        if var.visibility == parser::ast::Visibility::Private {
            parts.push(ContractPart::Function(accessors::getter(
                &var.name, &var.typ,
            )));
        }
    }

    for event in deps.events.iter().filter_map(|name| model.events.get(name)) {
        parts.push(ContractPart::Event(event.clone()));
    }
    for modifier in deps
        .modifiers
        .iter()
        .filter_map(|name| model.modifiers.get(name))
    {
        parts.push(ContractPart::Modifier(modifier.clone()));
    }
    for strukt in deps
        .structs
        .iter()
        .filter_map(|name| model.structs.get(name))
    {
        parts.push(ContractPart::Struct(strukt.clone()));
    }
    for enumeration in deps.enums.iter().filter_map(|name| model.enums.get(name)) {
        parts.push(ContractPart::Enum(enumeration.clone()));
    }

    for func in functions {
        parts.push(ContractPart::Function(with_change_events(
            &func.def, &mappings,
        )));
    }

    ContractDef {
        kind: ContractKind::Contract,
        name: name.into(),
        parts,
    }
}

/// Copy a function definition, inserting a change-notification emit after
/// every write to one of the slot's mappings.
pub fn with_change_events(def: &FunctionDef, mappings: &IndexSet<SmolStr>) -> FunctionDef {
    let mut def = def.clone();
    if let Some(body) = def.body.take() {
        def.body = Some(instrument_block(body, mappings));
    }
    def
}

fn instrument_block(block: Vec<Stmt>, mappings: &IndexSet<SmolStr>) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(block.len());
    for stmt in block {
        match stmt {
            Stmt::Expr(expr) => {
                let emit = mapping_write(&expr, mappings);
                out.push(Stmt::Expr(expr));
                if let Some((name, key)) = emit {
                    out.push(Stmt::Emit {
                        event: change_event_name(&name),
                        args: vec![Expr::Str(name), key],
                    });
                }
            }
            Stmt::If {
                condition,
                body,
                or_else,
            } => out.push(Stmt::If {
                condition,
                body: instrument_block(body, mappings),
                or_else: instrument_block(or_else, mappings),
            }),
            Stmt::For {
                init,
                condition,
                step,
                body,
            } => out.push(Stmt::For {
                init,
                condition,
                step,
                body: instrument_block(body, mappings),
            }),
            other => out.push(other),
        }
    }
    out
}

/// If the expression assigns into one of the given mappings, return the
/// mapping name and the written key.
fn mapping_write(expr: &Expr, mappings: &IndexSet<SmolStr>) -> Option<(SmolStr, Expr)> {
    if let Expr::Assign { target, .. } = expr {
        if let Expr::Index { base, index } = target.as_ref() {
            if let Expr::Ident(name) = base.as_ref() {
                if mappings.contains(name) {
                    return Some((name.clone(), (**index).clone()));
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use analyzer::analyze;
    use parser::ast::{ContractPart, Stmt};
    use parser::parse_file;
    use pretty_assertions::assert_eq;

    use super::*;

    const TOKEN: &str = r#"pragma solidity ^0.6.0;

contract Token {
    mapping(address => uint256) private balances;

    function credit(address to, uint256 amount) public {
        balances[to] = balances[to] + amount;
    }
}
"#;

    fn token_model() -> ContractModel {
        analyze(&parse_file(TOKEN).unwrap()).unwrap()
    }

    #[test]
    fn header_drops_initializers_and_adds_change_event() {
        let model = token_model();
        let variables: Vec<&StateVariable> = model.variables.iter().collect();
        let functions: Vec<&FunctionInfo> = model.functions.iter().collect();
        let contract = logic_contract(
            "TokenLogic0",
            &variables,
            &functions,
            &DependencySet::default(),
            &model,
        );

        let decls: Vec<&VariableDecl> = contract.variables().collect();
        assert_eq!(decls[0].name, "logicContract");
        assert!(decls.iter().all(|decl| decl.value.is_none()));
        assert!(contract.parts.iter().any(|part| matches!(
            part,
            ContractPart::Event(event) if event.name == "balancesEvent"
        )));
        // private variable gets a getter
        assert!(contract.parts.iter().any(|part| matches!(
            part,
            ContractPart::Function(def) if def.name.as_deref() == Some("get_balances")
        )));
    }

    #[test]
    fn mapping_writes_are_followed_by_an_emit() {
        let model = token_model();
        let mappings: IndexSet<SmolStr> = ["balances".into()].into_iter().collect();
        let instrumented = with_change_events(&model.functions[0].def, &mappings);
        let body = instrumented.body.unwrap();
        assert_eq!(body.len(), 2);
        match &body[1] {
            Stmt::Emit { event, args } => {
                assert_eq!(event.as_str(), "balancesEvent");
                assert_eq!(args[0], Expr::Str("balances".into()));
                assert_eq!(args[1], Expr::ident("to"));
            }
            other => panic!("expected an emit after the mapping write, found {other:?}"),
        }
    }

    #[test]
    fn reads_are_left_alone() {
        let model = token_model();
        let mappings: IndexSet<SmolStr> = ["balances".into()].into_iter().collect();
        let mut def = model.functions[0].def.clone();
        def.body = Some(vec![Stmt::Return(Some(Expr::index(
            Expr::ident("balances"),
            Expr::ident("to"),
        )))]);
        let instrumented = with_change_events(&def, &mappings);
        assert_eq!(instrumented.body.unwrap().len(), 1);
    }
}
