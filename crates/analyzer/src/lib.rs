//! Usage and dependency analysis over a parsed contract.
//!
//! A single pass over the syntax tree produces a [`ContractModel`]: the state
//! variables in declaration order, each function's usage vector over those
//! variables, the reference edges implied by initializers, and the dependency
//! sets the code generator needs when it distributes definitions across
//! slots. The pass is a pure function of the tree.

use std::fmt;

use indexmap::IndexMap;
use parser::ast::{
    ContractDef, ContractPart, EnumDef, EventDef, FunctionDef, FunctionKind, ModifierDef, Pragma,
    SourceUnit, StructDef,
};
use smol_str::SmolStr;

mod model;
mod usage;

pub use model::{ContractModel, DependencySet, FunctionInfo, ReferenceEdge, StateVariable};
pub use usage::{mark_expr_uses, mark_stmt_uses};

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AnalyzerError {
    /// The source unit holds no contract definition at all.
    MissingContractDefinition,
    /// More than one contract definition; the pipeline works on exactly one.
    MultipleContractDefinitions(Vec<SmolStr>),
}

impl fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzerError::MissingContractDefinition => {
                write!(f, "source contains no contract definition")
            }
            AnalyzerError::MultipleContractDefinitions(names) => {
                write!(
                    f,
                    "source contains {} contract definitions ({}); exactly one is supported",
                    names.len(),
                    names
                        .iter()
                        .map(SmolStr::as_str)
                        .collect::<Vec<_>>()
                        .join(", "),
                )
            }
        }
    }
}

impl std::error::Error for AnalyzerError {}

/// Analyze a parsed source unit into a [`ContractModel`].
pub fn analyze(unit: &SourceUnit) -> Result<ContractModel, AnalyzerError> {
    let contract = match unit.contracts.as_slice() {
        [] => return Err(AnalyzerError::MissingContractDefinition),
        [contract] => contract,
        many => {
            return Err(AnalyzerError::MultipleContractDefinitions(
                many.iter().map(|c| c.name.clone()).collect(),
            ))
        }
    };
    Ok(analyze_contract(contract, unit.pragma.clone()))
}

fn analyze_contract(contract: &ContractDef, pragma: Option<Pragma>) -> ContractModel {
    let mut variables = vec![];
    let mut function_defs: Vec<&FunctionDef> = vec![];
    let mut events: IndexMap<SmolStr, EventDef> = IndexMap::new();
    let mut modifiers: IndexMap<SmolStr, ModifierDef> = IndexMap::new();
    let mut structs: IndexMap<SmolStr, StructDef> = IndexMap::new();
    let mut enums: IndexMap<SmolStr, EnumDef> = IndexMap::new();

    for part in &contract.parts {
        match part {
            ContractPart::Variable(decl) => {
                let index = variables.len();
                variables.push(StateVariable {
                    index,
                    name: decl.name.clone(),
                    typ: decl.typ.clone(),
                    visibility: decl.visibility,
                    is_constant: decl.is_constant,
                    initializer: decl.value.clone(),
                });
            }
            ContractPart::Function(def) => function_defs.push(def),
            ContractPart::Event(def) => {
                events.insert(def.name.clone(), def.clone());
            }
            ContractPart::Modifier(def) => {
                modifiers.insert(def.name.clone(), def.clone());
            }
            ContractPart::Struct(def) => {
                structs.insert(def.name.clone(), def.clone());
            }
            ContractPart::Enum(def) => {
                enums.insert(def.name.clone(), def.clone());
            }
            ContractPart::Unsupported(_) => {}
        }
    }

    let variable_names: Vec<&str> = variables.iter().map(|var| var.name.as_str()).collect();

    let functions = function_defs
        .iter()
        .enumerate()
        .map(|(index, def)| {
            let mut walker = usage::UsageWalker::new(
                &variable_names,
                &events,
                &modifiers,
                &structs,
                &enums,
            );
            walker.walk_function(def);
            let (uses, deps) = walker.finish();
            FunctionInfo {
                index,
                name: match def.kind {
                    FunctionKind::Constructor => Some("constructor".into()),
                    FunctionKind::Fallback | FunctionKind::OldStyleFallback => {
                        Some("fallback".into())
                    }
                    FunctionKind::Function => def.name.clone(),
                },
                uses,
                deps,
                def: (*def).clone(),
            }
        })
        .collect();

    let reference_edges = reference_edges(&variables, &variable_names);

    ContractModel {
        name: contract.name.clone(),
        pragma,
        variables,
        functions,
        reference_edges,
        events,
        modifiers,
        structs,
        enums,
    }
}

/// Edges from a variable's initializer to every state variable it reads.
/// Both ends of an edge must land in the same slot.
fn reference_edges(variables: &[StateVariable], names: &[&str]) -> Vec<ReferenceEdge> {
    let mut edges = vec![];
    for var in variables {
        let Some(init) = &var.initializer else {
            continue;
        };
        let mut referenced = vec![false; names.len()];
        usage::mark_expr_uses(init, names, &mut referenced);
        for (other, used) in referenced.iter().enumerate() {
            if *used && other != var.index {
                let edge = ReferenceEdge {
                    from: var.index,
                    to: other,
                };
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
        }
    }
    edges
}
