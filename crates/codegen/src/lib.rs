//! Partition-driven contract generation.
//!
//! Consumes the analyzer's [`ContractModel`] and the optimizer's
//! [`Partition`] and emits one state/logic contract pair per occupied slot
//! plus the router, together with the partition record the maintenance
//! engine reads back later.

use std::fmt;

use analyzer::{ContractModel, DependencySet, FunctionInfo, StateVariable};
use common::{naming, PartitionRecord};
use indexmap::IndexMap;
use optimizer::Partition;
use parser::ast::{ContractDef, SourceUnit, TypeDesc};
use smol_str::SmolStr;
use tracing::{debug, warn};

pub mod accessors;
pub mod hyperlayer;
pub mod logic;
pub mod state;

pub use accessors::{getter, getter_name, setter, setter_name};

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum CodegenError {
    /// The partition does not line up with the analyzed variable set.
    InvalidPartitionAssignment(String),
    /// A generated state/logic pair disagrees on variable order.
    StorageLayoutMismatch { contract: SmolStr },
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenError::InvalidPartitionAssignment(detail) => {
                write!(f, "partition does not match the analyzed contract: {detail}")
            }
            CodegenError::StorageLayoutMismatch { contract } => {
                write!(f, "storage layout mismatch in generated pair for `{contract}`")
            }
        }
    }
}

impl std::error::Error for CodegenError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedContract {
    pub name: SmolStr,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SplitArtifacts {
    pub contracts: Vec<GeneratedContract>,
    pub record: PartitionRecord,
    /// Functions whose usage spans more than one slot. They cannot be
    /// attributed to a single logic contract and need manual resolution.
    pub cross_slot_functions: Vec<SmolStr>,
}

/// Generate every artifact of a partitioned contract.
pub fn split_contract(
    model: &ContractModel,
    partition: &Partition,
) -> Result<SplitArtifacts, CodegenError> {
    if partition.slots.len() != model.variables.len() {
        return Err(CodegenError::InvalidPartitionAssignment(format!(
            "partition covers {} variables, contract declares {}",
            partition.slots.len(),
            model.variables.len(),
        )));
    }

    let modern = model
        .pragma
        .as_ref()
        .and_then(|pragma| common::version::declared_version(&pragma.requirement))
        .as_ref()
        .is_some_and(common::version::has_modern_constructor);

    let occupied = partition.occupied_slots();
    let min_slot = *occupied.first().ok_or_else(|| {
        CodegenError::InvalidPartitionAssignment("partition occupies no slot".into())
    })?;

    // slot -> variables, in declaration order
    let mut slot_vars: IndexMap<u32, Vec<&StateVariable>> =
        occupied.iter().map(|slot| (*slot, vec![])).collect();
    for (var, slot) in model.variables.iter().zip(&partition.slots) {
        slot_vars.entry(*slot).or_default().push(var);
    }

    // attribute functions to slots
    let mut slot_functions: IndexMap<u32, Vec<&FunctionInfo>> =
        occupied.iter().map(|slot| (*slot, vec![])).collect();
    let mut slot_deps: IndexMap<u32, DependencySet> = occupied
        .iter()
        .map(|slot| (*slot, DependencySet::default()))
        .collect();
    let mut cross_slot_functions = vec![];
    let mut function_slots: IndexMap<SmolStr, Vec<u32>> = IndexMap::new();

    for func in &model.functions {
        let mut touched: Vec<u32> = func
            .used_variables()
            .map(|i| partition.slots[i])
            .collect();
        touched.sort_unstable();
        touched.dedup();

        let home = match touched.as_slice() {
            // a function using no state can live anywhere; the canonical
            // first slot keeps it callable
            [] => Some(min_slot),
            [slot] => Some(*slot),
            _ => None,
        };
        if let Some(name) = &func.name {
            function_slots.insert(
                name.clone(),
                if touched.is_empty() {
                    vec![min_slot]
                } else {
                    touched.clone()
                },
            );
        }
        match home {
            Some(slot) => {
                slot_functions[&slot].push(func);
                slot_deps[&slot].merge(&func.deps);
            }
            None => {
                if let Some(name) = &func.name {
                    warn!(function = %name, slots = ?touched, "function spans multiple slots");
                    cross_slot_functions.push(name.clone());
                }
            }
        }
    }

    // definitions whose own bodies or field types reach into a slot's
    // variables belong to that slot even when no resident function uses them
    for (slot, names) in definition_slots(model, partition) {
        let deps = &mut slot_deps[&slot];
        deps.events.extend(names.events);
        deps.modifiers.extend(names.modifiers);
        deps.structs.extend(names.structs);
        deps.enums.extend(names.enums);
    }

    let mut contracts = vec![];
    let mut record = PartitionRecord::new(model.name.clone());

    for slot in &occupied {
        let variables = &slot_vars[slot];
        let state_name = naming::state_contract(&model.name, *slot);
        let logic_name = naming::logic_contract(&model.name, *slot);

        let state = state::state_contract(&state_name, variables, modern);
        let logic = logic::logic_contract(
            &logic_name,
            variables,
            &slot_functions[slot],
            &slot_deps[slot],
            model,
        );
        verify_layout(&state, &logic)?;

        contracts.push(render(model, &state_name, state));
        contracts.push(render(model, &logic_name, logic));

        for var in variables {
            record.insert_variable(var.name.clone(), *slot, var.typ.descriptor());
        }
    }
    record.functions = function_slots;

    contracts.push(render(
        model,
        naming::HYPERLAYER_CONTRACT,
        hyperlayer::hyperlayer_contract(naming::HYPERLAYER_CONTRACT, modern),
    ));

    debug!(
        contract = %model.name,
        slots = occupied.len(),
        cross_slot = cross_slot_functions.len(),
        "generated partitioned contracts"
    );

    Ok(SplitArtifacts {
        contracts,
        record,
        cross_slot_functions,
    })
}

fn render(model: &ContractModel, name: &str, contract: ContractDef) -> GeneratedContract {
    let unit = SourceUnit {
        pragma: model.pragma.clone(),
        contracts: vec![contract],
    };
    GeneratedContract {
        name: name.into(),
        source: unit.to_string(),
    }
}

/// Both contracts of a pair must declare the same variables in the same
/// order behind the forwarding field.
pub fn verify_layout(state: &ContractDef, logic: &ContractDef) -> Result<(), CodegenError> {
    let header = |contract: &ContractDef| -> Vec<(SmolStr, String)> {
        contract
            .variables()
            .map(|var| (var.name.clone(), var.typ.descriptor()))
            .collect()
    };
    if header(state) == header(logic) {
        Ok(())
    } else {
        Err(CodegenError::StorageLayoutMismatch {
            contract: state.name.clone(),
        })
    }
}

/// For each definition kind, the slots its state-variable dependencies land
/// in. Events depend through field types, modifiers through body
/// identifiers, structs through member types; enums never reference state.
fn definition_slots(
    model: &ContractModel,
    partition: &Partition,
) -> IndexMap<u32, DependencySet> {
    let names: Vec<&str> = model.variables.iter().map(|var| var.name.as_str()).collect();
    let mut placed: IndexMap<u32, DependencySet> = IndexMap::new();

    let mut place = |indices: Vec<usize>, kind: Kind, name: &SmolStr| {
        let mut slots: Vec<u32> = indices.iter().map(|i| partition.slots[*i]).collect();
        slots.sort_unstable();
        slots.dedup();
        for slot in slots {
            let deps = placed.entry(slot).or_default();
            match kind {
                Kind::Event => deps.events.insert(name.clone()),
                Kind::Modifier => deps.modifiers.insert(name.clone()),
                Kind::Struct => deps.structs.insert(name.clone()),
            };
        }
    };

    for (name, event) in &model.events {
        let mut indices = vec![];
        for field in &event.fields {
            type_variable_refs(&field.typ, &names, &mut indices);
        }
        place(indices, Kind::Event, name);
    }
    for (name, modifier) in &model.modifiers {
        let mut found = vec![false; names.len()];
        for stmt in &modifier.body {
            analyzer::mark_stmt_uses(stmt, &names, &mut found);
        }
        let indices = found
            .iter()
            .enumerate()
            .filter_map(|(i, used)| used.then_some(i))
            .collect();
        place(indices, Kind::Modifier, name);
    }
    for (name, strukt) in &model.structs {
        let mut indices = vec![];
        for field in &strukt.fields {
            type_variable_refs(&field.typ, &names, &mut indices);
        }
        place(indices, Kind::Struct, name);
    }

    placed
}

#[derive(Copy, Clone)]
enum Kind {
    Event,
    Modifier,
    Struct,
}

fn type_variable_refs(typ: &TypeDesc, names: &[&str], out: &mut Vec<usize>) {
    match typ {
        TypeDesc::UserDefined(name) => {
            if let Some(i) = names.iter().position(|n| n == name) {
                out.push(i);
            }
        }
        TypeDesc::Mapping { key, value } => {
            type_variable_refs(key, names, out);
            type_variable_refs(value, names, out);
        }
        TypeDesc::Array { base, .. } => type_variable_refs(base, names, out),
        TypeDesc::Elementary(_) | TypeDesc::Unsupported(_) => {}
    }
}

