//! Updater contract generation.
//!
//! A maintenance batch leaves two partition records behind: the snapshot
//! taken at deployment (or the last migration) and the rewritten live
//! record. Diffing the two, per slot, yields the variables that survived the
//! change under their new names; the emitted one-shot "Updater" contract
//! reads each survivor from the old logic contract and writes it to the new
//! one. Mapping-typed variables are copied key by key from an externally
//! injected key list, since a mapping's key space cannot be enumerated
//! on-chain.

use std::fmt;

use common::PartitionRecord;
use indexmap::IndexMap;
use maintenance::Requirement;
use parser::ast::TypeDesc;
use smol_str::SmolStr;
use tracing::debug;

mod updater;

pub use updater::updater_contract;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    /// A surviving variable has no parseable type descriptor in the record.
    UnknownVariableType(SmolStr),
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationError::UnknownVariableType(name) => {
                write!(f, "no usable type descriptor for migrated variable `{name}`")
            }
        }
    }
}

impl std::error::Error for MigrationError {}

/// One variable that persisted across a maintenance batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigratedVariable {
    pub old_name: SmolStr,
    pub new_name: SmolStr,
    pub typ: TypeDesc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotMigration {
    pub slot: u32,
    pub variables: Vec<MigratedVariable>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MigrationPlan {
    pub slots: Vec<SlotMigration>,
}

impl MigrationPlan {
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// The old-name to new-name map implied by a requirement batch.
pub fn rename_map(requirements: &[Requirement]) -> IndexMap<SmolStr, SmolStr> {
    requirements
        .iter()
        .filter_map(|requirement| match requirement {
            Requirement::Update { old, new } => Some((old.name.clone(), new.name.clone())),
            _ => None,
        })
        .collect()
}

/// Per slot, the variables whose renamed-old identity intersects the new
/// identity. Slots the batch left untouched are skipped; they need no
/// redeployment and so no state copy.
pub fn plan_migration(
    old: &PartitionRecord,
    new: &PartitionRecord,
    renames: &IndexMap<SmolStr, SmolStr>,
) -> Result<MigrationPlan, MigrationError> {
    let mut plan = MigrationPlan::default();

    for slot in old.occupied_slots() {
        let old_vars = &old.slots[&slot];
        let new_vars: &[SmolStr] = new.slots.get(&slot).map_or(&[], Vec::as_slice);

        let renamed_old: Vec<(SmolStr, SmolStr)> = old_vars
            .iter()
            .map(|name| {
                let renamed = renames.get(name).unwrap_or(name).clone();
                (name.clone(), renamed)
            })
            .collect();

        let untouched = renamed_old
            .iter()
            .all(|(old_name, new_name)| old_name == new_name)
            && old_vars.as_slice() == new_vars;
        if untouched {
            continue;
        }

        let mut variables = vec![];
        for (old_name, new_name) in renamed_old {
            if !new_vars.contains(&new_name) {
                continue;
            }
            let descriptor = old
                .types
                .get(&old_name)
                .ok_or_else(|| MigrationError::UnknownVariableType(old_name.clone()))?;
            let typ = parser::parse_type_text(descriptor)
                .map_err(|_| MigrationError::UnknownVariableType(old_name.clone()))?;
            variables.push(MigratedVariable {
                old_name,
                new_name,
                typ,
            });
        }
        if variables.is_empty() {
            continue;
        }
        debug!(slot, count = variables.len(), "slot needs a state copy");
        plan.slots.push(SlotMigration { slot, variables });
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(slot_vars: &[(u32, &[(&str, &str)])]) -> PartitionRecord {
        let mut record = PartitionRecord::new("Token");
        for (slot, vars) in slot_vars {
            for (name, typ) in *vars {
                record.insert_variable((*name).into(), *slot, (*typ).to_string());
            }
        }
        record
    }

    #[test]
    fn surviving_variables_under_their_new_names() {
        let old = record(&[(0, &[("a", "uint256"), ("b", "uint256"), ("c", "address")])]);
        let new = record(&[(0, &[("a2", "uint256"), ("b", "uint256"), ("d", "address")])]);
        let renames = IndexMap::from([(SmolStr::new("a"), SmolStr::new("a2"))]);

        let plan = plan_migration(&old, &new, &renames).unwrap();
        assert_eq!(plan.slots.len(), 1);
        let names: Vec<(&str, &str)> = plan.slots[0]
            .variables
            .iter()
            .map(|var| (var.old_name.as_str(), var.new_name.as_str()))
            .collect();
        assert_eq!(names, vec![("a", "a2"), ("b", "b")]);
    }

    #[test]
    fn untouched_slots_are_skipped() {
        let old = record(&[
            (0, &[("a", "uint256")]),
            (1, &[("b", "uint256")]),
        ]);
        let mut new = old.clone();
        new.rename_variable("a", "a2".into(), "uint256".to_string());
        let renames = IndexMap::from([(SmolStr::new("a"), SmolStr::new("a2"))]);

        let plan = plan_migration(&old, &new, &renames).unwrap();
        assert_eq!(plan.slots.len(), 1);
        assert_eq!(plan.slots[0].slot, 0);
    }

    #[test]
    fn a_fully_replaced_slot_produces_no_copy() {
        let old = record(&[(0, &[("a", "uint256")])]);
        let new = record(&[(0, &[("z", "uint256")])]);
        let plan = plan_migration(&old, &new, &IndexMap::new()).unwrap();
        assert!(plan.is_empty());
    }
}
