//! Requirement application.

use std::fs;
use std::path::PathBuf;

use codegen::accessors;
use common::{naming, PartitionRecord};
use parser::ast::{ContractDef, ContractPart, Expr, TypeDesc, VariableDecl, Visibility};
use parser::AstProvider;
use smol_str::SmolStr;
use tracing::{info, warn};

use crate::rename::{rename_in_contract, strip_from_contract};
use crate::requirements::{Requirement, VarSpec};
use crate::{MaintenanceError, RequirementError};

pub struct MaintenanceEngine<'a> {
    dir: PathBuf,
    provider: &'a dyn AstProvider,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementIssue {
    pub requirement: Requirement,
    pub error: RequirementError,
}

/// Per-batch result, reported separately from per-item outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchOutcome {
    pub applied: usize,
    pub issues: Vec<RequirementIssue>,
    pub purged_slots: Vec<u32>,
}

impl BatchOutcome {
    pub fn fully_applied(&self) -> bool {
        self.issues.is_empty()
    }
}

enum ApplyError {
    Requirement(RequirementError),
    Fatal(MaintenanceError),
}

impl From<RequirementError> for ApplyError {
    fn from(err: RequirementError) -> Self {
        ApplyError::Requirement(err)
    }
}

impl From<MaintenanceError> for ApplyError {
    fn from(err: MaintenanceError) -> Self {
        ApplyError::Fatal(err)
    }
}

impl<'a> MaintenanceEngine<'a> {
    pub fn new(dir: impl Into<PathBuf>, provider: &'a dyn AstProvider) -> Self {
        MaintenanceEngine {
            dir: dir.into(),
            provider,
        }
    }

    /// Apply a requirement batch in order, then purge the slots it emptied.
    /// Per-item failures land in the outcome; fatal conditions abort.
    pub fn apply_batch(
        &self,
        record: &mut PartitionRecord,
        requirements: &[Requirement],
    ) -> Result<BatchOutcome, MaintenanceError> {
        let mut outcome = BatchOutcome::default();
        let mut vacated: Vec<u32> = vec![];

        for requirement in requirements {
            let result = match requirement {
                Requirement::Delete { name } => self.delete(record, name, &mut vacated),
                Requirement::Update { old, new } => self.update(record, old, new),
                Requirement::Insert(spec) => self.insert(record, spec),
            };
            match result {
                Ok(()) => outcome.applied += 1,
                Err(ApplyError::Requirement(error)) => {
                    warn!(%error, "requirement skipped");
                    outcome.issues.push(RequirementIssue {
                        requirement: requirement.clone(),
                        error,
                    });
                }
                Err(ApplyError::Fatal(error)) => return Err(error),
            }
        }

        // emptied slots are dropped only once the whole batch has run, so a
        // later insert in the same batch sees a consistent intermediate state
        for slot in vacated {
            if record.slot_is_empty(slot) && record.slots.contains_key(&slot) {
                self.remove_slot_files(&record.contract, slot)?;
                record.purge_slot(slot);
                info!(slot, "removed emptied slot");
                outcome.purged_slots.push(slot);
            }
        }

        Ok(outcome)
    }

    fn delete(
        &self,
        record: &mut PartitionRecord,
        name: &SmolStr,
        vacated: &mut Vec<u32>,
    ) -> Result<(), ApplyError> {
        let slot = record
            .slot_of(name)
            .ok_or_else(|| RequirementError::VariableNotFound(name.clone()))?;

        self.rewrite(&naming::state_contract(&record.contract, slot), |contract| {
            contract
                .parts
                .retain(|part| !matches!(part, ContractPart::Variable(decl) if decl.name == *name));
            Ok(())
        })?;
        // the logic side mirrors the storage header and may still read or
        // write the variable; scrub both
        self.rewrite(&naming::logic_contract(&record.contract, slot), |contract| {
            strip_from_contract(contract, name);
            Ok(())
        })?;

        record.remove_variable(name);
        if record.slot_is_empty(slot) && !vacated.contains(&slot) {
            vacated.push(slot);
        }
        info!(variable = %name, slot, "deleted state variable");
        Ok(())
    }

    fn update(
        &self,
        record: &mut PartitionRecord,
        old: &VarSpec,
        new: &VarSpec,
    ) -> Result<(), ApplyError> {
        let slot = record
            .slot_of(&old.name)
            .ok_or_else(|| RequirementError::VariableNotFound(old.name.clone()))?;
        let new_type = self.field_type(new)?;
        let new_value = self.field_value(new)?;

        // the state contract is the authority on the declaration being
        // replaced; the final shape is resolved against it
        let mut final_type: Option<TypeDesc> = None;
        let mut final_visibility = Visibility::default();
        self.rewrite(&naming::state_contract(&record.contract, slot), |contract| {
            let decl = declaration_mut(contract, &old.name)
                .ok_or_else(|| RequirementError::VariableNotFound(old.name.clone()))?;
            decl.name = new.name.clone();
            if let Some(typ) = &new_type {
                decl.typ = typ.clone();
            }
            decl.value = new_value.clone();
            if let Some(visibility) = new.visibility {
                decl.visibility = visibility;
            }
            final_type = Some(decl.typ.clone());
            final_visibility = decl.visibility;
            Ok(())
        })?;
        let final_type = final_type.unwrap_or(TypeDesc::Unsupported("unknown".into()));

        self.rewrite(&naming::logic_contract(&record.contract, slot), |contract| {
            // stale accessors go first so the rename does not touch them
            let getter = accessors::getter_name(&old.name);
            let setter = accessors::setter_name(&old.name);
            contract.parts.retain(|part| {
                !matches!(part, ContractPart::Function(def)
                    if def.name.as_deref() == Some(getter.as_str())
                        || def.name.as_deref() == Some(setter.as_str()))
            });
            if let Some(decl) = declaration_mut(contract, &old.name) {
                decl.name = new.name.clone();
                if let Some(typ) = &new_type {
                    decl.typ = typ.clone();
                }
                if let Some(visibility) = new.visibility {
                    decl.visibility = visibility;
                }
            }
            rename_in_contract(contract, &old.name, &new.name);
            if final_visibility == Visibility::Private {
                contract
                    .parts
                    .push(ContractPart::Function(accessors::setter(
                        &new.name,
                        &final_type,
                    )));
            }
            Ok(())
        })?;

        record.rename_variable(&old.name, new.name.clone(), final_type.descriptor());
        info!(old = %old.name, new = %new.name, slot, "updated state variable");
        Ok(())
    }

    fn insert(&self, record: &mut PartitionRecord, spec: &VarSpec) -> Result<(), ApplyError> {
        let slot = record
            .min_slot()
            .ok_or(MaintenanceError::NoOccupiedSlots)?;
        let Some(typ) = self.field_type(spec)? else {
            return Err(RequirementError::Unparseable {
                statement: spec.name.to_string(),
                reason: "an insert needs a concrete type".to_string(),
            }
            .into());
        };
        let value = self.field_value(spec)?;
        let visibility = spec.visibility.unwrap_or_default();

        self.rewrite(&naming::state_contract(&record.contract, slot), |contract| {
            append_declaration(
                contract,
                VariableDecl {
                    typ: typ.clone(),
                    visibility,
                    is_constant: false,
                    name: spec.name.clone(),
                    value: value.clone(),
                },
            );
            Ok(())
        })?;

        self.rewrite(&naming::logic_contract(&record.contract, slot), |contract| {
            append_declaration(
                contract,
                VariableDecl {
                    typ: typ.clone(),
                    visibility,
                    is_constant: false,
                    name: spec.name.clone(),
                    value: None,
                },
            );
            if visibility == Visibility::Private {
                contract
                    .parts
                    .push(ContractPart::Function(accessors::setter(&spec.name, &typ)));
            }
            Ok(())
        })?;

        record.insert_variable(spec.name.clone(), slot, typ.descriptor());
        info!(variable = %spec.name, slot, "inserted state variable");
        Ok(())
    }

    /// Read, re-parse, mutate, and rewrite one generated contract file.
    fn rewrite(
        &self,
        contract_name: &str,
        mutate: impl FnOnce(&mut ContractDef) -> Result<(), RequirementError>,
    ) -> Result<(), ApplyError> {
        let path = naming::source_file(&self.dir, contract_name);
        let source =
            fs::read_to_string(&path).map_err(|err| MaintenanceError::Io(path.clone(), err))?;
        let mut unit = self
            .provider
            .parse(&source)
            .map_err(|err| MaintenanceError::Parse(path.clone(), err))?;
        let [contract] = unit.contracts.as_mut_slice() else {
            return Err(MaintenanceError::MissingContract(path).into());
        };
        mutate(contract)?;
        fs::write(&path, unit.to_string()).map_err(|err| MaintenanceError::Io(path, err))?;
        Ok(())
    }

    fn remove_slot_files(&self, contract: &str, slot: u32) -> Result<(), MaintenanceError> {
        for name in [
            naming::state_contract(contract, slot),
            naming::logic_contract(contract, slot),
        ] {
            let path = naming::source_file(&self.dir, &name);
            fs::remove_file(&path).map_err(|err| MaintenanceError::Io(path, err))?;
        }
        Ok(())
    }

    fn field_type(&self, spec: &VarSpec) -> Result<Option<TypeDesc>, RequirementError> {
        spec.typ
            .as_ref()
            .map(|text| {
                parser::parse_type_text(text).map_err(|err| RequirementError::Unparseable {
                    statement: text.to_string(),
                    reason: err.to_string(),
                })
            })
            .transpose()
    }

    fn field_value(&self, spec: &VarSpec) -> Result<Option<Expr>, RequirementError> {
        spec.value
            .as_ref()
            .map(|text| {
                parser::parse_expr_text(text).map_err(|err| RequirementError::Unparseable {
                    statement: text.to_string(),
                    reason: err.to_string(),
                })
            })
            .transpose()
    }
}

fn declaration_mut<'c>(contract: &'c mut ContractDef, name: &str) -> Option<&'c mut VariableDecl> {
    contract.parts.iter_mut().find_map(|part| match part {
        ContractPart::Variable(decl) if decl.name == name => Some(decl),
        _ => None,
    })
}

/// Insert a declaration right after the contract's existing variable header
/// so generated functions stay below the storage layout.
fn append_declaration(contract: &mut ContractDef, decl: VariableDecl) {
    let at = contract
        .parts
        .iter()
        .rposition(|part| matches!(part, ContractPart::Variable(_)))
        .map_or(contract.parts.len(), |i| i + 1);
    contract.parts.insert(at, ContractPart::Variable(decl));
}
