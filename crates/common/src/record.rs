//! The persisted partition record.
//!
//! One JSON document per partitioned contract, carrying the slot layout in
//! both directions plus the function-to-slot map and the variable type
//! descriptors. The document has an explicit schema version so the
//! maintenance and migration read paths can reject drifted files instead of
//! misreading them.
//!
//! The record written at deployment time is also copied to a `.old` snapshot.
//! Maintenance runs rewrite the live record and leave the snapshot alone;
//! a migration run diffs the two and then re-baselines the snapshot.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::path::{Path, PathBuf};
use std::{fmt, fs, io};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PartitionRecord {
    pub schema_version: u32,
    pub contract: SmolStr,
    /// Slot index -> variables held by that slot, in declaration order.
    pub slots: IndexMap<u32, Vec<SmolStr>>,
    /// Variable name -> slot index. Redundant inverse of `slots`.
    pub variables: IndexMap<SmolStr, u32>,
    /// Function name -> slots whose variables the function touches.
    pub functions: IndexMap<SmolStr, Vec<u32>>,
    /// Variable name -> type descriptor string, e.g. `mapping(address => uint256)`.
    pub types: IndexMap<SmolStr, String>,
}

impl PartitionRecord {
    pub fn new(contract: impl Into<SmolStr>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            contract: contract.into(),
            slots: IndexMap::new(),
            variables: IndexMap::new(),
            functions: IndexMap::new(),
            types: IndexMap::new(),
        }
    }

    /// Slot holding the named variable.
    pub fn slot_of(&self, name: &str) -> Option<u32> {
        self.variables.get(name).copied()
    }

    /// Smallest occupied slot index, the canonical target for inserts.
    pub fn min_slot(&self) -> Option<u32> {
        self.slots.keys().copied().min()
    }

    pub fn occupied_slots(&self) -> Vec<u32> {
        let mut slots: Vec<u32> = self.slots.keys().copied().collect();
        slots.sort_unstable();
        slots
    }

    /// Add a variable to a slot, keeping both directions of the map in sync.
    pub fn insert_variable(&mut self, name: SmolStr, slot: u32, typ: String) {
        self.slots.entry(slot).or_default().push(name.clone());
        self.variables.insert(name.clone(), slot);
        self.types.insert(name, typ);
    }

    /// Remove a variable. Returns its former slot, or `None` if unknown.
    /// The slot entry is retained even when it becomes empty; emptied slots
    /// are purged explicitly at the end of a maintenance batch.
    pub fn remove_variable(&mut self, name: &str) -> Option<u32> {
        let slot = self.variables.shift_remove(name)?;
        if let Some(vars) = self.slots.get_mut(&slot) {
            vars.retain(|v| v != name);
        }
        self.types.shift_remove(name);
        Some(slot)
    }

    /// Rename a variable in place, preserving its slot and position.
    pub fn rename_variable(&mut self, old: &str, new: SmolStr, typ: String) -> Option<u32> {
        let slot = self.variables.shift_remove(old)?;
        if let Some(vars) = self.slots.get_mut(&slot) {
            for var in vars.iter_mut() {
                if var == old {
                    *var = new.clone();
                }
            }
        }
        self.variables.insert(new.clone(), slot);
        self.types.shift_remove(old);
        self.types.insert(new, typ);
        Some(slot)
    }

    pub fn slot_is_empty(&self, slot: u32) -> bool {
        self.slots.get(&slot).map_or(true, Vec::is_empty)
    }

    /// Drop a slot and every entry that still points at it.
    pub fn purge_slot(&mut self, slot: u32) {
        self.slots.shift_remove(&slot);
        self.variables.retain(|_, s| *s != slot);
        for touched in self.functions.values_mut() {
            touched.retain(|s| *s != slot);
        }
    }

    pub fn path(dir: &Path, contract: &str) -> PathBuf {
        dir.join(format!("{contract}.partition.json"))
    }

    pub fn snapshot_path(dir: &Path, contract: &str) -> PathBuf {
        dir.join(format!("{contract}.partition.old.json"))
    }

    pub fn load(path: &Path) -> Result<Self, RecordError> {
        let text = fs::read_to_string(path)
            .map_err(|err| RecordError::Io(path.to_path_buf(), err))?;
        let record: PartitionRecord = serde_json::from_str(&text)
            .map_err(|err| RecordError::Malformed(path.to_path_buf(), err.to_string()))?;
        if record.schema_version != SCHEMA_VERSION {
            return Err(RecordError::UnsupportedSchemaVersion {
                path: path.to_path_buf(),
                found: record.schema_version,
            });
        }
        Ok(record)
    }

    pub fn save(&self, path: &Path) -> Result<(), RecordError> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|err| RecordError::Malformed(path.to_path_buf(), err.to_string()))?;
        fs::write(path, text).map_err(|err| RecordError::Io(path.to_path_buf(), err))
    }
}

#[derive(Debug)]
pub enum RecordError {
    Io(PathBuf, io::Error),
    Malformed(PathBuf, String),
    UnsupportedSchemaVersion { path: PathBuf, found: u32 },
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Io(path, err) => {
                write!(f, "failed to read or write `{}`: {err}", path.display())
            }
            RecordError::Malformed(path, msg) => {
                write!(f, "partition record `{}` is malformed: {msg}", path.display())
            }
            RecordError::UnsupportedSchemaVersion { path, found } => write!(
                f,
                "partition record `{}` has schema version {found}, expected {SCHEMA_VERSION}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for RecordError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PartitionRecord {
        let mut record = PartitionRecord::new("Token");
        record.insert_variable("owner".into(), 0, "address".into());
        record.insert_variable("balances".into(), 1, "mapping(address => uint256)".into());
        record.insert_variable("total".into(), 1, "uint256".into());
        record.functions.insert("transfer".into(), vec![1]);
        record
    }

    #[test]
    fn roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = PartitionRecord::path(dir.path(), "Token");
        let record = sample();
        record.save(&path).unwrap();
        assert_eq!(PartitionRecord::load(&path).unwrap(), record);
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = PartitionRecord::path(dir.path(), "Token");
        let mut record = sample();
        record.schema_version = 99;
        let text = serde_json::to_string(&record).unwrap();
        fs::write(&path, text).unwrap();
        assert!(matches!(
            PartitionRecord::load(&path),
            Err(RecordError::UnsupportedSchemaVersion { found: 99, .. })
        ));
    }

    #[test]
    fn remove_keeps_slot_entry_until_purged() {
        let mut record = sample();
        assert_eq!(record.remove_variable("owner"), Some(0));
        assert!(record.slot_is_empty(0));
        assert!(record.slots.contains_key(&0));
        record.purge_slot(0);
        assert!(!record.slots.contains_key(&0));
        assert_eq!(record.min_slot(), Some(1));
    }

    #[test]
    fn rename_preserves_slot_order() {
        let mut record = sample();
        assert_eq!(record.rename_variable("total", "supply".into(), "uint256".into()), Some(1));
        assert_eq!(record.slots[&1], vec![SmolStr::new("balances"), SmolStr::new("supply")]);
        assert_eq!(record.slot_of("supply"), Some(1));
        assert!(record.slot_of("total").is_none());
    }
}
