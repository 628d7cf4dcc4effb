//! Schema-change maintenance over an already-partitioned contract set.
//!
//! The engine is a state machine over one [`PartitionRecord`]: each
//! requirement re-parses the target source file, mutates the tree, and
//! rewrites the file whole. Per-requirement failures are reported and the
//! batch continues; file and parse failures are fatal and abort before
//! anything else is written.

use std::path::PathBuf;
use std::{fmt, io};

use parser::ParseError;
use smol_str::SmolStr;

mod engine;
mod rename;
pub mod requirements;

pub use engine::{BatchOutcome, MaintenanceEngine, RequirementIssue};
pub use requirements::{parse_requirements, ParsedRequirements, Requirement, VarSpec};

/// A recoverable, per-requirement failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequirementError {
    Unparseable { statement: String, reason: String },
    UnknownAction(String),
    VariableNotFound(SmolStr),
}

impl fmt::Display for RequirementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequirementError::Unparseable { statement, reason } => {
                write!(f, "cannot parse requirement `{statement}`: {reason}")
            }
            RequirementError::UnknownAction(action) => {
                write!(f, "unknown requirement action `{action}`")
            }
            RequirementError::VariableNotFound(name) => {
                write!(f, "no state variable named `{name}` in the partition record")
            }
        }
    }
}

impl std::error::Error for RequirementError {}

/// A fatal condition that aborts the batch.
#[derive(Debug)]
pub enum MaintenanceError {
    Io(PathBuf, io::Error),
    Parse(PathBuf, ParseError),
    /// A generated source file no longer holds exactly one contract.
    MissingContract(PathBuf),
    /// The record holds no slot an insert could target.
    NoOccupiedSlots,
}

impl fmt::Display for MaintenanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaintenanceError::Io(path, err) => {
                write!(f, "failed to read or write `{}`: {err}", path.display())
            }
            MaintenanceError::Parse(path, err) => {
                write!(f, "cannot re-parse generated file `{}`: {err}", path.display())
            }
            MaintenanceError::MissingContract(path) => write!(
                f,
                "generated file `{}` does not hold exactly one contract",
                path.display()
            ),
            MaintenanceError::NoOccupiedSlots => {
                write!(f, "the partition record holds no occupied slot to insert into")
            }
        }
    }
}

impl std::error::Error for MaintenanceError {}
