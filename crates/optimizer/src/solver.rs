//! The solver seam.
//!
//! The engine itself is an external collaborator; [`IlpSolver`] is the whole
//! contract between the formulation and whatever backend runs the
//! branch-and-bound. [`CommandSolver`] ships the model as JSON to a solver
//! subprocess and reads a JSON verdict back.

use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::Model;

/// Values of the decision variables at an optimal solution, keyed by
/// variable name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Assignment {
    pub objective: f64,
    pub values: IndexMap<String, f64>,
}

impl Assignment {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.value(name).is_some_and(|v| v > 0.5)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SolveOutcome {
    Optimal(Assignment),
    /// No feasible assignment exists; carries the solver's conflicting-
    /// constraint report.
    Infeasible { conflicts: Vec<String> },
    /// The solver stopped without either proving optimality or
    /// infeasibility.
    Incomplete,
}

#[derive(Debug)]
pub enum SolverError {
    Spawn(std::io::Error),
    /// The backend exited non-zero or produced unusable output.
    Backend(String),
}

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverError::Spawn(err) => write!(f, "failed to launch solver backend: {err}"),
            SolverError::Backend(message) => write!(f, "solver backend failed: {message}"),
        }
    }
}

impl std::error::Error for SolverError {}

/// A single blocking round-trip to the solver. There is no cancellation; a
/// non-terminating solve is a hard failure mode of the pipeline.
pub trait IlpSolver {
    fn solve(&self, model: &Model) -> Result<SolveOutcome, SolverError>;
}

/// Backend adapter: writes the serialized model to a subprocess's stdin and
/// parses a [`SolveOutcome`] from its stdout.
#[derive(Debug, Clone)]
pub struct CommandSolver {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandSolver {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSolver {
            program: program.into(),
            args: vec![],
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

impl IlpSolver for CommandSolver {
    fn solve(&self, model: &Model) -> Result<SolveOutcome, SolverError> {
        let payload = serde_json::to_vec(model)
            .map_err(|err| SolverError::Backend(format!("model serialization failed: {err}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(SolverError::Spawn)?;

        child
            .stdin
            .take()
            .ok_or_else(|| SolverError::Backend("solver stdin unavailable".into()))?
            .write_all(&payload)
            .map_err(|err| SolverError::Backend(format!("writing model: {err}")))?;

        let output = child
            .wait_with_output()
            .map_err(|err| SolverError::Backend(format!("waiting for solver: {err}")))?;
        if !output.status.success() {
            return Err(SolverError::Backend(format!(
                "solver exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim(),
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|err| SolverError::Backend(format!("unreadable solver verdict: {err}")))
    }
}
