//! End-to-end pipelines: deploy, maintain, migrate.
//!
//! Each pipeline is one process invocation over the shared artifact
//! directory. Stages run to completion in order and nothing is written until
//! every fallible stage has succeeded, so a fatal condition always leaves
//! the previous consistent file set in place.

use std::path::{Path, PathBuf};
use std::{fmt, fs, io};

use analyzer::{analyze, AnalyzerError};
use codegen::{split_contract, CodegenError};
use common::{naming, PartitionRecord, RecordError};
use maintenance::{
    parse_requirements, BatchOutcome, MaintenanceEngine, MaintenanceError, RequirementError,
};
use migration::MigrationError;
use optimizer::{CostModel, IlpSolver, OptimizeError, PartitionProblem};
use parser::ast::Pragma;
use parser::{AstProvider, ParseError};
use smol_str::SmolStr;
use tracing::{info, warn};

#[derive(Debug)]
pub enum DriverError {
    Io(PathBuf, io::Error),
    Parse(ParseError),
    Analysis(AnalyzerError),
    Optimize(OptimizeError),
    Codegen(CodegenError),
    Record(RecordError),
    Requirement(RequirementError),
    Maintenance(MaintenanceError),
    Migration(MigrationError),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Io(path, err) => {
                write!(f, "failed to read or write `{}`: {err}", path.display())
            }
            DriverError::Parse(err) => write!(f, "{err}"),
            DriverError::Analysis(err) => write!(f, "{err}"),
            DriverError::Optimize(err) => write!(f, "{err}"),
            DriverError::Codegen(err) => write!(f, "{err}"),
            DriverError::Record(err) => write!(f, "{err}"),
            DriverError::Requirement(err) => write!(f, "{err}"),
            DriverError::Maintenance(err) => write!(f, "{err}"),
            DriverError::Migration(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DriverError {}

macro_rules! from_stage {
    ($variant:ident, $err:ty) => {
        impl From<$err> for DriverError {
            fn from(err: $err) -> Self {
                DriverError::$variant(err)
            }
        }
    };
}

from_stage!(Parse, ParseError);
from_stage!(Analysis, AnalyzerError);
from_stage!(Optimize, OptimizeError);
from_stage!(Codegen, CodegenError);
from_stage!(Record, RecordError);
from_stage!(Requirement, RequirementError);
from_stage!(Maintenance, MaintenanceError);
from_stage!(Migration, MigrationError);

pub struct Pipeline<'a> {
    out_dir: PathBuf,
    provider: &'a dyn AstProvider,
}

#[derive(Debug)]
pub struct DeployOutcome {
    pub record: PartitionRecord,
    pub written: Vec<PathBuf>,
    /// Functions no single logic contract can hold; left to the operator.
    pub cross_slot_functions: Vec<SmolStr>,
}

impl<'a> Pipeline<'a> {
    pub fn new(out_dir: impl Into<PathBuf>, provider: &'a dyn AstProvider) -> Self {
        Pipeline {
            out_dir: out_dir.into(),
            provider,
        }
    }

    /// Analyze, partition, and generate. Artifacts and both record files are
    /// written only after every stage has succeeded.
    pub fn deploy(
        &self,
        source_path: &Path,
        solver: &dyn IlpSolver,
        key_count: u64,
    ) -> Result<DeployOutcome, DriverError> {
        let source = fs::read_to_string(source_path)
            .map_err(|err| DriverError::Io(source_path.to_path_buf(), err))?;
        let unit = self.provider.parse(&source)?;
        let model = analyze(&unit)?;

        let problem = PartitionProblem {
            usage: model.functions.iter().map(|func| func.uses.clone()).collect(),
            type_keys: model
                .variables
                .iter()
                .map(|var| var.typ.cost_key().to_string())
                .collect(),
            edges: model
                .reference_edges
                .iter()
                .map(|edge| (edge.from, edge.to))
                .collect(),
            costs: CostModel::new(key_count),
        };
        let partition = optimizer::solve_partition(&problem, solver)?;
        let artifacts = split_contract(&model, &partition)?;
        for name in &artifacts.cross_slot_functions {
            warn!(function = %name, "function spans slots; not placed in any logic contract");
        }

        fs::create_dir_all(&self.out_dir)
            .map_err(|err| DriverError::Io(self.out_dir.clone(), err))?;
        let mut written = vec![];
        for contract in &artifacts.contracts {
            let path = naming::source_file(&self.out_dir, &contract.name);
            fs::write(&path, &contract.source).map_err(|err| DriverError::Io(path.clone(), err))?;
            written.push(path);
        }
        let record_path = PartitionRecord::path(&self.out_dir, &model.name);
        artifacts.record.save(&record_path)?;
        artifacts
            .record
            .save(&PartitionRecord::snapshot_path(&self.out_dir, &model.name))?;
        info!(contract = %model.name, files = written.len(), "deployed partitioned contracts");

        Ok(DeployOutcome {
            record: artifacts.record,
            written,
            cross_slot_functions: artifacts.cross_slot_functions,
        })
    }

    /// Apply a requirement batch and persist the updated record. The
    /// deployment-time snapshot stays behind for the migration run.
    pub fn maintain(
        &self,
        contract: &str,
        requirements_text: &str,
    ) -> Result<BatchOutcome, DriverError> {
        let record_path = PartitionRecord::path(&self.out_dir, contract);
        let mut record = PartitionRecord::load(&record_path)?;
        let parsed = parse_requirements(requirements_text)?;

        let engine = MaintenanceEngine::new(&self.out_dir, self.provider);
        let outcome = engine.apply_batch(&mut record, &parsed.requirements)?;
        record.save(&record_path)?;
        info!(
            contract,
            applied = outcome.applied,
            skipped = outcome.issues.len() + parsed.skipped.len(),
            "maintenance batch applied"
        );
        Ok(outcome)
    }

    /// Diff the live record against its snapshot and emit the updater
    /// contract; on success the snapshot is re-baselined to the live record.
    /// Returns `None` when no slot needs a state copy.
    pub fn migrate(
        &self,
        contract: &str,
        requirements_text: &str,
    ) -> Result<Option<PathBuf>, DriverError> {
        let record_path = PartitionRecord::path(&self.out_dir, contract);
        let snapshot_path = PartitionRecord::snapshot_path(&self.out_dir, contract);
        let record = PartitionRecord::load(&record_path)?;
        let snapshot = PartitionRecord::load(&snapshot_path)?;

        let parsed = parse_requirements(requirements_text)?;
        let renames = migration::rename_map(&parsed.requirements);
        let plan = migration::plan_migration(&snapshot, &record, &renames)?;
        let Some(first) = plan.slots.first() else {
            info!(contract, "no slot changed; no updater needed");
            return Ok(None);
        };

        let pragma = self.generated_pragma(contract, first.slot)?;
        let source = migration::updater_contract(contract, &plan, pragma);
        let path = naming::source_file(&self.out_dir, &naming::updater_contract(contract));
        fs::write(&path, source).map_err(|err| DriverError::Io(path.clone(), err))?;
        record.save(&snapshot_path)?;
        info!(contract, updater = %path.display(), "migration contract written");
        Ok(Some(path))
    }

    /// The pragma the deployment run stamped on its artifacts, recovered
    /// from a generated state contract.
    fn generated_pragma(&self, contract: &str, slot: u32) -> Result<Option<Pragma>, DriverError> {
        let path = naming::source_file(&self.out_dir, &naming::state_contract(contract, slot));
        let source =
            fs::read_to_string(&path).map_err(|err| DriverError::Io(path.clone(), err))?;
        Ok(self.provider.parse(&source)?.pragma)
    }
}
