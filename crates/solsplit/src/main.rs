//! Command-line front end for the partitioning pipeline.
//!
//! Three subcommands mirror the contract lifecycle: `deploy` splits a
//! monolithic source file, `maintain` applies a requirement batch to the
//! generated artifacts, and `migrate` emits the updater contract that moves
//! state between the old and new deployments.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use driver::Pipeline;
use optimizer::costs::DEFAULT_KEY_COUNT;
use optimizer::CommandSolver;
use parser::SubsetParser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Split Solidity contracts into upgradeable slots")]
struct Cli {
    /// Directory holding generated contracts and partition records.
    #[arg(long, default_value = "out", global = true)]
    out_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Partition a contract and generate its state, logic, and router sources.
    Deploy {
        /// The monolithic Solidity source file.
        source: PathBuf,

        /// Expected number of live keys per mapping, used to weigh
        /// migration cost.
        #[arg(long, default_value_t = DEFAULT_KEY_COUNT)]
        keys: u64,

        /// External ILP solver executable; reads the model on stdin and
        /// writes its verdict on stdout.
        #[arg(long)]
        solver: PathBuf,

        /// Extra argument passed to the solver. May be repeated.
        #[arg(long = "solver-arg")]
        solver_args: Vec<String>,
    },

    /// Apply a requirement batch to a deployed contract's artifacts.
    Maintain {
        /// Name of the originally deployed contract.
        contract: String,

        /// File of `;`-separated INSERT/DELETE/UPDATE statements.
        requirements: PathBuf,
    },

    /// Emit the one-shot updater contract for the changes since deployment.
    Migrate {
        /// Name of the originally deployed contract.
        contract: String,

        /// The same requirements file the maintenance run consumed.
        requirements: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let provider = SubsetParser;
    let pipeline = Pipeline::new(&cli.out_dir, &provider);

    match cli.command {
        Command::Deploy {
            source,
            keys,
            solver,
            solver_args,
        } => {
            let mut backend = CommandSolver::new(solver);
            for arg in solver_args {
                backend = backend.arg(arg);
            }
            let outcome = pipeline
                .deploy(&source, &backend, keys)
                .with_context(|| format!("deploying `{}`", source.display()))?;

            for path in &outcome.written {
                println!("{}", path.display());
            }
            for name in &outcome.cross_slot_functions {
                eprintln!("warning: `{name}` touches several slots; move it by hand");
            }
        }
        Command::Maintain {
            contract,
            requirements,
        } => {
            let text = fs::read_to_string(&requirements)
                .with_context(|| format!("reading `{}`", requirements.display()))?;
            let outcome = pipeline
                .maintain(&contract, &text)
                .with_context(|| format!("maintaining `{contract}`"))?;

            println!("applied {} requirement(s)", outcome.applied);
            for slot in &outcome.purged_slots {
                println!("removed empty slot {slot}");
            }
            for issue in &outcome.issues {
                eprintln!("warning: `{}`: {}", issue.requirement.subject(), issue.error);
            }
        }
        Command::Migrate {
            contract,
            requirements,
        } => {
            let text = fs::read_to_string(&requirements)
                .with_context(|| format!("reading `{}`", requirements.display()))?;
            match pipeline
                .migrate(&contract, &text)
                .with_context(|| format!("migrating `{contract}`"))?
            {
                Some(path) => println!("{}", path.display()),
                None => println!("nothing to migrate"),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
