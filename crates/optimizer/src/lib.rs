//! Partition optimization.
//!
//! Turns the analyzer's `(S, T, C)` outputs into an integer program, hands
//! it to an [`IlpSolver`] backend, and interprets the assignment as a
//! [`Partition`]. Formulation is pure; the only side effect in this crate is
//! the solver round-trip.

use std::fmt;

use tracing::{debug, info};

pub mod costs;
pub mod formulate;
pub mod model;
pub mod solver;

pub use costs::CostModel;
pub use formulate::{formulate, is_feasible, objective_value, x_name, Partition, PartitionProblem};
pub use solver::{Assignment, CommandSolver, IlpSolver, SolveOutcome, SolverError};

#[derive(Debug)]
pub enum OptimizeError {
    /// The model admits no assignment; carries the solver's
    /// irreducible-inconsistent-subsystem report.
    PartitionInfeasible(Vec<String>),
    /// The solver returned without a proven optimum.
    OptimizationIncomplete,
    /// An optimal verdict that does not decode into a total partition.
    MalformedAssignment(String),
    Solver(SolverError),
}

impl fmt::Display for OptimizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizeError::PartitionInfeasible(conflicts) => {
                write!(f, "partition model is infeasible")?;
                if !conflicts.is_empty() {
                    write!(f, "; conflicting constraints: {}", conflicts.join(", "))?;
                }
                Ok(())
            }
            OptimizeError::OptimizationIncomplete => {
                write!(f, "solver stopped without an optimal solution")
            }
            OptimizeError::MalformedAssignment(message) => {
                write!(f, "solver assignment is not a valid partition: {message}")
            }
            OptimizeError::Solver(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for OptimizeError {}

impl From<SolverError> for OptimizeError {
    fn from(err: SolverError) -> Self {
        OptimizeError::Solver(err)
    }
}

/// Formulate, solve, and interpret. No partial partition is ever returned.
pub fn solve_partition(
    problem: &PartitionProblem,
    solver: &dyn IlpSolver,
) -> Result<Partition, OptimizeError> {
    let model = formulate(problem);
    debug!(
        variables = model.variables.len(),
        constraints = model.constraints.len(),
        "submitting partition model"
    );

    let assignment = match solver.solve(&model)? {
        SolveOutcome::Optimal(assignment) => assignment,
        SolveOutcome::Infeasible { conflicts } => {
            return Err(OptimizeError::PartitionInfeasible(conflicts))
        }
        SolveOutcome::Incomplete => return Err(OptimizeError::OptimizationIncomplete),
    };

    let partition = interpret(problem, &assignment)?;
    info!(
        objective = assignment.objective,
        slots = partition.occupied_slots().len(),
        "partition solved"
    );
    Ok(partition)
}

fn interpret(
    problem: &PartitionProblem,
    assignment: &Assignment,
) -> Result<Partition, OptimizeError> {
    let mut slots = Vec::with_capacity(problem.n_variables());
    for i in 0..problem.n_variables() {
        let mut assigned = None;
        for j in 0..problem.n_slots() {
            if assignment.is_set(&x_name(i, j)) {
                if assigned.is_some() {
                    return Err(OptimizeError::MalformedAssignment(format!(
                        "variable {i} is assigned to more than one slot"
                    )));
                }
                assigned = Some(j as u32);
            }
        }
        let slot = assigned.ok_or_else(|| {
            OptimizeError::MalformedAssignment(format!("variable {i} has no slot"))
        })?;
        slots.push(slot);
    }
    Ok(Partition { slots })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    struct FixedOutcome(SolveOutcome);

    impl IlpSolver for FixedOutcome {
        fn solve(&self, _model: &model::Model) -> Result<SolveOutcome, SolverError> {
            Ok(self.0.clone())
        }
    }

    fn problem() -> PartitionProblem {
        PartitionProblem {
            usage: vec![vec![true, false], vec![false, true]],
            type_keys: vec!["uint256".into(), "mapping".into()],
            edges: vec![],
            costs: CostModel::default(),
        }
    }

    #[test]
    fn optimal_assignment_becomes_a_partition() {
        let mut values = IndexMap::new();
        values.insert(x_name(0, 0), 1.0);
        values.insert(x_name(1, 1), 1.0);
        let solver = FixedOutcome(SolveOutcome::Optimal(Assignment {
            objective: 1.0,
            values,
        }));
        let partition = solve_partition(&problem(), &solver).unwrap();
        assert_eq!(partition.slots, vec![0, 1]);
    }

    #[test]
    fn infeasible_surfaces_diagnostics() {
        let solver = FixedOutcome(SolveOutcome::Infeasible {
            conflicts: vec!["edge_0_1_slot0".into()],
        });
        match solve_partition(&problem(), &solver).unwrap_err() {
            OptimizeError::PartitionInfeasible(conflicts) => {
                assert_eq!(conflicts, vec!["edge_0_1_slot0"]);
            }
            other => panic!("expected infeasible, got {other}"),
        }
    }

    #[test]
    fn partial_assignment_is_rejected() {
        let mut values = IndexMap::new();
        values.insert(x_name(0, 0), 1.0);
        let solver = FixedOutcome(SolveOutcome::Optimal(Assignment {
            objective: 1.0,
            values,
        }));
        assert!(matches!(
            solve_partition(&problem(), &solver).unwrap_err(),
            OptimizeError::MalformedAssignment(_),
        ));
    }
}
