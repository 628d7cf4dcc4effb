//! Test doubles shared across the workspace.

use indexmap::IndexMap;
use optimizer::model::Model;
use optimizer::{
    is_feasible, objective_value, x_name, Assignment, IlpSolver, Partition, PartitionProblem,
    SolveOutcome, SolverError,
};

/// A brute-force stand-in for the external solver. Enumerates every dense
/// partition of the problem it was built from and returns the cheapest
/// feasible one, so tests run without a solver binary on the machine.
/// Usable up to a dozen variables or so; enumeration is Bell-number sized.
pub struct ExhaustiveSolver {
    problem: PartitionProblem,
}

impl ExhaustiveSolver {
    pub fn new(problem: PartitionProblem) -> Self {
        ExhaustiveSolver { problem }
    }
}

impl IlpSolver for ExhaustiveSolver {
    fn solve(&self, _model: &Model) -> Result<SolveOutcome, SolverError> {
        let mut best: Option<(f64, Partition)> = None;
        for partition in dense_partitions(self.problem.n_variables()) {
            if !is_feasible(&self.problem, &partition) {
                continue;
            }
            let objective = objective_value(&self.problem, &partition);
            if best.as_ref().map_or(true, |(cheapest, _)| objective < *cheapest) {
                best = Some((objective, partition));
            }
        }
        Ok(match best {
            Some((objective, partition)) => {
                let mut values = IndexMap::new();
                for (variable, slot) in partition.slots.iter().enumerate() {
                    values.insert(x_name(variable, *slot as usize), 1.0);
                }
                SolveOutcome::Optimal(Assignment { objective, values })
            }
            None => SolveOutcome::Infeasible { conflicts: vec![] },
        })
    }
}

/// Every left-packed slot assignment of `n` variables, as restricted growth
/// strings: the first variable sits in slot 0 and each later one in an
/// already-used slot or the next fresh one.
fn dense_partitions(n: usize) -> Vec<Partition> {
    let mut out = vec![];
    if n == 0 {
        return out;
    }
    let mut slots = vec![0u32; n];
    grow(&mut slots, 1, 0, &mut out);
    out
}

fn grow(slots: &mut Vec<u32>, at: usize, max_used: u32, out: &mut Vec<Partition>) {
    if at == slots.len() {
        out.push(Partition {
            slots: slots.clone(),
        });
        return;
    }
    for slot in 0..=max_used + 1 {
        slots[at] = slot;
        grow(slots, at + 1, max_used.max(slot), out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_counts_follow_the_bell_numbers() {
        assert_eq!(dense_partitions(1).len(), 1);
        assert_eq!(dense_partitions(2).len(), 2);
        assert_eq!(dense_partitions(3).len(), 5);
        assert_eq!(dense_partitions(4).len(), 15);
    }

    #[test]
    fn every_enumerated_partition_is_dense() {
        for partition in dense_partitions(4) {
            let occupied = partition.occupied_slots();
            let expected: Vec<u32> = (0..occupied.len() as u32).collect();
            assert_eq!(occupied, expected);
        }
    }
}
