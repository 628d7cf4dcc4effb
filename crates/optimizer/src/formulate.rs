//! Construction of the partition integer program.
//!
//! Decision variables follow the published formulation: `x[i,j]` assigns
//! variable `i` to slot `j`, `y[j]` marks slot `j` occupied, `all_in_one`
//! selects the unpartitioned degenerate case, and three continuous cost
//! variables are pinned to their closed forms through big-M disjunctions on
//! `all_in_one`. Slot indices range over `0..n_variables`; a partition can
//! never need more slots than it has variables.

use crate::costs::{
    CostModel, BLANK_DEPLOY, MERGED_PLUMBING, MERGED_REDEPLOY_EXTRA, REDEPLOY_BASE, SPLIT_PLUMBING,
};
use crate::model::{LinExpr, Model, QuadExpr, Sense, VarId};

/// Safe because the slot count never exceeds the variable count, which is
/// far below 100 for any contract that fits on chain.
const M: f64 = 100.0;
/// Dominates every cost expression in the disjunctions.
const M5: f64 = 1e13;

/// The optimizer's input: the usage matrix `S`, the per-variable type cost
/// keys `T`, and the initializer reference edges `C`.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionProblem {
    /// `usage[f][i]`: function `f` references state variable `i`.
    pub usage: Vec<Vec<bool>>,
    /// Cost-lookup key per state variable, in declaration order.
    pub type_keys: Vec<String>,
    /// Pairs of variable indices that must share a slot.
    pub edges: Vec<(usize, usize)>,
    pub costs: CostModel,
}

impl PartitionProblem {
    pub fn n_variables(&self) -> usize {
        self.type_keys.len()
    }

    pub fn n_slots(&self) -> usize {
        self.n_variables().max(1)
    }
}

/// A solved assignment of state variables to slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Slot index per state variable, in declaration order.
    pub slots: Vec<u32>,
}

impl Partition {
    pub fn slot_of(&self, variable: usize) -> Option<u32> {
        self.slots.get(variable).copied()
    }

    /// Distinct occupied slots in ascending order.
    pub fn occupied_slots(&self) -> Vec<u32> {
        let mut slots = self.slots.clone();
        slots.sort_unstable();
        slots.dedup();
        slots
    }

    pub fn variables_in(&self, slot: u32) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| (*s == slot).then_some(i))
            .collect()
    }
}

pub fn x_name(variable: usize, slot: usize) -> String {
    format!("x[{variable},{slot}]")
}

/// Build the full integer program for a partition problem.
pub fn formulate(problem: &PartitionProblem) -> Model {
    let n_vars = problem.n_variables();
    let n_slots = problem.n_slots();
    let costs = &problem.costs;

    let mut model = Model::new("partition");

    let x: Vec<Vec<VarId>> = (0..n_vars)
        .map(|i| (0..n_slots).map(|j| model.binary(x_name(i, j))).collect())
        .collect();
    let y: Vec<VarId> = (0..n_slots).map(|j| model.binary(format!("y[{j}]"))).collect();
    let all_in_one = model.binary("all_in_one");
    let sub_deploy = model.continuous("Sub_deploy");
    let migration = model.continuous("migration");
    let redeployment = model.continuous("redeployment");
    let num = model.continuous("num");

    // Co-location: for every function, at least one slot holds its whole
    // used-variable set.
    for (f, uses) in problem.usage.iter().enumerate() {
        let used: Vec<usize> = (0..n_vars).filter(|i| uses[*i]).collect();
        let all_in_k: Vec<VarId> = (0..n_slots)
            .map(|j| model.binary(format!("all_in_k[{f},{j}]")))
            .collect();
        for j in 0..n_slots {
            for &i in &used {
                model.constrain(
                    format!("func{f}_var{i}_slot{j}"),
                    LinExpr::new().term(1.0, x[i][j]).term(-1.0, all_in_k[j]),
                    Sense::Ge,
                );
            }
            let mut sum = LinExpr::new().term(-(used.len() as f64), all_in_k[j]);
            for &i in &used {
                sum.add_term(1.0, x[i][j]);
            }
            model.constrain(format!("func{f}_slot{j}_all_in"), sum, Sense::Ge);
        }
        let mut any = LinExpr::new().offset(-1.0);
        for id in &all_in_k {
            any.add_term(1.0, *id);
        }
        model.constrain(format!("func{f}_some_slot"), any, Sense::Ge);
    }

    // Exactly one slot per variable.
    for i in 0..n_vars {
        let mut sum = LinExpr::new().offset(-1.0);
        for j in 0..n_slots {
            sum.add_term(1.0, x[i][j]);
        }
        model.constrain(format!("var{i}_one_slot"), sum, Sense::Eq);
    }

    // Dense slot ordering: slot j may be used only if slot j-1 is non-empty.
    let flag: Vec<Vec<VarId>> = (0..n_slots)
        .map(|j| {
            (0..n_vars)
                .map(|i| model.binary(format!("flag[{j},{i}]")))
                .collect()
        })
        .collect();
    for i in 0..n_vars {
        for j in 0..n_slots {
            model.constrain(
                format!("flag_lower_{j}_{i}"),
                LinExpr::new().term(1.0, flag[j][i]).term(-1.0, x[i][j]),
                Sense::Ge,
            );
        }
        for j in 1..n_slots {
            let mut prev = LinExpr::new().term(1.0, flag[j][i]);
            for t in 0..n_vars {
                prev.add_term(-1.0, x[t][j - 1]);
            }
            model.constrain(format!("flag_upper_{j}_{i}"), prev, Sense::Le);
        }
    }

    // Initializer reference edges share a slot.
    for &(a, b) in &problem.edges {
        for j in 0..n_slots {
            model.constrain(
                format!("edge_{a}_{b}_slot{j}"),
                LinExpr::new().term(1.0, x[a][j]).term(-1.0, x[b][j]),
                Sense::Eq,
            );
        }
    }

    // y[j] = 1 iff slot j has at least one variable.
    for j in 0..n_slots {
        let mut lower = LinExpr::new().term(1.0, y[j]);
        let mut upper = LinExpr::new().term(-M, y[j]);
        for i in 0..n_vars {
            lower.add_term(-1.0, x[i][j]);
            upper.add_term(1.0, x[i][j]);
        }
        model.constrain(format!("occupied_lower_{j}"), lower, Sense::Le);
        model.constrain(format!("occupied_upper_{j}"), upper, Sense::Le);
    }

    let mut num_def = LinExpr::new().term(1.0, num);
    for j in 0..n_slots {
        num_def.add_term(-1.0, y[j]);
    }
    model.constrain("num_def", num_def, Sense::Eq);

    // all_in_one = 1 iff num = 1.
    model.constrain(
        "all_in_one_lower",
        LinExpr::new()
            .term(-1.0, all_in_one)
            .term(-M, num)
            .offset(1.0 + M),
        Sense::Le,
    );
    model.constrain(
        "all_in_one_upper",
        LinExpr::new()
            .term(1.0, num)
            .term(M, all_in_one)
            .offset(-(1.0 + M)),
        Sense::Le,
    );

    let total_declare: f64 = problem
        .type_keys
        .iter()
        .map(|key| costs.declare(key))
        .sum();

    // Sub_deploy, unpartitioned branch.
    let merged_deploy = MERGED_PLUMBING + BLANK_DEPLOY + total_declare;
    model.constrain(
        "deploy_merged_upper",
        LinExpr::new()
            .term(1.0, sub_deploy)
            .term(M5, all_in_one)
            .offset(-(merged_deploy + M5)),
        Sense::Le,
    );
    model.constrain(
        "deploy_merged_lower",
        LinExpr::new()
            .term(1.0, sub_deploy)
            .term(-M5, all_in_one)
            .offset(-(merged_deploy - M5)),
        Sense::Ge,
    );

    // Sub_deploy, partitioned branch.
    let mut split_upper = LinExpr::new()
        .term(1.0, sub_deploy)
        .term(-SPLIT_PLUMBING, num)
        .term(-M5, all_in_one);
    let mut split_lower = LinExpr::new()
        .term(1.0, sub_deploy)
        .term(-SPLIT_PLUMBING, num)
        .term(M5, all_in_one);
    for i in 0..n_vars {
        let declare = costs.declare(&problem.type_keys[i]);
        for j in 0..n_slots {
            split_upper.add_term(-declare, x[i][j]);
            split_lower.add_term(-declare, x[i][j]);
        }
    }
    model.constrain("deploy_split_upper", split_upper, Sense::Le);
    model.constrain("deploy_split_lower", split_lower, Sense::Ge);

    // migration = Σ over ordered co-resident pairs of the neighbor's
    // migration weight. The x·x product is what makes the model non-convex.
    let mut migration_def = QuadExpr::from(LinExpr::new().term(1.0, migration));
    for st in 0..n_vars {
        for idx in 0..n_vars {
            if idx == st {
                continue;
            }
            let weight = costs.migrate(&problem.type_keys[idx]);
            for j in 0..n_slots {
                migration_def.add_product(-weight, x[st][j], x[idx][j]);
            }
        }
    }
    model.constrain("migration_def", migration_def, Sense::Eq);

    // redeployment, partitioned branch.
    let mut redeploy_upper = LinExpr::new()
        .term(1.0, redeployment)
        .term(-M5, all_in_one);
    let mut redeploy_lower = LinExpr::new().term(1.0, redeployment).term(M5, all_in_one);
    for i in 0..n_vars {
        let per_var = REDEPLOY_BASE + costs.declare(&problem.type_keys[i]);
        for j in 0..n_slots {
            redeploy_upper.add_term(-per_var, x[i][j]);
            redeploy_lower.add_term(-per_var, x[i][j]);
        }
    }
    model.constrain("redeploy_split_upper", redeploy_upper, Sense::Le);
    model.constrain("redeploy_split_lower", redeploy_lower, Sense::Ge);

    // redeployment, unpartitioned branch.
    let merged_redeploy: f64 = problem
        .type_keys
        .iter()
        .map(|key| MERGED_PLUMBING + BLANK_DEPLOY + MERGED_REDEPLOY_EXTRA + costs.declare(key))
        .sum();
    model.constrain(
        "redeploy_merged_upper",
        LinExpr::new()
            .term(1.0, redeployment)
            .term(M5, all_in_one)
            .offset(-(merged_redeploy + M5)),
        Sense::Le,
    );
    model.constrain(
        "redeploy_merged_lower",
        LinExpr::new()
            .term(1.0, redeployment)
            .term(-M5, all_in_one)
            .offset(-(merged_redeploy - M5)),
        Sense::Ge,
    );

    model.minimize(
        LinExpr::new()
            .term(1.0, sub_deploy)
            .term(1.0, migration)
            .term(1.0, redeployment),
    );
    model.nonconvex = true;
    model
}

/// Objective value a feasible partition attains, computed directly from the
/// cost model. Used to cross-check solver results and by the exhaustive
/// test solver.
pub fn objective_value(problem: &PartitionProblem, partition: &Partition) -> f64 {
    let costs = &problem.costs;
    let occupied = partition.occupied_slots();
    let num = occupied.len() as f64;
    let total_declare: f64 = problem
        .type_keys
        .iter()
        .map(|key| costs.declare(key))
        .sum();

    let deploy = if occupied.len() == 1 {
        MERGED_PLUMBING + BLANK_DEPLOY + total_declare
    } else {
        num * SPLIT_PLUMBING + total_declare
    };

    let mut migration = 0.0;
    for st in 0..problem.n_variables() {
        for idx in 0..problem.n_variables() {
            if idx != st && partition.slots[st] == partition.slots[idx] {
                migration += costs.migrate(&problem.type_keys[idx]);
            }
        }
    }

    let redeployment: f64 = if occupied.len() == 1 {
        problem
            .type_keys
            .iter()
            .map(|key| {
                MERGED_PLUMBING + BLANK_DEPLOY + MERGED_REDEPLOY_EXTRA + costs.declare(key)
            })
            .sum()
    } else {
        problem
            .type_keys
            .iter()
            .map(|key| REDEPLOY_BASE + costs.declare(key))
            .sum()
    };

    deploy + migration + redeployment
}

/// Semantic feasibility of a candidate partition: totality, function
/// co-location, reference co-location, and dense slot numbering.
pub fn is_feasible(problem: &PartitionProblem, partition: &Partition) -> bool {
    if partition.slots.len() != problem.n_variables() {
        return false;
    }
    let occupied = partition.occupied_slots();
    if occupied
        .iter()
        .enumerate()
        .any(|(k, slot)| *slot != k as u32)
    {
        return false;
    }
    for uses in &problem.usage {
        let used: Vec<usize> = (0..problem.n_variables()).filter(|i| uses[*i]).collect();
        if used.is_empty() {
            continue;
        }
        let first = partition.slots[used[0]];
        if used.iter().any(|&i| partition.slots[i] != first) {
            return false;
        }
    }
    problem
        .edges
        .iter()
        .all(|&(a, b)| partition.slots[a] == partition.slots[b])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem() -> PartitionProblem {
        PartitionProblem {
            usage: vec![vec![true, true, false], vec![false, false, true]],
            type_keys: vec!["uint256".into(), "address".into(), "mapping".into()],
            edges: vec![],
            costs: CostModel::default(),
        }
    }

    #[test]
    fn model_names_follow_the_formulation() {
        let model = formulate(&problem());
        let names: Vec<&str> = model.variables.iter().map(|v| v.name.as_str()).collect();
        assert!(names.contains(&"x[0,0]"));
        assert!(names.contains(&"x[2,2]"));
        assert!(names.contains(&"all_in_one"));
        assert!(names.contains(&"Sub_deploy"));
        assert!(model.nonconvex);
    }

    #[test]
    fn formulation_is_deterministic() {
        assert_eq!(formulate(&problem()), formulate(&problem()));
    }

    #[test]
    fn identically_built_problems_compare_equal() {
        assert_eq!(problem(), problem());
        assert_ne!(
            problem(),
            PartitionProblem {
                costs: CostModel::new(99),
                ..problem()
            }
        );
    }

    #[test]
    fn feasibility_checks_colocations() {
        let problem = problem();
        // functions {0,1} and {2} split cleanly
        assert!(is_feasible(
            &problem,
            &Partition {
                slots: vec![0, 0, 1]
            }
        ));
        // function 0's variables split across slots
        assert!(!is_feasible(
            &problem,
            &Partition {
                slots: vec![0, 1, 1]
            }
        ));
        // gap in slot numbering
        assert!(!is_feasible(
            &problem,
            &Partition {
                slots: vec![0, 0, 2]
            }
        ));
    }

    #[test]
    fn merged_and_split_objectives_differ() {
        let problem = problem();
        let merged = objective_value(
            &problem,
            &Partition {
                slots: vec![0, 0, 0],
            },
        );
        let split = objective_value(
            &problem,
            &Partition {
                slots: vec![0, 0, 1],
            },
        );
        assert_ne!(merged, split);
    }
}
