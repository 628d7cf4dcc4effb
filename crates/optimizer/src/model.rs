//! Solver-agnostic integer-program representation.
//!
//! Constraint construction goes through this builder so the same formulation
//! can be shipped to any backend; the JSON serialization of [`Model`] is the
//! wire format of [`crate::solver::CommandSolver`].

use serde::{Deserialize, Serialize};

/// Handle to a decision variable within one [`Model`].
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct VarId(pub usize);

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VarKind {
    Binary,
    /// Continuous, bounded below by zero.
    Continuous,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub kind: VarKind,
}

/// Linear expression `Σ coeff·var + constant`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct LinExpr {
    pub terms: Vec<(f64, VarId)>,
    pub constant: f64,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(mut self, coeff: f64, var: VarId) -> Self {
        self.terms.push((coeff, var));
        self
    }

    pub fn offset(mut self, constant: f64) -> Self {
        self.constant += constant;
        self
    }

    pub fn add_term(&mut self, coeff: f64, var: VarId) {
        self.terms.push((coeff, var));
    }
}

/// Linear expression extended with products of two variables. The migration
/// cost term multiplies two binaries, which makes the model non-convex.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct QuadExpr {
    pub linear: LinExpr,
    pub products: Vec<(f64, VarId, VarId)>,
}

impl QuadExpr {
    pub fn add_product(&mut self, coeff: f64, a: VarId, b: VarId) {
        self.products.push((coeff, a, b));
    }
}

impl From<LinExpr> for QuadExpr {
    fn from(linear: LinExpr) -> Self {
        QuadExpr {
            linear,
            products: vec![],
        }
    }
}

/// Comparison of a constraint expression against zero.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    Le,
    Ge,
    Eq,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: String,
    /// Interpreted as `expr <sense> 0`.
    pub expr: QuadExpr,
    pub sense: Sense,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub variables: Vec<Variable>,
    pub constraints: Vec<Constraint>,
    /// Minimized.
    pub objective: LinExpr,
    /// The backend must be prepared for bilinear constraint terms.
    pub nonconvex: bool,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Model {
            name: name.into(),
            variables: vec![],
            constraints: vec![],
            objective: LinExpr::new(),
            nonconvex: false,
        }
    }

    pub fn binary(&mut self, name: impl Into<String>) -> VarId {
        self.add_variable(name.into(), VarKind::Binary)
    }

    pub fn continuous(&mut self, name: impl Into<String>) -> VarId {
        self.add_variable(name.into(), VarKind::Continuous)
    }

    fn add_variable(&mut self, name: String, kind: VarKind) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(Variable { name, kind });
        id
    }

    pub fn constrain(&mut self, name: impl Into<String>, expr: impl Into<QuadExpr>, sense: Sense) {
        self.constraints.push(Constraint {
            name: name.into(),
            expr: expr.into(),
            sense,
        });
    }

    pub fn minimize(&mut self, objective: LinExpr) {
        self.objective = objective;
    }

    pub fn var_name(&self, id: VarId) -> &str {
        &self.variables[id.0].name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assigns_sequential_ids() {
        let mut model = Model::new("test");
        let a = model.binary("a");
        let b = model.continuous("b");
        assert_eq!((a, b), (VarId(0), VarId(1)));
        assert_eq!(model.var_name(b), "b");
        assert_eq!(model.variables[0].kind, VarKind::Binary);
    }

    #[test]
    fn model_round_trips_through_json() {
        let mut model = Model::new("test");
        let a = model.binary("a");
        let b = model.binary("b");
        let mut expr = QuadExpr::from(LinExpr::new().term(1.0, a).offset(-1.0));
        expr.add_product(2.0, a, b);
        model.constrain("c0", expr, Sense::Le);
        model.minimize(LinExpr::new().term(1.0, a).term(1.0, b));
        model.nonconvex = true;

        let json = serde_json::to_string(&model).unwrap();
        let back: Model = serde_json::from_str(&json).unwrap();
        assert_eq!(model, back);
    }
}
