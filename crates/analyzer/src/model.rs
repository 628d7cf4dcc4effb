use indexmap::{IndexMap, IndexSet};
use parser::ast::{
    EnumDef, EventDef, Expr, FunctionDef, ModifierDef, Pragma, StructDef, TypeDesc, Visibility,
};
use smol_str::SmolStr;

/// Everything the later pipeline stages need to know about one contract.
/// Built once by [`crate::analyze`] and threaded through by value; no stage
/// keeps analysis state of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractModel {
    pub name: SmolStr,
    pub pragma: Option<Pragma>,
    pub variables: Vec<StateVariable>,
    pub functions: Vec<FunctionInfo>,
    pub reference_edges: Vec<ReferenceEdge>,
    pub events: IndexMap<SmolStr, EventDef>,
    pub modifiers: IndexMap<SmolStr, ModifierDef>,
    pub structs: IndexMap<SmolStr, StructDef>,
    pub enums: IndexMap<SmolStr, EnumDef>,
}

impl ContractModel {
    pub fn variable_named(&self, name: &str) -> Option<&StateVariable> {
        self.variables.iter().find(|var| var.name == name)
    }

    /// Type descriptor strings in variable declaration order, the `T` input
    /// of the partition optimizer.
    pub fn type_descriptors(&self) -> Vec<String> {
        self.variables.iter().map(|var| var.typ.descriptor()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateVariable {
    /// Stable position within one partitioning run.
    pub index: usize,
    pub name: SmolStr,
    pub typ: TypeDesc,
    pub visibility: Visibility,
    pub is_constant: bool,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionInfo {
    pub index: usize,
    /// `None` only for an unnamed definition the parser could not classify.
    pub name: Option<SmolStr>,
    /// One flag per state variable: referenced anywhere in this function's
    /// body.
    pub uses: Vec<bool>,
    pub deps: DependencySet,
    pub def: FunctionDef,
}

impl FunctionInfo {
    /// Indices of the state variables this function touches.
    pub fn used_variables(&self) -> impl Iterator<Item = usize> + '_ {
        self.uses
            .iter()
            .enumerate()
            .filter_map(|(i, used)| used.then_some(i))
    }
}

/// Names of the contract-level definitions a function references.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DependencySet {
    pub events: IndexSet<SmolStr>,
    pub modifiers: IndexSet<SmolStr>,
    pub structs: IndexSet<SmolStr>,
    pub enums: IndexSet<SmolStr>,
}

impl DependencySet {
    pub fn merge(&mut self, other: &DependencySet) {
        self.events.extend(other.events.iter().cloned());
        self.modifiers.extend(other.modifiers.iter().cloned());
        self.structs.extend(other.structs.iter().cloned());
        self.enums.extend(other.enums.iter().cloned());
    }
}

/// Declaring variable `from` reads variable `to` in its initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceEdge {
    pub from: usize,
    pub to: usize,
}
