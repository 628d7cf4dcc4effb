//! Rendering a [`MigrationPlan`] as a one-shot updater contract.

use common::{naming, version};
use parser::ast::{
    BinOp, ContractDef, ContractKind, ContractPart, Expr, FunctionDef, FunctionKind, Param, Pragma,
    SourceUnit, Stmt, TypeDesc, UnaryOp, VariableDecl, Visibility,
};
use smol_str::SmolStr;

use crate::{MigrationPlan, SlotMigration};

/// Render the updater plus its per-slot getter and setter interfaces.
pub fn updater_contract(contract: &str, plan: &MigrationPlan, pragma: Option<Pragma>) -> String {
    let modern = pragma
        .as_ref()
        .and_then(|pragma| version::declared_version(&pragma.requirement))
        .as_ref()
        .is_some_and(version::has_modern_constructor);

    let mut contracts = vec![];
    for migration in &plan.slots {
        contracts.push(old_interface(migration));
        contracts.push(new_interface(migration));
    }
    contracts.push(updater_body(contract, plan, modern));

    SourceUnit { pragma, contracts }.to_string()
}

fn old_interface_name(slot: u32) -> SmolStr {
    format!("IOld{slot}").into()
}

fn new_interface_name(slot: u32) -> SmolStr {
    format!("INew{slot}").into()
}

fn old_field_name(slot: u32) -> SmolStr {
    format!("oldContract{slot}").into()
}

fn new_field_name(slot: u32) -> SmolStr {
    format!("newContract{slot}").into()
}

fn key_list_name(var: &str) -> SmolStr {
    format!("key_of_{var}").into()
}

/// Getters exposed by the retired logic contract, under the old names.
fn old_interface(migration: &SlotMigration) -> ContractDef {
    let mut parts = vec![];
    for var in &migration.variables {
        let (params, returns) = match &var.typ {
            TypeDesc::Mapping { key, value } => (
                vec![param(key, "key")],
                vec![anonymous((**value).clone())],
            ),
            other => (vec![], vec![anonymous(other.clone())]),
        };
        parts.push(ContractPart::Function(FunctionDef {
            kind: FunctionKind::Function,
            name: Some(format!("get_{}", var.old_name).into()),
            params,
            visibility: Some(Visibility::External),
            mutability: Some(parser::ast::Mutability::View),
            modifiers: vec![],
            returns,
            body: None,
        }));
    }
    ContractDef {
        kind: ContractKind::Interface,
        name: old_interface_name(migration.slot),
        parts,
    }
}

/// Setters exposed by the replacement logic contract, under the new names.
fn new_interface(migration: &SlotMigration) -> ContractDef {
    let mut parts = vec![];
    for var in &migration.variables {
        let params = match &var.typ {
            TypeDesc::Mapping { key, value } => {
                vec![param(key, "key"), param(value, "value")]
            }
            other => vec![Param {
                typ: other.clone(),
                name: Some(format!("_{}", var.new_name).into()),
            }],
        };
        parts.push(ContractPart::Function(FunctionDef {
            kind: FunctionKind::Function,
            name: Some(format!("set_{}", var.new_name).into()),
            params,
            visibility: Some(Visibility::External),
            mutability: None,
            modifiers: vec![],
            returns: vec![],
            body: None,
        }));
    }
    ContractDef {
        kind: ContractKind::Interface,
        name: new_interface_name(migration.slot),
        parts,
    }
}

fn updater_body(contract: &str, plan: &MigrationPlan, modern: bool) -> ContractDef {
    let name: SmolStr = naming::updater_contract(contract).into();
    let mut parts = vec![];

    for migration in &plan.slots {
        parts.push(interface_field(
            old_interface_name(migration.slot),
            old_field_name(migration.slot),
        ));
        parts.push(interface_field(
            new_interface_name(migration.slot),
            new_field_name(migration.slot),
        ));
    }

    // injected key lists for mapping copies, one per migrated mapping
    for migration in &plan.slots {
        for var in &migration.variables {
            if let TypeDesc::Mapping { key, .. } = &var.typ {
                let list = key_list_name(&var.old_name);
                parts.push(ContractPart::Variable(VariableDecl {
                    typ: TypeDesc::Array {
                        base: key.clone(),
                        length: None,
                    },
                    visibility: Visibility::Public,
                    is_constant: false,
                    name: list.clone(),
                    value: None,
                }));
                parts.push(ContractPart::Function(key_push_helper(&list, key)));
            }
        }
    }

    parts.push(ContractPart::Function(constructor(&name, plan, modern)));
    parts.push(ContractPart::Function(update_state(plan)));

    ContractDef {
        kind: ContractKind::Contract,
        name,
        parts,
    }
}

fn interface_field(typ: SmolStr, name: SmolStr) -> ContractPart {
    ContractPart::Variable(VariableDecl {
        typ: TypeDesc::UserDefined(typ),
        visibility: Visibility::Internal,
        is_constant: false,
        name,
        value: None,
    })
}

fn key_push_helper(list: &SmolStr, key: &TypeDesc) -> FunctionDef {
    FunctionDef {
        kind: FunctionKind::Function,
        name: Some(format!("add_{list}").into()),
        params: vec![param(key, "key")],
        visibility: Some(Visibility::Public),
        mutability: None,
        modifiers: vec![],
        returns: vec![],
        body: Some(vec![Stmt::Expr(Expr::call(
            Expr::member(Expr::ident(list), "push"),
            vec![Expr::ident("key")],
        ))]),
    }
}

fn constructor(updater_name: &str, plan: &MigrationPlan, modern: bool) -> FunctionDef {
    let mut params = vec![];
    let mut body = vec![];
    for migration in &plan.slots {
        let slot = migration.slot;
        let old_param: SmolStr = format!("_old{slot}").into();
        let new_param: SmolStr = format!("_new{slot}").into();
        params.push(Param {
            typ: TypeDesc::elementary("address"),
            name: Some(old_param.clone()),
        });
        params.push(Param {
            typ: TypeDesc::elementary("address"),
            name: Some(new_param.clone()),
        });
        body.push(Stmt::Expr(Expr::assign(
            Expr::ident(&old_field_name(slot)),
            Expr::call(Expr::ident(&old_interface_name(slot)), vec![Expr::ident(&old_param)]),
        )));
        body.push(Stmt::Expr(Expr::assign(
            Expr::ident(&new_field_name(slot)),
            Expr::call(Expr::ident(&new_interface_name(slot)), vec![Expr::ident(&new_param)]),
        )));
    }

    let (kind, name) = if modern {
        (FunctionKind::Constructor, None)
    } else {
        (FunctionKind::Function, Some(updater_name.into()))
    };
    FunctionDef {
        kind,
        name,
        params,
        visibility: Some(Visibility::Public),
        mutability: None,
        modifiers: vec![],
        returns: vec![],
        body: Some(body),
    }
}

fn update_state(plan: &MigrationPlan) -> FunctionDef {
    let mut body = vec![];
    for migration in &plan.slots {
        let old_field = old_field_name(migration.slot);
        let new_field = new_field_name(migration.slot);
        for var in &migration.variables {
            body.push(copy_statement(var, &old_field, &new_field));
        }
    }
    FunctionDef {
        kind: FunctionKind::Function,
        name: Some("updateState".into()),
        params: vec![],
        visibility: Some(Visibility::Public),
        mutability: None,
        modifiers: vec![],
        returns: vec![],
        body: Some(body),
    }
}

fn copy_statement(
    var: &crate::MigratedVariable,
    old_field: &SmolStr,
    new_field: &SmolStr,
) -> Stmt {
    let getter = format!("get_{}", var.old_name);
    let setter = format!("set_{}", var.new_name);
    match &var.typ {
        TypeDesc::Mapping { .. } => {
            let list = key_list_name(&var.old_name);
            let key_at = |i: Expr| Expr::index(Expr::ident(&list), i);
            Stmt::For {
                init: Some(Box::new(Stmt::VarDecl {
                    typ: TypeDesc::elementary("uint256"),
                    name: "i".into(),
                    value: Some(Expr::number("0")),
                })),
                condition: Some(Expr::Binary {
                    left: Box::new(Expr::ident("i")),
                    op: BinOp::Lt,
                    right: Box::new(Expr::member(Expr::ident(&list), "length")),
                }),
                step: Some(Expr::Unary {
                    op: UnaryOp::Inc,
                    is_prefix: false,
                    operand: Box::new(Expr::ident("i")),
                }),
                body: vec![Stmt::Expr(Expr::call(
                    Expr::member(Expr::ident(new_field), &setter),
                    vec![
                        key_at(Expr::ident("i")),
                        Expr::call(
                            Expr::member(Expr::ident(old_field), &getter),
                            vec![key_at(Expr::ident("i"))],
                        ),
                    ],
                ))],
            }
        }
        _ => Stmt::Expr(Expr::call(
            Expr::member(Expr::ident(new_field), &setter),
            vec![Expr::call(
                Expr::member(Expr::ident(old_field), &getter),
                vec![],
            )],
        )),
    }
}

fn param(typ: &TypeDesc, name: &str) -> Param {
    Param {
        typ: typ.clone(),
        name: Some(name.into()),
    }
}

fn anonymous(typ: TypeDesc) -> Param {
    Param { typ, name: None }
}

#[cfg(test)]
mod tests {
    use common::PartitionRecord;
    use indexmap::IndexMap;
    use smol_str::SmolStr;

    use crate::plan_migration;

    use super::*;

    fn sample_plan() -> MigrationPlan {
        let mut old = PartitionRecord::new("Token");
        old.insert_variable("owner".into(), 0, "address".to_string());
        old.insert_variable("balances".into(), 0, "mapping(address => uint256)".to_string());
        let mut new = old.clone();
        new.rename_variable("owner", "holder".into(), "address".to_string());
        let renames = IndexMap::from([(SmolStr::new("owner"), SmolStr::new("holder"))]);
        plan_migration(&old, &new, &renames).unwrap()
    }

    #[test]
    fn interfaces_use_old_getters_and_new_setters() {
        let source = updater_contract("Token", &sample_plan(), None);
        assert!(source.contains("interface IOld0 {"));
        assert!(source.contains("function get_owner() external view returns (address);"));
        assert!(source.contains("function get_balances(address key) external view returns (uint256);"));
        assert!(source.contains("interface INew0 {"));
        assert!(source.contains("function set_holder(address _holder) external;"));
        assert!(source.contains("function set_balances(address key, uint256 value) external;"));
    }

    #[test]
    fn mappings_copy_through_the_injected_key_list() {
        let source = updater_contract("Token", &sample_plan(), None);
        assert!(source.contains("address[] public key_of_balances;"));
        assert!(source.contains("function add_key_of_balances(address key) public {"));
        assert!(source.contains(
            "for (uint256 i = 0; i < key_of_balances.length; i++) {"
        ));
        assert!(source.contains(
            "newContract0.set_balances(key_of_balances[i], oldContract0.get_balances(key_of_balances[i]));"
        ));
    }

    #[test]
    fn constructor_shape_follows_the_pragma() {
        let modern = Pragma {
            name: "solidity".into(),
            requirement: "^0.6.0".to_string(),
        };
        let source = updater_contract("Token", &sample_plan(), Some(modern));
        assert!(source.contains("constructor(address _old0, address _new0) public {"));
        assert!(source.contains("oldContract0 = IOld0(_old0);"));

        let legacy = updater_contract("Token", &sample_plan(), None);
        assert!(legacy.contains("function TokenUpdater(address _old0, address _new0) public {"));
    }

    #[test]
    fn plain_values_copy_in_one_call() {
        let source = updater_contract("Token", &sample_plan(), None);
        assert!(source.contains("newContract0.set_holder(oldContract0.get_owner());"));
    }
}
