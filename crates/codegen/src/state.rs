//! State (proxy) contract generation.

use analyzer::StateVariable;
use parser::ast::{
    ContractDef, ContractKind, ContractPart, Expr, FunctionDef, FunctionKind, Mutability, Param,
    Stmt, TypeDesc, VariableDecl, Visibility,
};

/// Body of the delegate-call forwarder, kept as raw assembly just like the
/// fallback it is injected into.
const FORWARD_ASSEMBLY: &str = "let ptr := mload(0x40)\n\
calldatacopy(ptr, 0, calldatasize())\n\
let result := delegatecall(gas(), _impl, ptr, calldatasize(), 0, 0)\n\
let size := returndatasize()\n\
returndatacopy(ptr, 0, size)\n\
switch result\n\
case 0 { revert(ptr, size) }\n\
default { return(ptr, size) }";

/// The forwarding-address field shared by every state and logic contract.
/// It occupies storage slot zero on both sides, which is what keeps the
/// layouts aligned.
pub fn forwarding_field() -> ContractPart {
    ContractPart::Variable(VariableDecl {
        typ: TypeDesc::elementary("address"),
        visibility: Visibility::Public,
        is_constant: false,
        name: "logicContract".into(),
        value: None,
    })
}

/// Build one slot's state contract: forwarding field, the slot's variables
/// with their initializers, a constructor taking the logic address, the
/// delegate-call fallback, and `upgradeTo`.
pub fn state_contract(name: &str, variables: &[&StateVariable], modern: bool) -> ContractDef {
    let mut parts = vec![forwarding_field()];
    for var in variables {
        parts.push(ContractPart::Variable(VariableDecl {
            typ: var.typ.clone(),
            visibility: var.visibility,
            is_constant: var.is_constant,
            name: var.name.clone(),
            value: var.initializer.clone(),
        }));
    }
    parts.push(ContractPart::Function(constructor(name, modern)));
    parts.push(ContractPart::Function(forwarding_fallback(modern)));
    parts.push(ContractPart::Function(upgrade_to()));
    ContractDef {
        kind: ContractKind::Contract,
        name: name.into(),
        parts,
    }
}

fn constructor(contract_name: &str, modern: bool) -> FunctionDef {
    let (kind, name) = if modern {
        (FunctionKind::Constructor, None)
    } else {
        // pre-0.6 constructors share the contract's name
        (FunctionKind::Function, Some(contract_name.into()))
    };
    FunctionDef {
        kind,
        name,
        params: vec![Param {
            typ: TypeDesc::elementary("address"),
            name: Some("_logicContract".into()),
        }],
        visibility: Some(Visibility::Public),
        mutability: None,
        modifiers: vec![],
        returns: vec![],
        body: Some(vec![Stmt::Expr(Expr::assign(
            Expr::ident("logicContract"),
            Expr::ident("_logicContract"),
        ))]),
    }
}

pub fn forwarding_fallback(modern: bool) -> FunctionDef {
    let (kind, visibility) = if modern {
        (FunctionKind::Fallback, Visibility::External)
    } else {
        (FunctionKind::OldStyleFallback, Visibility::Public)
    };
    FunctionDef {
        kind,
        name: None,
        params: vec![],
        visibility: Some(visibility),
        mutability: Some(Mutability::Payable),
        modifiers: vec![],
        returns: vec![],
        body: Some(vec![
            Stmt::VarDecl {
                typ: TypeDesc::elementary("address"),
                name: "_impl".into(),
                value: Some(Expr::ident("logicContract")),
            },
            Stmt::Expr(Expr::call(
                Expr::ident("require"),
                vec![Expr::Binary {
                    left: Box::new(Expr::ident("_impl")),
                    op: parser::ast::BinOp::Ne,
                    right: Box::new(Expr::call(
                        Expr::ElementaryType("address".into()),
                        vec![Expr::number("0")],
                    )),
                }],
            )),
            Stmt::InlineAssembly(FORWARD_ASSEMBLY.into()),
        ]),
    }
}

fn upgrade_to() -> FunctionDef {
    FunctionDef {
        kind: FunctionKind::Function,
        name: Some("upgradeTo".into()),
        params: vec![Param {
            typ: TypeDesc::elementary("address"),
            name: Some("_newLogic".into()),
        }],
        // access control is the deployer's to inject
        visibility: Some(Visibility::Public),
        mutability: None,
        modifiers: vec![],
        returns: vec![],
        body: Some(vec![Stmt::Expr(Expr::assign(
            Expr::ident("logicContract"),
            Expr::ident("_newLogic"),
        ))]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variable(name: &str) -> StateVariable {
        StateVariable {
            index: 0,
            name: name.into(),
            typ: TypeDesc::elementary("uint256"),
            visibility: Visibility::Public,
            is_constant: false,
            initializer: Some(Expr::number("7")),
        }
    }

    #[test]
    fn modern_state_contract_shape() {
        let var = variable("total");
        let rendered = state_contract("VaultState0", &[&var], true).to_string();
        assert!(rendered.starts_with("contract VaultState0 {"));
        assert!(rendered.contains("address public logicContract;"));
        assert!(rendered.contains("uint256 public total = 7;"));
        assert!(rendered.contains("constructor(address _logicContract) public {"));
        assert!(rendered.contains("fallback() external payable {"));
        assert!(rendered.contains("delegatecall(gas(), _impl, ptr, calldatasize(), 0, 0)"));
        assert!(rendered.contains("function upgradeTo(address _newLogic) public {"));
    }

    #[test]
    fn legacy_state_contract_uses_named_constructor() {
        let var = variable("total");
        let rendered = state_contract("VaultState0", &[&var], false).to_string();
        assert!(rendered.contains("function VaultState0(address _logicContract) public {"));
        assert!(rendered.contains("function () public payable {"));
        assert!(!rendered.contains("constructor("));
    }
}
