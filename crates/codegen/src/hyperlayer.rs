//! Router ("hyperlayer") contract generation.
//!
//! The router keeps a selector-to-address table and forwards through a plain
//! call rather than a delegate-call: each target's state lives in that
//! target's own storage.

use parser::ast::{
    ContractDef, ContractKind, ContractPart, Expr, FunctionDef, FunctionKind, Mutability, Param,
    Stmt, TypeDesc, VariableDecl, Visibility,
};

pub fn hyperlayer_contract(name: &str, modern: bool) -> ContractDef {
    let table = ContractPart::Variable(VariableDecl {
        typ: TypeDesc::Mapping {
            key: Box::new(TypeDesc::elementary("bytes4")),
            value: Box::new(TypeDesc::elementary("address")),
        },
        visibility: Visibility::Public,
        is_constant: false,
        name: "stateLogicMapping".into(),
        value: None,
    });

    let register = FunctionDef {
        kind: FunctionKind::Function,
        name: Some("setLogicContract".into()),
        params: vec![
            Param {
                typ: TypeDesc::elementary("bytes4"),
                name: Some("funcSelector".into()),
            },
            Param {
                typ: TypeDesc::elementary("address"),
                name: Some("logicAddress".into()),
            },
        ],
        visibility: Some(Visibility::Public),
        mutability: None,
        modifiers: vec![],
        returns: vec![],
        body: Some(vec![Stmt::Expr(Expr::assign(
            Expr::index(Expr::ident("stateLogicMapping"), Expr::ident("funcSelector")),
            Expr::ident("logicAddress"),
        ))]),
    };

    ContractDef {
        kind: ContractKind::Contract,
        name: name.into(),
        parts: vec![
            table,
            ContractPart::Function(register),
            ContractPart::Function(routing_fallback(modern)),
        ],
    }
}

fn routing_fallback(modern: bool) -> FunctionDef {
    let lookup = Stmt::VarDecl {
        typ: TypeDesc::elementary("address"),
        name: "target".into(),
        value: Some(Expr::index(
            Expr::ident("stateLogicMapping"),
            Expr::member(Expr::ident("msg"), "sig"),
        )),
    };
    let guard = Stmt::Expr(Expr::call(
        Expr::ident("require"),
        vec![
            Expr::Binary {
                left: Box::new(Expr::ident("target")),
                op: parser::ast::BinOp::Ne,
                right: Box::new(Expr::call(
                    Expr::ElementaryType("address".into()),
                    vec![Expr::number("0")],
                )),
            },
            Expr::Str("Logic contract not found".into()),
        ],
    ));

    let (kind, visibility, forward) = if modern {
        let forward = Stmt::DestructureDecl {
            components: vec![
                Some((TypeDesc::elementary("bool"), "success".into())),
                None,
            ],
            value: Expr::CallWithOptions {
                func: Box::new(Expr::member(Expr::ident("target"), "call")),
                options: vec![(
                    "value".into(),
                    Expr::member(Expr::ident("msg"), "value"),
                )],
                args: vec![Expr::member(Expr::ident("msg"), "data")],
            },
        };
        (FunctionKind::Fallback, Visibility::External, forward)
    } else {
        // pre-0.6 low-level call option syntax
        let forward = Stmt::VarDecl {
            typ: TypeDesc::elementary("bool"),
            name: "success".into(),
            value: Some(Expr::call(
                Expr::call(
                    Expr::member(
                        Expr::member(Expr::ident("target"), "call"),
                        "value",
                    ),
                    vec![Expr::member(Expr::ident("msg"), "value")],
                ),
                vec![Expr::member(Expr::ident("msg"), "data")],
            )),
        };
        (FunctionKind::OldStyleFallback, Visibility::Public, forward)
    };

    let check = Stmt::Expr(Expr::call(
        Expr::ident("require"),
        vec![Expr::ident("success"), Expr::Str("Call failed".into())],
    ));

    FunctionDef {
        kind,
        name: None,
        params: vec![],
        visibility: Some(visibility),
        mutability: Some(Mutability::Payable),
        modifiers: vec![],
        returns: vec![],
        body: Some(vec![lookup, guard, forward, check]),
    }
}
