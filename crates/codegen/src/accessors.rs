//! Generated getter and setter functions.
//!
//! Private state variables lose their implicit external surface when they
//! move behind a delegate-call proxy, so the logic contract carries an
//! explicit `get_<name>` for each; the maintenance engine appends a
//! `set_<name>` whenever a private variable is inserted or updated, which is
//! also what the migration updater calls.

use parser::ast::{
    Expr, FunctionDef, FunctionKind, Mutability, Param, Stmt, TypeDesc, Visibility,
};
use smol_str::SmolStr;

pub fn getter_name(var: &str) -> SmolStr {
    format!("get_{var}").into()
}

pub fn setter_name(var: &str) -> SmolStr {
    format!("set_{var}").into()
}

/// `function get_<name>() public view returns (<type>) { return <name>; }`,
/// with a key parameter when the variable is a mapping.
pub fn getter(name: &str, typ: &TypeDesc) -> FunctionDef {
    let (params, returns, value) = match typ {
        TypeDesc::Mapping { key, value } => (
            vec![Param {
                typ: (**key).clone(),
                name: Some("key".into()),
            }],
            (**value).clone(),
            Expr::index(Expr::ident(name), Expr::ident("key")),
        ),
        other => (vec![], other.clone(), Expr::ident(name)),
    };
    FunctionDef {
        kind: FunctionKind::Function,
        name: Some(getter_name(name)),
        params,
        visibility: Some(Visibility::Public),
        mutability: Some(Mutability::View),
        modifiers: vec![],
        returns: vec![Param {
            typ: returns,
            name: None,
        }],
        body: Some(vec![Stmt::Return(Some(value))]),
    }
}

/// `function set_<name>(<type> _<name>) public { <name> = _<name>; }`, or the
/// keyed form for a mapping.
pub fn setter(name: &str, typ: &TypeDesc) -> FunctionDef {
    let (params, body) = match typ {
        TypeDesc::Mapping { key, value } => (
            vec![
                Param {
                    typ: (**key).clone(),
                    name: Some("key".into()),
                },
                Param {
                    typ: (**value).clone(),
                    name: Some("value".into()),
                },
            ],
            vec![Stmt::Expr(Expr::assign(
                Expr::index(Expr::ident(name), Expr::ident("key")),
                Expr::ident("value"),
            ))],
        ),
        other => {
            let param_name = format!("_{name}");
            (
                vec![Param {
                    typ: other.clone(),
                    name: Some(param_name.clone().into()),
                }],
                vec![Stmt::Expr(Expr::assign(
                    Expr::ident(name),
                    Expr::ident(&param_name),
                ))],
            )
        }
    };
    FunctionDef {
        kind: FunctionKind::Function,
        name: Some(setter_name(name)),
        params,
        visibility: Some(Visibility::Public),
        mutability: None,
        modifiers: vec![],
        returns: vec![],
        body: Some(body),
    }
}
