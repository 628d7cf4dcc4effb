//! Syntax tree for the Solidity subset the toolchain emits and re-consumes.
//!
//! Each syntax category is a closed tagged-variant type. Constructs outside
//! the subset are carried as explicit `Unsupported` variants holding the
//! foreign node kind, so an external AST provider can hand them over without
//! the later stages silently falling through.
//!
//! `Display` impls render a tree back to source text; the contract generator
//! and the maintenance engine both produce files this way.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::{self, Formatter, Write};

use indenter::indented;

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct SourceUnit {
    pub pragma: Option<Pragma>,
    pub contracts: Vec<ContractDef>,
}

impl SourceUnit {
    /// The single contract definition of this unit, if there is exactly one.
    pub fn contract(&self) -> Option<&ContractDef> {
        match self.contracts.as_slice() {
            [contract] => Some(contract),
            _ => None,
        }
    }
}

/// A `pragma solidity ^0.8.0;` directive.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Pragma {
    pub name: SmolStr,
    pub requirement: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Copy, Clone)]
pub enum ContractKind {
    Contract,
    Interface,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct ContractDef {
    pub kind: ContractKind,
    pub name: SmolStr,
    pub parts: Vec<ContractPart>,
}

impl ContractDef {
    pub fn variables(&self) -> impl Iterator<Item = &VariableDecl> {
        self.parts.iter().filter_map(|part| match part {
            ContractPart::Variable(decl) => Some(decl),
            _ => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.parts.iter().filter_map(|part| match part {
            ContractPart::Function(def) => Some(def),
            _ => None,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum ContractPart {
    Variable(VariableDecl),
    Function(FunctionDef),
    Event(EventDef),
    Modifier(ModifierDef),
    Struct(StructDef),
    Enum(EnumDef),
    /// A construct outside the supported subset; holds the foreign node kind.
    Unsupported(SmolStr),
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct VariableDecl {
    pub typ: TypeDesc,
    pub visibility: Visibility,
    pub is_constant: bool,
    pub name: SmolStr,
    pub value: Option<Expr>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Copy, Clone, Default)]
pub enum Visibility {
    Public,
    Private,
    #[default]
    Internal,
    External,
}

impl Visibility {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            "internal" => Some(Visibility::Internal),
            "external" => Some(Visibility::External),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum TypeDesc {
    Elementary(SmolStr),
    UserDefined(SmolStr),
    Mapping {
        key: Box<TypeDesc>,
        value: Box<TypeDesc>,
    },
    Array {
        base: Box<TypeDesc>,
        length: Option<u64>,
    },
    Unsupported(SmolStr),
}

impl TypeDesc {
    pub fn elementary(name: &str) -> Self {
        TypeDesc::Elementary(name.into())
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, TypeDesc::Mapping { .. })
    }

    /// The type-name key used for gas cost lookup: the elementary name, or
    /// `mapping` for any mapping type, or the base element name for arrays.
    pub fn cost_key(&self) -> &str {
        match self {
            TypeDesc::Elementary(name) => name,
            TypeDesc::UserDefined(name) => name,
            TypeDesc::Mapping { .. } => "mapping",
            TypeDesc::Array { base, .. } => base.cost_key(),
            TypeDesc::Unsupported(name) => name,
        }
    }

    /// The canonical descriptor string, e.g. `mapping(address => uint256)`.
    pub fn descriptor(&self) -> String {
        self.to_string()
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct EventDef {
    pub name: SmolStr,
    pub fields: Vec<EventField>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct EventField {
    pub typ: TypeDesc,
    pub is_indexed: bool,
    pub name: SmolStr,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct ModifierDef {
    pub name: SmolStr,
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct StructDef {
    pub name: SmolStr,
    pub fields: Vec<StructField>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct StructField {
    pub typ: TypeDesc,
    pub name: SmolStr,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct EnumDef {
    pub name: SmolStr,
    pub variants: Vec<SmolStr>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Copy, Clone)]
pub enum FunctionKind {
    Function,
    Constructor,
    Fallback,
    /// Pre-0.6 unnamed fallback, written `function () ...`.
    OldStyleFallback,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Copy, Clone)]
pub enum Mutability {
    Payable,
    View,
    Pure,
}

impl Mutability {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "payable" => Some(Mutability::Payable),
            "view" => Some(Mutability::View),
            "pure" => Some(Mutability::Pure),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Param {
    pub typ: TypeDesc,
    pub name: Option<SmolStr>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct FunctionDef {
    pub kind: FunctionKind,
    pub name: Option<SmolStr>,
    pub params: Vec<Param>,
    pub visibility: Option<Visibility>,
    pub mutability: Option<Mutability>,
    pub modifiers: Vec<SmolStr>,
    pub returns: Vec<Param>,
    /// `None` renders as a bodiless declaration (interface member).
    pub body: Option<Vec<Stmt>>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum Stmt {
    Expr(Expr),
    Return(Option<Expr>),
    VarDecl {
        typ: TypeDesc,
        name: SmolStr,
        value: Option<Expr>,
    },
    /// Tuple destructuring declaration, e.g. `(bool success, ) = t.call(..);`.
    DestructureDecl {
        components: Vec<Option<(TypeDesc, SmolStr)>>,
        value: Expr,
    },
    If {
        condition: Expr,
        body: Vec<Stmt>,
        or_else: Vec<Stmt>,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        step: Option<Expr>,
        body: Vec<Stmt>,
    },
    Emit {
        event: SmolStr,
        args: Vec<Expr>,
    },
    /// Raw inline assembly, body text kept verbatim.
    InlineAssembly(String),
    Unsupported(SmolStr),
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum Expr {
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        is_prefix: bool,
        operand: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        op: AssignOp,
        value: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    /// A call with options, e.g. `target.call{value: msg.value}(msg.data)`.
    CallWithOptions {
        func: Box<Expr>,
        options: Vec<(SmolStr, Expr)>,
        args: Vec<Expr>,
    },
    Member {
        value: Box<Expr>,
        member: SmolStr,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Tuple(Vec<Expr>),
    Number(SmolStr),
    HexNumber(SmolStr),
    Bool(bool),
    Str(SmolStr),
    Ident(SmolStr),
    /// An elementary type used as an expression, e.g. `address(0)`.
    ElementaryType(SmolStr),
    Unsupported(SmolStr),
}

impl Expr {
    pub fn ident(name: &str) -> Self {
        Expr::Ident(name.into())
    }

    pub fn number(text: &str) -> Self {
        Expr::Number(text.into())
    }

    pub fn call(func: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            func: Box::new(func),
            args,
        }
    }

    pub fn member(value: Expr, member: &str) -> Self {
        Expr::Member {
            value: Box::new(value),
            member: member.into(),
        }
    }

    pub fn index(base: Expr, index: Expr) -> Self {
        Expr::Index {
            base: Box::new(base),
            index: Box::new(index),
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::Assign {
            target: Box::new(target),
            op: AssignOp::Assign,
            value: Box::new(value),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Copy, Clone)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Copy, Clone)]
pub enum UnaryOp {
    Not,
    Neg,
    Inc,
    Dec,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Copy, Clone)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
}

impl fmt::Display for SourceUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(pragma) = &self.pragma {
            writeln!(f, "{pragma}")?;
            writeln!(f)?;
        }
        for (i, contract) in self.contracts.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{contract}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Pragma {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "pragma {} {};", self.name, self.requirement)
    }
}

impl fmt::Display for ContractKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ContractKind::Contract => write!(f, "contract"),
            ContractKind::Interface => write!(f, "interface"),
        }
    }
}

impl fmt::Display for ContractDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {} {{", self.kind, self.name)?;
        for part in &self.parts {
            write!(indented(f), "{part}")?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for ContractPart {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ContractPart::Variable(decl) => writeln!(f, "{decl}"),
            ContractPart::Function(def) => writeln!(f, "{def}"),
            ContractPart::Event(def) => writeln!(f, "{def}"),
            ContractPart::Modifier(def) => writeln!(f, "{def}"),
            ContractPart::Struct(def) => writeln!(f, "{def}"),
            ContractPart::Enum(def) => writeln!(f, "{def}"),
            ContractPart::Unsupported(kind) => writeln!(f, "// unsupported: {kind}"),
        }
    }
}

impl fmt::Display for VariableDecl {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.typ, self.visibility)?;
        if self.is_constant {
            write!(f, " constant")?;
        }
        write!(f, " {}", self.name)?;
        if let Some(value) = &self.value {
            write!(f, " = {value}")?;
        }
        write!(f, ";")
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
            Visibility::Internal => write!(f, "internal"),
            Visibility::External => write!(f, "external"),
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Elementary(name) | TypeDesc::UserDefined(name) => write!(f, "{name}"),
            TypeDesc::Mapping { key, value } => write!(f, "mapping({key} => {value})"),
            TypeDesc::Array { base, length } => {
                if let Some(length) = length {
                    write!(f, "{base}[{length}]")
                } else {
                    write!(f, "{base}[]")
                }
            }
            TypeDesc::Unsupported(name) => write!(f, "{name}"),
        }
    }
}

impl fmt::Display for EventDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "event {}({});", self.name, comma_joined(&self.fields))
    }
}

impl fmt::Display for EventField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_indexed {
            write!(f, "{} indexed {}", self.typ, self.name)
        } else {
            write!(f, "{} {}", self.typ, self.name)
        }
    }
}

impl fmt::Display for ModifierDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "modifier {}({}) {{", self.name, comma_joined(&self.params))?;
        for stmt in &self.body {
            writeln!(indented(f), "{stmt}")?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for StructDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "struct {} {{", self.name)?;
        for field in &self.fields {
            writeln!(indented(f), "{} {};", field.typ, field.name)?;
        }
        write!(f, "}}")
    }
}

impl fmt::Display for EnumDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "enum {} {{ {} }}", self.name, comma_joined(&self.variants))
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} {name}", self.typ),
            None => write!(f, "{}", self.typ),
        }
    }
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Mutability::Payable => write!(f, "payable"),
            Mutability::View => write!(f, "view"),
            Mutability::Pure => write!(f, "pure"),
        }
    }
}

impl fmt::Display for FunctionDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind {
            FunctionKind::Function => {
                let name = self.name.as_deref().unwrap_or("");
                write!(f, "function {name}({})", comma_joined(&self.params))?
            }
            FunctionKind::Constructor => {
                write!(f, "constructor({})", comma_joined(&self.params))?
            }
            FunctionKind::Fallback => write!(f, "fallback({})", comma_joined(&self.params))?,
            FunctionKind::OldStyleFallback => {
                write!(f, "function ({})", comma_joined(&self.params))?
            }
        }
        if let Some(visibility) = self.visibility {
            write!(f, " {visibility}")?;
        }
        if let Some(mutability) = self.mutability {
            write!(f, " {mutability}")?;
        }
        for modifier in &self.modifiers {
            write!(f, " {modifier}")?;
        }
        if !self.returns.is_empty() {
            write!(f, " returns ({})", comma_joined(&self.returns))?;
        }
        match &self.body {
            None => write!(f, ";"),
            Some(body) => {
                writeln!(f, " {{")?;
                for stmt in body {
                    writeln!(indented(f), "{stmt}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Expr(expr) => write!(f, "{expr};"),
            Stmt::Return(None) => write!(f, "return;"),
            Stmt::Return(Some(expr)) => write!(f, "return {expr};"),
            Stmt::VarDecl { typ, name, value } => {
                write!(f, "{typ} {name}")?;
                if let Some(value) = value {
                    write!(f, " = {value}")?;
                }
                write!(f, ";")
            }
            Stmt::DestructureDecl { components, value } => {
                write!(f, "(")?;
                for (i, component) in components.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    if let Some((typ, name)) = component {
                        write!(f, "{typ} {name}")?;
                    }
                }
                write!(f, ") = {value};")
            }
            Stmt::If {
                condition,
                body,
                or_else,
            } => {
                writeln!(f, "if ({condition}) {{")?;
                for stmt in body {
                    writeln!(indented(f), "{stmt}")?;
                }
                if or_else.is_empty() {
                    write!(f, "}}")
                } else {
                    writeln!(f, "}} else {{")?;
                    for stmt in or_else {
                        writeln!(indented(f), "{stmt}")?;
                    }
                    write!(f, "}}")
                }
            }
            Stmt::For {
                init,
                condition,
                step,
                body,
            } => {
                write!(f, "for (")?;
                if let Some(init) = init {
                    // the init statement carries its own `;`
                    write!(f, "{init}")?;
                } else {
                    write!(f, ";")?;
                }
                if let Some(condition) = condition {
                    write!(f, " {condition}")?;
                }
                write!(f, ";")?;
                if let Some(step) = step {
                    write!(f, " {step}")?;
                }
                writeln!(f, ") {{")?;
                for stmt in body {
                    writeln!(indented(f), "{stmt}")?;
                }
                write!(f, "}}")
            }
            Stmt::Emit { event, args } => {
                write!(f, "emit {event}({});", comma_joined(args))
            }
            Stmt::InlineAssembly(body) => {
                writeln!(f, "assembly {{")?;
                for line in body.lines() {
                    writeln!(indented(f), "{}", line.trim())?;
                }
                write!(f, "}}")
            }
            Stmt::Unsupported(kind) => write!(f, "// unsupported: {kind}"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Binary { left, op, right } => write!(f, "{left} {op} {right}"),
            Expr::Unary {
                op,
                is_prefix,
                operand,
            } => {
                if *is_prefix {
                    write!(f, "{op}{operand}")
                } else {
                    write!(f, "{operand}{op}")
                }
            }
            Expr::Assign { target, op, value } => write!(f, "{target} {op} {value}"),
            Expr::Call { func, args } => write!(f, "{func}({})", comma_joined(args)),
            Expr::CallWithOptions {
                func,
                options,
                args,
            } => {
                write!(f, "{func}{{")?;
                for (i, (name, value)) in options.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}({})", comma_joined(args))
            }
            Expr::Member { value, member } => write!(f, "{value}.{member}"),
            Expr::Index { base, index } => write!(f, "{base}[{index}]"),
            Expr::Tuple(elts) => write!(f, "({})", comma_joined(elts)),
            Expr::Number(text) | Expr::HexNumber(text) => write!(f, "{text}"),
            Expr::Bool(value) => write!(f, "{value}"),
            Expr::Str(text) => write!(f, "\"{text}\""),
            Expr::Ident(name) | Expr::ElementaryType(name) => write!(f, "{name}"),
            Expr::Unsupported(kind) => write!(f, "/* unsupported: {kind} */"),
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        };
        write!(f, "{text}")
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::Inc => "++",
            UnaryOp::Dec => "--",
        };
        write!(f, "{text}")
    }
}

impl fmt::Display for AssignOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
        };
        write!(f, "{text}")
    }
}

fn comma_joined(items: &[impl fmt::Display]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
