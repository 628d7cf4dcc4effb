//! Parser for the subset of Solidity that monolithic application contracts
//! are written in.
//!
//! The [`ast`] types double as the code generator's output representation;
//! [`fmt::Display`] on [`ast::SourceUnit`] renders compilable source text.

use std::fmt;

pub mod ast;
pub mod grammar;
pub mod lexer;
pub mod parser;

use ast::SourceUnit;
use parser::Parser;

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ParseError {
    /// The pragma names a compiler release outside the supported range.
    UnsupportedVersion(String),
    Syntax { line: usize, message: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnsupportedVersion(requirement) => {
                write!(f, "unsupported solidity version requirement `{requirement}`")
            }
            ParseError::Syntax { line, message } => {
                write!(f, "syntax error on line {line}: {message}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse a source file into a [`SourceUnit`].
pub fn parse_file(src: &str) -> Result<SourceUnit, ParseError> {
    let mut par = Parser::new(src);
    let unit = grammar::parse_source_unit(&mut par)?;
    if let Some(pragma) = &unit.pragma {
        if pragma.name == "solidity"
            && common::version::declared_version(&pragma.requirement).is_none()
        {
            return Err(ParseError::UnsupportedVersion(pragma.requirement.clone()));
        }
    }
    Ok(unit)
}

/// Parse a lone type descriptor, e.g. `mapping(address => uint256)`.
pub fn parse_type_text(src: &str) -> Result<ast::TypeDesc, ParseError> {
    parse_fragment(src, grammar::types::parse_type)
}

/// Parse a lone expression, e.g. a requirement's initializer field.
pub fn parse_expr_text(src: &str) -> Result<ast::Expr, ParseError> {
    parse_fragment(src, grammar::expressions::parse_expression)
}

fn parse_fragment<T>(
    src: &str,
    parse: fn(&mut Parser) -> Result<T, ParseError>,
) -> Result<T, ParseError> {
    let mut par = Parser::new(src);
    let parsed = parse(&mut par)?;
    if !par.at_end() {
        return Err(par.error_here("trailing input after fragment"));
    }
    Ok(parsed)
}

/// Source of contract ASTs. The pipeline stages take this at their seams so
/// tests can substitute pre-built trees.
pub trait AstProvider {
    fn parse(&self, source: &str) -> Result<SourceUnit, ParseError>;
}

/// The built-in subset parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubsetParser;

impl AstProvider for SubsetParser {
    fn parse(&self, source: &str) -> Result<SourceUnit, ParseError> {
        parse_file(source)
    }
}
