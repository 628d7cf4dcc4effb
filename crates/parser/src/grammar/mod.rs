pub mod contracts;
pub mod expressions;
pub mod functions;
pub mod types;

use crate::ast::{Pragma, SourceUnit};
use crate::lexer::TokenKind;
use crate::parser::{ParseResult, Parser};

/// Parse a whole source file: an optional pragma directive followed by
/// contract definitions.
pub fn parse_source_unit(par: &mut Parser) -> ParseResult<SourceUnit> {
    let mut pragma = None;
    if par.peek() == Some(TokenKind::PragmaDirective) {
        let tok = par.next()?;
        pragma = Some(parse_pragma(tok.text));
    }

    let mut contracts = vec![];
    while !par.at_end() {
        contracts.push(contracts::parse_contract(par)?);
    }
    Ok(SourceUnit { pragma, contracts })
}

fn parse_pragma(text: &str) -> Pragma {
    let inner = text
        .trim_start_matches("pragma")
        .trim_end_matches(';')
        .trim();
    let mut parts = inner.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("").into();
    let requirement = parts.next().unwrap_or("").trim().to_string();
    Pragma { name, requirement }
}
