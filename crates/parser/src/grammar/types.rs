use crate::ast::TypeDesc;
use crate::lexer::TokenKind;
use crate::parser::{ParseResult, Parser};

/// Parse a type name: elementary, user-defined, `mapping(k => v)`, or an
/// array of any of those.
pub fn parse_type(par: &mut Parser) -> ParseResult<TypeDesc> {
    let base = match par.peek() {
        Some(TokenKind::Mapping) => {
            par.next()?;
            par.expect(TokenKind::ParenOpen, "mapping type")?;
            let key = parse_type(par)?;
            par.expect(TokenKind::FatArrow, "mapping type")?;
            let value = parse_type(par)?;
            par.expect(TokenKind::ParenClose, "mapping type")?;
            TypeDesc::Mapping {
                key: Box::new(key),
                value: Box::new(value),
            }
        }
        Some(TokenKind::Name) => {
            let tok = par.next()?;
            if is_elementary(tok.text) {
                TypeDesc::Elementary(tok.text.into())
            } else {
                TypeDesc::UserDefined(tok.text.into())
            }
        }
        _ => return Err(par.error_here("expected a type name")),
    };

    let mut typ = base;
    while par.eat(TokenKind::BracketOpen) {
        let length = if par.peek() == Some(TokenKind::Number) {
            let tok = par.next()?;
            Some(tok.text.parse::<u64>().map_err(|_| {
                par.syntax_error(tok.span, format!("invalid array length `{}`", tok.text))
            })?)
        } else {
            None
        };
        par.expect(TokenKind::BracketClose, "array type")?;
        typ = TypeDesc::Array {
            base: Box::new(typ),
            length,
        };
    }
    Ok(typ)
}

/// Whether a name denotes one of solidity's elementary types.
pub fn is_elementary(name: &str) -> bool {
    match name {
        "address" | "bool" | "string" | "byte" => true,
        _ => {
            let digits = name
                .strip_prefix("uint")
                .or_else(|| name.strip_prefix("int"))
                .or_else(|| name.strip_prefix("bytes"));
            match digits {
                Some("") => true,
                Some(digits) => digits.bytes().all(|b| b.is_ascii_digit()),
                None => false,
            }
        }
    }
}

/// Whether the parser is positioned at the start of a type.
pub fn at_type_start(par: &Parser) -> bool {
    match par.peek() {
        Some(TokenKind::Mapping) => true,
        Some(TokenKind::Name) => {
            is_elementary(par.peek_text().unwrap_or(""))
                || matches!(par.peek_at(1), Some(TokenKind::Name))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::is_elementary;

    #[test]
    fn elementary_names() {
        assert!(is_elementary("uint256"));
        assert!(is_elementary("uint"));
        assert!(is_elementary("bytes32"));
        assert!(is_elementary("address"));
        assert!(!is_elementary("uint2x"));
        assert!(!is_elementary("Counter"));
    }
}
