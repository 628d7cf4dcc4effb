use super::functions::parse_function;
use super::types::parse_type;
use crate::ast::{
    ContractDef, ContractKind, ContractPart, EnumDef, EventDef, EventField, ModifierDef, Param,
    StructDef, StructField, VariableDecl, Visibility,
};
use crate::lexer::TokenKind;
use crate::parser::{ParseResult, Parser};

/// Parse a `contract` or `interface` definition.
pub fn parse_contract(par: &mut Parser) -> ParseResult<ContractDef> {
    let kind = match par.peek() {
        Some(TokenKind::Contract) => {
            par.next()?;
            ContractKind::Contract
        }
        Some(TokenKind::Interface) => {
            par.next()?;
            ContractKind::Interface
        }
        _ => return Err(par.error_here("expected `contract` or `interface`")),
    };
    let name = par.expect_name("contract definition")?;
    par.expect(TokenKind::BraceOpen, "contract definition")?;

    let mut parts = vec![];
    loop {
        match par.peek() {
            Some(TokenKind::BraceClose) => {
                par.next()?;
                break;
            }
            Some(TokenKind::Function | TokenKind::Constructor | TokenKind::Fallback) => {
                parts.push(ContractPart::Function(parse_function(par)?));
            }
            Some(TokenKind::Event) => parts.push(ContractPart::Event(parse_event(par)?)),
            Some(TokenKind::Modifier) => parts.push(ContractPart::Modifier(parse_modifier(par)?)),
            Some(TokenKind::Struct) => parts.push(ContractPart::Struct(parse_struct(par)?)),
            Some(TokenKind::Enum) => parts.push(ContractPart::Enum(parse_enum(par)?)),
            Some(TokenKind::Mapping | TokenKind::Name) => {
                parts.push(ContractPart::Variable(parse_state_variable(par)?));
            }
            _ => return Err(par.error_here("expected a contract member")),
        }
    }
    Ok(ContractDef { kind, name, parts })
}

/// Parse a state variable declaration:
/// `<type> [visibility] [constant] <name> [= <expr>];`
fn parse_state_variable(par: &mut Parser) -> ParseResult<VariableDecl> {
    let typ = parse_type(par)?;
    let mut visibility = Visibility::default();
    let mut is_constant = false;
    loop {
        match par.peek() {
            Some(TokenKind::Constant) => {
                par.next()?;
                is_constant = true;
            }
            Some(TokenKind::Name) => {
                let is_qualifier = Visibility::parse(par.peek_text().unwrap_or("")).is_some()
                    && matches!(
                        par.peek_at(1),
                        Some(TokenKind::Name | TokenKind::Constant)
                    );
                if is_qualifier {
                    let tok = par.next()?;
                    visibility = Visibility::parse(tok.text).unwrap_or_default();
                } else {
                    break;
                }
            }
            _ => break,
        }
    }
    let name = par.expect_name("state variable declaration")?;
    let value = if par.eat(TokenKind::Eq) {
        Some(super::expressions::parse_expression(par)?)
    } else {
        None
    };
    par.expect(TokenKind::Semi, "state variable declaration")?;
    Ok(VariableDecl {
        typ,
        visibility,
        is_constant,
        name,
        value,
    })
}

fn parse_event(par: &mut Parser) -> ParseResult<EventDef> {
    par.expect(TokenKind::Event, "event definition")?;
    let name = par.expect_name("event definition")?;
    par.expect(TokenKind::ParenOpen, "event definition")?;
    let mut fields = vec![];
    while par.peek() != Some(TokenKind::ParenClose) {
        let typ = parse_type(par)?;
        let is_indexed = par.eat(TokenKind::Indexed);
        let field_name = par.expect_name("event field")?;
        fields.push(EventField {
            typ,
            is_indexed,
            name: field_name,
        });
        if !par.eat(TokenKind::Comma) {
            break;
        }
    }
    par.expect(TokenKind::ParenClose, "event definition")?;
    par.expect(TokenKind::Semi, "event definition")?;
    Ok(EventDef { name, fields })
}

fn parse_modifier(par: &mut Parser) -> ParseResult<ModifierDef> {
    par.expect(TokenKind::Modifier, "modifier definition")?;
    let name = par.expect_name("modifier definition")?;
    let params = if par.peek() == Some(TokenKind::ParenOpen) {
        parse_param_list(par)?
    } else {
        vec![]
    };
    let body = super::functions::parse_block(par)?;
    Ok(ModifierDef { name, params, body })
}

fn parse_struct(par: &mut Parser) -> ParseResult<StructDef> {
    par.expect(TokenKind::Struct, "struct definition")?;
    let name = par.expect_name("struct definition")?;
    par.expect(TokenKind::BraceOpen, "struct definition")?;
    let mut fields = vec![];
    while par.peek() != Some(TokenKind::BraceClose) {
        let typ = parse_type(par)?;
        let field_name = par.expect_name("struct field")?;
        par.expect(TokenKind::Semi, "struct field")?;
        fields.push(StructField {
            typ,
            name: field_name,
        });
    }
    par.expect(TokenKind::BraceClose, "struct definition")?;
    Ok(StructDef { name, fields })
}

fn parse_enum(par: &mut Parser) -> ParseResult<EnumDef> {
    par.expect(TokenKind::Enum, "enum definition")?;
    let name = par.expect_name("enum definition")?;
    par.expect(TokenKind::BraceOpen, "enum definition")?;
    let mut variants = vec![];
    while par.peek() != Some(TokenKind::BraceClose) {
        variants.push(par.expect_name("enum variant")?);
        if !par.eat(TokenKind::Comma) {
            break;
        }
    }
    par.expect(TokenKind::BraceClose, "enum definition")?;
    Ok(EnumDef { name, variants })
}

/// Parse a parenthesized parameter list. Data location keywords are accepted
/// and dropped; the subset doesn't track them.
pub fn parse_param_list(par: &mut Parser) -> ParseResult<Vec<Param>> {
    par.expect(TokenKind::ParenOpen, "parameter list")?;
    let mut params = vec![];
    while par.peek() != Some(TokenKind::ParenClose) {
        let typ = parse_type(par)?;
        while matches!(
            par.peek(),
            Some(TokenKind::Memory | TokenKind::Storage | TokenKind::Calldata)
        ) {
            par.next()?;
        }
        let name = if par.peek() == Some(TokenKind::Name) {
            Some(par.expect_name("parameter")?)
        } else {
            None
        };
        params.push(Param { typ, name });
        if !par.eat(TokenKind::Comma) {
            break;
        }
    }
    par.expect(TokenKind::ParenClose, "parameter list")?;
    Ok(params)
}
