use super::contracts::parse_param_list;
use super::expressions::{parse_call_args, parse_expression};
use super::types::{at_type_start, parse_type};
use crate::ast::{FunctionDef, FunctionKind, Mutability, Stmt, Visibility};
use crate::lexer::TokenKind;
use crate::parser::{ParseResult, Parser};

/// Parse a function, constructor, or fallback definition.
pub fn parse_function(par: &mut Parser) -> ParseResult<FunctionDef> {
    let (kind, name) = match par.peek() {
        Some(TokenKind::Function) => {
            par.next()?;
            if par.peek() == Some(TokenKind::ParenOpen) {
                (FunctionKind::OldStyleFallback, None)
            } else {
                (
                    FunctionKind::Function,
                    Some(par.expect_name("function definition")?),
                )
            }
        }
        Some(TokenKind::Constructor) => {
            par.next()?;
            (FunctionKind::Constructor, None)
        }
        Some(TokenKind::Fallback) => {
            par.next()?;
            (FunctionKind::Fallback, None)
        }
        _ => return Err(par.error_here("expected a function definition")),
    };

    let params = parse_param_list(par)?;

    let mut visibility = None;
    let mut mutability = None;
    let mut modifiers = vec![];
    let mut returns = vec![];
    loop {
        match par.peek() {
            Some(TokenKind::Name) => {
                let text = par.peek_text().unwrap_or("");
                if let Some(vis) = Visibility::parse(text) {
                    par.next()?;
                    visibility = Some(vis);
                } else if let Some(mutbl) = Mutability::parse(text) {
                    par.next()?;
                    mutability = Some(mutbl);
                } else {
                    modifiers.push(par.expect_name("function modifier")?);
                    // modifier invocations may carry arguments; drop them
                    if par.peek() == Some(TokenKind::ParenOpen) {
                        parse_call_args(par)?;
                    }
                }
            }
            Some(TokenKind::Returns) => {
                par.next()?;
                returns = parse_param_list(par)?;
            }
            Some(TokenKind::BraceOpen | TokenKind::Semi) => break,
            _ => return Err(par.error_here("expected function body or qualifier")),
        }
    }

    let body = if par.eat(TokenKind::Semi) {
        None
    } else {
        Some(parse_block(par)?)
    };

    Ok(FunctionDef {
        kind,
        name,
        params,
        visibility,
        mutability,
        modifiers,
        returns,
        body,
    })
}

/// Parse a `{ ... }` statement block.
pub fn parse_block(par: &mut Parser) -> ParseResult<Vec<Stmt>> {
    par.expect(TokenKind::BraceOpen, "block")?;
    let mut stmts = vec![];
    while !par.eat(TokenKind::BraceClose) {
        stmts.push(parse_stmt(par)?);
    }
    Ok(stmts)
}

pub fn parse_stmt(par: &mut Parser) -> ParseResult<Stmt> {
    match par.peek() {
        Some(TokenKind::Return) => {
            par.next()?;
            let value = if par.peek() == Some(TokenKind::Semi) {
                None
            } else {
                Some(parse_expression(par)?)
            };
            par.expect(TokenKind::Semi, "return statement")?;
            Ok(Stmt::Return(value))
        }
        Some(TokenKind::If) => parse_if(par),
        Some(TokenKind::For) => parse_for(par),
        Some(TokenKind::Emit) => {
            par.next()?;
            let event = par.expect_name("emit statement")?;
            let args = parse_call_args(par)?;
            par.expect(TokenKind::Semi, "emit statement")?;
            Ok(Stmt::Emit { event, args })
        }
        Some(TokenKind::Assembly) => parse_assembly(par),
        Some(TokenKind::ParenOpen) if at_destructure(par) => parse_destructure(par),
        Some(TokenKind::Mapping) => parse_local_decl(par),
        Some(TokenKind::Name) if at_type_start(par) => parse_local_decl(par),
        Some(_) => {
            let value = parse_expression(par)?;
            par.expect(TokenKind::Semi, "expression statement")?;
            Ok(Stmt::Expr(value))
        }
        None => Err(par.error_here("expected a statement")),
    }
}

fn parse_if(par: &mut Parser) -> ParseResult<Stmt> {
    par.expect(TokenKind::If, "if statement")?;
    par.expect(TokenKind::ParenOpen, "if statement")?;
    let condition = parse_expression(par)?;
    par.expect(TokenKind::ParenClose, "if statement")?;
    let body = parse_block(par)?;
    let or_else = if par.eat(TokenKind::Else) {
        if par.peek() == Some(TokenKind::If) {
            vec![parse_if(par)?]
        } else {
            parse_block(par)?
        }
    } else {
        vec![]
    };
    Ok(Stmt::If {
        condition,
        body,
        or_else,
    })
}

fn parse_for(par: &mut Parser) -> ParseResult<Stmt> {
    par.expect(TokenKind::For, "for statement")?;
    par.expect(TokenKind::ParenOpen, "for statement")?;
    let init = if par.eat(TokenKind::Semi) {
        None
    } else {
        // the init statement consumes its own `;`
        Some(Box::new(parse_stmt(par)?))
    };
    let condition = if par.peek() == Some(TokenKind::Semi) {
        None
    } else {
        Some(parse_expression(par)?)
    };
    par.expect(TokenKind::Semi, "for statement")?;
    let step = if par.peek() == Some(TokenKind::ParenClose) {
        None
    } else {
        Some(parse_expression(par)?)
    };
    par.expect(TokenKind::ParenClose, "for statement")?;
    let body = parse_block(par)?;
    Ok(Stmt::For {
        init,
        condition,
        step,
        body,
    })
}

/// Capture an inline assembly block verbatim, tracking brace depth so that
/// `switch`/`case` sub-blocks stay inside.
fn parse_assembly(par: &mut Parser) -> ParseResult<Stmt> {
    par.expect(TokenKind::Assembly, "assembly block")?;
    let open = par.expect(TokenKind::BraceOpen, "assembly block")?;
    let start = open.span.end;
    let mut depth = 1usize;
    let end;
    loop {
        let tok = par.next()?;
        match tok.kind {
            TokenKind::BraceOpen => depth += 1,
            TokenKind::BraceClose => {
                depth -= 1;
                if depth == 0 {
                    end = tok.span.start;
                    break;
                }
            }
            _ => {}
        }
    }
    let body = par.source()[start..end].trim().to_string();
    Ok(Stmt::InlineAssembly(body))
}

fn parse_local_decl(par: &mut Parser) -> ParseResult<Stmt> {
    let typ = parse_type(par)?;
    while matches!(
        par.peek(),
        Some(TokenKind::Memory | TokenKind::Storage | TokenKind::Calldata)
    ) {
        par.next()?;
    }
    let name = par.expect_name("variable declaration")?;
    let value = if par.eat(TokenKind::Eq) {
        Some(parse_expression(par)?)
    } else {
        None
    };
    par.expect(TokenKind::Semi, "variable declaration")?;
    Ok(Stmt::VarDecl { typ, name, value })
}

/// `(` directly followed by a typed component means a destructuring
/// declaration such as `(bool success, ) = target.call(..);`.
fn at_destructure(par: &Parser) -> bool {
    matches!(par.peek_at(1), Some(TokenKind::Name | TokenKind::Mapping))
        && matches!(par.peek_at(2), Some(TokenKind::Name))
}

fn parse_destructure(par: &mut Parser) -> ParseResult<Stmt> {
    par.expect(TokenKind::ParenOpen, "destructuring declaration")?;
    let mut components = vec![];
    loop {
        match par.peek() {
            Some(TokenKind::ParenClose) => break,
            Some(TokenKind::Comma) => {
                par.next()?;
                components.push(None);
            }
            _ => {
                let typ = parse_type(par)?;
                while matches!(
                    par.peek(),
                    Some(TokenKind::Memory | TokenKind::Storage | TokenKind::Calldata)
                ) {
                    par.next()?;
                }
                let name = par.expect_name("destructuring component")?;
                components.push(Some((typ, name)));
                if !par.eat(TokenKind::Comma) {
                    break;
                }
                // a trailing comma before `)` leaves an empty component
                if par.peek() == Some(TokenKind::ParenClose) {
                    components.push(None);
                }
            }
        }
    }
    par.expect(TokenKind::ParenClose, "destructuring declaration")?;
    par.expect(TokenKind::Eq, "destructuring declaration")?;
    let value = parse_expression(par)?;
    par.expect(TokenKind::Semi, "destructuring declaration")?;
    Ok(Stmt::DestructureDecl { components, value })
}
