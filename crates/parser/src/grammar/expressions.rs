use super::types::is_elementary;
use crate::ast::{AssignOp, BinOp, Expr, UnaryOp};
use crate::lexer::TokenKind;
use crate::parser::{ParseResult, Parser};

/// Parse an expression via precedence climbing, assignment binding loosest.
pub fn parse_expression(par: &mut Parser) -> ParseResult<Expr> {
    parse_assign(par)
}

/// Parse a parenthesized, comma-separated argument list.
pub fn parse_call_args(par: &mut Parser) -> ParseResult<Vec<Expr>> {
    par.expect(TokenKind::ParenOpen, "argument list")?;
    let mut args = vec![];
    while par.peek() != Some(TokenKind::ParenClose) {
        args.push(parse_expression(par)?);
        if !par.eat(TokenKind::Comma) {
            break;
        }
    }
    par.expect(TokenKind::ParenClose, "argument list")?;
    Ok(args)
}

fn parse_assign(par: &mut Parser) -> ParseResult<Expr> {
    let target = parse_or(par)?;
    let op = match par.peek() {
        Some(TokenKind::Eq) => AssignOp::Assign,
        Some(TokenKind::PlusEq) => AssignOp::AddAssign,
        Some(TokenKind::MinusEq) => AssignOp::SubAssign,
        _ => return Ok(target),
    };
    par.next()?;
    // right-associative
    let value = parse_assign(par)?;
    Ok(Expr::Assign {
        target: Box::new(target),
        op,
        value: Box::new(value),
    })
}

macro_rules! binary_level {
    ($name:ident, $next:ident, { $($kind:ident => $op:ident),+ $(,)? }) => {
        fn $name(par: &mut Parser) -> ParseResult<Expr> {
            let mut left = $next(par)?;
            loop {
                let op = match par.peek() {
                    $(Some(TokenKind::$kind) => BinOp::$op,)+
                    _ => break,
                };
                par.next()?;
                let right = $next(par)?;
                left = Expr::Binary {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                };
            }
            Ok(left)
        }
    };
}

binary_level!(parse_or, parse_and, { PipePipe => Or });
binary_level!(parse_and, parse_equality, { AmpAmp => And });
binary_level!(parse_equality, parse_comparison, { EqEq => Eq, NotEq => Ne });
binary_level!(parse_comparison, parse_additive, {
    Lt => Lt,
    LtEq => Le,
    Gt => Gt,
    GtEq => Ge,
});
binary_level!(parse_additive, parse_multiplicative, { Plus => Add, Minus => Sub });
binary_level!(parse_multiplicative, parse_unary, {
    Star => Mul,
    Slash => Div,
    Percent => Mod,
});

fn parse_unary(par: &mut Parser) -> ParseResult<Expr> {
    let op = match par.peek() {
        Some(TokenKind::Not) => Some(UnaryOp::Not),
        Some(TokenKind::Minus) => Some(UnaryOp::Neg),
        Some(TokenKind::PlusPlus) => Some(UnaryOp::Inc),
        Some(TokenKind::MinusMinus) => Some(UnaryOp::Dec),
        _ => None,
    };
    if let Some(op) = op {
        par.next()?;
        let operand = parse_unary(par)?;
        return Ok(Expr::Unary {
            op,
            is_prefix: true,
            operand: Box::new(operand),
        });
    }
    parse_postfix(par)
}

fn parse_postfix(par: &mut Parser) -> ParseResult<Expr> {
    let mut expr = parse_primary(par)?;
    loop {
        match par.peek() {
            Some(TokenKind::ParenOpen) => {
                let args = parse_call_args(par)?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                };
            }
            Some(TokenKind::BracketOpen) => {
                par.next()?;
                let index = parse_expression(par)?;
                par.expect(TokenKind::BracketClose, "index expression")?;
                expr = Expr::Index {
                    base: Box::new(expr),
                    index: Box::new(index),
                };
            }
            Some(TokenKind::Dot) => {
                par.next()?;
                let member = par.expect_name("member access")?;
                expr = Expr::Member {
                    value: Box::new(expr),
                    member,
                };
            }
            // `{value: ..}` options are only legal on the low-level call
            // members; anywhere else a `{` opens a block, not an option list.
            Some(TokenKind::BraceOpen) if at_call_options(&expr) => {
                par.next()?;
                let mut options = vec![];
                while par.peek() != Some(TokenKind::BraceClose) {
                    let name = par.expect_name("call option")?;
                    par.expect(TokenKind::Colon, "call option")?;
                    options.push((name, parse_expression(par)?));
                    if !par.eat(TokenKind::Comma) {
                        break;
                    }
                }
                par.expect(TokenKind::BraceClose, "call option list")?;
                let args = parse_call_args(par)?;
                expr = Expr::CallWithOptions {
                    func: Box::new(expr),
                    options,
                    args,
                };
            }
            Some(TokenKind::PlusPlus) => {
                par.next()?;
                expr = Expr::Unary {
                    op: UnaryOp::Inc,
                    is_prefix: false,
                    operand: Box::new(expr),
                };
            }
            Some(TokenKind::MinusMinus) => {
                par.next()?;
                expr = Expr::Unary {
                    op: UnaryOp::Dec,
                    is_prefix: false,
                    operand: Box::new(expr),
                };
            }
            _ => break,
        }
    }
    Ok(expr)
}

fn at_call_options(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Member { member, .. }
            if matches!(member.as_str(), "call" | "delegatecall" | "staticcall")
    )
}

fn parse_primary(par: &mut Parser) -> ParseResult<Expr> {
    match par.peek() {
        Some(TokenKind::Number) => Ok(Expr::Number(par.next()?.text.into())),
        Some(TokenKind::HexNumber) => Ok(Expr::HexNumber(par.next()?.text.into())),
        Some(TokenKind::Text) => {
            let text = par.next()?.text;
            Ok(Expr::Str(text[1..text.len() - 1].into()))
        }
        Some(TokenKind::True) => {
            par.next()?;
            Ok(Expr::Bool(true))
        }
        Some(TokenKind::False) => {
            par.next()?;
            Ok(Expr::Bool(false))
        }
        Some(TokenKind::Name) => {
            let name = par.next()?.text;
            if is_elementary(name) {
                Ok(Expr::ElementaryType(name.into()))
            } else {
                Ok(Expr::Ident(name.into()))
            }
        }
        Some(TokenKind::ParenOpen) => {
            par.next()?;
            let mut elts = vec![parse_expression(par)?];
            while par.eat(TokenKind::Comma) {
                elts.push(parse_expression(par)?);
            }
            par.expect(TokenKind::ParenClose, "parenthesized expression")?;
            if elts.len() == 1 {
                Ok(elts.pop().unwrap())
            } else {
                Ok(Expr::Tuple(elts))
            }
        }
        _ => Err(par.error_here("expected an expression")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AssignOp, BinOp, Expr};
    use crate::parser::Parser;

    fn expr(src: &str) -> Expr {
        let mut par = Parser::new(src);
        let expr = parse_expression(&mut par).expect("expression should parse");
        assert!(par.at_end(), "trailing input after expression");
        expr
    }

    #[test]
    fn precedence() {
        assert_eq!(
            expr("a + b * c"),
            Expr::Binary {
                left: Box::new(Expr::ident("a")),
                op: BinOp::Add,
                right: Box::new(Expr::Binary {
                    left: Box::new(Expr::ident("b")),
                    op: BinOp::Mul,
                    right: Box::new(Expr::ident("c")),
                }),
            }
        );
    }

    #[test]
    fn mapping_assignment() {
        assert_eq!(
            expr("balances[msg.sender] += amount"),
            Expr::Assign {
                target: Box::new(Expr::index(
                    Expr::ident("balances"),
                    Expr::member(Expr::ident("msg"), "sender"),
                )),
                op: AssignOp::AddAssign,
                value: Box::new(Expr::ident("amount")),
            }
        );
    }

    #[test]
    fn call_with_options() {
        let parsed = expr("target.delegatecall{value: msg.value}(msg.data)");
        match parsed {
            Expr::CallWithOptions { options, args, .. } => {
                assert_eq!(options.len(), 1);
                assert_eq!(options[0].0, "value");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected call with options, got {other:?}"),
        }
    }

    #[test]
    fn elementary_type_cast() {
        assert_eq!(
            expr("address(0)"),
            Expr::call(Expr::ElementaryType("address".into()), vec![Expr::number("0")]),
        );
    }
}
