use logos::Logos;

#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub span: Span,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Logos)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum TokenKind {
    /// Produced for any input the lexer can't tokenize.
    Error,

    /// A whole `pragma <name> <requirement>;` directive.
    #[regex(r"pragma[ \t]+[a-zA-Z_]+[^;]*;")]
    PragmaDirective,

    #[regex("[a-zA-Z_$][a-zA-Z0-9_$]*")]
    Name,
    #[regex("[0-9]+")]
    Number,
    #[regex("0[xX][0-9a-fA-F]+")]
    HexNumber,
    #[regex(r#""([^"\\]|\\.)*""#)]
    Text,

    #[token("contract")]
    Contract,
    #[token("interface")]
    Interface,
    #[token("function")]
    Function,
    #[token("constructor")]
    Constructor,
    #[token("fallback")]
    Fallback,
    #[token("event")]
    Event,
    #[token("modifier")]
    Modifier,
    #[token("struct")]
    Struct,
    #[token("enum")]
    Enum,
    #[token("mapping")]
    Mapping,
    #[token("returns")]
    Returns,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("emit")]
    Emit,
    #[token("assembly")]
    Assembly,
    #[token("constant")]
    Constant,
    #[token("indexed")]
    Indexed,
    #[token("memory")]
    Memory,
    #[token("storage")]
    Storage,
    #[token("calldata")]
    Calldata,
    #[token("true")]
    True,
    #[token("false")]
    False,

    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("=>")]
    FatArrow,
    #[token(":=")]
    ColonEq,

    #[token("=")]
    Eq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Not,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
}

pub struct Lexer<'a> {
    inner: logos::Lexer<'a, TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Lexer<'a> {
        Lexer {
            inner: TokenKind::lexer(src),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let kind = self.inner.next()?.unwrap_or(TokenKind::Error);
        let span = self.inner.span();
        Some(Token {
            kind,
            text: self.inner.slice(),
            span: Span {
                start: span.start,
                end: span.end,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Lexer, TokenKind};
    use TokenKind::*;

    fn check(input: &str, expected: &[TokenKind]) {
        let actual = Lexer::new(input).map(|t| t.kind).collect::<Vec<_>>();
        assert!(
            actual.iter().eq(expected.iter()),
            "\nexpected: {expected:?}\n  actual: {actual:?}"
        );
    }

    #[test]
    fn pragma_is_one_token() {
        check("pragma solidity ^0.8.0;", &[PragmaDirective]);
    }

    #[test]
    fn variable_declaration() {
        check(
            "mapping(address => uint256) private balances;",
            &[
                Mapping, ParenOpen, Name, FatArrow, Name, ParenClose, Name, Name, Semi,
            ],
        );
    }

    #[test]
    fn assembly_tokens() {
        check(
            "let ptr := mload(0x40)",
            &[Name, Name, ColonEq, Name, ParenOpen, HexNumber, ParenClose],
        );
    }

    #[test]
    fn operators() {
        check(
            "i++ <= n != m += 1",
            &[Name, PlusPlus, LtEq, Name, NotEq, Name, PlusEq, Number],
        );
    }
}
