//! Parsing state shared by the grammar functions.
//!
//! The grammar itself lives in [`crate::grammar`]. This parser fails fast on
//! the first syntax error; error recovery buys nothing for machine-generated
//! input.

use crate::lexer::{Lexer, Span, Token, TokenKind};
use crate::ParseError;
use smol_str::SmolStr;

pub type ParseResult<T> = Result<T, ParseError>;

pub struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        Parser {
            src,
            tokens: Lexer::new(src).collect(),
            pos: 0,
        }
    }

    pub fn source(&self) -> &'a str {
        self.src
    }

    pub fn peek(&self) -> Option<TokenKind> {
        self.tokens.get(self.pos).map(|tok| tok.kind)
    }

    pub fn peek_at(&self, offset: usize) -> Option<TokenKind> {
        self.tokens.get(self.pos + offset).map(|tok| tok.kind)
    }

    pub fn peek_text(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).map(|tok| tok.text)
    }

    pub fn next(&mut self) -> ParseResult<Token<'a>> {
        let tok = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| self.eof_error())?;
        self.pos += 1;
        Ok(tok)
    }

    /// Consume the next token if it has the given kind.
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, kind: TokenKind, context: &str) -> ParseResult<Token<'a>> {
        match self.peek() {
            Some(found) if found == kind => self.next(),
            Some(_) => {
                let tok = self.tokens[self.pos].clone();
                Err(self.syntax_error(
                    tok.span,
                    format!("expected {kind:?}, found `{}` while parsing {context}", tok.text),
                ))
            }
            None => Err(self.eof_error()),
        }
    }

    pub fn expect_name(&mut self, context: &str) -> ParseResult<SmolStr> {
        Ok(self.expect(TokenKind::Name, context)?.text.into())
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn syntax_error(&self, span: Span, message: String) -> ParseError {
        ParseError::Syntax {
            line: line_of(self.src, span.start),
            message,
        }
    }

    pub fn error_here(&self, message: impl Into<String>) -> ParseError {
        let span = self
            .tokens
            .get(self.pos)
            .map(|tok| tok.span)
            .unwrap_or(Span {
                start: self.src.len(),
                end: self.src.len(),
            });
        self.syntax_error(span, message.into())
    }

    fn eof_error(&self) -> ParseError {
        ParseError::Syntax {
            line: line_of(self.src, self.src.len()),
            message: "unexpected end of file".into(),
        }
    }
}

fn line_of(src: &str, offset: usize) -> usize {
    src[..offset.min(src.len())].matches('\n').count() + 1
}
