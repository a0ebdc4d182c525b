//! Tokenizer for the modc module dialect.
//!
//! Produces a flat token stream over a `.module.c` source. The grammar layer
//! in `modc-compiler` dispatches on dialect keywords and passes everything
//! else through verbatim, so tokens keep their exact source text.

mod token;

use logos::Logos;
use thiserror::Error;

pub use token::{Location, Token, TokenKind};

/// Failure to tokenize the input.
#[derive(Debug, Clone, Error)]
#[error("unrecognized input at {location}")]
pub struct LexError {
    pub offset: usize,
    pub location: Location,
}

/// Tokenize an entire source file.
pub fn lex(source: &str) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    for (result, span) in TokenKind::lexer(source).spanned() {
        match result {
            Ok(kind) => tokens.push(Token {
                kind,
                text: source[span.clone()].to_string(),
                span,
            }),
            Err(()) => {
                return Err(LexError {
                    offset: span.start,
                    location: Location::of(source, span.start),
                })
            }
        }
    }
    Ok(tokens)
}

/// Decode a quoted string literal into its runtime value.
///
/// Accepts the token text with surrounding quotes and processes the usual C
/// escapes. An unknown escape keeps the escaped character as-is.
pub fn unquote(quoted: &str) -> String {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(quoted);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
