//! Token definitions for the module dialect.
//!
//! The dialect is layered on top of C, and most of a module body is passed
//! through to the generated source untouched. Tokens therefore keep their
//! verbatim source text, and anything the rules below do not recognize is
//! still a single-character `Symbol` token rather than an error.

use std::fmt;
use std::ops::Range;

use logos::Logos;

/// Token classes produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Runs of spaces, tabs, and newlines. Preserved for passthrough.
    #[regex(r"[ \t\r\n]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[regex(r"/\*[^*]*\*+([^/*][^*]*\*+)*/")]
    BlockComment,

    /// A C preprocessor line, swallowed to end of line.
    #[regex(r"#[^\n]*")]
    Preprocessor,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Identifier,

    /// A double-quoted string literal, escapes included verbatim.
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    QuotedString,

    #[regex(r"'([^'\\\n]|\\.)+'")]
    CharLiteral,

    #[regex(r"[0-9][0-9A-Za-z_.]*")]
    Number,

    /// Any other single character: punctuation, operators, braces.
    #[regex(r".", priority = 0)]
    Symbol,
}

/// A single token with its verbatim source text and byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Range<usize>,
}

impl Token {
    /// True for tokens that carry no syntactic weight (whitespace, comments).
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    /// True when this token is the given single-character symbol.
    pub fn is_symbol(&self, ch: char) -> bool {
        self.kind == TokenKind::Symbol && self.text.chars().next() == Some(ch)
    }
}

/// A 1-based line/column position within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    /// Compute the location of a byte offset within `source`.
    pub fn of(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let mut line = 1;
        let mut column = 1;
        for c in source[..offset].chars() {
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
