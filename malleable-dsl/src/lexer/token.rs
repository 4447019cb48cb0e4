//! Lexer token types

use std::fmt;

// ============================================================================
// LEXER TYPES
// ============================================================================

/// Token kinds for the profile language.
///
/// The language has no reserved words: `set`, block keywords and verbs are
/// all plain identifiers and are told apart by the grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Delimiters
    LBrace,
    RBrace,
    Semicolon,
    Comma,

    // Literals
    /// Bare identifier, `[A-Za-z0-9_-]+`.
    Identifier(String),
    /// Quoted string with escapes already resolved.
    String(String),

    // Special
    Eof,
    Error(String),
}

impl TokenKind {
    /// Short human-readable description used in syntax errors.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::LBrace => "'{'".to_string(),
            TokenKind::RBrace => "'}'".to_string(),
            TokenKind::Semicolon => "';'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Identifier(name) => format!("identifier `{}`", name),
            TokenKind::String(_) => "string".to_string(),
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Error(msg) => format!("invalid token ({})", msg),
        }
    }
}

/// Source location span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Default for Span {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A token with its kind and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}
