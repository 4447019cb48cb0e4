//! Malleable profile DSL - Lexer, Parser, Compiler & Pretty-Printer
//!
//! This crate reads block-structured C2 profiles into a typed [`Profile`]
//! and writes them back out as canonical text.
//!
//! Architecture:
//! ```text
//! Profile source (text)
//!     ↓
//! Lexer (tokens)
//!     ↓
//! Parser (generic tree: set / verb call / group)
//!     ↓
//! Compiler (keyword dispatch + shape checks)
//!     ↓
//! Profile (typed model)
//!     ↓
//! Pretty Printer (canonical text, round-trips to an equal Profile)
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod lexer;
pub mod model;
pub mod parser;
pub mod pretty_printer;
pub mod values;

// Re-export key types for convenience
pub use compiler::{compile, ProfileCompiler};
pub use config::{ConfigError, ParseOptions};
pub use error::*;
pub use lexer::{Lexer, Span, Token, TokenKind};
pub use model::*;
pub use parser::{
    parse_tree, Assignment, DEFAULT_MAX_DEPTH, Entry, FunctionCall, Group, Parser, ProfileAst,
};
pub use pretty_printer::pretty_print;

/// Parse profile text with default options.
pub fn parse(source: &str) -> Result<Profile, ParseError> {
    parse_with_options(source, &ParseOptions::default())
}

/// Parse profile text. Any lex, syntax or shape error aborts the whole parse.
pub fn parse_with_options(source: &str, options: &ParseOptions) -> Result<Profile, ParseError> {
    let ast = parse_tree(source, options.max_depth)?;
    let profile = compile(&ast, options)?;
    tracing::debug!(
        globals = profile.globals.len(),
        http_get = profile.http_get.len(),
        http_post = profile.http_post.len(),
        extensions = profile.extensions.len(),
        "compiled profile"
    );
    Ok(profile)
}
