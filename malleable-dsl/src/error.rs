//! Error taxonomy
//!
//! Every stage aborts on its first error; there is no partial result.

use thiserror::Error;

// ============================================================================
// PARSE ERRORS
// ============================================================================

/// The single failure value returned by [`crate::parse`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    /// No token class matched the input at this position.
    #[error("lex error at line {line}, column {column}: {message}")]
    Lex {
        message: String,
        line: usize,
        column: usize,
    },

    /// The token stream matched no grammar alternative.
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    /// The tree is well formed but violates a block's shape.
    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

impl ParseError {
    pub fn line(&self) -> usize {
        match self {
            ParseError::Lex { line, .. } | ParseError::Syntax { line, .. } => *line,
            ParseError::Semantic(err) => err.line(),
        }
    }

    pub fn column(&self) -> usize {
        match self {
            ParseError::Lex { column, .. } | ParseError::Syntax { column, .. } => *column,
            ParseError::Semantic(err) => err.column(),
        }
    }
}

// ============================================================================
// SEMANTIC ERRORS
// ============================================================================

/// Shape violations found while building the typed profile.
///
/// `context` names the enclosing block, e.g. `profile`, `http-get "v2"` or
/// `client`.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SemanticError {
    #[error("unknown block `{block}` in {context} at line {line}, column {column}")]
    UnknownBlock {
        block: String,
        context: String,
        line: usize,
        column: usize,
    },

    #[error("unknown entry `{entry}` in {context} at line {line}, column {column}")]
    UnknownEntry {
        entry: String,
        context: String,
        line: usize,
        column: usize,
    },

    #[error(
        "{verb}: bad params, expected {expected} argument(s) but got {found} in `{entry}` at line {line}, column {column}"
    )]
    BadParams {
        verb: String,
        expected: usize,
        found: usize,
        entry: String,
        line: usize,
        column: usize,
    },

    #[error("duplicate block `{block}` in {context} at line {line}, column {column}")]
    DuplicateBlock {
        block: String,
        context: String,
        line: usize,
        column: usize,
    },
}

impl SemanticError {
    pub fn line(&self) -> usize {
        match self {
            SemanticError::UnknownBlock { line, .. }
            | SemanticError::UnknownEntry { line, .. }
            | SemanticError::BadParams { line, .. }
            | SemanticError::DuplicateBlock { line, .. } => *line,
        }
    }

    pub fn column(&self) -> usize {
        match self {
            SemanticError::UnknownBlock { column, .. }
            | SemanticError::UnknownEntry { column, .. }
            | SemanticError::BadParams { column, .. }
            | SemanticError::DuplicateBlock { column, .. } => *column,
        }
    }
}

pub type SemanticResult<T> = Result<T, SemanticError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_error_positions_pass_through() {
        let err = ParseError::from(SemanticError::UnknownBlock {
            block: "bogus".to_string(),
            context: "profile".to_string(),
            line: 4,
            column: 2,
        });
        assert_eq!(err.line(), 4);
        assert_eq!(err.column(), 2);
        assert_eq!(
            err.to_string(),
            "unknown block `bogus` in profile at line 4, column 2"
        );
    }

    #[test]
    fn test_bad_params_message_names_verb_and_arity() {
        let err = SemanticError::BadParams {
            verb: "header".to_string(),
            expected: 2,
            found: 1,
            entry: "header \"Host\";".to_string(),
            line: 1,
            column: 1,
        };
        let message = err.to_string();
        assert!(message.starts_with("header: bad params"));
        assert!(message.contains("got 1"));
    }
}
