//! Generic syntax tree
//!
//! The grammar knows nothing about block keywords: every statement is an
//! assignment, a function call or a group. Giving the tree meaning is the
//! job of [`crate::compiler`].

use crate::lexer::Span;
use crate::values::quote;
use std::fmt;

// ============================================================================
// TREE TYPES
// ============================================================================

/// Root of a parsed profile: the top-level entries in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileAst {
    pub entries: Vec<Entry>,
}

/// One statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// `set name "value";`
    Assignment(Assignment),
    /// `verb "arg" "arg";`
    FunctionCall(FunctionCall),
    /// `keyword "name" { ... }`
    Group(Group),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub name: String,
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub verb: String,
    pub args: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Type keyword, e.g. `http-get` or `client`.
    pub kind: String,
    pub name: Option<String>,
    pub entries: Vec<Entry>,
    pub span: Span,
}

impl Entry {
    pub fn span(&self) -> Span {
        match self {
            Entry::Assignment(a) => a.span,
            Entry::FunctionCall(f) => f.span,
            Entry::Group(g) => g.span,
        }
    }
}

impl Group {
    /// Keyword plus quoted name if any, e.g. `http-get "variant"`.
    pub fn header(&self) -> String {
        match &self.name {
            Some(name) => format!("{} {}", self.kind, quote(name)),
            None => self.kind.clone(),
        }
    }
}

// Single-line renderings, used in error messages.

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "set {} {};", self.name, quote(&self.value))
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.verb)?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        f.write_str(";")
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ ... }}", self.header())
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Assignment(a) => a.fmt(f),
            Entry::FunctionCall(c) => c.fmt(f),
            Entry::Group(g) => g.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_display() {
        let call = Entry::FunctionCall(FunctionCall {
            verb: "header".to_string(),
            args: vec!["Host".to_string(), "a \"b\"".to_string()],
            span: Span::default(),
        });
        assert_eq!(call.to_string(), r#"header "Host" "a \"b\"";"#);

        let set = Entry::Assignment(Assignment {
            name: "uri".to_string(),
            value: "/a".to_string(),
            span: Span::default(),
        });
        assert_eq!(set.to_string(), r#"set uri "/a";"#);

        let group = Entry::Group(Group {
            kind: "http-get".to_string(),
            name: Some("v1".to_string()),
            entries: vec![],
            span: Span::default(),
        });
        assert_eq!(group.to_string(), r#"http-get "v1" { ... }"#);
    }
}
