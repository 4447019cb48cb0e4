//! Parser implementation
//!
//! Recursive descent over the token stream, producing the generic tree:
//!
//! ```text
//! SETVAR   := "set" Ident String ";"
//! FUNCTION := Ident String* ";"
//! GROUP    := Ident String? "{" Entry* "}"
//! Entry    := SETVAR | FUNCTION | GROUP
//! ```

use super::ast::*;
use crate::error::ParseError;
use crate::lexer::*;

// ============================================================================
// PARSER
// ============================================================================

/// Group nesting limit used when no explicit limit is given.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Parser for the generic profile grammar.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    /// Create a new parser from a vector of tokens.
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| &t.kind) != Some(&TokenKind::Eof) {
            let span = tokens
                .last()
                .map(|t| Span {
                    start: t.span.end,
                    end: t.span.end,
                    line: t.span.line,
                    column: t.span.column,
                })
                .unwrap_or_default();
            tokens.push(Token {
                kind: TokenKind::Eof,
                span,
            });
        }
        Self {
            tokens,
            pos: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Limit group nesting. `None` falls back to [`DEFAULT_MAX_DEPTH`].
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
        self
    }

    /// Parse the tokens into a tree.
    pub fn parse(&mut self) -> Result<ProfileAst, ParseError> {
        if let Some(token) = self
            .tokens
            .iter()
            .find(|t| matches!(t.kind, TokenKind::Error(_)))
        {
            let message = match &token.kind {
                TokenKind::Error(msg) => msg.clone(),
                _ => "Lexer error".to_string(),
            };
            return Err(ParseError::Lex {
                message,
                line: token.span.line,
                column: token.span.column,
            });
        }

        let entries = self.parse_entries()?;

        if !self.is_at_end() {
            return Err(self.error("Unexpected '}' without a matching '{'"));
        }

        Ok(ProfileAst { entries })
    }

    /// Parse entries until `}` or end of input, leaving either unconsumed.
    fn parse_entries(&mut self) -> Result<Vec<Entry>, ParseError> {
        let mut entries = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            entries.push(self.parse_entry()?);
        }
        Ok(entries)
    }

    fn parse_entry(&mut self) -> Result<Entry, ParseError> {
        let word = match &self.current().kind {
            TokenKind::Identifier(s) => s.clone(),
            other => {
                return Err(self.error(&format!(
                    "Expected 'set', a function or a block, found {}",
                    other.describe()
                )))
            }
        };

        if word == "set" && matches!(self.peek(1).kind, TokenKind::Identifier(_)) {
            return self.parse_assignment().map(Entry::Assignment);
        }

        // An optional quoted name sits between the keyword and `{`.
        let opens_group = match (&self.peek(1).kind, &self.peek(2).kind) {
            (TokenKind::LBrace, _) => true,
            (TokenKind::String(_), TokenKind::LBrace) => true,
            _ => false,
        };

        if opens_group {
            self.parse_group().map(Entry::Group)
        } else {
            self.parse_function().map(Entry::FunctionCall)
        }
    }

    /// Parse `set name "value";`.
    fn parse_assignment(&mut self) -> Result<Assignment, ParseError> {
        let span = self.current().span;
        self.advance(); // set
        let name = self.expect_identifier()?;
        let value = self.expect_string()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Assignment { name, value, span })
    }

    /// Parse `verb "arg"* ;`.
    fn parse_function(&mut self) -> Result<FunctionCall, ParseError> {
        let span = self.current().span;
        let verb = self.expect_identifier()?;

        let mut args = Vec::new();
        while let TokenKind::String(s) = &self.current().kind {
            args.push(s.clone());
            self.advance();
        }

        if !self.check(&TokenKind::Semicolon) {
            return Err(self.error(&format!(
                "Expected ';' after `{}`, found {}",
                verb,
                self.current().kind.describe()
            )));
        }
        self.advance();

        Ok(FunctionCall { verb, args, span })
    }

    /// Parse `keyword "name"? { entries }`.
    fn parse_group(&mut self) -> Result<Group, ParseError> {
        let span = self.current().span;
        let kind = self.expect_identifier()?;

        let name = match &self.current().kind {
            TokenKind::String(s) => {
                let s = s.clone();
                self.advance();
                Some(s)
            }
            _ => None,
        };

        self.expect(TokenKind::LBrace)?;

        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ParseError::Syntax {
                message: format!(
                    "Block `{}` exceeds the maximum nesting depth of {}",
                    kind, self.max_depth
                ),
                line: span.line,
                column: span.column,
            });
        }

        let entries = self.parse_entries()?;

        if self.is_at_end() {
            return Err(self.error(&format!(
                "Unclosed block `{}` opened at {}",
                kind, span
            )));
        }
        self.advance(); // }
        self.depth -= 1;

        Ok(Group {
            kind,
            name,
            entries,
            span,
        })
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn current(&self) -> &Token {
        self.peek(0)
    }

    /// Token `offset` positions ahead, clamped to the trailing Eof.
    fn peek(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.current().kind == TokenKind::Eof
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current().kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), ParseError> {
        if self.check(&kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(&format!(
                "Expected {}, found {}",
                kind.describe(),
                self.current().kind.describe()
            )))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Identifier(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            other => Err(self.error(&format!("Expected identifier, found {}", other.describe()))),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::String(s) => {
                let s = s.clone();
                self.advance();
                Ok(s)
            }
            other => Err(self.error(&format!("Expected string, found {}", other.describe()))),
        }
    }

    fn error(&self, msg: &str) -> ParseError {
        let span = self.current().span;
        ParseError::Syntax {
            message: msg.to_string(),
            line: span.line,
            column: span.column,
        }
    }
}

// ============================================================================
// CONVENIENCE FUNCTIONS
// ============================================================================

/// Lex and parse source text into the generic tree.
pub fn parse_tree(source: &str, max_depth: Option<usize>) -> Result<ProfileAst, ParseError> {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize();
    let token_count = tokens.len();
    let mut parser = Parser::new(tokens).with_max_depth(max_depth);
    let ast = parser.parse()?;
    tracing::debug!(
        tokens = token_count,
        entries = ast.entries.len(),
        "parsed profile tree"
    );
    Ok(ast)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(source: &str) -> Result<ProfileAst, ParseError> {
        parse_tree(source, None)
    }

    fn test_parse_error(message: &str) -> ParseError {
        ParseError::Syntax {
            message: message.to_string(),
            line: 0,
            column: 0,
        }
    }

    #[test]
    fn test_parse_empty() -> Result<(), ParseError> {
        assert!(tree("")?.entries.is_empty());
        assert!(tree("  # only a comment\n")?.entries.is_empty());
        Ok(())
    }

    #[test]
    fn test_parse_assignment() -> Result<(), ParseError> {
        let ast = tree(r#"set sleeptime "37500";"#)?;
        match &ast.entries[0] {
            Entry::Assignment(a) => {
                assert_eq!(a.name, "sleeptime");
                assert_eq!(a.value, "37500");
            }
            _ => return Err(test_parse_error("Expected assignment")),
        }
        Ok(())
    }

    #[test]
    fn test_parse_function_arities() -> Result<(), ParseError> {
        let ast = tree(r#"print; append "x"; header "a" "b"; strrep "c" "" ;"#)?;
        let calls: Vec<(String, usize)> = ast
            .entries
            .iter()
            .filter_map(|e| match e {
                Entry::FunctionCall(f) => Some((f.verb.clone(), f.args.len())),
                _ => None,
            })
            .collect();
        assert_eq!(
            calls,
            vec![
                ("print".to_string(), 0),
                ("append".to_string(), 1),
                ("header".to_string(), 2),
                ("strrep".to_string(), 2),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_set_with_string_is_a_function() -> Result<(), ParseError> {
        let ast = tree(r#"set "x";"#)?;
        assert!(matches!(&ast.entries[0], Entry::FunctionCall(f) if f.verb == "set"));
        Ok(())
    }

    #[test]
    fn test_parse_named_and_unnamed_groups() -> Result<(), ParseError> {
        let ast = tree(
            r#"
            http-get { set uri "/a"; }
            http-get "variant" { client { metadata { base64; } } }
            "#,
        )?;
        let groups: Vec<&Group> = ast
            .entries
            .iter()
            .filter_map(|e| match e {
                Entry::Group(g) => Some(g),
                _ => None,
            })
            .collect();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].kind, "http-get");
        assert_eq!(groups[0].name, None);
        assert_eq!(groups[1].name.as_deref(), Some("variant"));

        let client = match &groups[1].entries[0] {
            Entry::Group(g) => g,
            _ => return Err(test_parse_error("Expected client group")),
        };
        assert_eq!(client.kind, "client");
        assert!(matches!(&client.entries[0], Entry::Group(g) if g.kind == "metadata"));
        Ok(())
    }

    #[test]
    fn test_parse_empty_group() -> Result<(), ParseError> {
        let ast = tree("post-ex { }")?;
        assert!(matches!(&ast.entries[0], Entry::Group(g) if g.entries.is_empty()));
        Ok(())
    }

    #[test]
    fn test_grammar_is_keyword_agnostic() -> Result<(), ParseError> {
        // Unknown keywords are the transformer's problem, not the grammar's.
        let ast = tree(r#"bogus-block { set x "1"; }"#)?;
        assert!(matches!(&ast.entries[0], Entry::Group(g) if g.kind == "bogus-block"));
        Ok(())
    }

    #[test]
    fn test_unclosed_group_is_fatal() {
        let err = tree("stage {\n set userwx \"false\";\n").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
        assert!(err.to_string().contains("Unclosed block `stage`"));
    }

    #[test]
    fn test_stray_closing_brace() {
        let err = tree(r#"set a "b"; }"#).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 1, column: 12, .. }));
    }

    #[test]
    fn test_missing_semicolon() {
        let err = tree("set a \"b\"\nset c \"d\";").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 2, column: 1, .. }));
    }

    #[test]
    fn test_two_names_before_brace() {
        let err = tree(r#"http-get "a" "b" { }"#).unwrap_err();
        assert!(err.to_string().contains("Expected ';' after `http-get`"));
    }

    #[test]
    fn test_comma_is_not_valid_here() {
        assert!(tree(r#"header "a", "b";"#).is_err());
    }

    #[test]
    fn test_lex_error_reported_first() {
        let err = tree("set a \"b\";\n  @").unwrap_err();
        assert_eq!(
            err,
            ParseError::Lex {
                message: "Unexpected character: @".to_string(),
                line: 2,
                column: 3,
            }
        );
    }

    #[test]
    fn test_max_depth() -> Result<(), ParseError> {
        let source = "a { b { c { } } }";
        assert!(parse_tree(source, Some(3)).is_ok());
        let err = parse_tree(source, Some(2)).unwrap_err();
        assert!(err.to_string().contains("maximum nesting depth of 2"));
        tree(source)?;
        Ok(())
    }

    #[test]
    fn test_default_depth_limit() {
        let nested = |depth: usize| format!("{}{}", "a { ".repeat(depth), "} ".repeat(depth));
        assert!(parse_tree(&nested(DEFAULT_MAX_DEPTH), None).is_ok());
        let err = parse_tree(&nested(DEFAULT_MAX_DEPTH + 1), None).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { line: 1, .. }));
        assert!(err.to_string().contains("maximum nesting depth of 256"));
    }

    #[test]
    fn test_parser_without_eof_token() -> Result<(), ParseError> {
        let mut parser = Parser::new(vec![]);
        assert!(parser.parse()?.entries.is_empty());
        Ok(())
    }

    #[test]
    fn test_spans_recorded() -> Result<(), ParseError> {
        let ast = tree("\n\n  http-get {\n    print;\n  }")?;
        let group = match &ast.entries[0] {
            Entry::Group(g) => g,
            _ => return Err(test_parse_error("Expected group")),
        };
        assert_eq!((group.span.line, group.span.column), (3, 3));
        assert_eq!(group.entries[0].span().line, 4);
        Ok(())
    }
}
