//! Lexer implementation

use super::token::*;
use std::iter::Peekable;
use std::str::CharIndices;

// ============================================================================
// LEXER IMPLEMENTATION
// ============================================================================

/// Lexer for profile source text.
///
/// Comments (`#` to end of line) and whitespace never reach the token
/// stream. Characters that start no token class produce a
/// [`TokenKind::Error`] token; the parser turns the first one into a lex
/// error.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            line: 1,
            column: 1,
            pos: 0,
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    ///
    /// The returned vector always ends with a single [`TokenKind::Eof`].
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tokens
    }

    /// Get the next token from the source.
    fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start_pos = self.pos;
        let start_line = self.line;
        let start_col = self.column;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(c) => match c {
                '{' => {
                    self.advance();
                    TokenKind::LBrace
                }
                '}' => {
                    self.advance();
                    TokenKind::RBrace
                }
                ';' => {
                    self.advance();
                    TokenKind::Semicolon
                }
                ',' => {
                    self.advance();
                    TokenKind::Comma
                }

                '"' => self.scan_string(),

                c if is_ident_char(c) => self.scan_identifier(),

                c => {
                    self.advance();
                    TokenKind::Error(format!("Unexpected character: {}", c))
                }
            },
        };

        Token {
            kind,
            span: Span {
                start: start_pos,
                end: self.pos,
                line: start_line,
                column: start_col,
            },
        }
    }

    /// Scan an identifier. Digits and dashes may lead, e.g. `transform-x86`
    /// or `NtQueueApcThread-s`.
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if is_ident_char(c) {
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::Identifier(self.source[start..self.pos].to_string())
    }

    /// Scan a string literal with escape sequences.
    fn scan_string(&mut self) -> TokenKind {
        self.advance(); // consume opening quote
        let mut value = String::new();

        loop {
            match self.peek_char() {
                None => return TokenKind::Error("Unterminated string".to_string()),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    match self.peek_char() {
                        Some('n') => {
                            self.advance();
                            value.push('\n');
                        }
                        Some('t') => {
                            self.advance();
                            value.push('\t');
                        }
                        Some('\\') => {
                            self.advance();
                            value.push('\\');
                        }
                        Some('"') => {
                            self.advance();
                            value.push('"');
                        }
                        Some('r') => {
                            self.advance();
                            value.push('\r');
                        }
                        Some('x') => {
                            self.advance();
                            match self.scan_hex_escape(2) {
                                Some(c) => value.push(c),
                                None => {
                                    return TokenKind::Error("Invalid \\x escape".to_string())
                                }
                            }
                        }
                        Some('u') => {
                            self.advance();
                            match self.scan_hex_escape(4) {
                                Some(c) => value.push(c),
                                None => {
                                    return TokenKind::Error("Invalid \\u escape".to_string())
                                }
                            }
                        }
                        _ => value.push('\\'),
                    }
                }
                Some('\n') => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                    value.push('\n');
                }
                Some(c) => {
                    self.advance();
                    value.push(c);
                }
            }
        }

        TokenKind::String(value)
    }

    /// Read exactly `digits` hex digits and map them to a char.
    fn scan_hex_escape(&mut self, digits: usize) -> Option<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self.peek_char()?.to_digit(16)?;
            self.advance();
            code = code * 16 + digit;
        }
        char::from_u32(code)
    }

    /// Skip whitespace and comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(' ') | Some('\t') | Some('\r') => {
                    self.advance();
                }
                Some('\n') => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                }
                Some('#') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn advance(&mut self) -> Option<char> {
        if let Some((i, c)) = self.chars.next() {
            self.pos = i + c.len_utf8();
            self.column += 1;
            Some(c)
        } else {
            None
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_lexer_delimiters() {
        assert_eq!(
            kinds("{ } ; ,"),
            vec![
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Semicolon,
                TokenKind::Comma,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_identifiers() {
        let tokens = kinds("set http-get transform-x86 NtQueueApcThread-s 0x1000 get_AAAA");
        assert_eq!(tokens[0], TokenKind::Identifier("set".to_string()));
        assert_eq!(tokens[1], TokenKind::Identifier("http-get".to_string()));
        assert_eq!(tokens[2], TokenKind::Identifier("transform-x86".to_string()));
        assert_eq!(tokens[3], TokenKind::Identifier("NtQueueApcThread-s".to_string()));
        assert_eq!(tokens[4], TokenKind::Identifier("0x1000".to_string()));
        assert_eq!(tokens[5], TokenKind::Identifier("get_AAAA".to_string()));
    }

    #[test]
    fn test_lexer_string_literals() {
        let tokens = kinds(r#""hello" "escaped\"quote" "C:\\Windows" "\x90\x90" "a\qb""#);
        assert_eq!(tokens[0], TokenKind::String("hello".to_string()));
        assert_eq!(tokens[1], TokenKind::String("escaped\"quote".to_string()));
        assert_eq!(tokens[2], TokenKind::String("C:\\Windows".to_string()));
        assert_eq!(tokens[3], TokenKind::String("\u{90}\u{90}".to_string()));
        assert_eq!(tokens[4], TokenKind::String("a\\qb".to_string()));
    }

    #[test]
    fn test_lexer_comments() {
        let tokens = kinds("# leading comment\nset # trailing\n\"v\"; # eof comment");
        assert_eq!(
            tokens,
            vec![
                TokenKind::Identifier("set".to_string()),
                TokenKind::String("v".to_string()),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_hash_inside_string_is_not_comment() {
        let tokens = kinds(r#""ntsvcs##""#);
        assert_eq!(tokens[0], TokenKind::String("ntsvcs##".to_string()));
    }

    #[test]
    fn test_lexer_error_on_invalid_char() {
        let tokens = kinds("set @ x");
        assert!(matches!(tokens[0], TokenKind::Identifier(_)));
        assert!(matches!(tokens[1], TokenKind::Error(_)));
        assert!(matches!(tokens[2], TokenKind::Identifier(_)));
    }

    #[test]
    fn test_lexer_unterminated_string() {
        let tokens = kinds("set x \"open");
        assert_eq!(
            tokens[2],
            TokenKind::Error("Unterminated string".to_string())
        );
    }

    #[test]
    fn test_lexer_unicode_escapes() {
        let tokens = kinds(r#""caf\u00e9" "\u00C9t\u00e9""#);
        assert_eq!(tokens[0], TokenKind::String("café".to_string()));
        assert_eq!(tokens[1], TokenKind::String("Été".to_string()));

        let short = kinds(r#""\u12""#);
        assert_eq!(short[0], TokenKind::Error("Invalid \\u escape".to_string()));

        let surrogate = kinds(r#""\uD800""#);
        assert_eq!(surrogate[0], TokenKind::Error("Invalid \\u escape".to_string()));
    }

    #[test]
    fn test_lexer_bad_hex_escape() {
        let tokens = kinds(r#""\xZZ""#);
        assert!(matches!(tokens[0], TokenKind::Error(_)));
    }

    #[test]
    fn test_lexer_spans() {
        let tokens = Lexer::new("set\n  x \"v\";").tokenize();
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[0].span.column, 1);
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[1].span.column, 3);
        assert_eq!(tokens[2].span.start, 8);
        assert_eq!(tokens[2].span.end, 11);
    }
}
