//! Value helpers shared by the model accessors and the printer.
//!
//! Every setting in a profile is stored as the raw string found between the
//! quotes. These helpers interpret the common shapes (booleans, comma and
//! space separated lists) and produce string literals the lexer reads back
//! unchanged.

use std::fmt::Write;

/// Parse a boolean setting such as `set host_stage "false";`.
///
/// Accepts `true`/`false` in any case, surrounding whitespace ignored.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Split a comma separated list, e.g. `curl*,lynx*,wget*`.
pub fn split_comma_list(value: &str) -> Vec<String> {
    if value.trim().is_empty() {
        return Vec::new();
    }
    value.split(',').map(|item| item.trim().to_string()).collect()
}

pub fn join_comma_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| item.as_ref())
        .collect::<Vec<_>>()
        .join(",")
}

/// Split a space separated list, e.g. `/jquery-3.3.1.min.js /admin`.
///
/// Runs of whitespace count as one separator.
pub fn split_space_list(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

pub fn join_space_list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(|item| item.as_ref())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape a string so the scanner reads it back to the same value.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => {
                // Cc only spans U+0000..U+009F, so two hex digits suffice.
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Escape and wrap in double quotes.
pub fn quote(s: &str) -> String {
    format!("\"{}\"", escape_string(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" FALSE "), Some(false));
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_comma_list() {
        let items = split_comma_list("curl*, lynx*,wget*");
        assert_eq!(items, vec!["curl*", "lynx*", "wget*"]);
        assert_eq!(join_comma_list(&items), "curl*,lynx*,wget*");
        assert!(split_comma_list("  ").is_empty());
    }

    #[test]
    fn test_space_list() {
        let items = split_space_list("/login  /config /admin");
        assert_eq!(items, vec!["/login", "/config", "/admin"]);
        assert_eq!(join_space_list(&items), "/login /config /admin");
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("plain"), "plain");
        assert_eq!(escape_string("a\"b"), "a\\\"b");
        assert_eq!(escape_string("C:\\Windows"), "C:\\\\Windows");
        assert_eq!(escape_string("line\nnext\t"), "line\\nnext\\t");
        assert_eq!(escape_string("\u{90}\u{0}"), "\\x90\\x00");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("%windir%\\sysnative"), "\"%windir%\\\\sysnative\"");
        assert_eq!(quote(""), "\"\"");
    }
}
