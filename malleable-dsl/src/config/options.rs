//! Options accepted by [`crate::parse_with_options`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ERROR TYPES
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid extension block keyword `{0}`")]
    InvalidKeyword(String),
}

// ============================================================================
// OPTIONS
// ============================================================================

/// Knobs for the parser and the transformer.
///
/// ```toml
/// extension_blocks = ["vendor-extras"]
/// max_depth = 64
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseOptions {
    /// Extra top-level keywords accepted as parameter-only blocks.
    pub extension_blocks: Vec<String>,
    /// Maximum group nesting depth. `None` uses [`crate::DEFAULT_MAX_DEPTH`].
    pub max_depth: Option<usize>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extension_block(mut self, keyword: impl Into<String>) -> Self {
        self.extension_blocks.push(keyword.into());
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Load options from TOML and validate them.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let options: ParseOptions = toml::from_str(source)?;
        options.validate()?;
        Ok(options)
    }

    /// Every extension keyword must be something the lexer can produce.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for keyword in &self.extension_blocks {
            let valid = !keyword.is_empty()
                && keyword
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !valid {
                return Err(ConfigError::InvalidKeyword(keyword.clone()));
            }
        }
        Ok(())
    }

    pub fn is_extension_block(&self, keyword: &str) -> bool {
        self.extension_blocks.iter().any(|k| k == keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ParseOptions::default();
        assert!(options.extension_blocks.is_empty());
        assert_eq!(options.max_depth, None);
    }

    #[test]
    fn test_from_toml() -> Result<(), ConfigError> {
        let options = ParseOptions::from_toml_str(
            r#"
            extension_blocks = ["vendor-extras", "smb_beacon"]
            max_depth = 32
            "#,
        )?;
        assert!(options.is_extension_block("vendor-extras"));
        assert!(options.is_extension_block("smb_beacon"));
        assert!(!options.is_extension_block("stage"));
        assert_eq!(options.max_depth, Some(32));
        Ok(())
    }

    #[test]
    fn test_from_toml_empty_uses_defaults() -> Result<(), ConfigError> {
        assert_eq!(ParseOptions::from_toml_str("")?, ParseOptions::default());
        Ok(())
    }

    #[test]
    fn test_from_toml_rejects_unknown_fields() {
        let result = ParseOptions::from_toml_str("strict = true");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_from_toml_rejects_bad_keyword() {
        let result = ParseOptions::from_toml_str(r#"extension_blocks = ["has space"]"#);
        assert!(matches!(result, Err(ConfigError::InvalidKeyword(k)) if k == "has space"));
    }

    #[test]
    fn test_builder() {
        let options = ParseOptions::new()
            .with_extension_block("vendor")
            .with_max_depth(8);
        assert_eq!(options.extension_blocks, vec!["vendor".to_string()]);
        assert_eq!(options.max_depth, Some(8));
    }
}
