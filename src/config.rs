//! Validator configuration.
//!
//! Options can be built in code or loaded from TOML:
//!
//! ```toml
//! fail_fast = true
//! memoize_bindings = true
//! ```

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_memoize_bindings() -> bool {
    true
}

/// Options controlling validation behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidatorOptions {
    /// Stop the whole validation after the first batch that reports a violation.
    #[serde(default)]
    pub fail_fast: bool,
    /// Remember how each type's Default group is bound after its first use.
    #[serde(default = "default_memoize_bindings")]
    pub memoize_bindings: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            fail_fast: false,
            memoize_bindings: default_memoize_bindings(),
        }
    }
}

impl ValidatorOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable fail-fast.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Enable/disable memoization of type bindings.
    pub fn with_memoize_bindings(mut self, memoize: bool) -> Self {
        self.memoize_bindings = memoize;
        self
    }

    /// Parse options from a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load options from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ValidatorOptions::default();
        assert!(!options.fail_fast);
        assert!(options.memoize_bindings);
    }

    #[test]
    fn test_builder_setters() {
        let options = ValidatorOptions::new()
            .with_fail_fast(true)
            .with_memoize_bindings(false);
        assert!(options.fail_fast);
        assert!(!options.memoize_bindings);
    }

    #[test]
    fn test_from_toml_partial() {
        let options = ValidatorOptions::from_toml_str("fail_fast = true").unwrap();
        assert!(options.fail_fast);
        assert!(options.memoize_bindings);

        let empty = ValidatorOptions::from_toml_str("").unwrap();
        assert_eq!(empty, ValidatorOptions::default());
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let result = ValidatorOptions::from_toml_str("parallel = true");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_from_missing_file() {
        let result = ValidatorOptions::from_file("/nonexistent/sequent.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
