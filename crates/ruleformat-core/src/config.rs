//! Transform configuration
//!
//! Options can be built in code or read from a JSON or YAML document:
//!
//! ```yaml
//! strict_mode: Strict
//! max_depth: 256
//! ```
//!
//! Copyright (c) 2025 Ruleformat Team
//! Licensed under the Apache-2.0 license

use crate::error::{Result, StrictMode};
use crate::loader::read_document;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Depth bound applied when none is configured
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Options controlling a single transform call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Whether error-severity issues fail the call
    pub strict_mode: StrictMode,
    /// Deepest node that is still transformed; `None` for no bound
    pub max_depth: Option<usize>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            strict_mode: StrictMode::Warn,
            max_depth: Some(DEFAULT_MAX_DEPTH),
        }
    }
}

impl TransformOptions {
    /// Default options with [`StrictMode::Strict`]
    pub fn strict() -> Self {
        Self {
            strict_mode: StrictMode::Strict,
            ..Self::default()
        }
    }

    /// Read options from a `.json`, `.yaml` or `.yml` file
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, has another extension, or does not
    /// describe transform options.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let document = read_document(path)?;
        let options = serde_json::from_value(document)?;
        log::debug!("loaded transform options from {}", path.display());
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let options = TransformOptions::default();
        assert_eq!(options.strict_mode, StrictMode::Warn);
        assert_eq!(options.max_depth, Some(DEFAULT_MAX_DEPTH));
        assert_eq!(TransformOptions::strict().strict_mode, StrictMode::Strict);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let options: TransformOptions =
            serde_json::from_value(serde_json::json!({"strict_mode": "Strict"})).unwrap();
        assert_eq!(options.strict_mode, StrictMode::Strict);
        assert_eq!(options.max_depth, Some(DEFAULT_MAX_DEPTH));
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("options.yaml");
        fs::write(&path, "strict_mode: Strict\nmax_depth: 16\n").unwrap();

        let options = TransformOptions::from_file(&path).unwrap();
        assert_eq!(options.strict_mode, StrictMode::Strict);
        assert_eq!(options.max_depth, Some(16));
    }

    #[test]
    fn test_unbounded_depth_from_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("options.json");
        fs::write(&path, r#"{"max_depth": null}"#).unwrap();

        let options = TransformOptions::from_file(&path).unwrap();
        assert_eq!(options.max_depth, None);
        assert_eq!(options.strict_mode, StrictMode::Warn);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("options.toml");
        fs::write(&path, "strict_mode = 'Strict'").unwrap();
        assert!(TransformOptions::from_file(&path).is_err());
    }
}
