//! Error types for the ruleformat core library
//!
//! Construction-time problems (registration, table validation, definition
//! loading) surface as [`Error`] values and abort immediately. Traversal-time
//! problems are [`TransformIssue`](crate::report::TransformIssue) values that
//! are collected rather than raised; they only become an [`Error`] when the
//! caller asked for [`StrictMode::Strict`].

use crate::report::TransformIssue;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ruleformat operations
#[derive(Error, Debug)]
pub enum Error {
    /// A rule format with this version tag is already registered
    #[error("Rule format '{version}' is already registered")]
    DuplicateVersion { version: String },

    /// No rule format is registered under this version tag
    #[error("Unsupported rule format '{version}' (available: {})", available.join(", "))]
    UnknownVersion {
        version: String,
        available: Vec<String>,
    },

    /// Two wire keys in the same path scope fold to one canonical key
    #[error("Ambiguous name mapping at '{path}': {wire_keys:?} all map to '{canonical}'")]
    AmbiguousNameMapping {
        path: String,
        canonical: String,
        wire_keys: Vec<String>,
    },

    /// Two tokens in the same path scope decode to one literal
    #[error("Ambiguous type mapping at '{path}': {tokens:?} all map to {literal}")]
    AmbiguousTypeMapping {
        path: String,
        literal: String,
        tokens: Vec<String>,
    },

    /// A rule format definition is malformed
    #[error("Invalid rule format definition{}: {message}", path.as_ref().map(|p| format!(" '{}'", p.display())).unwrap_or_default())]
    Definition {
        message: String,
        path: Option<PathBuf>,
    },

    /// Strict mode rejected a transform that produced issues
    #[error("Transform rejected: {message}")]
    Transform {
        message: String,
        issues: Vec<TransformIssue>,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parsing errors
    #[error("YAML error: {message}")]
    Yaml {
        message: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// How a transform treats the issues it collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StrictMode {
    /// Any error-severity issue fails the whole call
    Strict,
    /// Return the best-effort tree together with every issue
    #[default]
    Warn,
}

/// Severity levels for transform issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational, no action required
    Info,
    /// Warning, should be reviewed
    Warning,
    /// Error, the affected node could not be transformed
    Error,
}

impl Error {
    /// Shorthand for a definition error that is not tied to a file
    pub fn definition(message: impl Into<String>) -> Self {
        Error::Definition {
            message: message.into(),
            path: None,
        }
    }

    /// Issues carried by a strict-mode rejection, empty for every other variant
    pub fn issues(&self) -> &[TransformIssue] {
        match self {
            Error::Transform { issues, .. } => issues,
            _ => &[],
        }
    }
}

impl fmt::Display for StrictMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrictMode::Strict => write!(f, "Strict"),
            StrictMode::Warn => write!(f, "Warn"),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DuplicateVersion {
            version: "rules_v2024_10_21".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Rule format 'rules_v2024_10_21' is already registered"
        );
    }

    #[test]
    fn test_unknown_version_lists_available() {
        let err = Error::UnknownVersion {
            version: "rules_v1999_01_01".to_string(),
            available: vec!["rules_v2023_01_05".to_string(), "rules_v2024_10_21".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("rules_v1999_01_01"));
        assert!(message.contains("rules_v2023_01_05, rules_v2024_10_21"));
    }

    #[test]
    fn test_definition_error_with_and_without_path() {
        let err = Error::definition("missing version");
        assert_eq!(err.to_string(), "Invalid rule format definition: missing version");

        let err = Error::Definition {
            message: "missing version".to_string(),
            path: Some(PathBuf::from("formats/v1.yaml")),
        };
        assert!(err.to_string().contains("'formats/v1.yaml'"));
    }

    #[test]
    fn test_strict_mode_display_and_default() {
        assert_eq!(StrictMode::Strict.to_string(), "Strict");
        assert_eq!(StrictMode::Warn.to_string(), "Warn");
        assert_eq!(StrictMode::default(), StrictMode::Warn);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_issues_accessor() {
        let err = Error::definition("bad");
        assert!(err.issues().is_empty());
    }
}
