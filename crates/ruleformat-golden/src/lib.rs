//! Golden round-trip tests for ruleformat rule trees
//!
//! A golden corpus is a directory of rule format definitions plus one
//! directory per test case. Each case holds a wire-format rule tree, the
//! internal tree it must translate to, and the issues the translation is
//! expected to report. The runner translates every case through the
//! registered format, compares the result, and checks that translating back
//! reproduces the original wire tree.

pub mod corpus;
pub mod diff;
pub mod runner;

use std::path::PathBuf;
use thiserror::Error;

pub use corpus::{CorpusManager, CorpusStatistics, TestCase, TestExpectations, TestMetadata};
pub use diff::{DiffEngine, DiffOptions, DiffResult};
pub use runner::{GoldenTestRunner, TestResult};

/// Golden test error types
#[derive(Debug, Error)]
pub enum GoldenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Rule format error: {0}")]
    Format(#[from] ruleformat_core::Error),

    #[error("Corpus error: {0}")]
    CorpusError(String),

    #[error("Test failed: {0}")]
    TestFailed(String),
}

pub type Result<T> = std::result::Result<T, GoldenError>;

/// Configuration for golden tests
#[derive(Debug, Clone)]
pub struct GoldenConfig {
    /// Root directory for test cases
    pub corpus_dir: PathBuf,

    /// Directory holding the rule format definitions the cases refer to
    pub definitions_dir: PathBuf,

    /// Diff options
    pub diff_options: DiffOptions,

    /// Verbose output
    pub verbose: bool,
}

impl Default for GoldenConfig {
    fn default() -> Self {
        Self::with_corpus_dir("../../golden-corpus")
    }
}

impl GoldenConfig {
    /// Config for a corpus whose definitions live in `<corpus>/definitions`
    pub fn with_corpus_dir(corpus_dir: impl Into<PathBuf>) -> Self {
        let corpus_dir = corpus_dir.into();
        Self {
            definitions_dir: corpus_dir.join("definitions"),
            corpus_dir,
            diff_options: DiffOptions::default(),
            verbose: false,
        }
    }

    /// Create config from environment and defaults
    pub fn from_env() -> Self {
        let mut config = match std::env::var("GOLDEN_CORPUS_DIR") {
            Ok(corpus_dir) => Self::with_corpus_dir(corpus_dir),
            Err(_) => Self::default(),
        };

        if let Ok(definitions_dir) = std::env::var("GOLDEN_DEFINITIONS_DIR") {
            config.definitions_dir = PathBuf::from(definitions_dir);
        }

        if let Ok(verbose) = std::env::var("GOLDEN_VERBOSE") {
            config.verbose = verbose == "1" || verbose.to_lowercase() == "true";
        }

        config
    }
}

/// Macro for defining golden tests
#[macro_export]
macro_rules! golden_test {
    ($name:ident, $test_path:expr) => {
        #[test]
        fn $name() {
            use $crate::{GoldenConfig, GoldenTestRunner};

            let runner = GoldenTestRunner::new(GoldenConfig::from_env())
                .expect("golden corpus definitions load");

            runner
                .run_test($test_path)
                .unwrap_or_else(|e| panic!("Golden test failed: {}: {}", $test_path, e));
        }
    };
}

/// Macro for a golden test over every case whose name or category matches
#[macro_export]
macro_rules! golden_test_batch {
    ($name:ident, $pattern:expr) => {
        #[test]
        fn $name() {
            use $crate::{GoldenConfig, GoldenTestRunner};

            let runner = GoldenTestRunner::new(GoldenConfig::from_env())
                .expect("golden corpus definitions load");

            runner
                .run_batch($pattern)
                .unwrap_or_else(|e| panic!("Golden test batch failed: {}: {}", $pattern, e));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        let config = GoldenConfig::from_env();
        assert!(!config.corpus_dir.as_os_str().is_empty());
        assert!(!config.definitions_dir.as_os_str().is_empty());
    }

    #[test]
    fn test_definitions_dir_follows_corpus() {
        let config = GoldenConfig::with_corpus_dir("/tmp/corpus");
        assert_eq!(config.definitions_dir, PathBuf::from("/tmp/corpus/definitions"));
    }
}
