//! Golden test runner: translate each case and compare against the corpus

use crate::{
    corpus::{CorpusManager, TestCase, TEST_FILE},
    diff::DiffEngine,
    GoldenConfig, GoldenError, Result,
};
use colored::*;
use ruleformat_core::{Error, RegistryBuilder, RuleNode, SchemaRegistry, TransformOptions};
use serde_json::Value;
use std::time::Instant;

/// Result of running a golden test
#[derive(Debug)]
pub struct TestResult {
    /// `<category>/<name>` of the test
    pub name: String,

    /// Whether the test passed
    pub passed: bool,

    /// Error message if failed
    pub error: Option<String>,

    /// Diff output if comparison failed
    pub diff: Option<String>,

    /// Issue kinds the translation reported
    pub issues: Vec<String>,

    /// Execution time in milliseconds
    pub duration_ms: u64,
}

impl TestResult {
    /// Print the test result
    pub fn print(&self, verbose: bool) {
        let status = if self.passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };

        println!("{} {} ({}ms)", status, self.name, self.duration_ms);

        if let Some(ref error) = self.error {
            println!("  {}: {}", "Error".red(), error);
        }

        if verbose && !self.issues.is_empty() {
            println!("  {}: {}", "Issues".yellow(), self.issues.join(", "));
        }

        if verbose || !self.passed {
            if let Some(ref diff) = self.diff {
                println!("{}", diff);
            }
        }
    }
}

/// Why a case failed
struct Failure {
    message: String,
    diff: Option<String>,
}

impl Failure {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            diff: None,
        }
    }
}

/// Runner for golden tests
pub struct GoldenTestRunner {
    config: GoldenConfig,
    corpus_manager: CorpusManager,
    registry: SchemaRegistry,
    diff_engine: DiffEngine,
}

impl GoldenTestRunner {
    /// Create a runner whose registry holds every definition in the
    /// configured definitions directory
    pub fn new(config: GoldenConfig) -> Result<Self> {
        let registry = RegistryBuilder::new()
            .load_dir(&config.definitions_dir)?
            .build()?;
        Ok(Self::with_registry(config, registry))
    }

    /// Create a runner over an already built registry
    pub fn with_registry(config: GoldenConfig, registry: SchemaRegistry) -> Self {
        Self {
            corpus_manager: CorpusManager::new(&config.corpus_dir),
            diff_engine: DiffEngine::new(config.diff_options.clone()),
            registry,
            config,
        }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Run a single test by `<category>/<name>`
    pub fn run_test(&self, test_name: &str) -> Result<TestResult> {
        let test_path = self.config.corpus_dir.join(test_name).join(TEST_FILE);
        let test_case = self.corpus_manager.load_test_case(&test_path)?;

        let result = self.run_case(&test_case);

        if self.config.verbose {
            result.print(true);
        }

        if result.passed {
            Ok(result)
        } else {
            Err(GoldenError::TestFailed(format!(
                "Test '{}' failed: {}",
                result.name,
                result.error.as_deref().unwrap_or("Unknown error")
            )))
        }
    }

    /// Run one loaded case; never fails, the outcome is in the result
    pub fn run_case(&self, test_case: &TestCase) -> TestResult {
        let start = Instant::now();
        let mut issues = Vec::new();
        let outcome = self.execute_test(test_case, &mut issues);

        let (passed, error, diff) = match outcome {
            Ok(()) => (true, None, None),
            Err(failure) => (false, Some(failure.message), failure.diff),
        };

        TestResult {
            name: format!("{}/{}", test_case.category, test_case.name),
            passed,
            error,
            diff,
            issues,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Run a batch of tests whose name or category contains `pattern`
    pub fn run_batch(&self, pattern: &str) -> Result<Vec<TestResult>> {
        let tests = self.corpus_manager.discover_tests()?;
        let tests = self.corpus_manager.filter_enabled(tests);

        let filtered_tests: Vec<_> = if pattern == "*" {
            tests
        } else {
            tests
                .into_iter()
                .filter(|t| t.name.contains(pattern) || t.category.contains(pattern))
                .collect()
        };

        if filtered_tests.is_empty() {
            return Err(GoldenError::CorpusError(format!(
                "No tests found matching pattern '{}'",
                pattern
            )));
        }

        println!("Running {} tests...\n", filtered_tests.len());

        let results: Vec<TestResult> = filtered_tests.iter().map(|t| self.run_case(t)).collect();
        for result in &results {
            result.print(self.config.verbose);
        }

        let passed = results.iter().filter(|r| r.passed).count();
        let failed = results.len() - passed;

        println!("\n{}", "=== Test Summary ===".bold());
        println!(
            "{}: {} passed, {} failed",
            "Results".bold(),
            passed.to_string().green(),
            failed.to_string().red()
        );

        if failed > 0 {
            Err(GoldenError::TestFailed(format!("{} test(s) failed", failed)))
        } else {
            Ok(results)
        }
    }

    fn execute_test(&self, test_case: &TestCase, issues: &mut Vec<String>) -> std::result::Result<(), Failure> {
        let expectations = &test_case.expectations;

        let format = self
            .registry
            .resolve(&test_case.version)
            .map_err(|e| Failure::new(e.to_string()))?;

        let options = if expectations.strict {
            TransformOptions::strict()
        } else {
            TransformOptions::default()
        };

        let outcome = format.to_internal_with(RuleNode::from(test_case.wire.clone()), &options);
        let transformed = match outcome {
            Ok(transformed) => transformed,
            Err(Error::Transform { message, issues: found }) => {
                issues.extend(found.iter().map(|i| i.kind.to_string()));
                self.check_issues(&expectations.expected_issues, issues)?;
                return match &expectations.error_pattern {
                    Some(pattern) if !message.contains(pattern.as_str()) => Err(Failure::new(format!(
                        "error '{}' does not contain '{}'",
                        message, pattern
                    ))),
                    _ => Ok(()),
                };
            }
            Err(e) => return Err(Failure::new(e.to_string())),
        };

        issues.extend(transformed.issues.iter().map(|i| i.kind.to_string()));
        self.check_issues(&expectations.expected_issues, issues)?;

        if let Some(expected) = &test_case.expected_internal {
            self.check_tree("internal tree", expected, &transformed.to_json())?;
        }

        if expectations.round_trip {
            let back = format
                .to_wire_with(transformed.into_tree(), &options)
                .map_err(|e| Failure::new(format!("translating back failed: {}", e)))?;
            self.check_tree("round trip", &test_case.wire, &back.to_json())?;
        }

        Ok(())
    }

    fn check_issues(&self, expected: &[String], actual: &[String]) -> std::result::Result<(), Failure> {
        if expected == actual {
            Ok(())
        } else {
            Err(Failure::new(format!(
                "expected issues [{}], got [{}]",
                expected.join(", "),
                actual.join(", ")
            )))
        }
    }

    fn check_tree(&self, what: &str, expected: &Value, actual: &Value) -> std::result::Result<(), Failure> {
        let diff = self.diff_engine.compare(expected, actual);
        if diff.matches {
            return Ok(());
        }
        Err(Failure {
            message: format!("{} differs at {}", what, diff.differing_paths.join(", ")),
            diff: Some(diff.diff_output),
        })
    }

    /// Initialize the corpus with a sample definition and test
    pub fn init_corpus(&self) -> Result<()> {
        self.corpus_manager.init_corpus()
    }

    /// List all available tests
    pub fn list_tests(&self) -> Result<Vec<String>> {
        let tests = self.corpus_manager.discover_tests()?;
        Ok(tests
            .into_iter()
            .map(|t| format!("{}/{}", t.category, t.name))
            .collect())
    }

    /// Print corpus statistics
    pub fn get_statistics(&self) -> Result<()> {
        let stats = self.corpus_manager.get_statistics()?;
        stats.print();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DiffOptions;
    use tempfile::TempDir;

    fn temp_config(temp_dir: &TempDir) -> GoldenConfig {
        GoldenConfig {
            diff_options: DiffOptions {
                colored: false,
                ..Default::default()
            },
            ..GoldenConfig::with_corpus_dir(temp_dir.path())
        }
    }

    #[test]
    fn test_runner_on_sample_corpus() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_config(&temp_dir);
        crate::CorpusManager::new(&config.corpus_dir).init_corpus().unwrap();

        let runner = GoldenTestRunner::new(config).unwrap();
        assert_eq!(runner.registry().versions(), vec!["rules_v2024_10_21"]);
        assert_eq!(runner.list_tests().unwrap(), vec!["basic/cp-code"]);

        let result = runner.run_test("basic/cp-code").unwrap();
        assert!(result.passed);
        assert!(result.issues.is_empty());
    }

    #[test]
    fn test_unknown_version_fails_the_case() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_config(&temp_dir);
        let manager = crate::CorpusManager::new(&config.corpus_dir);
        manager.init_corpus().unwrap();

        let runner = GoldenTestRunner::new(config).unwrap();
        let mut case = manager.discover_tests().unwrap().remove(0);
        case.version = "rules_v1999_01_01".to_string();

        let result = runner.run_case(&case);
        assert!(!result.passed);
        assert!(result.error.unwrap().contains("rules_v1999_01_01"));
    }

    #[test]
    fn test_wrong_expectation_reports_diff() {
        let temp_dir = TempDir::new().unwrap();
        let config = temp_config(&temp_dir);
        let manager = crate::CorpusManager::new(&config.corpus_dir);
        manager.init_corpus().unwrap();

        let runner = GoldenTestRunner::new(config).unwrap();
        let mut case = manager.discover_tests().unwrap().remove(0);
        case.expected_internal = Some(serde_json::json!({"cpCode": {"value": {"id": 102}}}));

        let result = runner.run_case(&case);
        assert!(!result.passed);
        assert!(result.error.unwrap().contains("$.cpCode.value.id"));
        assert!(result.diff.is_some());
    }
}
