//! Discovery and bookkeeping for the golden rule-tree corpus

use crate::{GoldenError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File name every test case directory carries
pub const TEST_FILE: &str = "test.json";

/// One wire tree pinned against a rule format version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Name of the test case
    pub name: String,

    /// Top-level corpus directory the case lives in
    pub category: String,

    /// Rule format version the wire tree is written against
    pub version: String,

    /// Wire-format rule tree, inline or as a `.json` file name next to `test.json`
    pub wire: Value,

    /// Internal tree the wire tree must translate to, if pinned
    #[serde(default)]
    pub expected_internal: Option<Value>,

    /// What the translation must report and reproduce
    #[serde(default)]
    pub expectations: TestExpectations,

    /// Test metadata
    pub metadata: TestMetadata,
}

/// Checks applied to a case beyond the expected tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExpectations {
    /// Whether translating back must reproduce the wire tree
    #[serde(default = "default_true")]
    pub round_trip: bool,

    /// Issue kinds the translation must report, in order
    #[serde(default)]
    pub expected_issues: Vec<String>,

    /// Run in strict mode; the translation is then expected to fail when
    /// `expected_issues` is non-empty
    #[serde(default)]
    pub strict: bool,

    /// Substring the strict-mode error must contain
    #[serde(default)]
    pub error_pattern: Option<String>,
}

impl Default for TestExpectations {
    fn default() -> Self {
        Self {
            round_trip: true,
            expected_issues: Vec::new(),
            strict: false,
            error_pattern: None,
        }
    }
}

/// Bookkeeping attached to a case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestMetadata {
    /// Behavior the case pins down
    pub description: String,

    /// Free-form tags used by `filter_by_tags`
    #[serde(default)]
    pub tags: Vec<String>,

    /// Disabled cases are skipped by batch runs
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lower runs first
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_true() -> bool {
    true
}

fn default_priority() -> u32 {
    100
}

/// Finds and loads cases under a corpus root
pub struct CorpusManager {
    corpus_dir: PathBuf,
}

impl CorpusManager {
    pub fn new(corpus_dir: impl AsRef<Path>) -> Self {
        Self {
            corpus_dir: corpus_dir.as_ref().to_path_buf(),
        }
    }

    pub fn corpus_dir(&self) -> &Path {
        &self.corpus_dir
    }

    /// Every `test.json` under the root, ordered by priority
    pub fn discover_tests(&self) -> Result<Vec<TestCase>> {
        let mut tests = Vec::new();

        if !self.corpus_dir.exists() {
            return Ok(tests);
        }

        for entry in WalkDir::new(&self.corpus_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();

            if path.is_file() && path.file_name() == Some(std::ffi::OsStr::new(TEST_FILE)) {
                match self.load_test_case(path) {
                    Ok(test_case) => tests.push(test_case),
                    Err(e) => {
                        eprintln!("skipping unreadable case {}: {}", path.display(), e);
                    }
                }
            }
        }

        // Stable, so equal priorities keep discovery order
        tests.sort_by_key(|t| t.metadata.priority);

        Ok(tests)
    }

    /// Parse one `test.json`, inlining referenced wire and expected files
    pub fn load_test_case(&self, path: &Path) -> Result<TestCase> {
        let content = fs::read_to_string(path)?;
        let mut test_case: TestCase = serde_json::from_str(&content)?;

        let test_dir = path.parent().ok_or_else(|| {
            GoldenError::CorpusError(format!("test case {:?} has no parent directory", path))
        })?;

        test_case.wire = resolve_file_reference(test_dir, test_case.wire)?;
        if let Some(expected) = test_case.expected_internal.take() {
            test_case.expected_internal = Some(resolve_file_reference(test_dir, expected)?);
        }

        Ok(test_case)
    }

    /// Filter tests by category
    pub fn filter_by_category(&self, tests: Vec<TestCase>, category: &str) -> Vec<TestCase> {
        tests
            .into_iter()
            .filter(|t| t.category == category || category == "*")
            .collect()
    }

    /// Filter tests by tags
    pub fn filter_by_tags(&self, tests: Vec<TestCase>, tags: &[String]) -> Vec<TestCase> {
        if tags.is_empty() {
            return tests;
        }

        tests
            .into_iter()
            .filter(|t| tags.iter().any(|tag| t.metadata.tags.contains(tag)))
            .collect()
    }

    pub fn filter_enabled(&self, tests: Vec<TestCase>) -> Vec<TestCase> {
        tests.into_iter().filter(|t| t.metadata.enabled).collect()
    }

    /// Create the corpus directory structure with one sample definition and case
    pub fn init_corpus(&self) -> Result<()> {
        for dir in ["definitions", "basic", "edge-cases", "regression"] {
            fs::create_dir_all(self.corpus_dir.join(dir))?;
        }

        let definition = self.corpus_dir.join("definitions/rules_v2024_10_21.yaml");
        if !definition.exists() {
            fs::write(
                definition,
                "version: rules_v2024_10_21\nshould_flatten:\n  - cpCode.value\n",
            )?;
        }

        self.create_sample_test()
    }

    fn create_sample_test(&self) -> Result<()> {
        let test_dir = self.corpus_dir.join("basic/cp-code");
        fs::create_dir_all(&test_dir)?;

        let test_case = TestCase {
            name: "cp-code".to_string(),
            category: "basic".to_string(),
            version: "rules_v2024_10_21".to_string(),
            wire: json!({"cpCode": {"value": [{"id": 101}]}}),
            expected_internal: Some(json!({"cpCode": {"value": {"id": 101}}})),
            expectations: TestExpectations::default(),
            metadata: TestMetadata {
                description: "Singleton cpCode value is flattened".to_string(),
                tags: vec!["flatten".to_string(), "smoke".to_string()],
                enabled: true,
                priority: 1,
            },
        };

        let content = serde_json::to_string_pretty(&test_case)?;
        fs::write(test_dir.join(TEST_FILE), content)?;

        Ok(())
    }

    /// Distinct categories of the discovered cases, sorted
    pub fn list_categories(&self) -> Result<Vec<String>> {
        let tests = self.discover_tests()?;
        let mut categories: Vec<String> = tests.into_iter().map(|t| t.category).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    /// Counts by category, version and tag
    pub fn get_statistics(&self) -> Result<CorpusStatistics> {
        let tests = self.discover_tests()?;

        let mut stats = CorpusStatistics {
            total_tests: tests.len(),
            ..Default::default()
        };

        for test in tests {
            if test.metadata.enabled {
                stats.enabled_tests += 1;
            } else {
                stats.disabled_tests += 1;
            }

            *stats.tests_by_category.entry(test.category).or_insert(0) += 1;
            *stats.tests_by_version.entry(test.version).or_insert(0) += 1;

            for tag in test.metadata.tags {
                *stats.tests_by_tag.entry(tag).or_insert(0) += 1;
            }
        }

        Ok(stats)
    }
}

/// Replace a `"something.json"` string with the parsed contents of that file
fn resolve_file_reference(test_dir: &Path, value: Value) -> Result<Value> {
    match value {
        Value::String(ref filename) if filename.ends_with(".json") => {
            let content = fs::read_to_string(test_dir.join(filename))?;
            Ok(serde_json::from_str(&content)?)
        }
        other => Ok(other),
    }
}

/// Case counts for a corpus
#[derive(Debug, Default)]
pub struct CorpusStatistics {
    pub total_tests: usize,
    pub enabled_tests: usize,
    pub disabled_tests: usize,
    pub tests_by_category: BTreeMap<String, usize>,
    pub tests_by_version: BTreeMap<String, usize>,
    pub tests_by_tag: BTreeMap<String, usize>,
}

impl CorpusStatistics {
    pub fn print(&self) {
        println!("Golden corpus");
        println!("  cases:    {}", self.total_tests);
        println!("  enabled:  {}", self.enabled_tests);
        println!("  disabled: {}", self.disabled_tests);

        for (title, counts) in [
            ("category", &self.tests_by_category),
            ("version", &self.tests_by_version),
            ("tag", &self.tests_by_tag),
        ] {
            if counts.is_empty() {
                continue;
            }
            println!("\nTests by {}:", title);
            for (key, count) in counts {
                println!("  {}: {}", key, count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_corpus_manager_init() {
        let temp_dir = TempDir::new().unwrap();
        let manager = CorpusManager::new(temp_dir.path());

        manager.init_corpus().unwrap();

        assert!(temp_dir.path().join("definitions/rules_v2024_10_21.yaml").exists());
        assert!(temp_dir.path().join("edge-cases").exists());
        assert!(temp_dir.path().join("basic/cp-code/test.json").exists());
    }

    #[test]
    fn test_discover_tests() {
        let temp_dir = TempDir::new().unwrap();
        let manager = CorpusManager::new(temp_dir.path());

        manager.init_corpus().unwrap();

        let tests = manager.discover_tests().unwrap();
        assert_eq!(tests.len(), 1);
        assert_eq!(tests[0].name, "cp-code");
        assert_eq!(tests[0].version, "rules_v2024_10_21");
        assert!(tests[0].expectations.round_trip);
    }

    #[test]
    fn test_wire_file_reference() {
        let temp_dir = TempDir::new().unwrap();
        let case_dir = temp_dir.path().join("regression/split-files");
        fs::create_dir_all(&case_dir).unwrap();
        fs::write(case_dir.join("wire.json"), r#"{"a": [1]}"#).unwrap();
        fs::write(
            case_dir.join(TEST_FILE),
            r#"{
                "name": "split-files",
                "category": "regression",
                "version": "rules_v2024_10_21",
                "wire": "wire.json",
                "metadata": {"description": "wire tree kept in its own file"}
            }"#,
        )
        .unwrap();

        let manager = CorpusManager::new(temp_dir.path());
        let test_case = manager.load_test_case(&case_dir.join(TEST_FILE)).unwrap();
        assert_eq!(test_case.wire, json!({"a": [1]}));
        assert_eq!(test_case.metadata.priority, 100);
        assert!(test_case.expected_internal.is_none());
    }

    #[test]
    fn test_filter_by_category() {
        let temp_dir = TempDir::new().unwrap();
        let manager = CorpusManager::new(temp_dir.path());
        manager.init_corpus().unwrap();

        let mut tests = manager.discover_tests().unwrap();
        let mut other = tests[0].clone();
        other.category = "edge-cases".to_string();
        tests.push(other);

        let filtered = manager.filter_by_category(tests.clone(), "basic");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].category, "basic");
        assert_eq!(manager.filter_by_category(tests, "*").len(), 2);
    }

    #[test]
    fn test_statistics() {
        let temp_dir = TempDir::new().unwrap();
        let manager = CorpusManager::new(temp_dir.path());
        manager.init_corpus().unwrap();

        let stats = manager.get_statistics().unwrap();
        assert_eq!(stats.total_tests, 1);
        assert_eq!(stats.enabled_tests, 1);
        assert_eq!(stats.tests_by_version.get("rules_v2024_10_21"), Some(&1));
        assert_eq!(stats.tests_by_tag.get("smoke"), Some(&1));
    }
}
