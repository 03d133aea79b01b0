//! Diff engine for comparing rule trees
//!
//! Object field order is ignored; list order is significant, since it is
//! rule evaluation order.

use colored::*;
use serde_json::Value;
use similar::{ChangeTag, TextDiff};
use std::collections::BTreeSet;

/// Options for diff comparison
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Whether to use colored output
    pub colored: bool,

    /// Unchanged lines to show around each change
    pub context_lines: usize,

    /// Maximum diff lines to show (0 = unlimited)
    pub max_diff_lines: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            colored: true,
            context_lines: 3,
            max_diff_lines: 100,
        }
    }
}

/// Result of a diff operation
#[derive(Debug)]
pub struct DiffResult {
    /// Whether the values match
    pub matches: bool,

    /// Human-readable diff output
    pub diff_output: String,

    /// Paths that differ, e.g. `$.cpCode.value` or `$.children (length 2 vs 3)`
    pub differing_paths: Vec<String>,
}

/// Engine for comparing JSON rule trees
pub struct DiffEngine {
    options: DiffOptions,
}

impl DiffEngine {
    /// Create a new diff engine
    pub fn new(options: DiffOptions) -> Self {
        Self { options }
    }

    /// Compare two JSON values
    pub fn compare(&self, expected: &Value, actual: &Value) -> DiffResult {
        if expected == actual {
            return DiffResult {
                matches: true,
                diff_output: String::new(),
                differing_paths: Vec::new(),
            };
        }

        let mut differing_paths = Vec::new();
        collect_diff_paths(expected, actual, "$".to_string(), &mut differing_paths);

        DiffResult {
            matches: false,
            diff_output: self.generate_diff_output(expected, actual),
            differing_paths,
        }
    }

    /// Generate human-readable diff output over key-sorted pretty JSON
    fn generate_diff_output(&self, expected: &Value, actual: &Value) -> String {
        let expected_str = pretty(&sort_keys(expected));
        let actual_str = pretty(&sort_keys(actual));

        let text_diff = TextDiff::from_lines(&expected_str, &actual_str);
        let mut output = String::new();

        if self.options.colored {
            output.push_str(&"=== Diff Output ===\n".bold().to_string());
        } else {
            output.push_str("=== Diff Output ===\n");
        }

        let mut line_count = 0;

        for group in text_diff.grouped_ops(self.options.context_lines) {
            for op in group {
                for change in text_diff.iter_changes(&op) {
                    if self.options.max_diff_lines > 0 && line_count >= self.options.max_diff_lines {
                        output.push_str("... (diff truncated) ...\n");
                        return output;
                    }

                    let line = match change.tag() {
                        ChangeTag::Delete if self.options.colored => {
                            format!("{}{}", "-".red(), change.to_string().red())
                        }
                        ChangeTag::Delete => format!("-{}", change),
                        ChangeTag::Insert if self.options.colored => {
                            format!("{}{}", "+".green(), change.to_string().green())
                        }
                        ChangeTag::Insert => format!("+{}", change),
                        ChangeTag::Equal => format!(" {}", change),
                    };

                    output.push_str(&line);
                    line_count += 1;
                }
            }
        }

        output
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Copy of `value` with every object's keys in sorted order
fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by_key(|(k, _)| k.as_str());
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// Recursively collect paths that differ
fn collect_diff_paths(expected: &Value, actual: &Value, path: String, paths: &mut Vec<String>) {
    match (expected, actual) {
        (Value::Object(exp), Value::Object(act)) => {
            let all_keys: BTreeSet<&String> = exp.keys().chain(act.keys()).collect();

            for key in all_keys {
                let new_path = format!("{}.{}", path, key);
                match (exp.get(key), act.get(key)) {
                    (Some(exp_val), Some(act_val)) if exp_val != act_val => {
                        collect_diff_paths(exp_val, act_val, new_path, paths);
                    }
                    (Some(_), None) => paths.push(format!("{} (missing in actual)", new_path)),
                    (None, Some(_)) => paths.push(format!("{} (extra in actual)", new_path)),
                    _ => {}
                }
            }
        }
        (Value::Array(exp), Value::Array(act)) => {
            for (i, (exp_val, act_val)) in exp.iter().zip(act.iter()).enumerate() {
                if exp_val != act_val {
                    collect_diff_paths(exp_val, act_val, format!("{}[{}]", path, i), paths);
                }
            }

            if exp.len() != act.len() {
                paths.push(format!("{} (length {} vs {})", path, exp.len(), act.len()));
            }
        }
        _ => {
            if expected != actual {
                paths.push(path);
            }
        }
    }
}
