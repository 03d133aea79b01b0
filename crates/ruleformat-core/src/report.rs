//! Issue collection for rule-tree transforms
//!
//! A transform never stops at the first structural problem. Each problem is
//! recorded as a [`TransformIssue`] carrying the dotted structural path and
//! the concrete location in the input tree, and the whole list is handed back
//! alongside the best-effort result.

use crate::error::Severity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of problem found during a transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IssueKind {
    /// A flatten path held more than one element
    MultipleValues,
    /// Two keys of one object resolved to the same target name
    NameCollision,
    /// The tree is nested deeper than the configured bound
    DepthExceeded,
}

impl IssueKind {
    /// Default severity of an issue of this kind
    pub fn severity(self) -> Severity {
        match self {
            IssueKind::MultipleValues | IssueKind::NameCollision | IssueKind::DepthExceeded => {
                Severity::Error
            }
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueKind::MultipleValues => write!(f, "MultipleValues"),
            IssueKind::NameCollision => write!(f, "NameCollision"),
            IssueKind::DepthExceeded => write!(f, "DepthExceeded"),
        }
    }
}

/// A single problem found while transforming a rule tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformIssue {
    pub kind: IssueKind,
    /// Structural dotted path, e.g. `cpCode.value`
    pub path: String,
    /// Location of the node in the input tree, e.g. `$.cpCode.value[0]`
    pub location: String,
    pub message: String,
    pub severity: Severity,
}

impl fmt::Display for TransformIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} at {} ({}): {}",
            self.severity, self.kind, self.path, self.location, self.message
        )
    }
}

/// Counts of collected issues
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub total_issues: usize,
    pub by_kind: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
}

/// Collects issues during one transform call
#[derive(Debug, Default)]
pub struct IssueTracker {
    issues: Vec<TransformIssue>,
}

impl IssueTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a flatten path holding `count` elements
    pub fn add_multiple_values(&mut self, path: &str, location: &str, count: usize) {
        self.push(
            IssueKind::MultipleValues,
            path,
            location,
            format!("expected at most one element, found {}", count),
        );
    }

    /// Record a key dropped because an earlier key already took `target`
    pub fn add_name_collision(&mut self, path: &str, location: &str, source_key: &str, target: &str) {
        self.push(
            IssueKind::NameCollision,
            path,
            location,
            format!(
                "field '{}' resolves to '{}', which an earlier field already uses; dropped",
                source_key, target
            ),
        );
    }

    /// Record a subtree left untransformed because it is nested too deep
    pub fn add_depth_exceeded(&mut self, path: &str, location: &str, max_depth: usize) {
        self.push(
            IssueKind::DepthExceeded,
            path,
            location,
            format!("nesting exceeds the depth bound of {}; subtree copied unchanged", max_depth),
        );
    }

    fn push(&mut self, kind: IssueKind, path: &str, location: &str, message: String) {
        self.issues.push(TransformIssue {
            kind,
            path: path.to_string(),
            location: location.to_string(),
            message,
            severity: kind.severity(),
        });
    }

    pub fn issues(&self) -> &[TransformIssue] {
        &self.issues
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Whether any issue has error severity
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity >= Severity::Error)
    }

    /// Issues recorded at a given structural path
    pub fn issues_at(&self, path: &str) -> Vec<&TransformIssue> {
        self.issues.iter().filter(|i| i.path == path).collect()
    }

    pub fn summary(&self) -> IssueSummary {
        summarize(&self.issues)
    }

    pub fn into_issues(self) -> Vec<TransformIssue> {
        self.issues
    }
}

/// Count issues by kind and by severity
pub fn summarize(issues: &[TransformIssue]) -> IssueSummary {
    let mut summary = IssueSummary {
        total_issues: issues.len(),
        ..Default::default()
    };
    for issue in issues {
        *summary.by_kind.entry(issue.kind.to_string()).or_insert(0) += 1;
        *summary.by_severity.entry(issue.severity.to_string()).or_insert(0) += 1;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_records_issues_in_order() {
        let mut tracker = IssueTracker::new();
        tracker.add_multiple_values("cpCode.value", "$.cpCode.value", 2);
        tracker.add_name_collision("origin", "$.origin", "DN", "dn");

        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.issues()[0].kind, IssueKind::MultipleValues);
        assert_eq!(tracker.issues()[1].kind, IssueKind::NameCollision);
        assert!(tracker.issues()[0].message.contains("found 2"));
        assert!(tracker.has_errors());
    }

    #[test]
    fn test_issues_at_path() {
        let mut tracker = IssueTracker::new();
        tracker.add_multiple_values("a.b", "$.a.b", 3);
        tracker.add_multiple_values("a.c", "$.a.c", 2);
        tracker.add_multiple_values("a.b", "$.a[1].b", 4);

        assert_eq!(tracker.issues_at("a.b").len(), 2);
        assert!(tracker.issues_at("x").is_empty());
    }

    #[test]
    fn test_summary_counts() {
        let mut tracker = IssueTracker::new();
        tracker.add_multiple_values("a", "$.a", 2);
        tracker.add_multiple_values("b", "$.b", 2);
        tracker.add_depth_exceeded("c", "$.c", 8);

        let summary = tracker.summary();
        assert_eq!(summary.total_issues, 3);
        assert_eq!(summary.by_kind.get("MultipleValues"), Some(&2));
        assert_eq!(summary.by_kind.get("DepthExceeded"), Some(&1));
        assert_eq!(summary.by_severity.get("error"), Some(&3));
    }

    #[test]
    fn test_empty_tracker() {
        let tracker = IssueTracker::new();
        assert!(tracker.is_empty());
        assert!(!tracker.has_errors());
        assert_eq!(tracker.summary(), IssueSummary::default());
    }

    #[test]
    fn test_issue_display() {
        let mut tracker = IssueTracker::new();
        tracker.add_multiple_values("cpCode.value", "$.cpCode.value", 2);
        let text = tracker.issues()[0].to_string();
        assert!(text.starts_with("[error] MultipleValues at cpCode.value"));
    }
}
