//! Rule-tree traversal driving name mapping, type coercion and flattening
//!
//! Both directions are a single depth-first pass over an owned tree.
//!
//! Towards the internal form, an object field is renamed first, its value is
//! transformed, and only then is the transformed value flattened at the
//! field's path. Towards the wire form the field's wire name is resolved, its
//! value is transformed, the transformed value is re-wrapped, and it is stored
//! under the wire name. In both cases flatten and unflatten see the already
//! transformed shape of their direct child.
//!
//! Structural paths are always spelled with wire field names, so the same
//! table entries apply in both directions.
//!
//! Copyright (c) 2025 Ruleformat Team
//! Licensed under the Apache-2.0 license

use crate::config::TransformOptions;
use crate::error::{Error, Result, StrictMode};
use crate::format::RuleFormat;
use crate::node::{Fields, Literal, RuleNode};
use crate::path::DottedPath;
use crate::report::{summarize, IssueSummary, IssueTracker, TransformIssue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Instant;

/// Location of the tree root in issue reports
const ROOT_LOCATION: &str = "$";

/// Which way a transform goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Wire format to canonical internal form
    ToInternal,
    /// Canonical internal form back to wire format
    ToWire,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToInternal => write!(f, "to_internal"),
            Direction::ToWire => write!(f, "to_wire"),
        }
    }
}

/// Metadata about one transform call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformMetadata {
    pub version: String,
    pub direction: Direction,
    pub node_count: usize,
    pub timestamp: String,
    pub duration_ms: Option<u64>,
}

/// Best-effort transformed tree plus every issue found on the way
///
/// A non-empty issue list means "completed with warnings to review", not
/// "nothing usable was produced".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transformed {
    pub tree: RuleNode,
    pub issues: Vec<TransformIssue>,
    pub metadata: TransformMetadata,
}

impl Transformed {
    /// Whether the transform found nothing to report
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn summary(&self) -> IssueSummary {
        summarize(&self.issues)
    }

    pub fn into_tree(self) -> RuleNode {
        self.tree
    }

    pub fn to_json(&self) -> Value {
        self.tree.to_json()
    }
}

/// Stateless driver of one rule format over whole rule trees
#[derive(Debug, Clone)]
pub struct TraversalEngine<'f> {
    format: &'f RuleFormat,
    options: TransformOptions,
}

impl<'f> TraversalEngine<'f> {
    pub fn new(format: &'f RuleFormat) -> Self {
        Self::with_options(format, TransformOptions::default())
    }

    pub fn with_options(format: &'f RuleFormat, options: TransformOptions) -> Self {
        Self { format, options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Translate a wire-format tree into the canonical internal form
    ///
    /// # Errors
    ///
    /// Only in [`StrictMode::Strict`], when an error-severity issue was found.
    pub fn to_internal(&self, tree: RuleNode) -> Result<Transformed> {
        self.run(Direction::ToInternal, tree)
    }

    /// Translate a canonical internal tree back into the wire format
    ///
    /// # Errors
    ///
    /// Only in [`StrictMode::Strict`], when an error-severity issue was found.
    pub fn to_wire(&self, tree: RuleNode) -> Result<Transformed> {
        self.run(Direction::ToWire, tree)
    }

    fn run(&self, direction: Direction, tree: RuleNode) -> Result<Transformed> {
        let start = Instant::now();
        let node_count = tree.node_count();

        let mut walk = Walk {
            format: self.format,
            max_depth: self.options.max_depth,
            tracker: IssueTracker::new(),
        };
        let root = DottedPath::root();
        let tree = match direction {
            Direction::ToInternal => walk.to_internal(tree, &root, ROOT_LOCATION, 1),
            Direction::ToWire => walk.to_wire(tree, &root, ROOT_LOCATION, 1),
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        let version = self.format.version();
        log::debug!(
            "{} with format {}: {} nodes in {}ms",
            direction,
            version,
            node_count,
            duration_ms
        );

        if !walk.tracker.is_empty() {
            log::warn!(
                "{} with format {} produced {} issue(s)",
                direction,
                version,
                walk.tracker.len()
            );
            if self.options.strict_mode == StrictMode::Strict && walk.tracker.has_errors() {
                let issues = walk.tracker.into_issues();
                return Err(Error::Transform {
                    message: format!(
                        "{} issue(s) during {} with format '{}'",
                        issues.len(),
                        direction,
                        version
                    ),
                    issues,
                });
            }
        }

        Ok(Transformed {
            tree,
            issues: walk.tracker.into_issues(),
            metadata: TransformMetadata {
                version: version.to_string(),
                direction,
                node_count,
                timestamp: chrono::Utc::now().to_rfc3339(),
                duration_ms: Some(duration_ms),
            },
        })
    }
}

/// Mutable state of a single pass: the format and the issues found so far
struct Walk<'a> {
    format: &'a RuleFormat,
    max_depth: Option<usize>,
    tracker: IssueTracker,
}

impl Walk<'_> {
    fn too_deep(&mut self, path: &DottedPath, location: &str, depth: usize) -> bool {
        match self.max_depth {
            Some(max_depth) if depth > max_depth => {
                self.tracker.add_depth_exceeded(&path.to_string(), location, max_depth);
                true
            }
            _ => false,
        }
    }

    fn to_internal(&mut self, node: RuleNode, path: &DottedPath, location: &str, depth: usize) -> RuleNode {
        if self.too_deep(path, location, depth) {
            return node;
        }

        match node {
            RuleNode::Null => RuleNode::Null,
            RuleNode::Scalar(literal) => RuleNode::Scalar(self.decode(path, literal)),
            RuleNode::List(items) => RuleNode::List(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.to_internal(item, path, &format!("{}[{}]", location, i), depth + 1)
                    })
                    .collect(),
            ),
            RuleNode::Object(fields) => {
                let mut out = Fields::with_capacity(fields.len());
                for (wire_key, value) in fields {
                    let format = self.format;
                    let canonical = format.name_mapper().to_canonical(path, &wire_key).to_string();
                    let child_path = path.child(&wire_key);
                    let child_location = format!("{}.{}", location, wire_key);

                    let value = self.to_internal(value, &child_path, &child_location, depth + 1);
                    let value = match format.flattener().flatten(value, &child_path) {
                        Ok(flat) => flat,
                        Err(multiple) => {
                            self.tracker
                                .add_multiple_values(&multiple.path, &child_location, multiple.count);
                            multiple.node
                        }
                    };

                    if out.contains_key(&canonical) {
                        self.tracker.add_name_collision(
                            &child_path.to_string(),
                            &child_location,
                            &wire_key,
                            &canonical,
                        );
                    } else {
                        out.insert(canonical, value);
                    }
                }
                RuleNode::Object(out)
            }
        }
    }

    fn to_wire(&mut self, node: RuleNode, path: &DottedPath, location: &str, depth: usize) -> RuleNode {
        if self.too_deep(path, location, depth) {
            return node;
        }

        match node {
            RuleNode::Null => RuleNode::Null,
            RuleNode::Scalar(literal) => RuleNode::Scalar(self.encode(path, literal)),
            RuleNode::List(items) => RuleNode::List(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.to_wire(item, path, &format!("{}[{}]", location, i), depth + 1)
                    })
                    .collect(),
            ),
            RuleNode::Object(fields) => {
                let mut out = Fields::with_capacity(fields.len());
                for (canonical_key, value) in fields {
                    let format = self.format;
                    let wire_key = format.name_mapper().to_wire(path, &canonical_key).to_string();
                    let child_path = path.child(&wire_key);
                    let child_location = format!("{}.{}", location, canonical_key);

                    let value = self.to_wire(value, &child_path, &child_location, depth + 1);
                    let value = match format.flattener().unflatten(value, &child_path) {
                        Ok(wrapped) => wrapped,
                        Err(multiple) => {
                            self.tracker
                                .add_multiple_values(&multiple.path, &child_location, multiple.count);
                            multiple.node
                        }
                    };

                    if out.contains_key(&wire_key) {
                        self.tracker.add_name_collision(
                            &child_path.to_string(),
                            &child_location,
                            &canonical_key,
                            &wire_key,
                        );
                    } else {
                        out.insert(wire_key, value);
                    }
                }
                RuleNode::Object(out)
            }
        }
    }

    fn decode(&self, path: &DottedPath, literal: Literal) -> Literal {
        match self.format.type_coercer().decode(path, &literal) {
            Some(decoded) => decoded.clone(),
            None => literal,
        }
    }

    fn encode(&self, path: &DottedPath, literal: Literal) -> Literal {
        match self.format.type_coercer().encode(path, &literal) {
            Some(token) => Literal::Str(token.to_string()),
            None => literal,
        }
    }
}
