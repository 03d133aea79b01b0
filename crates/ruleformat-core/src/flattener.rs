//! Singleton-list flattening
//!
//! The wire format wraps "at most one" children in a list so every nested
//! block has the same shape. The canonical tree holds the child directly, or
//! null when the list was empty. Both directions are no-ops on a node that is
//! already in the target shape, so applying them twice is the same as once.
//!
//! Copyright (c) 2025 Ruleformat Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::node::RuleNode;
use crate::path::{DottedPath, PathTable, SEPARATOR};

/// A flatten path held a list with more than one element
///
/// The offending node is handed back unchanged so the caller can keep it in
/// a best-effort tree.
#[derive(Debug, Clone, PartialEq)]
pub struct MultipleValues {
    pub path: String,
    pub count: usize,
    pub node: RuleNode,
}

/// Applies `shouldFlatten` paths for one rule format
#[derive(Debug, Default)]
pub struct Flattener {
    paths: PathTable<()>,
}

impl Flattener {
    pub fn new<I, P>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let mut table = PathTable::new();
        for path in paths {
            let path = path.into();
            if path.is_empty() || path.split(SEPARATOR).any(str::is_empty) {
                return Err(Error::definition(format!(
                    "flatten path '{}' has an empty segment",
                    path
                )));
            }
            table.insert(path, ());
        }
        Ok(Self { paths: table })
    }

    /// Whether nodes at `path` are flattened
    pub fn applies(&self, path: &DottedPath) -> bool {
        self.paths.matches(path)
    }

    /// Collapse a singleton list at a flatten path into its element
    ///
    /// An empty list becomes null. A list whose sole element is itself a list
    /// is left alone, since collapsing it would make a second pass unwrap
    /// again. So is `[null]`: the collapsed null would re-wrap as `[]`.
    pub fn flatten(&self, node: RuleNode, path: &DottedPath) -> std::result::Result<RuleNode, MultipleValues> {
        if !self.applies(path) {
            return Ok(node);
        }

        match node {
            RuleNode::List(mut items) => match items.len() {
                0 => Ok(RuleNode::Null),
                1 if !items[0].is_list() && !items[0].is_null() => Ok(items.remove(0)),
                1 => Ok(RuleNode::List(items)),
                count => Err(MultipleValues {
                    path: path.to_string(),
                    count,
                    node: RuleNode::List(items),
                }),
            },
            // already flat
            other => Ok(other),
        }
    }

    /// Re-wrap a flattened child into the wire format's list
    ///
    /// Null becomes an empty list. A list of zero or one elements is kept as
    /// it is; a longer one cannot have come from [`Flattener::flatten`].
    pub fn unflatten(&self, node: RuleNode, path: &DottedPath) -> std::result::Result<RuleNode, MultipleValues> {
        if !self.applies(path) {
            return Ok(node);
        }

        match node {
            RuleNode::Null => Ok(RuleNode::List(Vec::new())),
            RuleNode::List(items) if items.len() > 1 => Err(MultipleValues {
                path: path.to_string(),
                count: items.len(),
                node: RuleNode::List(items),
            }),
            list @ RuleNode::List(_) => Ok(list),
            other => Ok(RuleNode::List(vec![other])),
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(|(k, _)| k)
    }
}
