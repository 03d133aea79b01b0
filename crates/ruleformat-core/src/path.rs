//! Dotted structural paths and the suffix-matched tables keyed by them
//!
//! A [`DottedPath`] names a *class* of node: the field names from the tree
//! root down to the node, with list nesting contributing no segment. A
//! [`PathTable`] maps dotted keys to directives; a key `a.b.c` applies to every
//! path ending in `a`, `b`, `c`, and when several keys apply the one with the
//! most segments wins.
//!
//! Copyright (c) 2025 Ruleformat Team
//! Licensed under the Apache-2.0 license

use std::collections::HashMap;
use std::fmt;

/// Separator between path segments
pub const SEPARATOR: char = '.';

/// Structural path from the rule-tree root to a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DottedPath {
    segments: Vec<String>,
}

impl DottedPath {
    /// The empty path addressing the tree root
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted string; the empty string is the root
    pub fn parse(path: &str) -> Self {
        if path.is_empty() {
            return Self::root();
        }
        Self {
            segments: path.split(SEPARATOR).map(str::to_string).collect(),
        }
    }

    /// Path of a field directly below this one
    pub fn child(&self, segment: &str) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment.to_string());
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            segments: rest.to_vec(),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn last(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for DottedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl From<&str> for DottedPath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

/// Split a dotted key into its scope and its final segment
///
/// `"issuerRDNs.description"` splits into `("issuerRDNs", "description")`;
/// a bare key has an empty scope.
pub fn split_key(key: &str) -> (&str, &str) {
    match key.rfind(SEPARATOR) {
        Some(index) => (&key[..index], &key[index + 1..]),
        None => ("", key),
    }
}

/// Join a scope and a final segment back into a dotted key
pub fn join_key(scope: &str, leaf: &str) -> String {
    if scope.is_empty() {
        leaf.to_string()
    } else {
        format!("{}{}{}", scope, SEPARATOR, leaf)
    }
}

/// Flat, order-independent lookup from dotted keys to directives
#[derive(Debug, Clone)]
pub struct PathTable<T> {
    entries: HashMap<String, T>,
    max_segments: usize,
}

impl<T> Default for PathTable<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            max_segments: 0,
        }
    }
}

impl<T> PathTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a directive, returning the one it replaced
    pub fn insert(&mut self, key: impl Into<String>, value: T) -> Option<T> {
        let key = key.into();
        let segments = key.split(SEPARATOR).count();
        self.max_segments = self.max_segments.max(segments);
        self.entries.insert(key, value)
    }

    pub fn get_exact(&self, key: &str) -> Option<&T> {
        self.entries.get(key)
    }

    /// Most specific entry matching `path` extended by `leaf`
    ///
    /// Candidate keys are the suffixes of the extended path, tried longest
    /// first. Returns the matched key together with its directive.
    pub fn lookup(&self, path: &DottedPath, leaf: Option<&str>) -> Option<(&str, &T)> {
        if self.entries.is_empty() {
            return None;
        }

        let mut segments: Vec<&str> = path.segments().iter().map(String::as_str).collect();
        if let Some(leaf) = leaf {
            segments.push(leaf);
        }

        let total = segments.len();
        let shortest_start = total.saturating_sub(self.max_segments);
        for start in shortest_start..total {
            let candidate = segments[start..].join(".");
            if let Some((key, value)) = self.entries.get_key_value(&candidate) {
                return Some((key.as_str(), value));
            }
        }
        None
    }

    /// Whether any entry applies to `path` itself
    pub fn matches(&self, path: &DottedPath) -> bool {
        self.lookup(path, None).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, T> FromIterator<(K, T)> for PathTable<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut table = PathTable::new();
        for (key, value) in iter {
            table.insert(key, value);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path = DottedPath::parse("origin.customCertificates.issuerRDNs");
        assert_eq!(path.len(), 3);
        assert_eq!(path.last(), Some("issuerRDNs"));
        assert_eq!(path.to_string(), "origin.customCertificates.issuerRDNs");
        assert!(DottedPath::parse("").is_root());
    }

    #[test]
    fn test_child_and_parent() {
        let path = DottedPath::root().child("cpCode").child("value");
        assert_eq!(path.to_string(), "cpCode.value");
        assert_eq!(path.parent(), Some(DottedPath::parse("cpCode")));
        assert_eq!(DottedPath::root().parent(), None);
    }

    #[test]
    fn test_split_and_join_key() {
        assert_eq!(split_key("issuerRDNs.description"), ("issuerRDNs", "description"));
        assert_eq!(split_key("description"), ("", "description"));
        assert_eq!(join_key("", "c"), "c");
        assert_eq!(join_key("a.b", "c"), "a.b.c");
    }

    #[test]
    fn test_lookup_prefers_longest_suffix() {
        let table: PathTable<&str> = [
            ("description", "caption"),
            ("issuerRDNs.description", "DESCRIPTION"),
        ]
        .into_iter()
        .collect();

        let issuer = DottedPath::parse("origin.customCertificates.issuerRDNs");
        assert_eq!(
            table.lookup(&issuer, Some("description")),
            Some(("issuerRDNs.description", &"DESCRIPTION"))
        );

        let advanced = DottedPath::parse("advanced");
        assert_eq!(
            table.lookup(&advanced, Some("description")),
            Some(("description", &"caption"))
        );
        assert_eq!(table.lookup(&advanced, Some("name")), None);
    }

    #[test]
    fn test_matches_applies_wherever_path_recurs() {
        let table: PathTable<()> = [("cpCode.value.cpCodeLimits", ())].into_iter().collect();

        assert!(table.matches(&DottedPath::parse("cpCode.value.cpCodeLimits")));
        assert!(table.matches(&DottedPath::parse("rules.behaviors.cpCode.value.cpCodeLimits")));
        assert!(!table.matches(&DottedPath::parse("cpCode.value")));
        assert!(!table.matches(&DottedPath::parse("other.cpCodeLimits")));
    }

    #[test]
    fn test_empty_table_never_matches() {
        let table: PathTable<()> = PathTable::new();
        assert!(!table.matches(&DottedPath::parse("a.b")));
        assert!(table.is_empty());
    }
}
