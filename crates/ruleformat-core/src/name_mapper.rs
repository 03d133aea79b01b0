//! Field-name mapping between wire-format keys and canonical keys
//!
//! `nameMappings` entries are keyed by a wire field name, optionally qualified
//! by the trailing segments of the path it lives under
//! (`"issuerRDNs.description"`). Qualified entries beat bare ones; keys with
//! no entry keep their name.
//!
//! The reverse direction is derived from the same entries, scoped the same
//! way, and built once per mapper on first use.
//!
//! Copyright (c) 2025 Ruleformat Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::path::{join_key, split_key, DottedPath, PathTable, SEPARATOR};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// Resolves wire keys to canonical keys and back for one rule format
#[derive(Debug, Default)]
pub struct NameMapper {
    forward: PathTable<String>,
    inverse: OnceLock<PathTable<String>>,
}

impl NameMapper {
    /// Build a mapper, rejecting tables whose reverse direction is ambiguous
    ///
    /// The table is ambiguous when two wire keys resolve to the same canonical
    /// name at some path. Bare entries count inside qualified scopes unless a
    /// qualified entry overrides them there.
    pub fn new<I, K, V>(mappings: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut forward = PathTable::new();
        for (wire, canonical) in mappings {
            let wire = wire.into();
            let canonical = canonical.into();
            validate_entry(&wire, &canonical)?;
            if let Some(previous) = forward.insert(wire.clone(), canonical.clone()) {
                if previous != canonical {
                    return Err(Error::definition(format!(
                        "name mapping '{}' is defined twice ('{}' and '{}')",
                        wire, previous, canonical
                    )));
                }
            }
        }

        check_reverse_ambiguity(&forward)?;

        Ok(Self {
            forward,
            inverse: OnceLock::new(),
        })
    }

    /// Canonical name of `wire_key` found in an object at `path`
    pub fn to_canonical<'a>(&'a self, path: &DottedPath, wire_key: &'a str) -> &'a str {
        self.forward
            .lookup(path, Some(wire_key))
            .map_or(wire_key, |(_, canonical)| canonical.as_str())
    }

    /// Wire name of `canonical_key` found in an object at `path`
    ///
    /// A reverse candidate is only used if it maps forward to the same
    /// canonical name at this path. A bare entry shadowed by a qualified one
    /// is never reported as a preimage where the qualified entry applies.
    pub fn to_wire<'a>(&'a self, path: &DottedPath, canonical_key: &'a str) -> &'a str {
        match self.inverse().lookup(path, Some(canonical_key)) {
            Some((_, wire)) if self.to_canonical(path, wire) == canonical_key => wire.as_str(),
            _ => canonical_key,
        }
    }

    /// Whether any entry renames `wire_key` at `path`
    pub fn renames(&self, path: &DottedPath, wire_key: &str) -> bool {
        self.forward.lookup(path, Some(wire_key)).is_some()
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// All entries as `(wire key, canonical name)` pairs
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.forward.iter().map(|(k, v)| (k, v.as_str()))
    }

    fn inverse(&self) -> &PathTable<String> {
        self.inverse.get_or_init(|| {
            log::debug!("building reverse name table ({} entries)", self.forward.len());
            self.forward
                .iter()
                .map(|(key, canonical)| {
                    let (scope, wire) = split_key(key);
                    (join_key(scope, canonical), wire.to_string())
                })
                .collect()
        })
    }
}

fn validate_entry(wire: &str, canonical: &str) -> Result<()> {
    if wire.is_empty() || wire.split(SEPARATOR).any(str::is_empty) {
        return Err(Error::definition(format!(
            "name mapping key '{}' has an empty path segment",
            wire
        )));
    }
    if canonical.is_empty() || canonical.contains(SEPARATOR) {
        return Err(Error::definition(format!(
            "name mapping '{}' targets '{}', which is not a single field name",
            wire, canonical
        )));
    }
    Ok(())
}

/// Reject tables where two wire keys fold to one canonical name at some path
///
/// Bare entries apply inside every qualified scope, so each scope is checked
/// with the entries that actually resolve there. The resolution at any path
/// equals the one at the longest entry scope it ends with, which makes the
/// written scopes (plus the root) the only places to look.
fn check_reverse_ambiguity(forward: &PathTable<String>) -> Result<()> {
    let mut scopes: BTreeSet<&str> = BTreeSet::new();
    let mut wire_keys: BTreeSet<&str> = BTreeSet::new();
    scopes.insert("");
    for (key, _) in forward.iter() {
        let (scope, wire) = split_key(key);
        scopes.insert(scope);
        wire_keys.insert(wire);
    }

    for scope in scopes {
        let path = DottedPath::parse(scope);
        // canonical -> wire names resolving to it at this scope
        let mut folded: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for &wire in &wire_keys {
            if let Some((_, canonical)) = forward.lookup(&path, Some(wire)) {
                folded.entry(canonical.as_str()).or_default().push(wire);
            }
        }

        if let Some((canonical, keys)) = folded.into_iter().find(|(_, keys)| keys.len() > 1) {
            return Err(Error::AmbiguousNameMapping {
                path: if scope.is_empty() { "<any>".to_string() } else { scope.to_string() },
                canonical: canonical.to_string(),
                wire_keys: keys.into_iter().map(str::to_string).collect(),
            });
        }
    }
    Ok(())
}
