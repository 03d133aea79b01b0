//! Scalar coercion between wire tokens and canonical literals
//!
//! Some wire fields carry descriptive string tokens where the canonical form
//! wants a native value, e.g. the token `"500"` under
//! `adScalerCircuitBreaker.returnErrorResponseCodeBased` stands for the
//! integer `500`. Coercion is opt-in per exact token and scoped by path: the
//! same token elsewhere in the tree passes through untouched.
//!
//! Copyright (c) 2025 Ruleformat Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::node::Literal;
use crate::path::{join_key, split_key, DottedPath, PathTable, SEPARATOR};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

/// One `typeMappings` entry: `token` under `scope` decodes to `literal`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeMapping {
    pub scope: String,
    pub token: String,
    pub literal: Literal,
}

impl TypeMapping {
    pub fn new(scope: impl Into<String>, token: impl Into<String>, literal: impl Into<Literal>) -> Self {
        Self {
            scope: scope.into(),
            token: token.into(),
            literal: literal.into(),
        }
    }

    /// Build an entry from a flat dotted key; the last segment is the token
    pub fn from_key(key: &str, literal: impl Into<Literal>) -> Self {
        let (scope, token) = split_key(key);
        Self::new(scope, token, literal)
    }

    pub fn key(&self) -> String {
        join_key(&self.scope, &self.token)
    }
}

/// Decodes wire tokens to literals and encodes them back for one rule format
#[derive(Debug, Default)]
pub struct TypeCoercer {
    entries: Vec<TypeMapping>,
    forward: PathTable<Literal>,
    inverse: OnceLock<PathTable<String>>,
}

impl TypeCoercer {
    /// Build a coercer, rejecting tables whose encode direction is ambiguous
    pub fn new(mappings: impl IntoIterator<Item = TypeMapping>) -> Result<Self> {
        let mut entries: Vec<TypeMapping> = Vec::new();
        let mut forward = PathTable::new();

        for mapping in mappings {
            if mapping.token.is_empty()
                || (!mapping.scope.is_empty() && mapping.scope.split(SEPARATOR).any(str::is_empty))
            {
                return Err(Error::definition(format!(
                    "type mapping '{}' has an empty path segment or token",
                    mapping.key()
                )));
            }

            let key = mapping.key();
            match forward.get_exact(&key) {
                Some(existing) if *existing == mapping.literal => continue,
                Some(existing) => {
                    return Err(Error::definition(format!(
                        "type mapping '{}' is defined twice ({} and {})",
                        key, existing, mapping.literal
                    )));
                }
                None => {}
            }
            forward.insert(key, mapping.literal.clone());
            entries.push(mapping);
        }

        check_encode_ambiguity(&entries, &forward)?;

        Ok(Self {
            entries,
            forward,
            inverse: OnceLock::new(),
        })
    }

    /// Canonical literal for `wire` at `path`, if a mapping applies
    ///
    /// Only string tokens are ever decoded; native wire values pass through.
    pub fn decode(&self, path: &DottedPath, wire: &Literal) -> Option<&Literal> {
        let token = wire.as_str()?;
        self.forward.lookup(path, Some(token)).map(|(_, literal)| literal)
    }

    /// Wire token for `canonical` at `path`, if a mapping applies
    pub fn encode(&self, path: &DottedPath, canonical: &Literal) -> Option<&str> {
        let (_, token) = self.inverse().lookup(path, Some(&canonical.lookup_key()))?;
        // Reject a reverse hit whose token decodes to something else here
        let decoded = self.decode(path, &Literal::Str(token.clone()))?;
        (decoded == canonical).then_some(token.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TypeMapping] {
        &self.entries
    }

    fn inverse(&self) -> &PathTable<String> {
        self.inverse.get_or_init(|| {
            log::debug!("building reverse type table ({} entries)", self.entries.len());
            self.entries
                .iter()
                .map(|m| (join_key(&m.scope, &m.literal.lookup_key()), m.token.clone()))
                .collect()
        })
    }
}

/// Reject tables where two tokens decode to one literal at some path
///
/// Unscoped entries apply inside every scoped one, so each written scope is
/// checked with the entries that resolve there.
fn check_encode_ambiguity(entries: &[TypeMapping], forward: &PathTable<Literal>) -> Result<()> {
    let mut scopes: BTreeSet<&str> = entries.iter().map(|m| m.scope.as_str()).collect();
    scopes.insert("");
    let tokens: BTreeSet<&str> = entries.iter().map(|m| m.token.as_str()).collect();

    for scope in scopes {
        let path = DottedPath::parse(scope);
        let mut folded: BTreeMap<String, (&Literal, Vec<&str>)> = BTreeMap::new();
        for &token in &tokens {
            if let Some((_, literal)) = forward.lookup(&path, Some(token)) {
                folded
                    .entry(literal.lookup_key())
                    .or_insert_with(|| (literal, Vec::new()))
                    .1
                    .push(token);
            }
        }

        if let Some((literal, tokens)) = folded.into_values().find(|(_, tokens)| tokens.len() > 1) {
            return Err(Error::AmbiguousTypeMapping {
                path: if scope.is_empty() { "<any>".to_string() } else { scope.to_string() },
                literal: literal.to_string(),
                tokens: tokens.into_iter().map(str::to_string).collect(),
            });
        }
    }
    Ok(())
}
