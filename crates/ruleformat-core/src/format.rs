//! Versioned rule formats
//!
//! A [`RuleFormat`] bundles a version tag, the opaque behavior and criteria
//! schema tables, and the three mapping tables that drive the transform. It
//! is validated once when built and is immutable afterwards.
//!
//! Copyright (c) 2025 Ruleformat Team
//! Licensed under the Apache-2.0 license

use crate::config::TransformOptions;
use crate::error::Result;
use crate::flattener::Flattener;
use crate::name_mapper::NameMapper;
use crate::node::{Literal, RuleNode};
use crate::path::DottedPath;
use crate::traversal::{Transformed, TraversalEngine};
use crate::type_coercer::{TypeCoercer, TypeMapping};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Opaque per-name schema data (behavior or criterion definitions)
///
/// The contents are consumed by validation tooling outside this crate; the
/// transform only needs to carry them and look them up by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaTable(BTreeMap<String, Value>);

impl SchemaTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, schema: Value) -> Option<Value> {
        self.0.insert(name.into(), schema)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for SchemaTable {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Table sizes of a rule format, for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSummary {
    pub version: String,
    pub behaviors: usize,
    pub criteria: usize,
    pub type_mappings: usize,
    pub name_mappings: usize,
    pub flatten_paths: usize,
}

/// One schema version of the rule tree and how to translate it
#[derive(Debug)]
pub struct RuleFormat {
    version: String,
    behaviors_schemas: SchemaTable,
    criteria_schemas: SchemaTable,
    name_mapper: NameMapper,
    type_coercer: TypeCoercer,
    flattener: Flattener,
}

impl RuleFormat {
    pub fn builder(version: impl Into<String>) -> RuleFormatBuilder {
        RuleFormatBuilder::new(version)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn behaviors_schemas(&self) -> &SchemaTable {
        &self.behaviors_schemas
    }

    pub fn criteria_schemas(&self) -> &SchemaTable {
        &self.criteria_schemas
    }

    pub fn behavior_schema(&self, name: &str) -> Option<&Value> {
        self.behaviors_schemas.get(name)
    }

    pub fn criterion_schema(&self, name: &str) -> Option<&Value> {
        self.criteria_schemas.get(name)
    }

    pub fn behavior_names(&self) -> Vec<&str> {
        self.behaviors_schemas.names().collect()
    }

    pub fn criteria_names(&self) -> Vec<&str> {
        self.criteria_schemas.names().collect()
    }

    pub fn name_mapper(&self) -> &NameMapper {
        &self.name_mapper
    }

    pub fn type_coercer(&self) -> &TypeCoercer {
        &self.type_coercer
    }

    pub fn flattener(&self) -> &Flattener {
        &self.flattener
    }

    /// Whether nodes at the dotted `path` are flattened by this format
    pub fn is_flattened(&self, path: &str) -> bool {
        self.flattener.applies(&DottedPath::parse(path))
    }

    pub fn summary(&self) -> FormatSummary {
        FormatSummary {
            version: self.version.clone(),
            behaviors: self.behaviors_schemas.len(),
            criteria: self.criteria_schemas.len(),
            type_mappings: self.type_coercer.len(),
            name_mappings: self.name_mapper.len(),
            flatten_paths: self.flattener.len(),
        }
    }

    /// Translate a wire tree to the internal form with default options
    ///
    /// # Errors
    ///
    /// Never with default options; see [`TraversalEngine::to_internal`].
    pub fn to_internal(&self, tree: RuleNode) -> Result<Transformed> {
        TraversalEngine::new(self).to_internal(tree)
    }

    /// Translate an internal tree to the wire form with default options
    ///
    /// # Errors
    ///
    /// Never with default options; see [`TraversalEngine::to_wire`].
    pub fn to_wire(&self, tree: RuleNode) -> Result<Transformed> {
        TraversalEngine::new(self).to_wire(tree)
    }

    pub fn to_internal_with(&self, tree: RuleNode, options: &TransformOptions) -> Result<Transformed> {
        TraversalEngine::with_options(self, options.clone()).to_internal(tree)
    }

    pub fn to_wire_with(&self, tree: RuleNode, options: &TransformOptions) -> Result<Transformed> {
        TraversalEngine::with_options(self, options.clone()).to_wire(tree)
    }

    /// JSON in, JSON out convenience around [`RuleFormat::to_internal`]
    pub fn to_internal_json(&self, wire: Value) -> Result<(Value, Transformed)> {
        let transformed = self.to_internal(RuleNode::from(wire))?;
        Ok((transformed.to_json(), transformed))
    }

    /// JSON in, JSON out convenience around [`RuleFormat::to_wire`]
    pub fn to_wire_json(&self, internal: Value) -> Result<(Value, Transformed)> {
        let transformed = self.to_wire(RuleNode::from(internal))?;
        Ok((transformed.to_json(), transformed))
    }
}

/// Accumulates the tables of a rule format and validates them on `build`
#[derive(Debug, Clone)]
pub struct RuleFormatBuilder {
    version: String,
    behaviors_schemas: SchemaTable,
    criteria_schemas: SchemaTable,
    name_mappings: Vec<(String, String)>,
    type_mappings: Vec<TypeMapping>,
    should_flatten: Vec<String>,
}

impl RuleFormatBuilder {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            behaviors_schemas: SchemaTable::new(),
            criteria_schemas: SchemaTable::new(),
            name_mappings: Vec::new(),
            type_mappings: Vec::new(),
            should_flatten: Vec::new(),
        }
    }

    pub fn behaviors_schemas(mut self, schemas: SchemaTable) -> Self {
        self.behaviors_schemas = schemas;
        self
    }

    pub fn criteria_schemas(mut self, schemas: SchemaTable) -> Self {
        self.criteria_schemas = schemas;
        self
    }

    pub fn behavior_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.behaviors_schemas.insert(name, schema);
        self
    }

    pub fn criterion_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.criteria_schemas.insert(name, schema);
        self
    }

    /// Map a wire key, optionally path-qualified, to a canonical name
    pub fn name_mapping(mut self, wire_key: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.name_mappings.push((wire_key.into(), canonical.into()));
        self
    }

    /// Map a flat `<scope>.<token>` key to a literal
    pub fn type_mapping(mut self, key: &str, literal: impl Into<Literal>) -> Self {
        self.type_mappings.push(TypeMapping::from_key(key, literal));
        self
    }

    /// Map `token` under `scope` to a literal; use this when the token has dots
    pub fn scoped_type_mapping(
        mut self,
        scope: impl Into<String>,
        token: impl Into<String>,
        literal: impl Into<Literal>,
    ) -> Self {
        self.type_mappings.push(TypeMapping::new(scope, token, literal));
        self
    }

    /// Mark a dotted path as flattened
    pub fn flatten(mut self, path: impl Into<String>) -> Self {
        self.should_flatten.push(path.into());
        self
    }

    /// Validate every table and produce an immutable format
    ///
    /// # Errors
    ///
    /// Fails on an empty version, malformed table entries, or mappings whose
    /// reverse direction is ambiguous. A format with such a defect is never
    /// produced.
    pub fn build(self) -> Result<RuleFormat> {
        if self.version.trim().is_empty() {
            return Err(crate::Error::definition("rule format version is empty"));
        }

        let name_mapper = NameMapper::new(self.name_mappings)?;
        let type_coercer = TypeCoercer::new(self.type_mappings)?;
        let flattener = Flattener::new(self.should_flatten)?;

        log::debug!(
            "built rule format {} ({} name, {} type, {} flatten entries)",
            self.version,
            name_mapper.len(),
            type_coercer.len(),
            flattener.len()
        );

        Ok(RuleFormat {
            version: self.version,
            behaviors_schemas: self.behaviors_schemas,
            criteria_schemas: self.criteria_schemas,
            name_mapper,
            type_coercer,
            flattener,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use serde_json::json;

    fn sample_format() -> RuleFormat {
        RuleFormat::builder("rules_v2024_10_21")
            .behavior_schema("cpCode", json!({"options": ["value"]}))
            .behavior_schema("origin", json!({"options": ["hostname"]}))
            .criterion_schema("path", json!({"options": ["values"]}))
            .name_mapping("description", "caption")
            .name_mapping("issuerRDNs.description", "DESCRIPTION")
            .type_mapping("adScalerCircuitBreaker.returnErrorResponseCodeBased.500", 500)
            .flatten("cpCode.value")
            .build()
            .unwrap()
    }

    #[test]
    fn test_schema_lookup() {
        let format = sample_format();
        assert_eq!(format.version(), "rules_v2024_10_21");
        assert_eq!(format.behavior_names(), vec!["cpCode", "origin"]);
        assert_eq!(format.criteria_names(), vec!["path"]);
        assert!(format.behavior_schema("cpCode").is_some());
        assert!(format.criterion_schema("cpCode").is_none());
    }

    #[test]
    fn test_summary() {
        let summary = sample_format().summary();
        assert_eq!(summary.behaviors, 2);
        assert_eq!(summary.criteria, 1);
        assert_eq!(summary.name_mappings, 2);
        assert_eq!(summary.type_mappings, 1);
        assert_eq!(summary.flatten_paths, 1);
    }

    #[test]
    fn test_is_flattened() {
        let format = sample_format();
        assert!(format.is_flattened("cpCode.value"));
        assert!(format.is_flattened("rules.cpCode.value"));
        assert!(!format.is_flattened("cpCode"));
    }

    #[test]
    fn test_empty_version_is_rejected() {
        let err = RuleFormat::builder("  ").build().unwrap_err();
        assert!(matches!(err, Error::Definition { .. }));
    }

    #[test]
    fn test_ambiguous_names_make_format_unusable() {
        let err = RuleFormat::builder("rules_v2024_10_21")
            .name_mapping("dn", "DN")
            .name_mapping("dc", "DN")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::AmbiguousNameMapping { .. }));
    }

    #[test]
    fn test_json_round_trip_helpers() {
        let format = sample_format();
        let wire = json!({
            "adScalerCircuitBreaker": {"returnErrorResponseCodeBased": "500"},
            "cpCode": {"value": [{"id": 7}]}
        });

        let (internal, report) = format.to_internal_json(wire.clone()).unwrap();
        assert_eq!(report.metadata.version, format.version());
        assert_eq!(
            internal,
            json!({
                "adScalerCircuitBreaker": {"returnErrorResponseCodeBased": 500},
                "cpCode": {"value": {"id": 7}}
            })
        );

        let (back, _) = format.to_wire_json(internal).unwrap();
        assert_eq!(back, wire);
    }
}
