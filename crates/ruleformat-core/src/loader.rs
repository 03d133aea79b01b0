//! Loading rule format definitions from JSON and YAML files
//!
//! A definition file carries one rule format:
//!
//! ```yaml
//! version: rules_v2024_10_21
//! behaviors_schemas:
//!   cpCode: {}
//! type_mappings:
//!   adScalerCircuitBreaker.returnErrorResponseCodeBased.500: 500
//! name_mappings:
//!   issuerRDNs.description: DESCRIPTION
//! should_flatten:
//!   - cpCode.value
//! ```
//!
//! The camelCase spellings (`typeMappings`, `shouldFlatten`, ...) are accepted
//! as well.
//!
//! Copyright (c) 2025 Ruleformat Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::format::{RuleFormat, RuleFormatBuilder, SchemaTable};
use crate::node::Literal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Serializable form of a [`RuleFormat`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDefinition {
    pub version: String,
    #[serde(default, alias = "behaviorsSchemas")]
    pub behaviors_schemas: SchemaTable,
    #[serde(default, alias = "criteriaSchemas")]
    pub criteria_schemas: SchemaTable,
    #[serde(default, alias = "typeMappings")]
    pub type_mappings: BTreeMap<String, Value>,
    #[serde(default, alias = "nameMappings")]
    pub name_mappings: BTreeMap<String, String>,
    #[serde(default, alias = "shouldFlatten")]
    pub should_flatten: Vec<String>,
}

impl FormatDefinition {
    /// Validate the definition and build the rule format it describes
    ///
    /// # Errors
    ///
    /// Fails when a type mapping does not target a scalar literal, or when
    /// [`RuleFormatBuilder::build`] rejects the tables.
    pub fn into_format(self) -> Result<RuleFormat> {
        let mut builder = RuleFormatBuilder::new(self.version)
            .behaviors_schemas(self.behaviors_schemas)
            .criteria_schemas(self.criteria_schemas);

        for (key, value) in &self.type_mappings {
            let literal = Literal::from_json(value).ok_or_else(|| {
                Error::definition(format!(
                    "type mapping '{}' must map to a string, number or boolean, not {}",
                    key, value
                ))
            })?;
            builder = builder.type_mapping(key, literal);
        }
        for (wire, canonical) in self.name_mappings {
            builder = builder.name_mapping(wire, canonical);
        }
        for path in self.should_flatten {
            builder = builder.flatten(path);
        }

        builder.build()
    }
}

impl TryFrom<FormatDefinition> for RuleFormat {
    type Error = Error;

    fn try_from(definition: FormatDefinition) -> Result<Self> {
        definition.into_format()
    }
}

/// Document formats a definition or options file may use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Json,
    Yaml,
}

fn document_kind(path: &Path) -> Option<DocumentKind> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Some(DocumentKind::Json),
        Some("yaml") | Some("yml") => Some(DocumentKind::Yaml),
        _ => None,
    }
}

/// Read a `.json`, `.yaml` or `.yml` file into a JSON value
///
/// # Errors
///
/// Fails on IO errors, parse errors, or an unsupported extension.
pub fn read_document(path: &Path) -> Result<Value> {
    let kind = document_kind(path).ok_or_else(|| Error::Definition {
        message: "unsupported file format, expected .json, .yaml or .yml".to_string(),
        path: Some(path.to_path_buf()),
    })?;

    let content = fs::read_to_string(path)?;
    let value = match kind {
        DocumentKind::Json => serde_json::from_str(&content)?,
        DocumentKind::Yaml => serde_yaml::from_str(&content)?,
    };
    Ok(value)
}

/// Load one rule format from a definition file
///
/// # Errors
///
/// Fails when the file cannot be read or parsed, or describes an invalid
/// rule format.
pub fn load_definition(path: impl AsRef<Path>) -> Result<RuleFormat> {
    let path = path.as_ref();
    let document = read_document(path)?;
    let definition: FormatDefinition =
        serde_json::from_value(document).map_err(|e| Error::Definition {
            message: e.to_string(),
            path: Some(path.to_path_buf()),
        })?;

    let format = definition.into_format().map_err(|e| attach_path(e, path))?;
    log::debug!("loaded rule format {} from {}", format.version(), path.display());
    Ok(format)
}

/// Load every definition file directly inside `dir`, in file-name order
///
/// Files with other extensions are skipped with a warning. Any invalid
/// definition aborts the whole load.
///
/// # Errors
///
/// Fails when the directory cannot be read or any definition is invalid.
pub fn load_definitions_dir(dir: impl AsRef<Path>) -> Result<Vec<RuleFormat>> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if document_kind(&path).is_some() {
            paths.push(path);
        } else {
            log::warn!("skipping {}: not a rule format definition", path.display());
        }
    }
    paths.sort();

    paths.iter().map(load_definition).collect()
}

fn attach_path(err: Error, path: &Path) -> Error {
    match err {
        Error::Definition { message, path: None } => Error::Definition {
            message,
            path: Some(path.to_path_buf()),
        },
        other => other,
    }
}
