//! Ruleformat Core - Versioned rule-tree translation between wire and canonical forms
//!
//! A CDN configuration API describes behaviors and match criteria as a nested
//! "rule tree" whose JSON shape drifts from one schema version to the next:
//! field names change, enumerations are encoded as strings, and single values
//! are wrapped in one-element lists. This crate keeps one canonical shape on
//! the tool side and translates to and from each wire version, losslessly.
//!
//! # Main Components
//!
//! - **Registry**: [`SchemaRegistry`] resolves a version tag to its [`RuleFormat`]
//! - **Rule formats**: name, type and flatten tables plus opaque schema data
//! - **Traversal**: [`TraversalEngine`] walks a tree and applies the tables
//! - **Issues**: structural problems are collected, not raised, unless the
//!   caller asks for [`StrictMode::Strict`]
//!
//! # Example
//!
//! ```no_run
//! use ruleformat_core::{RuleFormat, RegistryBuilder, Result};
//! use serde_json::json;
//!
//! fn example() -> Result<()> {
//!     let registry = RegistryBuilder::new()
//!         .register(
//!             RuleFormat::builder("rules_v2024_10_21")
//!                 .flatten("cpCode.value")
//!                 .build()?,
//!         )
//!         .build()?;
//!
//!     let format = registry.resolve("rules_v2024_10_21")?;
//!     let (internal, _report) = format.to_internal_json(json!({"cpCode": {"value": [{"id": 1}]}}))?;
//!     assert_eq!(internal, json!({"cpCode": {"value": {"id": 1}}}));
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod flattener;
pub mod format;
pub mod loader;
pub mod name_mapper;
pub mod node;
pub mod path;
pub mod registry;
pub mod report;
pub mod traversal;
pub mod type_coercer;
pub mod version;

// Re-export main types for convenience
pub use config::{TransformOptions, DEFAULT_MAX_DEPTH};
pub use error::{Error, Result, Severity, StrictMode};
pub use format::{FormatSummary, RuleFormat, RuleFormatBuilder, SchemaTable};
pub use loader::{load_definition, load_definitions_dir, FormatDefinition};
pub use node::{Fields, Literal, RuleNode};
pub use path::{DottedPath, PathTable};
pub use registry::{RegistryBuilder, SchemaRegistry};
pub use report::{IssueKind, IssueSummary, IssueTracker, TransformIssue};
pub use traversal::{Direction, TransformMetadata, Transformed, TraversalEngine};
pub use version::RuleFormatVersion;

// Table types, for callers that drive the pieces directly
pub use flattener::{Flattener, MultipleValues};
pub use name_mapper::NameMapper;
pub use type_coercer::{TypeCoercer, TypeMapping};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
