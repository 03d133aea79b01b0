//! Registry of rule formats keyed by version tag
//!
//! The registry is built once at startup, usually through [`RegistryBuilder`],
//! and then shared by reference (or behind an `Arc`) with everything that
//! needs to resolve a version. Writes after startup are possible but rare;
//! they go through a single lock so a duplicate tag can never slip in.
//!
//! Copyright (c) 2025 Ruleformat Team
//! Licensed under the Apache-2.0 license

use crate::error::{Error, Result};
use crate::format::RuleFormat;
use crate::loader::load_definitions_dir;
use crate::version::RuleFormatVersion;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Version-keyed store of immutable rule formats
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    formats: RwLock<BTreeMap<RuleFormatVersion, Arc<RuleFormat>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Add a format under its version tag
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateVersion`] when the tag is already taken; the
    /// registry is then unchanged. Any string is a valid tag.
    pub fn register(&self, format: RuleFormat) -> Result<Arc<RuleFormat>> {
        let version = RuleFormatVersion::new(format.version());
        let mut formats = self.formats.write().unwrap_or_else(PoisonError::into_inner);

        if formats.contains_key(&version) {
            return Err(Error::DuplicateVersion {
                version: version.to_string(),
            });
        }

        let format = Arc::new(format);
        log::debug!("registered rule format {}", version);
        formats.insert(version, Arc::clone(&format));
        Ok(format)
    }

    /// Look up the format registered under `version`
    ///
    /// # Errors
    ///
    /// [`Error::UnknownVersion`] listing the registered tags when nothing
    /// matches.
    pub fn resolve(&self, version: &str) -> Result<Arc<RuleFormat>> {
        let formats = self.formats.read().unwrap_or_else(PoisonError::into_inner);

        formats.get(&RuleFormatVersion::new(version)).cloned().ok_or_else(|| Error::UnknownVersion {
            version: version.to_string(),
            available: formats.keys().map(|v| v.to_string()).collect(),
        })
    }

    /// Registered tags: undated ones by string, then dated ones oldest first
    pub fn versions(&self) -> Vec<String> {
        let formats = self.formats.read().unwrap_or_else(PoisonError::into_inner);
        formats.keys().map(|v| v.to_string()).collect()
    }

    /// The most recently dated format, or the last undated tag when no
    /// registered tag carries a date
    pub fn latest(&self) -> Option<Arc<RuleFormat>> {
        let formats = self.formats.read().unwrap_or_else(PoisonError::into_inner);
        formats.values().next_back().cloned()
    }

    pub fn contains(&self, version: &str) -> bool {
        self.resolve(version).is_ok()
    }

    pub fn len(&self) -> usize {
        self.formats.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collects formats and builds a populated [`SchemaRegistry`]
///
/// Replaces init-time self-registration: callers construct the registry
/// explicitly and pass it to whatever resolves versions.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    formats: Vec<RuleFormat>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, format: RuleFormat) -> Self {
        self.formats.push(format);
        self
    }

    /// Queue every definition file found in `dir`
    ///
    /// # Errors
    ///
    /// Fails when the directory cannot be read or a definition is invalid.
    pub fn load_dir(mut self, dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let loaded = load_definitions_dir(dir)?;
        log::debug!("loaded {} rule format(s) from {}", loaded.len(), dir.display());
        self.formats.extend(loaded);
        Ok(self)
    }

    /// Register everything queued, in order
    ///
    /// # Errors
    ///
    /// The first registration error aborts the build.
    pub fn build(self) -> Result<SchemaRegistry> {
        let registry = SchemaRegistry::new();
        for format in self.formats {
            registry.register(format)?;
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use tempfile::TempDir;

    fn format(version: &str) -> RuleFormat {
        RuleFormat::builder(version).build().unwrap()
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = SchemaRegistry::new();
        registry.register(format("rules_v2024_10_21")).unwrap();
        registry.register(format("rules_v2023_01_05")).unwrap();

        let resolved = registry.resolve("rules_v2024_10_21").unwrap();
        assert_eq!(resolved.version(), "rules_v2024_10_21");

        match registry.resolve("rules_v1999_01_01").unwrap_err() {
            Error::UnknownVersion { version, available } => {
                assert_eq!(version, "rules_v1999_01_01");
                assert_eq!(available, vec!["rules_v2023_01_05", "rules_v2024_10_21"]);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = SchemaRegistry::new();
        let first = registry.register(format("rules_v2024_10_21")).unwrap();
        let err = registry.register(format("rules_v2024_10_21")).unwrap_err();

        assert!(matches!(err, Error::DuplicateVersion { .. }));
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&first, &registry.resolve("rules_v2024_10_21").unwrap()));
    }

    #[test]
    fn test_undated_tags_register_and_resolve() {
        let registry = SchemaRegistry::new();
        registry.register(format("latest")).unwrap();
        registry.register(format("v2023-01-05")).unwrap();

        assert_eq!(registry.resolve("latest").unwrap().version(), "latest");
        assert_eq!(registry.resolve("v2023-01-05").unwrap().version(), "v2023-01-05");
        assert!(matches!(
            registry.register(format("latest")),
            Err(Error::DuplicateVersion { .. })
        ));

        assert_eq!(registry.versions(), vec!["latest", "v2023-01-05"]);
        assert_eq!(registry.latest().unwrap().version(), "v2023-01-05");
    }

    #[test]
    fn test_latest_falls_back_to_undated_tags() {
        let registry = SchemaRegistry::builder()
            .register(format("beta"))
            .register(format("alpha"))
            .build()
            .unwrap();
        assert_eq!(registry.latest().unwrap().version(), "beta");
    }

    #[test]
    fn test_resolve_garbage_is_unknown() {
        let registry = SchemaRegistry::new();
        assert!(matches!(registry.resolve("nope"), Err(Error::UnknownVersion { .. })));
    }

    #[test]
    fn test_versions_and_latest() {
        let registry = SchemaRegistry::builder()
            .register(format("rules_v2024_10_21"))
            .register(format("rules_v2018_02_27"))
            .register(format("rules_v2023_01_05"))
            .build()
            .unwrap();

        assert_eq!(
            registry.versions(),
            vec!["rules_v2018_02_27", "rules_v2023_01_05", "rules_v2024_10_21"]
        );
        assert_eq!(registry.latest().unwrap().version(), "rules_v2024_10_21");
        assert!(registry.contains("rules_v2018_02_27"));
        assert!(SchemaRegistry::new().latest().is_none());
    }

    #[test]
    fn test_builder_stops_on_duplicate() {
        let result = RegistryBuilder::new()
            .register(format("rules_v2024_10_21"))
            .register(format("rules_v2024_10_21"))
            .build();
        assert!(matches!(result, Err(Error::DuplicateVersion { .. })));
    }

    #[test]
    fn test_builder_load_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.yaml"), "version: rules_v2023_01_05\n").unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"{"version": "rules_v2024_10_21", "should_flatten": ["cpCode.value"]}"#,
        )
        .unwrap();

        let registry = RegistryBuilder::new().load_dir(dir.path()).unwrap().build().unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.resolve("rules_v2024_10_21").unwrap().is_flattened("cpCode.value"));
    }

    #[test]
    fn test_concurrent_resolve() {
        let registry = Arc::new(
            RegistryBuilder::new()
                .register(format("rules_v2024_10_21"))
                .register(format("rules_v2023_01_05"))
                .build()
                .unwrap(),
        );

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    let tag = if i % 2 == 0 { "rules_v2024_10_21" } else { "rules_v2023_01_05" };
                    registry.resolve(tag).unwrap().version().to_string()
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let expected = if i % 2 == 0 { "rules_v2024_10_21" } else { "rules_v2023_01_05" };
            assert_eq!(handle.join().unwrap(), expected);
        }
    }
}
