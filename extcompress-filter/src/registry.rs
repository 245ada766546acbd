//! Content-type to filter mapping.
//!
//! Lookup is two-level: an exact content-type match wins, otherwise the
//! primary type (the part before `/`) is tried as a fallback bucket. The
//! registry is read-only once built and can be shared freely between
//! threads.

use crate::filter::Filter;
use extcompress_core::{ContentType, ExtCompressError, FilterDescriptor, Result};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error};

/// Default content types and the programs that handle them.
const DEFAULT_UNIX_FILTERS: [(&str, &str); 3] = [
    ("application/x-bzip2", "bzip2"),
    ("application/gzip", "gzip"),
    ("application/x-xz", "xz"),
];

/// Default content types passed through unchanged.
const DEFAULT_PASSTHROUGH: [&str; 2] = [ContentType::TEXT_PLAIN, ContentType::EMPTY];

/// Mapping from content type to [`FilterDescriptor`].
#[derive(Debug, Clone)]
pub struct FilterRegistry {
    filters: BTreeMap<String, Arc<FilterDescriptor>>,
}

impl FilterRegistry {
    /// Create a registry with no filters.
    pub fn empty() -> Self {
        Self {
            filters: BTreeMap::new(),
        }
    }

    /// Create a registry with the bzip2, gzip, xz, and pass-through filters.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for (content_type, program) in DEFAULT_UNIX_FILTERS {
            registry.register(content_type, FilterDescriptor::unix_filter(program));
        }
        for content_type in DEFAULT_PASSTHROUGH {
            registry.register(content_type, FilterDescriptor::passthrough());
        }
        registry
    }

    /// Parse a registry from JSON.
    ///
    /// The document is an object keyed by content type (or primary type for
    /// a fallback bucket), each value a serialized [`FilterDescriptor`]:
    ///
    /// ```json
    /// {
    ///   "application/zstd": {
    ///     "program": "zstd",
    ///     "args": { "stream-compress": ["-c"], "stream-decompress": ["-d", "-c"] }
    ///   }
    /// }
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let filters: BTreeMap<String, FilterDescriptor> =
            serde_json::from_str(json).map_err(|e| ExtCompressError::invalid_config(e.to_string()))?;
        if let Some((content_type, _)) = filters.iter().find(|(_, d)| d.program().is_empty()) {
            return Err(ExtCompressError::invalid_config(format!(
                "empty program for {}",
                content_type
            )));
        }
        Ok(Self {
            filters: filters
                .into_iter()
                .map(|(content_type, descriptor)| (content_type, Arc::new(descriptor)))
                .collect(),
        })
    }

    /// Load a registry from a JSON file. See [`from_json_str`](Self::from_json_str).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serialize the registry to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String> {
        let plain: BTreeMap<&str, &FilterDescriptor> = self.iter().collect();
        serde_json::to_string_pretty(&plain).map_err(|e| ExtCompressError::invalid_config(e.to_string()))
    }

    /// Add or replace the filter for a content type or primary type.
    pub fn register(&mut self, content_type: impl Into<String>, descriptor: FilterDescriptor) {
        self.filters.insert(content_type.into(), Arc::new(descriptor));
    }

    /// Resolve a handler for `content_type`.
    ///
    /// The returned handler reports `content_type` as its identity even when
    /// it was found through the primary-type fallback.
    pub fn lookup(&self, content_type: &str) -> Result<Filter> {
        let wanted = ContentType::from(content_type);
        self.filters
            .get(wanted.as_str())
            .or_else(|| self.filters.get(wanted.primary()))
            .map(|descriptor| Filter::new(wanted.clone(), Arc::clone(descriptor)))
            .ok_or_else(|| ExtCompressError::unknown_content_type(content_type))
    }

    /// Check if a handler exists for `content_type`, fallback included.
    pub fn supports(&self, content_type: &str) -> bool {
        self.lookup(content_type).is_ok()
    }

    /// Registered keys, sorted.
    pub fn content_types(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Registered keys with their descriptors, sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterDescriptor)> {
        self.filters
            .iter()
            .map(|(content_type, descriptor)| (content_type.as_str(), descriptor.as_ref()))
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Verify every registered program can be found in the search path.
    ///
    /// Meant to run once at startup so a missing program fails fast
    /// instead of on first use.
    pub fn check_programs(&self) -> Result<()> {
        for (content_type, descriptor) in self.iter() {
            match which::which(descriptor.program()) {
                Ok(path) => {
                    debug!(content_type, program = descriptor.program(), path = %path.display(), "Handler available");
                }
                Err(e) => {
                    error!(content_type, program = descriptor.program(), error = %e, "Handler unavailable");
                    return Err(ExtCompressError::program_not_found(
                        descriptor.program(),
                        content_type,
                    ));
                }
            }
        }
        Ok(())
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extcompress_core::OperationMode;

    #[test]
    fn test_defaults_round_trip_identity() {
        let registry = FilterRegistry::with_defaults();
        assert_eq!(registry.len(), 5);
        for content_type in registry.content_types() {
            let filter = registry.lookup(content_type).unwrap();
            assert_eq!(filter.content_type(), content_type);
        }
    }

    #[test]
    fn test_unknown_content_type() {
        let registry = FilterRegistry::with_defaults();
        let err = registry.lookup("application/x-totally-unknown").unwrap_err();
        match err {
            ExtCompressError::UnknownContentType { content_type } => {
                assert_eq!(content_type, "application/x-totally-unknown");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_primary_type_fallback() {
        let mut registry = FilterRegistry::with_defaults();
        assert!(!registry.supports("text/x-shellscript"));

        registry.register("text", FilterDescriptor::passthrough());
        let filter = registry.lookup("text/x-shellscript").unwrap();
        assert_eq!(filter.content_type(), "text/x-shellscript");
        assert_eq!(filter.descriptor().program(), "cat");

        // Exact matches still win over the bucket.
        let filter = registry.lookup("text/plain").unwrap();
        assert_eq!(filter.content_type(), "text/plain");
    }

    #[test]
    fn test_from_json_replaces_defaults() {
        let json = r#"{
            "application/zstd": {
                "program": "zstd",
                "args": { "stream-compress": ["-c"], "stream-decompress": ["-d", "-c"] }
            }
        }"#;
        let registry = FilterRegistry::from_json_str(json).unwrap();
        assert_eq!(registry.len(), 1);
        let filter = registry.lookup("application/zstd").unwrap();
        assert_eq!(
            filter.descriptor().command_line(OperationMode::StreamDecompress),
            "zstd -d -c"
        );
        assert!(!registry.supports("application/gzip"));
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        assert!(matches!(
            FilterRegistry::from_json_str("[1, 2]"),
            Err(ExtCompressError::InvalidConfig { .. })
        ));
        assert!(matches!(
            FilterRegistry::from_json_str(r#"{ "text/plain": { "program": "" } }"#),
            Err(ExtCompressError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_json_output_parses_back() {
        let registry = FilterRegistry::with_defaults();
        let json = registry.to_json_pretty().unwrap();
        let parsed = FilterRegistry::from_json_str(&json).unwrap();
        assert_eq!(parsed.len(), registry.len());
        assert_eq!(
            parsed.lookup("application/x-xz").unwrap().descriptor(),
            registry.lookup("application/x-xz").unwrap().descriptor()
        );
    }

    #[test]
    fn test_check_programs_reports_missing() {
        let mut registry = FilterRegistry::empty();
        registry.register(
            "application/x-missing",
            FilterDescriptor::unix_filter("extcompress-no-such-program"),
        );
        match registry.check_programs() {
            Err(ExtCompressError::ProgramNotFound { program, content_type }) => {
                assert_eq!(program, "extcompress-no-such-program");
                assert_eq!(content_type, "application/x-missing");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_check_programs_passthrough() {
        let mut registry = FilterRegistry::empty();
        registry.register("text/plain", FilterDescriptor::passthrough());
        registry.check_programs().unwrap();
    }
}
