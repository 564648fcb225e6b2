//! Mapping document loading
//!
//! Mapping documents are JSON objects keyed by collection name, as saved by
//! the mapping editor. Loading is two-step: parse into a [`MappingLoader`],
//! then [`compile`](MappingLoader::compile) to get a validated [`MappingSpec`].

use std::path::Path;

use crate::error::{MappingError, MappingResult};
use crate::mapping::MappingSpec;

/// Parsed but not yet validated mapping document.
#[derive(Debug, Clone)]
pub struct MappingLoader {
    spec: MappingSpec,
}

impl MappingLoader {
    /// Parse a mapping document from JSON text.
    pub fn from_json(json: &str) -> MappingResult<Self> {
        let spec: MappingSpec = serde_json::from_str(json)?;
        tracing::debug!(collections = spec.len(), "parsed mapping document");
        Ok(Self { spec })
    }

    /// Parse a mapping document from an already-decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> MappingResult<Self> {
        let spec: MappingSpec = serde_json::from_value(value)?;
        Ok(Self { spec })
    }

    /// Read and parse a mapping document from disk.
    pub fn from_path(path: impl AsRef<Path>) -> MappingResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// The parsed spec, without validation.
    pub fn spec(&self) -> &MappingSpec {
        &self.spec
    }

    /// Unvalidated spec; pipeline runs detect structural problems themselves.
    pub fn into_spec(self) -> MappingSpec {
        self.spec
    }

    /// Validate and return the spec.
    pub fn compile(self) -> MappingResult<MappingSpec> {
        self.spec.validate()?;
        Ok(self.spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_rejects_incomplete_mapping() {
        let loader = MappingLoader::from_json(
            r#"{"Articles": {"ID": {"type": "uuid"},
                "Supplier": {"source_file": "A", "source_col": "S",
                             "is_ref": true, "ref_model": "Suppliers"}}}"#,
        )
        .unwrap();
        assert_eq!(loader.spec().len(), 1);
        assert!(matches!(
            loader.compile(),
            Err(MappingError::UnknownReferencedCollection { .. })
        ));
    }

    #[test]
    fn test_parse_error_has_context() {
        let err = MappingLoader::from_json(r#"{"Articles": {"ID": {"type": 3}}}"#).unwrap_err();
        match err {
            MappingError::Parse(msg) => assert!(msg.contains("collection 'Articles'"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = MappingLoader::from_path("/nonexistent/mapping.json").unwrap_err();
        assert!(matches!(err, MappingError::Io { .. }));
    }
}
