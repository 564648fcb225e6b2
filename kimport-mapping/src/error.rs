//! Mapping error types

use std::path::PathBuf;

use thiserror::Error;

/// Mapping-specific errors
#[derive(Debug, Error)]
pub enum MappingError {
    /// Error parsing a mapping document
    #[error("Parse error: {0}")]
    Parse(String),

    /// Failed to read a mapping document
    #[error("Failed to read mapping {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The same collection is declared twice
    #[error("Collection '{0}' is declared more than once")]
    DuplicateCollection(String),

    /// A collection declares no columns at all
    #[error("Collection '{0}' has no column rules")]
    EmptyCollection(String),

    /// More than one identity column in a collection
    #[error("Collection '{collection}' declares several identity columns: {}", columns.join(", "))]
    MultipleIdentityRules {
        collection: String,
        columns: Vec<String>,
    },

    /// No direct or reference rule names a driving source table
    #[error("Collection '{collection}' has no source rule (columns: {})", declared.join(", "))]
    MissingSourceRule {
        collection: String,
        declared: Vec<String>,
    },

    /// A reference rule names a collection absent from the mapping
    #[error(
        "Column '{column}' of collection '{collection}' references unknown collection '{referenced}' (declared: {})",
        declared.join(", ")
    )]
    UnknownReferencedCollection {
        collection: String,
        column: String,
        referenced: String,
        declared: Vec<String>,
    },

    /// A reference rule names a collection that generates no identifiers
    #[error(
        "Column '{column}' of collection '{collection}' references '{referenced}', which has no identity column"
    )]
    ReferencedCollectionWithoutIdentity {
        collection: String,
        column: String,
        referenced: String,
    },
}

impl From<serde_json::Error> for MappingError {
    fn from(e: serde_json::Error) -> Self {
        MappingError::Parse(e.to_string())
    }
}

/// Result type for mapping operations
pub type MappingResult<T> = Result<T, MappingError>;
