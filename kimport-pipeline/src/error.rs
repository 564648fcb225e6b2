//! Error types for pipeline runs

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that abort a pipeline run.
///
/// Failures inside one collection are wrapped in [`PipelineError::Collection`]
/// so the message always names the collection being processed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No direct or reference rule designates a driving table
    #[error("No source rule designates a driving table (declared columns: {})", declared.join(", "))]
    MissingSourceRule { declared: Vec<String> },

    /// A rule names a table absent from the source registry
    #[error(
        "Source table '{table}' (read by column '{column}') not found; available tables: {}",
        list_or_none(available)
    )]
    SourceTableNotFound {
        table: String,
        column: String,
        available: Vec<String>,
    },

    /// A rule names a column absent from its source table
    #[error(
        "Source column '{source_column}' (read by column '{column}') not found in table '{table}'; available columns: {}",
        list_or_none(available)
    )]
    SourceColumnNotFound {
        table: String,
        source_column: String,
        column: String,
        available: Vec<String>,
    },

    /// A reference rule names a collection that has no identity map
    #[error(
        "Column '{column}' references collection '{referenced}', which has no identity map; collections with identities: {}",
        list_or_none(available)
    )]
    UnknownReferencedCollection {
        column: String,
        referenced: String,
        available: Vec<String>,
    },

    /// A freshly built identity map failed verification
    #[error(
        "Identity map for key column '{column}' failed verification: {reason} (expected {expected} entries, found {actual})"
    )]
    IdentityIntegrity {
        column: String,
        reason: String,
        expected: usize,
        actual: usize,
    },

    /// Reference tokens with no identity, under the strict policy
    #[error("Column '{column}' row {row}: unresolved reference(s) to '{referenced}': {}", tokens.join(", "))]
    UnresolvedReference {
        column: String,
        referenced: String,
        /// 1-based data row (header excluded)
        row: usize,
        tokens: Vec<String>,
    },

    /// A generated reference points outside the referenced output table
    #[error(
        "Column '{column}' holds {count} identifier(s) missing from collection '{referenced}' (first: {first})"
    )]
    ReferentialClosure {
        column: String,
        referenced: String,
        count: usize,
        first: String,
    },

    /// Two collections whose tables would land on the same archive entry
    #[error("Collections '{first}' and '{second}' would both be written to '{path}'")]
    ArchivePathCollision {
        path: String,
        first: String,
        second: String,
    },

    /// Failure while processing one collection
    #[error("Collection '{collection}': {source}")]
    Collection {
        collection: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error(transparent)]
    Tabular(#[from] kimport_tabular::TabularError),

    #[error(transparent)]
    Mapping(#[from] kimport_mapping::MappingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

impl PipelineError {
    /// Wrap `self` with the collection being processed.
    pub fn in_collection(self, collection: impl Into<String>) -> Self {
        PipelineError::Collection {
            collection: collection.into(),
            source: Box::new(self),
        }
    }

    /// Innermost collection the failure happened in, if any.
    pub fn collection(&self) -> Option<&str> {
        match self {
            PipelineError::Collection { collection, source } => {
                source.collection().or(Some(collection.as_str()))
            }
            _ => None,
        }
    }

    /// The underlying failure, without collection wrappers.
    pub fn root(&self) -> &PipelineError {
        match self {
            PipelineError::Collection { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_wrapping() {
        let err = PipelineError::SourceTableNotFound {
            table: "Old Invoices".into(),
            column: "Number".into(),
            available: vec!["Old Suppliers".into()],
        }
        .in_collection("Invoices");

        assert_eq!(err.collection(), Some("Invoices"));
        assert!(matches!(err.root(), PipelineError::SourceTableNotFound { .. }));
        let msg = err.to_string();
        assert!(msg.starts_with("Collection 'Invoices': Source table 'Old Invoices'"));
        assert!(msg.contains("available tables: Old Suppliers"));
    }

    #[test]
    fn test_empty_alternatives() {
        let err = PipelineError::UnknownReferencedCollection {
            column: "Supplier".into(),
            referenced: "Suppliers".into(),
            available: vec![],
        };
        assert!(err.to_string().ends_with("collections with identities: (none)"));
    }
}
