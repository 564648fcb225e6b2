//! Error types for tabular operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from tabular batch operations.
#[derive(Debug, Error)]
pub enum TabularError {
    /// Schema or structural error (column count mismatch, row count mismatch, etc.)
    #[error("Schema error: {0}")]
    Schema(String),

    /// Two columns in one table share a header
    #[error("Duplicate column '{column}' in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    /// A table with this name is already registered
    #[error("Table '{0}' is already registered")]
    DuplicateTable(String),

    /// Malformed CSV input
    #[error("CSV error in '{table}' (line {line}): {message}")]
    Csv {
        table: String,
        line: u64,
        message: String,
    },

    /// Failed to open or read a source file
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for tabular operations.
pub type Result<T> = std::result::Result<T, TabularError>;
