//! Tabular column batch types for kimport.
//!
//! This crate provides the in-memory representation of legacy spreadsheet
//! data consumed by the identity and reference pipeline, and of the tables
//! the pipeline produces.
//!
//! # Design
//!
//! - **Columnar storage**: Data is stored in typed `Vec` per column, not per-row
//! - **Strongly typed**: All column access is through the `Column` enum, no `dyn Any`
//! - **Name canonical**: Spreadsheet headers are the canonical identifier for columns
//! - **Narrowable**: Columns can be narrowed to smaller numeric types or
//!   dictionary-encoded (see [`narrow`]) to bound memory on large inputs
//! - **Caller-owned registries**: A [`SourceRegistry`] is a plain value scoped to
//!   one run; nothing is cached process-wide

pub mod batch;
pub mod loader;
pub mod error;
pub mod narrow;
pub mod table;

pub use batch::{BatchSchema, Column, ColumnBatch, FieldInfo, FieldType};
pub use loader::{read_csv, read_csv_path, CsvReadOptions};
pub use error::{Result, TabularError};
pub use table::{SourceRegistry, SourceTable};
