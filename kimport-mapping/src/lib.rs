//! Mapping specifications for legacy spreadsheet imports
//!
//! This crate describes how the columns of legacy spreadsheets populate the
//! collections of the target CRM. Each collection is a set of target columns,
//! each populated by a [`FieldRule`]:
//!
//! - **Identity**: a freshly generated identifier per row, optionally keyed on
//!   a natural-key column of the driving table
//! - **Direct**: a verbatim copy of a source column
//! - **Reference**: source keys replaced by the identifiers they received in
//!   another collection
//!
//! # Usage
//!
//! Load the editor's JSON document with [`MappingLoader::from_path()`], then
//! call `compile()` to get a validated [`MappingSpec`]. The spec can compute
//! the [`ImportOrder`] in which generated collections must be loaded.

pub mod error;
pub mod loader;
pub mod mapping;

pub use error::{MappingError, MappingResult};
pub use loader::MappingLoader;
pub use mapping::{ColumnMapping, FieldRule, ImportOrder, MappingSpec, SourceRef};
