//! Mapping structures
//!
//! A [`MappingSpec`] maps each target collection to a [`ColumnMapping`],
//! which maps each target column to a [`FieldRule`].

mod column_mapping;
mod field_rule;
mod order;
mod spec;

pub use column_mapping::ColumnMapping;
pub use field_rule::{FieldRule, SourceRef};
pub use order::ImportOrder;
pub use spec::MappingSpec;
