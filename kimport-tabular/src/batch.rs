//! Columnar batch format for tabular data.
//!
//! This module provides a columnar batch format for spreadsheet-shaped data.
//! The `ColumnBatch` type stores data in typed column vectors with schema
//! information.
//!
//! # Design
//!
//! - **Columnar storage**: Data is stored in typed `Vec` per column, not per-row
//! - **Strongly typed**: All column access is through the `Column` enum, no `dyn Any`
//! - **Canonical keys**: Every cell has one textual rendering ([`Column::key`])
//!   shared by identity keys and serialization, independent of the physical type

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, TabularError};

/// Tabular field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    String,
    /// Dictionary-encoded strings
    Categorical,
}

/// Field information for a column in a batch.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    /// Column header - canonical identifier for lookups.
    pub name: String,
    /// Field type.
    pub field_type: FieldType,
    /// Whether the field contains (or allows) nulls.
    pub nullable: bool,
}

impl FieldInfo {
    pub fn new(name: impl Into<String>, field_type: FieldType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable,
        }
    }
}

/// Schema for a column batch.
#[derive(Debug, Clone)]
pub struct BatchSchema {
    /// Field definitions in column order.
    pub fields: Vec<FieldInfo>,
    /// Lookup by header.
    name_to_index: HashMap<String, usize>,
}

impl BatchSchema {
    /// Create a new batch schema from field definitions.
    ///
    /// Fails if two fields share a name.
    pub fn new(fields: Vec<FieldInfo>) -> Result<Self> {
        let mut name_to_index = HashMap::with_capacity(fields.len());
        for (i, f) in fields.iter().enumerate() {
            if name_to_index.insert(f.name.clone(), i).is_some() {
                return Err(TabularError::Schema(format!(
                    "Duplicate field name '{}' at position {}",
                    f.name, i
                )));
            }
        }

        Ok(Self {
            fields,
            name_to_index,
        })
    }

    /// Get field index by name.
    #[inline]
    pub fn index_by_name(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Get field info by name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldInfo> {
        self.index_by_name(name).map(|i| &self.fields[i])
    }

    /// Number of fields in the schema.
    #[inline]
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Same fields and lookup, with new physical types in column order.
    pub(crate) fn retyped(&self, types: impl Iterator<Item = FieldType>) -> Self {
        let mut schema = self.clone();
        for (field, field_type) in schema.fields.iter_mut().zip(types) {
            field.field_type = field_type;
        }
        schema
    }

    /// Field names in column order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Column storage - typed arrays with optional values (nullable).
#[derive(Debug, Clone)]
pub enum Column {
    Boolean(Vec<Option<bool>>),
    Int32(Vec<Option<i32>>),
    Int64(Vec<Option<i64>>),
    Float32(Vec<Option<f32>>),
    Float64(Vec<Option<f64>>),
    String(Vec<Option<String>>),
    /// Dictionary-encoded strings: each code indexes into `dictionary`.
    Categorical {
        codes: Vec<Option<u32>>,
        dictionary: Arc<[String]>,
    },
}

impl Column {
    /// Create an empty column of the given type.
    pub fn empty(field_type: FieldType) -> Self {
        Self::with_capacity(field_type, 0)
    }

    /// Create an empty column with pre-allocated capacity.
    pub fn with_capacity(field_type: FieldType, capacity: usize) -> Self {
        match field_type {
            FieldType::Boolean => Self::Boolean(Vec::with_capacity(capacity)),
            FieldType::Int32 => Self::Int32(Vec::with_capacity(capacity)),
            FieldType::Int64 => Self::Int64(Vec::with_capacity(capacity)),
            FieldType::Float32 => Self::Float32(Vec::with_capacity(capacity)),
            FieldType::Float64 => Self::Float64(Vec::with_capacity(capacity)),
            FieldType::String => Self::String(Vec::with_capacity(capacity)),
            FieldType::Categorical => Self::Categorical {
                codes: Vec::with_capacity(capacity),
                dictionary: Arc::from(Vec::new()),
            },
        }
    }

    /// Build a string column from borrowed cells.
    pub fn from_strs<'a>(values: impl IntoIterator<Item = Option<&'a str>>) -> Self {
        Self::String(values.into_iter().map(|v| v.map(str::to_string)).collect())
    }

    /// Get the number of rows in this column.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Self::Boolean(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::String(v) => v.len(),
            Self::Categorical { codes, .. } => codes.len(),
        }
    }

    /// Check if the column is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if value at index is null. NaN floats count as null.
    #[inline]
    pub fn is_null(&self, idx: usize) -> bool {
        match self {
            Self::Boolean(v) => v.get(idx).map_or(true, |v| v.is_none()),
            Self::Int32(v) => v.get(idx).map_or(true, |v| v.is_none()),
            Self::Int64(v) => v.get(idx).map_or(true, |v| v.is_none()),
            Self::Float32(v) => v.get(idx).map_or(true, |v| v.map_or(true, f32::is_nan)),
            Self::Float64(v) => v.get(idx).map_or(true, |v| v.map_or(true, f64::is_nan)),
            Self::String(v) => v.get(idx).map_or(true, |v| v.is_none()),
            Self::Categorical { codes, .. } => codes.get(idx).map_or(true, |v| v.is_none()),
        }
    }

    /// Number of null cells.
    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_null(i)).count()
    }

    /// Get the field type of this column.
    pub fn field_type(&self) -> FieldType {
        match self {
            Self::Boolean(_) => FieldType::Boolean,
            Self::Int32(_) => FieldType::Int32,
            Self::Int64(_) => FieldType::Int64,
            Self::Float32(_) => FieldType::Float32,
            Self::Float64(_) => FieldType::Float64,
            Self::String(_) => FieldType::String,
            Self::Categorical { .. } => FieldType::Categorical,
        }
    }

    /// Get boolean value at index (returns None if wrong type or null).
    #[inline]
    pub fn get_bool(&self, idx: usize) -> Option<bool> {
        match self {
            Self::Boolean(v) => v.get(idx).and_then(|v| *v),
            _ => None,
        }
    }

    /// Get integer value at index, widening `Int32` (returns None if wrong type or null).
    #[inline]
    pub fn get_i64(&self, idx: usize) -> Option<i64> {
        match self {
            Self::Int32(v) => v.get(idx).and_then(|v| v.map(i64::from)),
            Self::Int64(v) => v.get(idx).and_then(|v| *v),
            _ => None,
        }
    }

    /// Get float value at index, widening `Float32` (returns None if wrong type or null).
    #[inline]
    pub fn get_f64(&self, idx: usize) -> Option<f64> {
        let value = match self {
            Self::Float32(v) => v.get(idx).and_then(|v| v.map(f64::from)),
            Self::Float64(v) => v.get(idx).and_then(|v| *v),
            _ => None,
        };
        value.filter(|v| !v.is_nan())
    }

    /// Get string value at index for `String` and `Categorical` columns
    /// (returns None if wrong type or null).
    #[inline]
    pub fn get_string(&self, idx: usize) -> Option<&str> {
        match self {
            Self::String(v) => v.get(idx).and_then(|v| v.as_deref()),
            Self::Categorical { codes, dictionary } => codes
                .get(idx)
                .and_then(|c| *c)
                .and_then(|c| dictionary.get(c as usize))
                .map(String::as_str),
            _ => None,
        }
    }

    /// Canonical textual form of the cell at `idx`, or `None` when null.
    ///
    /// Strings are borrowed. Floats use the shortest round-trip rendering, so
    /// `3.0` renders as `3` and narrowing `Float64` to `Float32` (only done when
    /// lossless) keeps the same text.
    pub fn key(&self, idx: usize) -> Option<Cow<'_, str>> {
        match self {
            Self::Boolean(v) => v
                .get(idx)
                .and_then(|v| *v)
                .map(|b| Cow::Borrowed(if b { "true" } else { "false" })),
            Self::Int32(_) | Self::Int64(_) => {
                self.get_i64(idx).map(|n| Cow::Owned(n.to_string()))
            }
            Self::Float32(v) => v
                .get(idx)
                .and_then(|v| *v)
                .filter(|f| !f.is_nan())
                .map(|f| Cow::Owned(f.to_string())),
            Self::Float64(v) => v
                .get(idx)
                .and_then(|v| *v)
                .filter(|f| !f.is_nan())
                .map(|f| Cow::Owned(f.to_string())),
            Self::String(_) | Self::Categorical { .. } => self.get_string(idx).map(Cow::Borrowed),
        }
    }

    /// Iterator over the canonical textual form of every cell.
    pub fn keys(&self) -> impl Iterator<Item = Option<Cow<'_, str>>> + '_ {
        (0..self.len()).map(move |i| self.key(i))
    }

    /// Positionally align this column to `len` rows: truncate, or pad with nulls.
    pub fn aligned(&self, len: usize) -> Self {
        fn fit<T: Clone>(v: &[Option<T>], len: usize) -> Vec<Option<T>> {
            let mut out: Vec<Option<T>> = v.iter().take(len).cloned().collect();
            out.resize(len, None);
            out
        }

        match self {
            Self::Boolean(v) => Self::Boolean(fit(v, len)),
            Self::Int32(v) => Self::Int32(fit(v, len)),
            Self::Int64(v) => Self::Int64(fit(v, len)),
            Self::Float32(v) => Self::Float32(fit(v, len)),
            Self::Float64(v) => Self::Float64(fit(v, len)),
            Self::String(v) => Self::String(fit(v, len)),
            Self::Categorical { codes, dictionary } => Self::Categorical {
                codes: fit(codes, len),
                dictionary: Arc::clone(dictionary),
            },
        }
    }

    /// Approximate byte size of this column (for budget tracking).
    pub fn byte_size(&self) -> usize {
        match self {
            Self::Boolean(v) => v.len() * 2, // Option<bool> is 2 bytes
            Self::Int32(v) => v.len() * 8,   // Option<i32> with alignment
            Self::Int64(v) => v.len() * 16,
            Self::Float32(v) => v.len() * 8,
            Self::Float64(v) => v.len() * 16,
            Self::String(v) => v.iter().map(|s| s.as_ref().map_or(24, |s| s.len() + 24)).sum(),
            Self::Categorical { codes, dictionary } => {
                codes.len() * 8 + dictionary.iter().map(|s| s.len() + 24).sum::<usize>()
            }
        }
    }
}

/// Columnar batch: a schema plus equal-length columns.
#[derive(Debug, Clone)]
pub struct ColumnBatch {
    /// Schema for this batch.
    pub schema: Arc<BatchSchema>,
    /// Column data in schema order.
    pub columns: Vec<Column>,
    /// Number of rows in the batch.
    pub num_rows: usize,
}

impl ColumnBatch {
    /// Create a new column batch.
    pub fn new(schema: Arc<BatchSchema>, columns: Vec<Column>) -> Result<Self> {
        if columns.len() != schema.num_fields() {
            return Err(TabularError::Schema(format!(
                "Column count mismatch: schema has {} fields, got {} columns",
                schema.num_fields(),
                columns.len()
            )));
        }

        let num_rows = columns.first().map_or(0, |c| c.len());

        // Verify all columns have the same row count
        for (i, col) in columns.iter().enumerate() {
            if col.len() != num_rows {
                return Err(TabularError::Schema(format!(
                    "Row count mismatch: column '{}' has {} rows, expected {}",
                    schema.fields[i].name,
                    col.len(),
                    num_rows
                )));
            }
        }

        Ok(Self {
            schema,
            columns,
            num_rows,
        })
    }

    /// Build a batch from named columns, deriving the schema.
    pub fn from_columns(columns: Vec<(String, Column)>) -> Result<Self> {
        let fields = columns
            .iter()
            .map(|(name, col)| FieldInfo::new(name.clone(), col.field_type(), col.null_count() > 0))
            .collect();
        let schema = Arc::new(BatchSchema::new(fields)?);
        Self::new(schema, columns.into_iter().map(|(_, c)| c).collect())
    }

    /// Create an empty batch with the given schema.
    pub fn empty(schema: Arc<BatchSchema>) -> Self {
        let columns = schema
            .fields
            .iter()
            .map(|f| Column::empty(f.field_type))
            .collect();
        Self {
            schema,
            columns,
            num_rows: 0,
        }
    }

    /// Get column by name.
    #[inline]
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.schema.index_by_name(name).map(|i| &self.columns[i])
    }

    /// Get column by index.
    #[inline]
    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    /// Column headers in order.
    pub fn column_names(&self) -> Vec<String> {
        self.schema.names().map(str::to_string).collect()
    }

    /// Check if the batch is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    /// Approximate byte size of this batch (for budget tracking).
    pub fn byte_size(&self) -> usize {
        self.columns.iter().map(|c| c.byte_size()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_batch() -> ColumnBatch {
        ColumnBatch::from_columns(vec![
            ("id".to_string(), Column::Int64(vec![Some(1), Some(2), Some(3)])),
            (
                "name".to_string(),
                Column::from_strs([Some("Alice"), Some("Bob"), None]),
            ),
            (
                "active".to_string(),
                Column::Boolean(vec![Some(true), Some(false), Some(true)]),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_schema_lookup() {
        let batch = sample_batch();

        assert_eq!(batch.schema.index_by_name("id"), Some(0));
        assert_eq!(batch.schema.index_by_name("name"), Some(1));
        assert_eq!(batch.schema.index_by_name("unknown"), None);
        assert!(!batch.schema.field_by_name("id").unwrap().nullable);
        assert!(batch.schema.field_by_name("name").unwrap().nullable);
    }

    #[test]
    fn test_column_batch_creation() {
        let batch = sample_batch();
        assert_eq!(batch.num_rows, 3);
        assert_eq!(batch.column_names(), vec!["id", "name", "active"]);

        let name_col = batch.column_by_name("name").unwrap();
        assert_eq!(name_col.get_string(0), Some("Alice"));
        assert_eq!(name_col.get_string(2), None); // null

        let active_col = batch.column(2).unwrap();
        assert_eq!(active_col.get_bool(0), Some(true));
    }

    #[test]
    fn test_row_count_mismatch_rejected() {
        let err = ColumnBatch::from_columns(vec![
            ("a".to_string(), Column::Int64(vec![Some(1), Some(2)])),
            ("b".to_string(), Column::Int64(vec![Some(1)])),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("Row count mismatch"));
    }

    #[test]
    fn test_duplicate_header_rejected() {
        let err = ColumnBatch::from_columns(vec![
            ("a".to_string(), Column::Int64(vec![Some(1)])),
            ("a".to_string(), Column::Int64(vec![Some(2)])),
        ])
        .unwrap_err();
        assert!(matches!(err, TabularError::Schema(_)));
    }

    #[test]
    fn test_keys_render_canonically() {
        let floats = Column::Float64(vec![Some(3.0), Some(2.5), None, Some(f64::NAN)]);
        let keys: Vec<_> = floats.keys().map(|k| k.map(Cow::into_owned)).collect();
        assert_eq!(
            keys,
            vec![Some("3".to_string()), Some("2.5".to_string()), None, None]
        );
        assert_eq!(floats.null_count(), 2);

        let ints = Column::Int32(vec![Some(-7)]);
        assert_eq!(ints.key(0).as_deref(), Some("-7"));

        let cat = Column::Categorical {
            codes: vec![Some(1), None, Some(0)],
            dictionary: Arc::from(vec!["x".to_string(), "y".to_string()]),
        };
        assert_eq!(cat.key(0).as_deref(), Some("y"));
        assert_eq!(cat.key(1), None);
        assert!(matches!(cat.key(2), Some(Cow::Borrowed("x"))));
    }

    #[test]
    fn test_aligned_truncates_and_pads() {
        let col = Column::from_strs([Some("a"), Some("b"), Some("c")]);
        let short = col.aligned(2);
        assert_eq!(short.len(), 2);
        assert_eq!(short.get_string(1), Some("b"));

        let long = col.aligned(5);
        assert_eq!(long.len(), 5);
        assert_eq!(long.get_string(2), Some("c"));
        assert!(long.is_null(3));
        assert!(long.is_null(4));
    }
}
