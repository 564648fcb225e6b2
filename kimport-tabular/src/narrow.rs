//! Memory narrowing for columns and batches.
//!
//! Large legacy spreadsheets repeat the same handful of categorical values
//! across thousands of rows and store small integers in 64-bit slots. The
//! narrowing pass rewrites a column into a smaller physical representation
//! without changing any cell's [`Column::key`] rendering:
//!
//! - `Int64` → `Int32` when every value fits
//! - `Float64` → `Float32` when every value round-trips exactly
//! - `String` → `Categorical` when fewer than half of the non-null cells are distinct

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::batch::{Column, ColumnBatch};

/// Distinct/non-null ratio below which strings are dictionary-encoded.
pub const CATEGORICAL_RATIO: f64 = 0.5;

impl Column {
    /// Narrow this column to a smaller physical representation where lossless.
    pub fn narrow(self) -> Column {
        match self {
            Column::Int64(values) => {
                if values
                    .iter()
                    .flatten()
                    .all(|v| i32::try_from(*v).is_ok())
                {
                    Column::Int32(values.into_iter().map(|v| v.map(|n| n as i32)).collect())
                } else {
                    Column::Int64(values)
                }
            }
            Column::Float64(values) => {
                if values
                    .iter()
                    .flatten()
                    .all(|v| v.is_nan() || f64::from(*v as f32) == *v)
                {
                    Column::Float32(values.into_iter().map(|v| v.map(|f| f as f32)).collect())
                } else {
                    Column::Float64(values)
                }
            }
            Column::String(values) => dictionary_encode(values),
            other => other,
        }
    }
}

fn dictionary_encode(values: Vec<Option<String>>) -> Column {
    let non_null = values.iter().flatten().count();
    let distinct = values
        .iter()
        .flatten()
        .map(String::as_str)
        .collect::<FxHashSet<&str>>()
        .len();

    if non_null == 0 || (distinct as f64) / (non_null as f64) >= CATEGORICAL_RATIO {
        return Column::String(values);
    }

    let mut index: FxHashMap<String, u32> = FxHashMap::default();
    let mut dictionary: Vec<String> = Vec::with_capacity(distinct);
    let codes = values
        .into_iter()
        .map(|v| {
            v.map(|s| {
                *index.entry(s).or_insert_with_key(|key| {
                    dictionary.push(key.clone());
                    (dictionary.len() - 1) as u32
                })
            })
        })
        .collect();

    Column::Categorical {
        codes,
        dictionary: Arc::from(dictionary),
    }
}

impl ColumnBatch {
    /// Narrow every column, rebuilding the schema to reflect the new types.
    pub fn narrow(self) -> ColumnBatch {
        let before = self.byte_size();
        let ColumnBatch {
            schema,
            columns,
            num_rows,
        } = self;

        let columns: Vec<Column> = columns.into_iter().map(Column::narrow).collect();
        let schema = Arc::new(schema.retyped(columns.iter().map(Column::field_type)));
        let batch = ColumnBatch {
            schema,
            columns,
            num_rows,
        };

        tracing::debug!(
            rows = num_rows,
            before_bytes = before,
            after_bytes = batch.byte_size(),
            "narrowed column batch"
        );
        batch
    }
}
