//! Named source tables and the per-run registry that holds them.

use std::collections::BTreeMap;

use crate::batch::{Column, ColumnBatch};
use crate::error::{Result, TabularError};

/// A loaded legacy spreadsheet: a name plus its column batch.
///
/// Source tables are read-only once loaded.
#[derive(Debug, Clone)]
pub struct SourceTable {
    name: String,
    batch: ColumnBatch,
}

impl SourceTable {
    pub fn new(name: impl Into<String>, batch: ColumnBatch) -> Self {
        Self {
            name: name.into(),
            batch,
        }
    }

    /// Build a table from named columns.
    pub fn from_columns(name: impl Into<String>, columns: Vec<(String, Column)>) -> Result<Self> {
        let name = name.into();
        let batch = ColumnBatch::from_columns(columns).map_err(|e| match e {
            TabularError::Schema(msg) => TabularError::Schema(format!("table '{name}': {msg}")),
            other => other,
        })?;
        Ok(Self { name, batch })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn batch(&self) -> &ColumnBatch {
        &self.batch
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.batch.column_by_name(name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch.column_names()
    }
}

/// Registry of source tables for one pipeline run, keyed by table name.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    tables: BTreeMap<String, SourceTable>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a table. Fails if a table with the same name is present.
    pub fn insert(&mut self, table: SourceTable) -> Result<()> {
        if self.tables.contains_key(table.name()) {
            return Err(TabularError::DuplicateTable(table.name().to_string()));
        }
        self.tables.insert(table.name().to_string(), table);
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_table(mut self, table: SourceTable) -> Result<Self> {
        self.insert(table)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&SourceTable> {
        self.tables.get(name)
    }

    /// Release a table once nothing else needs it.
    pub fn remove(&mut self, name: &str) -> Option<SourceTable> {
        self.tables.remove(name)
    }

    /// Table names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceTable> {
        self.tables.values()
    }
}
