//! Table projection: one collection's mapping applied to the source tables.
//!
//! The driving rule (the first rule reading a source column) fixes the row
//! count and row order of the output. Rules reading other tables are aligned
//! to the driving table by row position.

use kimport_mapping::{ColumnMapping, FieldRule, SourceRef};
use kimport_tabular::{Column, ColumnBatch, SourceRegistry, SourceTable};

use crate::config::{PipelineOptions, UnresolvedPolicy};
use crate::error::{PipelineError, Result};
use crate::identity::{IdentityMap, IdentityMapper, IdentityMaps};
use crate::resolve::{ReferenceResolver, ReferenceStats};

/// A generated table for one collection.
#[derive(Debug, Clone)]
pub struct OutputTable {
    name: String,
    batch: ColumnBatch,
    identity_column: Option<String>,
    /// `(column, referenced collection)` for every reference column
    references: Vec<(String, String)>,
}

impl OutputTable {
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

    /// Name of the identity column, when the collection has one.
    pub fn identity_column_name(&self) -> Option<&str> {
        self.identity_column.as_deref()
    }

    pub fn identity_column(&self) -> Option<&Column> {
        self.identity_column
            .as_deref()
            .and_then(|name| self.batch.column_by_name(name))
    }

    /// Reference columns as `(column, referenced collection)`.
    pub fn reference_columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.references
            .iter()
            .map(|(column, referenced)| (column.as_str(), referenced.as_str()))
    }

    /// Narrow the underlying batch. Cell text is unchanged.
    pub fn narrow(self) -> Self {
        Self {
            batch: self.batch.narrow(),
            ..self
        }
    }
}

/// Output of projecting one collection.
#[derive(Debug, Clone)]
pub struct Projection {
    pub table: OutputTable,
    pub references: Vec<ReferenceStats>,
    /// Columns read from a secondary table whose row count differs from the
    /// driving table
    pub misaligned_columns: Vec<String>,
}

/// Natural-key column of a collection's identity rule.
#[derive(Debug, Clone, Copy)]
pub(crate) struct IdentityKey<'r> {
    /// Target identity column
    pub target: &'r str,
    /// Source column holding natural keys
    pub key_column: &'r str,
    pub values: &'r Column,
}

/// Resolve a source table by name.
pub(crate) fn lookup_table<'r>(
    registry: &'r SourceRegistry,
    table: &str,
    column: &str,
) -> Result<&'r SourceTable> {
    registry
        .get(table)
        .ok_or_else(|| PipelineError::SourceTableNotFound {
            table: table.to_string(),
            column: column.to_string(),
            available: registry.names(),
        })
}

/// Resolve a source column by name within its table.
pub(crate) fn lookup_column<'r>(
    table: &'r SourceTable,
    source_column: &str,
    column: &str,
) -> Result<&'r Column> {
    table
        .column(source_column)
        .ok_or_else(|| PipelineError::SourceColumnNotFound {
            table: table.name().to_string(),
            source_column: source_column.to_string(),
            column: column.to_string(),
            available: table.column_names(),
        })
}

/// The driving rule's target column, source and table.
pub(crate) fn driving_source<'r>(
    mapping: &'r ColumnMapping,
    registry: &'r SourceRegistry,
) -> Result<(&'r str, &'r SourceRef, &'r SourceTable)> {
    let (target, source) = mapping
        .driving_rule()
        .ok_or_else(|| PipelineError::MissingSourceRule {
            declared: mapping.column_names(),
        })?;
    let table = lookup_table(registry, &source.table, target)?;
    lookup_column(table, &source.column, target)?;
    Ok((target, source, table))
}

/// The identity key column of a collection, if it has an identity rule.
///
/// Keys come from the driving table: the rule's `key` column when named,
/// the driving column otherwise.
pub(crate) fn identity_key<'r>(
    collection: &str,
    mapping: &'r ColumnMapping,
    registry: &'r SourceRegistry,
) -> Result<Option<IdentityKey<'r>>> {
    let identities = mapping.identity_rules();
    if identities.len() > 1 {
        return Err(kimport_mapping::MappingError::MultipleIdentityRules {
            collection: collection.to_string(),
            columns: identities.iter().map(|(c, _)| c.to_string()).collect(),
        }
        .into());
    }
    let Some((target, key)) = mapping.identity() else {
        return Ok(None);
    };

    let (_, driving, table) = driving_source(mapping, registry)?;
    let key_column = key.unwrap_or(driving.column.as_str());
    let values = lookup_column(table, key_column, target)?;
    Ok(Some(IdentityKey {
        target,
        key_column,
        values,
    }))
}

/// Projects collections from a source registry using the run's identity maps.
pub struct TableProjector<'a> {
    registry: &'a SourceRegistry,
    identities: &'a IdentityMaps,
    options: &'a PipelineOptions,
}

impl<'a> TableProjector<'a> {
    pub fn new(
        registry: &'a SourceRegistry,
        identities: &'a IdentityMaps,
        options: &'a PipelineOptions,
    ) -> Self {
        Self {
            registry,
            identities,
            options,
        }
    }

    /// Project one collection.
    ///
    /// Output columns are the mapping's target columns: the identity column
    /// first, then the others in declaration order.
    pub fn project(
        &self,
        collection: &str,
        mapping: &ColumnMapping,
        mapper: &mut IdentityMapper<'_>,
    ) -> Result<Projection> {
        let (_, driving, driving_table) = driving_source(mapping, self.registry)?;
        let rows = driving_table.num_rows();
        if rows == 0 {
            tracing::warn!(
                collection,
                table = %driving.table,
                "driving table has no rows; collection will be empty"
            );
        }

        let mut columns: Vec<(String, Column)> = Vec::with_capacity(mapping.len());
        let mut identity_column = None;
        if let Some(key) = identity_key(collection, mapping, self.registry)? {
            let map = self.identity_map(collection, key.target)?;
            let ids: Vec<Option<String>> = (0..rows)
                .map(|row| {
                    let id = key
                        .values
                        .key(row)
                        .and_then(|k| map.get(&k))
                        .unwrap_or_else(|| mapper.fresh());
                    Some(id.to_string())
                })
                .collect();
            tracing::debug!(
                collection,
                column = key.target,
                key_column = key.key_column,
                rows,
                "allocated identity column"
            );
            columns.push((key.target.to_string(), Column::String(ids)));
            identity_column = Some(key.target.to_string());
        }

        let mut references = Vec::new();
        let mut reference_stats = Vec::new();
        let mut misaligned_columns = Vec::new();

        for (target, rule) in mapping.iter() {
            let column = match rule {
                FieldRule::Identity { .. } => continue,
                FieldRule::Direct(source) => {
                    let values = self.source_values(target, source)?;
                    if values.len() != rows {
                        self.misaligned(collection, target, source, values.len(), rows);
                        misaligned_columns.push(target.to_string());
                        values.aligned(rows)
                    } else {
                        values.clone()
                    }
                }
                FieldRule::Reference { source, collection: referenced } => {
                    let values = self.source_values(target, source)?;
                    if values.len() != rows {
                        self.misaligned(collection, target, source, values.len(), rows);
                        misaligned_columns.push(target.to_string());
                    }
                    let (column, stats) = self.resolve_column(target, values, referenced, rows)?;
                    references.push((target.to_string(), referenced.clone()));
                    reference_stats.push(stats);
                    column
                }
            };
            columns.push((target.to_string(), column));
        }

        let batch = ColumnBatch::from_columns(columns)?;
        tracing::debug!(
            collection,
            rows = batch.num_rows,
            columns = batch.schema.num_fields(),
            "projected collection"
        );

        Ok(Projection {
            table: OutputTable {
                name: collection.to_string(),
                batch,
                identity_column,
                references,
            },
            references: reference_stats,
            misaligned_columns,
        })
    }

    fn identity_map(&self, collection: &str, column: &str) -> Result<&'a IdentityMap> {
        self.identities
            .get(collection)
            .ok_or_else(|| PipelineError::UnknownReferencedCollection {
                column: column.to_string(),
                referenced: collection.to_string(),
                available: self.identities.keys().cloned().collect(),
            })
    }

    fn source_values(&self, target: &str, source: &SourceRef) -> Result<&'a Column> {
        let table = lookup_table(self.registry, &source.table, target)?;
        lookup_column(table, &source.column, target)
    }

    fn misaligned(
        &self,
        collection: &str,
        target: &str,
        source: &SourceRef,
        source_rows: usize,
        rows: usize,
    ) {
        tracing::warn!(
            collection,
            column = target,
            table = %source.table,
            source_rows,
            driving_rows = rows,
            "secondary table row count differs from driving table; aligning by position"
        );
    }

    fn resolve_column(
        &self,
        target: &str,
        values: &Column,
        referenced: &str,
        rows: usize,
    ) -> Result<(Column, ReferenceStats)> {
        let map = self.identity_map(referenced, target)?;
        let resolver = ReferenceResolver::new(map, &self.options.reference_delimiter);
        let strict = self.options.unresolved_references == UnresolvedPolicy::Strict;

        let mut stats = ReferenceStats::new(target, referenced);
        let mut cells = Vec::with_capacity(rows);
        for row in 0..rows {
            let raw = values.key(row);
            let cell = resolver.resolve_cell(raw.as_deref());
            if strict && cell.is_degraded() {
                return Err(PipelineError::UnresolvedReference {
                    column: target.to_string(),
                    referenced: referenced.to_string(),
                    row: row + 1,
                    tokens: cell.unresolved,
                });
            }
            stats.record(&cell);
            cells.push(cell.into_cell());
        }

        if stats.is_degraded() {
            tracing::warn!(
                column = target,
                referenced,
                unresolved_tokens = stats.unresolved_tokens,
                degraded_cells = stats.degraded_cells,
                sample = ?stats.unresolved_sample,
                "reference resolution degraded: unresolved tokens dropped"
            );
        }
        Ok((Column::String(cells), stats))
    }
}
