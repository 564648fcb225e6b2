//! Import generation pipeline: mapping + sources → tables → audit → archive.
//!
//! ## Pipeline overview
//!
//! 1. **Identities**: for every collection with an identity rule, build an
//!    [`IdentityMap`] over its natural-key column and verify it
//! 2. **Projection**: project every collection against the complete set of
//!    identity maps; source tables are released after their last use
//! 3. **Closure check**: every identifier in a reference column must occur
//!    in the referenced table's identity column
//! 4. **Narrowing**: optional memory narrowing of the output tables
//! 5. **Packaging**: tables, audit, README and manifest zipped together
//!
//! All identity maps exist before any reference is resolved, so a collection
//! may reference one declared after it. Any hard failure aborts the run; no
//! archive is produced.

use std::time::Instant;

use kimport_mapping::MappingSpec;
use kimport_tabular::SourceRegistry;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::archive::{package, ResultArchive};
use crate::audit::AuditTable;
use crate::config::{ArchiveLayout, PipelineOptions};
use crate::error::{PipelineError, Result};
use crate::identity::{
    IdentifierSource, IdentityMap, IdentityMapper, IdentityMaps, MappingStats, RandomUuids,
};
use crate::project::{
    driving_source, identity_key, lookup_column, lookup_table, OutputTable, TableProjector,
};
use crate::report::{CollectionReport, PipelineReport};

// ============================================================================
// Output
// ============================================================================

/// Everything a run generates, before packaging.
#[derive(Debug, Clone)]
pub struct GeneratedImport {
    /// One table per collection, in declaration order
    pub tables: Vec<OutputTable>,
    pub audit: AuditTable,
    pub report: PipelineReport,
}

impl GeneratedImport {
    pub fn table(&self, collection: &str) -> Option<&OutputTable> {
        self.tables.iter().find(|t| t.name() == collection)
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Runs the two-pass generation for one mapping and one set of sources.
///
/// Holds no state between runs apart from the identifier source.
pub struct Pipeline<S: IdentifierSource = RandomUuids> {
    options: PipelineOptions,
    ids: S,
}

impl Pipeline<RandomUuids> {
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            options,
            ids: RandomUuids,
        }
    }
}

impl<S: IdentifierSource> Pipeline<S> {
    /// Pipeline drawing identifiers from `ids`.
    pub fn with_identifier_source(options: PipelineOptions, ids: S) -> Self {
        Self { options, ids }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Check that every table, column and referenced collection the mapping
    /// names is available, without generating identifiers.
    pub fn preflight(&self, spec: &MappingSpec, registry: &SourceRegistry) -> Result<()> {
        check_table_paths(spec, &self.options.layout)?;
        let with_identity: FxHashSet<&str> = spec
            .iter()
            .filter(|(_, mapping)| mapping.identity().is_some())
            .map(|(name, _)| name)
            .collect();

        for (name, mapping) in spec.iter() {
            let check = || -> Result<()> {
                driving_source(mapping, registry)?;
                identity_key(name, mapping, registry)?;
                for (target, rule) in mapping.iter() {
                    if let Some(source) = rule.source() {
                        let table = lookup_table(registry, &source.table, target)?;
                        lookup_column(table, &source.column, target)?;
                    }
                }
                for (target, _, referenced) in mapping.references() {
                    if !with_identity.contains(referenced) {
                        let mut available: Vec<String> =
                            with_identity.iter().map(|s| s.to_string()).collect();
                        available.sort();
                        return Err(PipelineError::UnknownReferencedCollection {
                            column: target.to_string(),
                            referenced: referenced.to_string(),
                            available,
                        });
                    }
                }
                Ok(())
            };
            check().map_err(|e| e.in_collection(name))?;
        }
        Ok(())
    }

    /// Generate output tables, audit and report.
    pub fn generate(&mut self, spec: &MappingSpec, mut registry: SourceRegistry) -> Result<GeneratedImport> {
        self.options.validate()?;
        check_table_paths(spec, &self.options.layout)?;
        let _span =
            tracing::info_span!("pipeline_run", collections = spec.len(), sources = registry.len())
                .entered();
        let start = Instant::now();
        tracing::info!("starting import generation");

        // Pass 1
        let (identities, audit, identity_stats) = self.build_identities(spec, &registry)?;

        // Pass 2
        let mut last_use: FxHashMap<String, usize> = FxHashMap::default();
        for (i, (_, mapping)) in spec.iter().enumerate() {
            for table in mapping.source_tables() {
                last_use.insert(table.to_string(), i);
            }
        }

        let mut tables = Vec::with_capacity(spec.len());
        let mut collections = Vec::with_capacity(spec.len());
        let mut mapper = IdentityMapper::new(&mut self.ids);
        for (i, (name, mapping)) in spec.iter().enumerate() {
            let _span = tracing::info_span!("collection", name).entered();

            let projector = TableProjector::new(&registry, &identities, &self.options);
            let projection = projector
                .project(name, mapping, &mut mapper)
                .map_err(|e| e.in_collection(name))?;
            tracing::info!(
                rows = projection.table.num_rows(),
                reference_columns = projection.references.len(),
                "collection projected"
            );

            collections.push(CollectionReport {
                name: name.to_string(),
                rows: projection.table.num_rows(),
                identity: identity_stats.get(name).copied(),
                references: projection.references,
                misaligned_columns: projection.misaligned_columns,
            });
            tables.push(projection.table);

            for table in mapping.source_tables() {
                if last_use.get(table) == Some(&i) {
                    if let Some(released) = registry.remove(table) {
                        tracing::debug!(
                            table,
                            rows = released.num_rows(),
                            bytes = released.batch().byte_size(),
                            "released source table"
                        );
                    }
                }
            }
        }
        drop(registry);

        check_closure(&tables, &self.options.reference_delimiter)?;

        if self.options.optimize_tables {
            let before: usize = tables.iter().map(|t| t.batch().byte_size()).sum();
            tables = tables.into_iter().map(OutputTable::narrow).collect();
            let after: usize = tables.iter().map(|t| t.batch().byte_size()).sum();
            tracing::debug!(bytes_before = before, bytes_after = after, "narrowed output tables");
        }

        let report = PipelineReport {
            collections,
            import_order: spec.import_order(),
        };
        tracing::info!(
            tables = tables.len(),
            rows = report.total_rows(),
            audit_records = audit.len(),
            unresolved_references = report.unresolved_tokens(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "import generation complete"
        );

        Ok(GeneratedImport { tables, audit, report })
    }

    /// Generate and package into a result archive.
    pub fn run(&mut self, spec: &MappingSpec, registry: SourceRegistry) -> Result<ResultArchive> {
        let generated = self.generate(spec, registry)?;
        package(&generated.tables, &generated.audit, generated.report, &self.options)
    }

    // ========================================================================
    // Pass 1
    // ========================================================================

    fn build_identities(
        &mut self,
        spec: &MappingSpec,
        registry: &SourceRegistry,
    ) -> Result<(IdentityMaps, AuditTable, FxHashMap<String, MappingStats>)> {
        let mut identities = IdentityMaps::new();
        let mut audit = AuditTable::new();
        let mut stats_by_collection = FxHashMap::default();
        let mut mapper = IdentityMapper::new(&mut self.ids);

        for (name, mapping) in spec.iter() {
            let _span = tracing::info_span!("collection", name).entered();

            let map: Option<IdentityMap> = (|| -> Result<Option<IdentityMap>> {
                let Some(key) = identity_key(name, mapping, registry)? else {
                    return Ok(None);
                };
                let map = mapper.build(key.values.keys());
                IdentityMapper::check(&map, key.key_column, key.values.keys())?;
                let stats = IdentityMapper::stats(&map, key.values.keys());
                tracing::debug!(
                    key_column = key.key_column,
                    identifiers = map.len(),
                    nulls = stats.null_count,
                    "built identity map"
                );
                audit.push(name, &map, stats);
                stats_by_collection.insert(name.to_string(), stats);
                Ok(Some(map))
            })()
            .map_err(|e| e.in_collection(name))?;

            match map {
                Some(map) => {
                    identities.insert(name.to_string(), map);
                }
                None => tracing::debug!("collection has no identity rule"),
            }
        }

        tracing::info!(
            identity_maps = identities.len(),
            identifiers = audit.len(),
            "identity pass complete"
        );
        Ok((identities, audit, stats_by_collection))
    }
}

/// Every collection must get its own table entry in the archive.
fn check_table_paths(spec: &MappingSpec, layout: &ArchiveLayout) -> Result<()> {
    let mut owners: FxHashMap<String, &str> = FxHashMap::default();
    for (name, _) in spec.iter() {
        let path = layout.table_path(name);
        if let Some(first) = owners.get(&path) {
            return Err(PipelineError::ArchivePathCollision {
                path,
                first: first.to_string(),
                second: name.to_string(),
            });
        }
        owners.insert(path, name);
    }
    Ok(())
}

// ============================================================================
// Referential closure
// ============================================================================

/// Every identifier in a reference column must be a value of the referenced
/// table's identity column.
fn check_closure(tables: &[OutputTable], delimiter: &str) -> Result<()> {
    let identity_values: FxHashMap<&str, FxHashSet<&str>> = tables
        .iter()
        .filter_map(|t| {
            let column = t.identity_column()?;
            let values = (0..column.len()).filter_map(|row| column.get_string(row)).collect();
            Some((t.name(), values))
        })
        .collect();
    let empty = FxHashSet::default();

    for table in tables {
        for (column_name, referenced) in table.reference_columns() {
            let Some(column) = table.column(column_name) else {
                continue;
            };
            let known = identity_values.get(referenced).unwrap_or(&empty);
            let mut missing = 0usize;
            let mut first = None;
            for row in 0..column.len() {
                let Some(cell) = column.get_string(row) else {
                    continue;
                };
                for id in cell.split(delimiter) {
                    if !known.contains(id) {
                        missing += 1;
                        first.get_or_insert_with(|| id.to_string());
                    }
                }
            }
            if let Some(first) = first {
                return Err(PipelineError::ReferentialClosure {
                    column: column_name.to_string(),
                    referenced: referenced.to_string(),
                    count: missing,
                    first,
                }
                .in_collection(table.name()));
            }
        }
    }
    Ok(())
}
