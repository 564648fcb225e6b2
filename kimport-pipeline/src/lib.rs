//! Identity and reference generation for Kimaiko imports.
//!
//! Given a [`MappingSpec`](kimport_mapping::MappingSpec) and a registry of
//! legacy source tables, the [`Pipeline`] gives every collection row a fresh
//! identifier, rewrites legacy foreign keys into those identifiers and
//! packages the generated tables with an identity audit into a zip archive.
//!
//! # Design
//!
//! - **Two passes**: every identity map is built before any reference is resolved
//! - **Lossy references**: unknown reference tokens are dropped and counted, unless
//!   the strict policy is configured
//! - **Closed output**: every identifier in a reference column occurs in the
//!   referenced table's identity column
//! - **Run-scoped state**: registries and identity maps belong to one run

pub mod archive;
pub mod audit;
pub mod config;
pub mod error;
pub mod identity;
pub mod pipeline;
pub mod project;
pub mod report;
pub mod resolve;
pub mod writer;

pub use archive::{render_readme, ResultArchive};
pub use audit::{AuditRecord, AuditTable, AUDIT_HEADER};
pub use config::{load_options, ArchiveLayout, ConfigError, PipelineOptions, UnresolvedPolicy};
pub use error::{PipelineError, Result};
pub use identity::{
    Identifier, IdentifierSource, IdentityMap, IdentityMapper, IdentityMaps, MappingStats,
    RandomUuids, SequentialIds,
};
pub use pipeline::{GeneratedImport, Pipeline};
pub use project::{OutputTable, Projection, TableProjector};
pub use report::{CollectionReport, PipelineReport};
pub use resolve::{ReferenceResolver, ReferenceStats, ResolvedCell};
pub use writer::write_table_csv;
