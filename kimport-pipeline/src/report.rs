//! Run report returned alongside generated tables and archives.

use kimport_mapping::ImportOrder;
use serde::Serialize;

use crate::identity::MappingStats;
use crate::resolve::ReferenceStats;

/// Outcome for one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectionReport {
    pub name: String,
    pub rows: usize,
    /// Identity statistics, for collections with an identity rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<MappingStats>,
    pub references: Vec<ReferenceStats>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub misaligned_columns: Vec<String>,
}

impl CollectionReport {
    pub fn unresolved_tokens(&self) -> usize {
        self.references.iter().map(|r| r.unresolved_tokens).sum()
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// Collections in declaration order
    pub collections: Vec<CollectionReport>,
    pub import_order: ImportOrder,
}

impl PipelineReport {
    pub fn collection(&self, name: &str) -> Option<&CollectionReport> {
        self.collections.iter().find(|c| c.name == name)
    }

    pub fn total_rows(&self) -> usize {
        self.collections.iter().map(|c| c.rows).sum()
    }

    pub fn unresolved_tokens(&self) -> usize {
        self.collections.iter().map(|c| c.unresolved_tokens()).sum()
    }

    /// True when any reference token was dropped.
    pub fn is_degraded(&self) -> bool {
        self.unresolved_tokens() > 0
    }
}
