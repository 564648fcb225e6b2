//! Identity audit table.
//!
//! One section per collection with an identity map: every natural key with
//! the identifier it received, followed by a statistics row. The pipeline
//! never reads the audit back; it ships in the archive for traceability.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::identity::{Identifier, IdentityMap, MappingStats};

/// Audit file header.
pub const AUDIT_HEADER: [&str; 3] = ["Valeur Originale", "UUID", "Modèle"];

/// One original value and the identifier it was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub collection: String,
    pub original: String,
    pub identifier: Identifier,
}

#[derive(Debug, Clone)]
struct AuditSection {
    collection: String,
    entries: Vec<(String, Identifier)>,
    stats: MappingStats,
}

/// Consolidated audit of every identity map in a run.
#[derive(Debug, Clone, Default)]
pub struct AuditTable {
    sections: Vec<AuditSection>,
}

impl AuditTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a collection's identity map and its statistics.
    pub fn push(&mut self, collection: impl Into<String>, map: &IdentityMap, stats: MappingStats) {
        self.sections.push(AuditSection {
            collection: collection.into(),
            entries: map.iter().map(|(k, id)| (k.to_string(), id)).collect(),
            stats,
        });
    }

    /// Collections in the audit, in insertion order.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.collection.as_str())
    }

    pub fn stats(&self, collection: &str) -> Option<MappingStats> {
        self.sections
            .iter()
            .find(|s| s.collection == collection)
            .map(|s| s.stats)
    }

    pub fn records(&self) -> impl Iterator<Item = AuditRecord> + '_ {
        self.sections.iter().flat_map(|section| {
            section.entries.iter().map(|(original, identifier)| AuditRecord {
                collection: section.collection.clone(),
                original: original.clone(),
                identifier: *identifier,
            })
        })
    }

    /// Number of audit records, statistics rows excluded.
    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the audit as CSV: records then a statistics row, per collection.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(AUDIT_HEADER)?;
        for section in &self.sections {
            for (original, identifier) in &section.entries {
                let id = identifier.to_string();
                wtr.write_record([original.as_str(), id.as_str(), section.collection.as_str()])?;
            }
            let s = section.stats;
            wtr.write_record([
                format!("Statistiques {}", section.collection),
                format!(
                    "Total: {}, Uniques: {}, Mappés: {}, NA: {}",
                    s.total, s.unique, s.mapped, s.null_count
                ),
                String::new(),
            ])?;
        }
        wtr.flush()?;
        Ok(())
    }
}
