//! Reference resolution.
//!
//! A reference cell holds one natural key, or several joined by the
//! reference delimiter (`"S1, S2"`). Each key is replaced by the identifier
//! it received in the referenced collection. Keys without an identifier are
//! dropped and counted; they never fail the row.

use serde::Serialize;

use crate::identity::IdentityMap;

/// Unresolved tokens kept per column for diagnostics.
const SAMPLE_LIMIT: usize = 5;

/// Result of resolving one cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCell {
    /// Resolved identifiers joined by the delimiter; empty when none resolved
    pub value: String,
    /// Number of tokens that resolved
    pub resolved: usize,
    /// Tokens with no identifier, in cell order
    pub unresolved: Vec<String>,
}

impl ResolvedCell {
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn is_degraded(&self) -> bool {
        !self.unresolved.is_empty()
    }

    /// The value as an output cell: empty results become null.
    pub fn into_cell(self) -> Option<String> {
        if self.value.is_empty() {
            None
        } else {
            Some(self.value)
        }
    }
}

/// Resolves reference cells against one collection's identity map.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver<'a> {
    map: &'a IdentityMap,
    delimiter: &'a str,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(map: &'a IdentityMap, delimiter: &'a str) -> Self {
        Self { map, delimiter }
    }

    /// Resolve one cell. Null cells resolve to an empty value.
    ///
    /// Tokens are trimmed; blank tokens are skipped without counting as
    /// unresolved. Order and duplicates of resolved tokens are preserved.
    pub fn resolve_cell(&self, raw: Option<&str>) -> ResolvedCell {
        let mut cell = ResolvedCell::default();
        let Some(raw) = raw else {
            return cell;
        };

        for token in raw.split(self.delimiter).map(str::trim) {
            if token.is_empty() {
                continue;
            }
            match self.map.get(token) {
                Some(id) => {
                    if cell.resolved > 0 {
                        cell.value.push_str(self.delimiter);
                    }
                    cell.value.push_str(&id.to_string());
                    cell.resolved += 1;
                }
                None => cell.unresolved.push(token.to_string()),
            }
        }
        cell
    }
}

/// Resolution counts for one reference column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceStats {
    /// Target column name
    pub column: String,
    /// Referenced collection
    pub referenced: String,
    /// Cells in the column
    pub cells: usize,
    /// Cells with no resolved identifier (null or fully unresolved)
    pub empty_cells: usize,
    pub resolved_tokens: usize,
    pub unresolved_tokens: usize,
    /// Cells that lost at least one token
    pub degraded_cells: usize,
    /// First few distinct unresolved tokens
    pub unresolved_sample: Vec<String>,
}

impl ReferenceStats {
    pub fn new(column: impl Into<String>, referenced: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            referenced: referenced.into(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, cell: &ResolvedCell) {
        self.cells += 1;
        self.resolved_tokens += cell.resolved;
        self.unresolved_tokens += cell.unresolved.len();
        if cell.is_empty() {
            self.empty_cells += 1;
        }
        if cell.is_degraded() {
            self.degraded_cells += 1;
            for token in &cell.unresolved {
                if self.unresolved_sample.len() >= SAMPLE_LIMIT {
                    break;
                }
                if !self.unresolved_sample.contains(token) {
                    self.unresolved_sample.push(token.clone());
                }
            }
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.unresolved_tokens > 0
    }
}
