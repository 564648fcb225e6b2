//! Ordered target-column → rule mapping for one collection

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::field_rule::{FieldRule, SourceRef};

/// Target column rules for one collection, in declaration order.
///
/// Declaration order matters: the first source-reading rule drives the row
/// count and row order of the projected table, and output columns follow the
/// declared order after the identity column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    columns: Vec<(String, FieldRule)>,
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Returns the rule previously declared for `column`, which
    /// is replaced in place so the column keeps its position.
    pub fn insert(&mut self, column: impl Into<String>, rule: FieldRule) -> Option<FieldRule> {
        let column = column.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => Some(std::mem::replace(existing, rule)),
            None => {
                self.columns.push((column, rule));
                None
            }
        }
    }

    pub fn with_identity(mut self, column: impl Into<String>) -> Self {
        self.insert(column, FieldRule::identity());
        self
    }

    pub fn with_keyed_identity(
        mut self,
        column: impl Into<String>,
        key_column: impl Into<String>,
    ) -> Self {
        self.insert(column, FieldRule::keyed_identity(key_column));
        self
    }

    pub fn with_direct(
        mut self,
        column: impl Into<String>,
        table: impl Into<String>,
        source_column: impl Into<String>,
    ) -> Self {
        self.insert(column, FieldRule::direct(table, source_column));
        self
    }

    pub fn with_reference(
        mut self,
        column: impl Into<String>,
        table: impl Into<String>,
        source_column: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        self.insert(column, FieldRule::reference(table, source_column, collection));
        self
    }

    pub fn get(&self, column: &str) -> Option<&FieldRule> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, rule)| rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldRule)> {
        self.columns.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// All identity rules with their target column names.
    pub fn identity_rules(&self) -> Vec<(&str, &FieldRule)> {
        self.iter().filter(|(_, rule)| rule.is_identity()).collect()
    }

    /// The first identity rule as `(target column, key column)`.
    pub fn identity(&self) -> Option<(&str, Option<&str>)> {
        self.iter().find_map(|(name, rule)| match rule {
            FieldRule::Identity { key_column } => Some((name, key_column.as_deref())),
            _ => None,
        })
    }

    /// The first rule that reads a source column, which fixes the driving table.
    pub fn driving_rule(&self) -> Option<(&str, &SourceRef)> {
        self.iter()
            .find_map(|(name, rule)| rule.source().map(|source| (name, source)))
    }

    /// Reference rules as `(target column, source, referenced collection)`.
    pub fn references(&self) -> impl Iterator<Item = (&str, &SourceRef, &str)> {
        self.iter().filter_map(|(name, rule)| match rule {
            FieldRule::Reference { source, collection } => {
                Some((name, source, collection.as_str()))
            }
            _ => None,
        })
    }

    /// Distinct referenced collections, in first-mention order.
    pub fn referenced_collections(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for (_, _, collection) in self.references() {
            if !out.contains(&collection) {
                out.push(collection);
            }
        }
        out
    }

    /// Distinct source tables read by this collection, driving table first.
    pub fn source_tables(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for source in self.columns.iter().filter_map(|(_, rule)| rule.source()) {
            if !out.contains(&source.table.as_str()) {
                out.push(&source.table);
            }
        }
        out
    }
}

impl Serialize for ColumnMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, rule) in &self.columns {
            map.serialize_entry(name, rule)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ColumnMapping {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ColumnMappingVisitor;

        impl<'de> Visitor<'de> for ColumnMappingVisitor {
            type Value = ColumnMapping;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of target column rules")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut mapping = ColumnMapping::new();
                while let Some(column) = access.next_key::<String>()? {
                    let rule: FieldRule = access.next_value().map_err(|e| {
                        serde::de::Error::custom(format!("column '{column}': {e}"))
                    })?;
                    if mapping.get(&column).is_some() {
                        return Err(serde::de::Error::custom(format!(
                            "column '{column}' is declared more than once"
                        )));
                    }
                    mapping.columns.push((column, rule));
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(ColumnMappingVisitor)
    }
}
