//! Whole-import mapping specification

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::column_mapping::ColumnMapping;
use crate::error::{MappingError, MappingResult};

/// Collection name → column mapping, in declaration order.
///
/// A spec is plain data: it is built by hand, deserialized from the mapping
/// editor's JSON, or produced by a schema-suggestion service. [`validate`]
/// checks structural completeness only.
///
/// [`validate`]: MappingSpec::validate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingSpec {
    collections: Vec<(String, ColumnMapping)>,
}

impl MappingSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a collection. Fails if the name is already declared.
    pub fn insert(
        &mut self,
        collection: impl Into<String>,
        mapping: ColumnMapping,
    ) -> MappingResult<()> {
        let collection = collection.into();
        if self.get(&collection).is_some() {
            return Err(MappingError::DuplicateCollection(collection));
        }
        self.collections.push((collection, mapping));
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_collection(
        mut self,
        collection: impl Into<String>,
        mapping: ColumnMapping,
    ) -> MappingResult<Self> {
        self.insert(collection, mapping)?;
        Ok(self)
    }

    pub fn get(&self, collection: &str) -> Option<&ColumnMapping> {
        self.collections
            .iter()
            .find(|(name, _)| name == collection)
            .map(|(_, mapping)| mapping)
    }

    pub fn contains(&self, collection: &str) -> bool {
        self.get(collection).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnMapping)> {
        self.collections
            .iter()
            .map(|(name, mapping)| (name.as_str(), mapping))
    }

    /// Collection names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.collections.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Every structural problem in the spec, in declaration order.
    ///
    /// Problems found:
    /// - collections with no rules
    /// - collections with more than one identity rule
    /// - collections with no source-reading rule
    /// - references to undeclared collections, or to collections without identity
    pub fn issues(&self) -> Vec<MappingError> {
        let mut issues = Vec::new();
        let declared = self.names();

        for (collection, mapping) in self.iter() {
            if mapping.is_empty() {
                issues.push(MappingError::EmptyCollection(collection.to_string()));
                continue;
            }

            let identities = mapping.identity_rules();
            if identities.len() > 1 {
                issues.push(MappingError::MultipleIdentityRules {
                    collection: collection.to_string(),
                    columns: identities.iter().map(|(c, _)| c.to_string()).collect(),
                });
            }

            if mapping.driving_rule().is_none() {
                issues.push(MappingError::MissingSourceRule {
                    collection: collection.to_string(),
                    declared: mapping.column_names(),
                });
            }

            for (column, _, referenced) in mapping.references() {
                match self.get(referenced) {
                    None => issues.push(MappingError::UnknownReferencedCollection {
                        collection: collection.to_string(),
                        column: column.to_string(),
                        referenced: referenced.to_string(),
                        declared: declared.clone(),
                    }),
                    Some(target) if target.identity().is_none() => {
                        issues.push(MappingError::ReferencedCollectionWithoutIdentity {
                            collection: collection.to_string(),
                            column: column.to_string(),
                            referenced: referenced.to_string(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        issues
    }

    /// Fail with the first structural problem, if any.
    pub fn validate(&self) -> MappingResult<()> {
        match self.issues().into_iter().next() {
            Some(issue) => Err(issue),
            None => Ok(()),
        }
    }
}

impl Serialize for MappingSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.collections.len()))?;
        for (name, mapping) in &self.collections {
            map.serialize_entry(name, mapping)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MappingSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = MappingSpec;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of collection mappings")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut spec = MappingSpec::new();
                while let Some(collection) = access.next_key::<String>()? {
                    let mapping: ColumnMapping = access.next_value().map_err(|e| {
                        serde::de::Error::custom(format!("collection '{collection}': {e}"))
                    })?;
                    spec.insert(collection, mapping)
                        .map_err(serde::de::Error::custom)?;
                }
                Ok(spec)
            }
        }

        deserializer.deserialize_map(SpecVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suppliers() -> ColumnMapping {
        ColumnMapping::new()
            .with_identity("ID")
            .with_direct("Code", "Old Suppliers", "Code")
    }

    fn invoices() -> ColumnMapping {
        ColumnMapping::new()
            .with_identity("ID")
            .with_direct("Number", "Old Invoices", "Num")
            .with_reference("Supplier", "Old Invoices", "SupplierCode", "Suppliers")
    }

    #[test]
    fn test_valid_spec() {
        let spec = MappingSpec::new()
            .with_collection("Invoices", invoices())
            .unwrap()
            .with_collection("Suppliers", suppliers())
            .unwrap();
        assert!(spec.validate().is_ok());
        assert_eq!(spec.names(), vec!["Invoices", "Suppliers"]);
    }

    #[test]
    fn test_duplicate_collection() {
        let err = MappingSpec::new()
            .with_collection("Suppliers", suppliers())
            .unwrap()
            .with_collection("Suppliers", suppliers())
            .unwrap_err();
        assert!(matches!(err, MappingError::DuplicateCollection(ref c) if c == "Suppliers"));
    }

    #[test]
    fn test_unknown_referenced_collection() {
        let spec = MappingSpec::new()
            .with_collection("Invoices", invoices())
            .unwrap();
        match spec.validate().unwrap_err() {
            MappingError::UnknownReferencedCollection {
                collection,
                column,
                referenced,
                declared,
            } => {
                assert_eq!(collection, "Invoices");
                assert_eq!(column, "Supplier");
                assert_eq!(referenced, "Suppliers");
                assert_eq!(declared, vec!["Invoices"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_collects_every_issue() {
        let spec = MappingSpec::new()
            .with_collection("Empty", ColumnMapping::new())
            .unwrap()
            .with_collection("OnlyIds", ColumnMapping::new().with_identity("A").with_identity("B"))
            .unwrap()
            .with_collection(
                "Tags",
                ColumnMapping::new().with_direct("Label", "Old Tags", "Label"),
            )
            .unwrap()
            .with_collection(
                "Posts",
                ColumnMapping::new()
                    .with_identity("ID")
                    .with_reference("Tag", "Old Posts", "TagCode", "Tags"),
            )
            .unwrap();

        let issues = spec.issues();
        assert_eq!(issues.len(), 4, "{issues:?}");
        assert!(matches!(issues[0], MappingError::EmptyCollection(_)));
        assert!(matches!(issues[1], MappingError::MultipleIdentityRules { .. }));
        assert!(matches!(issues[2], MappingError::MissingSourceRule { .. }));
        assert!(matches!(
            issues[3],
            MappingError::ReferencedCollectionWithoutIdentity { .. }
        ));
    }

    #[test]
    fn test_json_keeps_collection_order() {
        let json = r#"{
            "Invoices": {"ID": {"type": "uuid"}, "Num": {"source_file": "I", "source_col": "n"}},
            "Suppliers": {"ID": {"type": "uuid"}, "Code": {"source_file": "S", "source_col": "c"}}
        }"#;
        let spec: MappingSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.names(), vec!["Invoices", "Suppliers"]);

        let err = serde_json::from_str::<MappingSpec>(
            r#"{"A": {"ID": {"type": "uuid"}}, "A": {"ID": {"type": "uuid"}}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
