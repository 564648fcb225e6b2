//! Identity generation.
//!
//! An [`IdentityMap`] assigns one fresh [`Identifier`] to each distinct
//! non-null natural key of a collection. Maps are built once per run in the
//! identity pass and are read-only afterwards.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{PipelineError, Result};

/// Opaque 128-bit identifier, printed in hyphenated UUID form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(Uuid);

impl Identifier {
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl Serialize for Identifier {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Supplier of fresh identifiers.
pub trait IdentifierSource {
    fn next_identifier(&mut self) -> Identifier;
}

/// Random version 4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomUuids;

impl IdentifierSource for RandomUuids {
    fn next_identifier(&mut self) -> Identifier {
        Identifier(Uuid::new_v4())
    }
}

/// Identifiers counting up from `00000000-0000-0000-0000-000000000001`.
///
/// Gives reproducible archives for fixtures and tests.
#[derive(Debug, Clone, Default)]
pub struct SequentialIds {
    issued: u128,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `n`th identifier this source issues (1-based).
    pub fn nth(n: u128) -> Identifier {
        Identifier(Uuid::from_u128(n))
    }
}

impl IdentifierSource for SequentialIds {
    fn next_identifier(&mut self) -> Identifier {
        self.issued += 1;
        Self::nth(self.issued)
    }
}

/// Natural key → identifier, in first-seen key order.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    entries: Vec<(String, Identifier)>,
    index: FxHashMap<String, usize>,
}

impl IdentityMap {
    pub fn get(&self, key: &str) -> Option<Identifier> {
        self.index.get(key).map(|&i| self.entries[i].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Identifier)> {
        self.entries.iter().map(|(k, id)| (k.as_str(), *id))
    }
}

/// Identity maps of one run, keyed by collection.
pub type IdentityMaps = BTreeMap<String, IdentityMap>;

/// Descriptive counts for an identity map over its key column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MappingStats {
    /// Cells in the key column
    pub total: usize,
    /// Distinct non-null keys
    pub unique: usize,
    /// Distinct non-null keys that have an identifier
    pub mapped: usize,
    /// Null cells
    pub null_count: usize,
}

/// Builds and checks identity maps.
pub struct IdentityMapper<'a> {
    source: &'a mut dyn IdentifierSource,
}

impl<'a> IdentityMapper<'a> {
    pub fn new(source: &'a mut dyn IdentifierSource) -> Self {
        Self { source }
    }

    /// Assign a fresh identifier to every distinct non-null value.
    pub fn build<I, K>(&mut self, values: I) -> IdentityMap
    where
        I: IntoIterator<Item = Option<K>>,
        K: AsRef<str>,
    {
        let mut map = IdentityMap::default();
        for key in values.into_iter().flatten() {
            let key = key.as_ref();
            if map.index.contains_key(key) {
                continue;
            }
            let id = self.source.next_identifier();
            map.index.insert(key.to_string(), map.entries.len());
            map.entries.push((key.to_string(), id));
        }
        map
    }

    /// Identifier for a row whose key is null. Never entered in any map.
    pub fn fresh(&mut self) -> Identifier {
        self.source.next_identifier()
    }

    /// True iff `map` is a bijection over the distinct non-null `values`.
    pub fn verify<I, K>(map: &IdentityMap, values: I) -> bool
    where
        I: IntoIterator<Item = Option<K>>,
        K: AsRef<str>,
    {
        Self::check(map, "", values).is_ok()
    }

    /// [`verify`](Self::verify) with a diagnostic error naming `column`.
    pub fn check<I, K>(map: &IdentityMap, column: &str, values: I) -> Result<()>
    where
        I: IntoIterator<Item = Option<K>>,
        K: AsRef<str>,
    {
        let distinct: FxHashSet<String> = values
            .into_iter()
            .flatten()
            .map(|k| k.as_ref().to_string())
            .collect();

        let fail = |reason: String| PipelineError::IdentityIntegrity {
            column: column.to_string(),
            reason,
            expected: distinct.len(),
            actual: map.len(),
        };

        if map.index.len() != map.entries.len() {
            return Err(fail("key index out of step with entries".to_string()));
        }
        if let Some((key, _)) = map.entries.iter().find(|(k, _)| !distinct.contains(k)) {
            return Err(fail(format!("key '{key}' does not occur in the column")));
        }
        if let Some(key) = distinct.iter().find(|k| !map.contains_key(k)) {
            return Err(fail(format!("key '{key}' has no identifier")));
        }
        for (i, (key, _)) in map.entries.iter().enumerate() {
            if map.index.get(key) != Some(&i) {
                return Err(fail(format!("key '{key}' is indexed to another entry")));
            }
        }

        let mut seen: FxHashMap<Identifier, &str> = FxHashMap::default();
        for (key, id) in map.iter() {
            if let Some(previous) = seen.insert(id, key) {
                return Err(fail(format!(
                    "identifier {id} assigned to both '{previous}' and '{key}'"
                )));
            }
        }

        Ok(())
    }

    /// Counts over the key column. Pure.
    pub fn stats<I, K>(map: &IdentityMap, values: I) -> MappingStats
    where
        I: IntoIterator<Item = Option<K>>,
        K: AsRef<str>,
    {
        let mut stats = MappingStats::default();
        let mut distinct: FxHashSet<String> = FxHashSet::default();
        for value in values {
            stats.total += 1;
            match value {
                None => stats.null_count += 1,
                Some(key) => {
                    let key = key.as_ref();
                    if !distinct.contains(key) {
                        if map.contains_key(key) {
                            stats.mapped += 1;
                        }
                        distinct.insert(key.to_string());
                    }
                }
            }
        }
        stats.unique = distinct.len();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant;

    impl IdentifierSource for Constant {
        fn next_identifier(&mut self) -> Identifier {
            Identifier::from_uuid(Uuid::nil())
        }
    }

    fn codes() -> Vec<Option<&'static str>> {
        vec![Some("S1"), Some("S2"), None, Some("S1"), Some("S3")]
    }

    #[test]
    fn test_build_is_bijective_over_non_null_values() {
        let mut ids = RandomUuids;
        let map = IdentityMapper::new(&mut ids).build(codes());
        assert_eq!(map.len(), 3);
        assert!(IdentityMapper::verify(&map, codes()));

        let distinct: FxHashSet<Identifier> = map.iter().map(|(_, id)| id).collect();
        assert_eq!(distinct.len(), 3);
        assert_ne!(map.get("S1"), map.get("S2"));
    }

    #[test]
    fn test_first_seen_order_and_display() {
        let mut ids = SequentialIds::new();
        let map = IdentityMapper::new(&mut ids).build(codes());
        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["S1", "S2", "S3"]);
        assert_eq!(
            map.get("S2").unwrap().to_string(),
            "00000000-0000-0000-0000-000000000002"
        );
        assert!(map.get("S4").is_none());
    }

    #[test]
    fn test_empty_and_all_null_inputs() {
        let mut ids = RandomUuids;
        let mut mapper = IdentityMapper::new(&mut ids);
        let empty = mapper.build(Vec::<Option<String>>::new());
        assert!(empty.is_empty());
        let nulls = mapper.build(vec![None::<&str>, None]);
        assert!(nulls.is_empty());
        assert!(IdentityMapper::verify(&nulls, vec![None::<&str>, None]));
    }

    #[test]
    fn test_collapsed_identifiers_fail_verification() {
        let mut ids = Constant;
        let map = IdentityMapper::new(&mut ids).build(codes());
        let err = IdentityMapper::check(&map, "Code", codes()).unwrap_err();
        match err {
            PipelineError::IdentityIntegrity {
                column,
                reason,
                expected,
                actual,
            } => {
                assert_eq!(column, "Code");
                assert!(reason.contains("assigned to both"), "{reason}");
                assert_eq!((expected, actual), (3, 3));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_map_for_other_values_fails_verification() {
        let mut ids = RandomUuids;
        let map = IdentityMapper::new(&mut ids).build(codes());
        assert!(!IdentityMapper::verify(&map, vec![Some("S1"), Some("S2")]));
        assert!(!IdentityMapper::verify(&map, vec![Some("S1"), Some("S2"), Some("S3"), Some("S4")]));
    }

    #[test]
    fn test_stats() {
        let mut ids = RandomUuids;
        let map = IdentityMapper::new(&mut ids).build(codes());
        assert_eq!(
            IdentityMapper::stats(&map, codes()),
            MappingStats {
                total: 5,
                unique: 3,
                mapped: 3,
                null_count: 1,
            }
        );

        // Counted once per distinct key, and only for keys in the column
        let repeated = vec![Some("S1"), Some("S2"), Some("S1")];
        let stats = IdentityMapper::stats(&map, repeated);
        assert_eq!((stats.total, stats.unique, stats.mapped), (3, 2, 2));
    }

    #[test]
    fn test_bijection_over_value_shapes() {
        let generated: Vec<Option<String>> = (0..200)
            .map(|i| (i % 7 != 0).then(|| format!("K{}", i % 45)))
            .collect();
        let shapes: Vec<(&str, Vec<Option<String>>, usize)> = vec![
            ("single", vec![Some("only".into())], 1),
            ("duplicates", vec![Some("x".into()); 6], 1),
            ("all null", vec![None; 4], 0),
            ("mixed", vec![None, Some("a".into()), Some("b".into()), None, Some("a".into())], 2),
            (
                "generated",
                generated.clone(),
                generated.iter().flatten().collect::<FxHashSet<_>>().len(),
            ),
        ];

        for (shape, values, distinct) in shapes {
            let mut ids = RandomUuids;
            let map = IdentityMapper::new(&mut ids).build(values.iter().map(|v| v.as_deref()));
            assert_eq!(map.len(), distinct, "{shape}");
            assert!(IdentityMapper::verify(&map, values.iter().map(|v| v.as_deref())), "{shape}");

            let ids: FxHashSet<Identifier> = map.iter().map(|(_, id)| id).collect();
            assert_eq!(ids.len(), distinct, "{shape}");
            for key in values.iter().flatten() {
                assert!(map.get(key).is_some(), "{shape}: {key}");
            }

            let stats = IdentityMapper::stats(&map, values.iter().map(|v| v.as_deref()));
            assert_eq!(stats.total, values.len(), "{shape}");
            assert_eq!(stats.unique, distinct, "{shape}");
            assert_eq!(stats.mapped, distinct, "{shape}");
            assert_eq!(stats.null_count, values.iter().filter(|v| v.is_none()).count(), "{shape}");
        }
    }
}
