//! Field rules
//!
//! A field rule says how one target column of a collection is populated:
//! a freshly generated identifier, a verbatim copy of a source column, or a
//! source column whose values are keys into another collection's identities.
//!
//! # JSON shape
//!
//! Rules use the shape produced by the mapping editor:
//!
//! ```json
//! { "type": "uuid" }
//! { "type": "uuid", "key": "CodeFournisseur" }
//! { "source_file": "Ancien Articles", "source_col": "Designation" }
//! { "source_file": "Ancien Articles", "source_col": "CodeFournisseur",
//!   "is_ref": true, "ref_model": "Fournisseurs" }
//! ```
//!
//! `source_collection`/`source_table`, `source_column` and
//! `referenced_collection` are accepted as aliases.

use serde::{Deserialize, Serialize};

/// A column in a named source table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    /// Source table name (key into the source registry)
    pub table: String,
    /// Column header in that table
    pub column: String,
}

impl SourceRef {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl std::fmt::Display for SourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// How one target column is populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFieldRule", into = "RawFieldRule")]
pub enum FieldRule {
    /// Generate a new identifier per row.
    ///
    /// `key_column` names the natural-key column of the driving table; when
    /// absent, the driving rule's own source column is the key.
    Identity { key_column: Option<String> },

    /// Copy a source column verbatim.
    Direct(SourceRef),

    /// Replace each key in the source cell by the identifier it received in
    /// `collection`.
    Reference { source: SourceRef, collection: String },
}

impl FieldRule {
    pub fn identity() -> Self {
        FieldRule::Identity { key_column: None }
    }

    pub fn keyed_identity(key_column: impl Into<String>) -> Self {
        FieldRule::Identity {
            key_column: Some(key_column.into()),
        }
    }

    pub fn direct(table: impl Into<String>, column: impl Into<String>) -> Self {
        FieldRule::Direct(SourceRef::new(table, column))
    }

    pub fn reference(
        table: impl Into<String>,
        column: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        FieldRule::Reference {
            source: SourceRef::new(table, column),
            collection: collection.into(),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, FieldRule::Identity { .. })
    }

    /// The source column read by this rule, if any.
    pub fn source(&self) -> Option<&SourceRef> {
        match self {
            FieldRule::Identity { .. } => None,
            FieldRule::Direct(source) | FieldRule::Reference { source, .. } => Some(source),
        }
    }

    /// The referenced collection, for reference rules.
    pub fn referenced_collection(&self) -> Option<&str> {
        match self {
            FieldRule::Reference { collection, .. } => Some(collection),
            _ => None,
        }
    }
}

/// Wire shape of a field rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawFieldRule {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(
        alias = "source_collection",
        alias = "source_table",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    source_file: Option<String>,
    #[serde(alias = "source_column", default, skip_serializing_if = "Option::is_none")]
    source_col: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    is_ref: bool,
    #[serde(
        alias = "referenced_collection",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    ref_model: Option<String>,
    /// Target-side key name written by the editor; informational only.
    #[serde(default, skip_serializing)]
    #[allow(dead_code)]
    ref_key: Option<String>,
}

fn is_false(b: &bool) -> bool {
    !*b
}

const IDENTITY_KINDS: [&str; 3] = ["uuid", "identity", "id"];

impl TryFrom<RawFieldRule> for FieldRule {
    type Error = String;

    fn try_from(raw: RawFieldRule) -> Result<Self, Self::Error> {
        if let Some(kind) = raw.kind.as_deref() {
            if !IDENTITY_KINDS.iter().any(|k| kind.eq_ignore_ascii_case(k)) {
                return Err(format!(
                    "unknown rule type '{kind}' (expected one of: {})",
                    IDENTITY_KINDS.join(", ")
                ));
            }
            if raw.source_file.is_some() || raw.source_col.is_some() || raw.is_ref {
                return Err(
                    "an identity rule takes no source; name its natural key with 'key'".to_string(),
                );
            }
            return Ok(FieldRule::Identity {
                key_column: raw.key,
            });
        }

        let table = raw
            .source_file
            .ok_or_else(|| "missing 'source_file'".to_string())?;
        let column = raw
            .source_col
            .ok_or_else(|| "missing 'source_col'".to_string())?;
        let source = SourceRef { table, column };

        match (raw.is_ref, raw.ref_model) {
            (true, Some(collection)) => Ok(FieldRule::Reference { source, collection }),
            (true, None) => Err("reference rule is missing 'ref_model'".to_string()),
            (false, Some(model)) => Err(format!(
                "'ref_model' is '{model}' but 'is_ref' is not set"
            )),
            (false, None) => Ok(FieldRule::Direct(source)),
        }
    }
}

impl From<FieldRule> for RawFieldRule {
    fn from(rule: FieldRule) -> Self {
        match rule {
            FieldRule::Identity { key_column } => RawFieldRule {
                kind: Some("uuid".to_string()),
                key: key_column,
                ..Default::default()
            },
            FieldRule::Direct(source) => RawFieldRule {
                source_file: Some(source.table),
                source_col: Some(source.column),
                ..Default::default()
            },
            FieldRule::Reference { source, collection } => RawFieldRule {
                source_file: Some(source.table),
                source_col: Some(source.column),
                is_ref: true,
                ref_model: Some(collection),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<FieldRule, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_identity_rule() {
        assert_eq!(parse(r#"{"type": "uuid"}"#).unwrap(), FieldRule::identity());
        assert_eq!(
            parse(r#"{"type": "UUID", "key": "Code"}"#).unwrap(),
            FieldRule::keyed_identity("Code")
        );
    }

    #[test]
    fn test_direct_rule_with_aliases() {
        let editor = parse(r#"{"source_file": "Old", "source_col": "Name"}"#).unwrap();
        let aliased = parse(r#"{"source_collection": "Old", "source_column": "Name"}"#).unwrap();
        assert_eq!(editor, FieldRule::direct("Old", "Name"));
        assert_eq!(aliased, editor);
        assert_eq!(editor.source().unwrap().to_string(), "Old.Name");
    }

    #[test]
    fn test_reference_rule_ignores_ref_key() {
        let rule = parse(
            r#"{"source_file": "Old Invoices", "source_col": "SupplierCode",
                "is_ref": true, "ref_model": "Suppliers", "ref_key": "Code"}"#,
        )
        .unwrap();
        assert_eq!(
            rule,
            FieldRule::reference("Old Invoices", "SupplierCode", "Suppliers")
        );
        assert_eq!(rule.referenced_collection(), Some("Suppliers"));
    }

    #[test]
    fn test_malformed_rules() {
        let err = parse(r#"{"source_file": "Old"}"#).unwrap_err();
        assert!(err.to_string().contains("source_col"));

        let err = parse(r#"{"type": "serial"}"#).unwrap_err();
        assert!(err.to_string().contains("unknown rule type"));

        let err = parse(r#"{"source_file": "A", "source_col": "B", "is_ref": true}"#).unwrap_err();
        assert!(err.to_string().contains("ref_model"));

        let err = parse(r#"{"type": "uuid", "source_file": "A"}"#).unwrap_err();
        assert!(err.to_string().contains("identity rule"));
    }

    #[test]
    fn test_serializes_to_editor_shape() {
        let json = serde_json::to_value(FieldRule::reference("T", "C", "Target")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "source_file": "T",
                "source_col": "C",
                "is_ref": true,
                "ref_model": "Target"
            })
        );
        let json = serde_json::to_value(FieldRule::identity()).unwrap();
        assert_eq!(json, serde_json::json!({"type": "uuid"}));
    }
}
