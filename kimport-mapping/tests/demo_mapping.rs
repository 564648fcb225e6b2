//! Loads the bundled demo mapping the way the CLI does.

use std::io::Write;

use kimport_mapping::{FieldRule, MappingError, MappingLoader, SourceRef};

const DEMO: &str = include_str!("../../demos/mapping.json");

#[test]
fn demo_mapping_compiles() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(DEMO.as_bytes()).unwrap();

    let spec = MappingLoader::from_path(file.path())
        .unwrap()
        .compile()
        .unwrap();
    assert_eq!(spec.names(), vec!["Factures", "Fournisseurs", "Articles"]);

    let factures = spec.get("Factures").unwrap();
    assert_eq!(factures.identity(), Some(("ID", Some("NumeroFacture"))));
    assert_eq!(
        factures.driving_rule().map(|(_, s)| s),
        Some(&SourceRef::new("Ancien Factures", "NumeroFacture"))
    );
    assert_eq!(
        factures.get("ID_Article"),
        Some(&FieldRule::reference("Ancien Factures", "CodeArticle", "Articles"))
    );
    assert_eq!(factures.referenced_collections(), vec!["Fournisseurs", "Articles"]);
}

#[test]
fn demo_import_order_puts_suppliers_first() {
    let spec = MappingLoader::from_json(DEMO).unwrap().compile().unwrap();
    let order = spec.import_order();
    assert_eq!(order.ordered, vec!["Fournisseurs", "Articles", "Factures"]);
    assert!(order.cyclic.is_empty());
}

#[test]
fn demo_mapping_round_trips_through_json() {
    let spec = MappingLoader::from_json(DEMO).unwrap().into_spec();
    let json = serde_json::to_string_pretty(&spec).unwrap();
    let again = MappingLoader::from_json(&json).unwrap().into_spec();
    assert_eq!(again, spec);
}

#[test]
fn dropping_a_collection_breaks_references() {
    let mut value: serde_json::Value = serde_json::from_str(DEMO).unwrap();
    value.as_object_mut().unwrap().remove("Fournisseurs");

    let spec = MappingLoader::from_value(value).unwrap().into_spec();
    let issues = spec.issues();
    assert_eq!(issues.len(), 2);
    for issue in &issues {
        match issue {
            MappingError::UnknownReferencedCollection { referenced, declared, .. } => {
                assert_eq!(referenced, "Fournisseurs");
                assert_eq!(declared.len(), 2);
                assert!(!declared.iter().any(|c| c == "Fournisseurs"));
            }
            other => panic!("unexpected issue: {other}"),
        }
    }
}
