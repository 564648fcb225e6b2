use assert_cmd::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn demo(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../demos").join(file)
}

fn source(name: &str, file: &str) -> String {
    format!("{name}={}", demo(file).display())
}

/// `kimport` running in an isolated temp directory with color disabled.
fn kimport_cmd(work_dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("kimport");
    cmd.current_dir(work_dir.path());
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn demo_generate(work_dir: &TempDir) -> Command {
    let mut cmd = kimport_cmd(work_dir);
    cmd.arg("generate")
        .arg("--mapping")
        .arg(demo("mapping.json"))
        .args(["--source", &source("Ancien Fournisseurs", "fournisseurs.csv")])
        .args(["--source", &source("Ancien Articles", "articles.csv")])
        .args(["--source", &source("Ancien Factures", "factures.csv")]);
    cmd
}

// ============================================================================
// Happy path tests
// ============================================================================

#[test]
fn version_flag() {
    cargo_bin_cmd!("kimport")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("kimport"));
}

#[test]
fn help_flag() {
    cargo_bin_cmd!("kimport")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Kimaiko import archive generator"))
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn generate_demo_archive() {
    let tmp = TempDir::new().unwrap();
    demo_generate(&tmp)
        .args(["--output", "out.zip"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Fournisseurs"))
        .stdout(predicate::str::contains("Import order:"))
        .stdout(predicate::str::contains(" 1. Fournisseurs"))
        .stdout(predicate::str::contains("Wrote"))
        .stderr(predicate::str::contains("Factures.ID_Article → Articles: 1 dropped (e.g. A-999)"));

    let file = std::fs::File::open(tmp.path().join("out.zip")).unwrap();
    let zip = zip::ZipArchive::new(file).unwrap();
    let mut names: Vec<&str> = zip.file_names().collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "README.md",
            "fichiers_kimaiko/Articles.csv",
            "fichiers_kimaiko/Factures.csv",
            "fichiers_kimaiko/Fournisseurs.csv",
            "manifest.json",
            "references/references_uuid.csv",
        ]
    );
}

#[test]
fn generate_json_report() {
    let tmp = TempDir::new().unwrap();
    let output = demo_generate(&tmp).arg("--json").output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        report["import_order"]["ordered"],
        serde_json::json!(["Fournisseurs", "Articles", "Factures"])
    );
    assert!(tmp.path().join("import_kimaiko.zip").is_file());
}

#[test]
fn generate_with_config_file() {
    let tmp = TempDir::new().unwrap();
    demo_generate(&tmp)
        .arg("--config")
        .arg(demo("kimport.toml"))
        .args(["--quiet", "--output", "quiet.zip"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert!(tmp.path().join("quiet.zip").is_file());
}

#[test]
fn validate_demo_mapping() {
    let tmp = TempDir::new().unwrap();
    kimport_cmd(&tmp)
        .arg("validate")
        .arg("--mapping")
        .arg(demo("mapping.json"))
        .args(["--source", &source("Ancien Fournisseurs", "fournisseurs.csv")])
        .args(["--source", &source("Ancien Articles", "articles.csv")])
        .args(["--source", &source("Ancien Factures", "factures.csv")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Valid"))
        .stdout(predicate::str::contains("(3 collections)"))
        .stdout(predicate::str::contains(" 3. Factures"));
}

// ============================================================================
// Error path tests
// ============================================================================

#[test]
fn verbose_quiet_conflict() {
    cargo_bin_cmd!("kimport")
        .args(["--verbose", "--quiet", "validate", "--mapping", "m.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn malformed_source_arg_is_usage_error() {
    let tmp = TempDir::new().unwrap();
    kimport_cmd(&tmp)
        .args(["generate", "--mapping", "m.json", "--source", "factures.csv"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("expected NAME=PATH"));
}

#[test]
fn strict_generation_fails_without_archive() {
    let tmp = TempDir::new().unwrap();
    demo_generate(&tmp)
        .args(["--strict", "--output", "strict.zip"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Column 'ID_Article' row 4: unresolved reference(s) to 'Articles': A-999"))
        .stderr(predicate::str::contains("rerun without --strict"));
    assert!(!tmp.path().join("strict.zip").exists());
}

#[test]
fn missing_source_table_named_in_error() {
    let tmp = TempDir::new().unwrap();
    kimport_cmd(&tmp)
        .arg("generate")
        .arg("--mapping")
        .arg(demo("mapping.json"))
        .args(["--source", &source("Ancien Fournisseurs", "fournisseurs.csv")])
        .args(["--source", &source("Ancien Factures", "factures.csv")])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Source table 'Ancien Articles'"))
        .stderr(predicate::str::contains(
            "available tables: Ancien Factures, Ancien Fournisseurs",
        ));
}

#[test]
fn validate_lists_every_issue() {
    let tmp = TempDir::new().unwrap();
    let mapping = tmp.path().join("broken.json");
    std::fs::write(
        &mapping,
        r#"{
            "Contacts": {
                "ID": {"type": "uuid"},
                "Societe": {"source_file": "Old", "source_col": "Company", "is_ref": true, "ref_model": "Companies"}
            },
            "Notes": {
                "ID": {"type": "uuid"}
            }
        }"#,
    )
    .unwrap();

    kimport_cmd(&tmp)
        .arg("validate")
        .arg("--mapping")
        .arg(&mapping)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("mapping has 2 issue(s)"))
        .stderr(predicate::str::contains("unknown collection 'Companies'"))
        .stderr(predicate::str::contains("Collection 'Notes' has no source rule"));
}

#[test]
fn invalid_config_file_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("kimport.toml");
    std::fs::write(&config, "reference_separator = \";\"\n").unwrap();

    demo_generate(&tmp)
        .arg("--config")
        .arg(&config)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("kimport.toml"));
}
