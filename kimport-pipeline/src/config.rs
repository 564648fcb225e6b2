//! Pipeline options and their file format.
//!
//! Options load from a TOML file (or JSON, detected by the `.json`
//! extension). Every field is optional in the file; absent fields keep their
//! defaults. Command-line flags, applied by the caller after loading, take
//! precedence over the file.
//!
//! ```toml
//! reference_delimiter = ", "
//! unresolved_references = "strict"
//! optimize_tables = true
//!
//! [layout]
//! tables_dir = "fichiers_kimaiko"
//! references_dir = "references"
//! audit_file = "references_uuid.csv"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// What to do with reference tokens that match no identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    /// Drop the token, count it and keep going.
    #[default]
    Lenient,
    /// Abort the run on the first unresolved token.
    Strict,
}

/// Paths of the entries written into the result archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveLayout {
    /// Directory holding one file per collection
    pub tables_dir: String,
    /// Directory holding the identity audit file
    pub references_dir: String,
    /// Audit file name, inside `references_dir`
    pub audit_file: String,
    /// Human-readable manifest, at the archive root
    pub readme_file: String,
    /// Machine-readable manifest, at the archive root
    pub manifest_file: String,
}

impl Default for ArchiveLayout {
    fn default() -> Self {
        Self {
            tables_dir: "fichiers_kimaiko".to_string(),
            references_dir: "references".to_string(),
            audit_file: "references_uuid.csv".to_string(),
            readme_file: "README.md".to_string(),
            manifest_file: "manifest.json".to_string(),
        }
    }
}

impl ArchiveLayout {
    /// Archive path of a collection's table.
    pub fn table_path(&self, collection: &str) -> String {
        let stem: String = collection
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        format!("{}/{}.csv", self.tables_dir, stem)
    }

    /// Archive path of the audit file.
    pub fn audit_path(&self) -> String {
        format!("{}/{}", self.references_dir, self.audit_file)
    }
}

/// Options for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineOptions {
    /// Separator between keys in multi-valued reference cells, and between
    /// identifiers in the generated cells.
    pub reference_delimiter: String,
    pub unresolved_references: UnresolvedPolicy,
    /// Narrow output tables before serialization.
    pub optimize_tables: bool,
    pub layout: ArchiveLayout,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            reference_delimiter: ", ".to_string(),
            unresolved_references: UnresolvedPolicy::Lenient,
            optimize_tables: true,
            layout: ArchiveLayout::default(),
        }
    }
}

impl PipelineOptions {
    pub fn strict(mut self) -> Self {
        self.unresolved_references = UnresolvedPolicy::Strict;
        self
    }

    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.reference_delimiter = delimiter.into();
        self
    }

    /// Reject option combinations that cannot produce a usable archive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reference_delimiter.trim().is_empty() {
            return Err(ConfigError::InvalidValue(format!(
                "reference_delimiter must contain a non-whitespace character, got {:?}",
                self.reference_delimiter
            )));
        }
        // Identifiers are hyphenated hex, so such a delimiter would split them
        if self
            .reference_delimiter
            .chars()
            .all(|c| c.is_ascii_hexdigit() || c == '-')
        {
            return Err(ConfigError::InvalidValue(format!(
                "reference_delimiter must contain a character other than hex digits and '-', got {:?}",
                self.reference_delimiter
            )));
        }

        let layout = &self.layout;
        let entries = [
            ("layout.tables_dir", &layout.tables_dir),
            ("layout.references_dir", &layout.references_dir),
            ("layout.audit_file", &layout.audit_file),
            ("layout.readme_file", &layout.readme_file),
            ("layout.manifest_file", &layout.manifest_file),
        ];
        for (key, value) in entries {
            let trimmed = value.trim();
            if trimmed.is_empty() || trimmed == "." || trimmed == ".." {
                return Err(ConfigError::InvalidValue(format!(
                    "{key} must be a plain name, got {value:?}"
                )));
            }
            if value.contains(['/', '\\']) {
                return Err(ConfigError::InvalidValue(format!(
                    "{key} must not contain path separators, got {value:?}"
                )));
            }
        }

        // Root-level entries must not collide
        let roots = [
            ("layout.tables_dir", &layout.tables_dir),
            ("layout.references_dir", &layout.references_dir),
            ("layout.readme_file", &layout.readme_file),
            ("layout.manifest_file", &layout.manifest_file),
        ];
        for (i, (key, value)) in roots.iter().enumerate() {
            if let Some((other, _)) = roots[i + 1..].iter().find(|(_, v)| v == value) {
                return Err(ConfigError::InvalidValue(format!(
                    "{key} and {other} both use {value:?}"
                )));
            }
        }

        Ok(())
    }
}

/// Load pipeline options from a file. Detects format by extension:
/// `.json` → JSON, everything else → TOML. An empty file yields defaults.
pub fn load_options(path: &Path) -> Result<PipelineOptions, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if content.trim().is_empty() {
        return Ok(PipelineOptions::default());
    }

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let options: PipelineOptions = if is_json {
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?
    } else {
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?
    };

    options.validate()?;
    tracing::debug!(path = %path.display(), "loaded pipeline options");
    Ok(options)
}

/// Errors from option loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {detail}")]
    Parse { path: PathBuf, detail: String },
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(name: &str, content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_toml_overrides_some_fields() {
        let (_dir, path) = write(
            "kimport.toml",
            r#"
unresolved_references = "strict"

[layout]
tables_dir = "generated"
"#,
        );
        let options = load_options(&path).unwrap();
        assert_eq!(options.unresolved_references, UnresolvedPolicy::Strict);
        assert_eq!(options.reference_delimiter, ", ");
        assert!(options.optimize_tables);
        assert_eq!(options.layout.tables_dir, "generated");
        assert_eq!(options.layout.references_dir, "references");
        assert_eq!(options.layout.table_path("Suppliers"), "generated/Suppliers.csv");
    }

    #[test]
    fn test_load_json_config() {
        let (_dir, path) = write(
            "kimport.json",
            r#"{"reference_delimiter": ";", "optimize_tables": false}"#,
        );
        let options = load_options(&path).unwrap();
        assert_eq!(options.reference_delimiter, ";");
        assert!(!options.optimize_tables);
    }

    #[test]
    fn test_empty_config_file() {
        let (_dir, path) = write("kimport.toml", "  \n");
        assert_eq!(load_options(&path).unwrap(), PipelineOptions::default());
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let (_dir, path) = write("kimport.toml", "delimiter = \";\"\n");
        let err = load_options(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
    }

    #[test]
    fn test_missing_file() {
        let err = load_options(Path::new("/nonexistent/kimport.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let blank = PipelineOptions::default().with_delimiter(" ");
        assert!(blank.validate().is_err());

        let mut nested = PipelineOptions::default();
        nested.layout.audit_file = "refs/audit.csv".to_string();
        assert!(nested.validate().unwrap_err().to_string().contains("path separators"));

        let mut clash = PipelineOptions::default();
        clash.layout.references_dir = clash.layout.tables_dir.clone();
        let msg = clash.validate().unwrap_err().to_string();
        assert!(msg.contains("layout.tables_dir and layout.references_dir"), "{msg}");

        assert!(PipelineOptions::default().strict().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_identifier_characters_as_delimiter() {
        for delimiter in ["-", "a", "F", "--", "0-9"] {
            let err = PipelineOptions::default()
                .with_delimiter(delimiter)
                .validate()
                .unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue(_)), "{delimiter:?}: {err}");
        }
        for delimiter in [";", " - ", "|", ", "] {
            assert!(
                PipelineOptions::default().with_delimiter(delimiter).validate().is_ok(),
                "{delimiter:?}"
            );
        }
    }

    #[test]
    fn test_table_path_escapes_separators() {
        let layout = ArchiveLayout::default();
        assert_eq!(layout.table_path("A/B"), "fichiers_kimaiko/A_B.csv");
        assert_eq!(layout.audit_path(), "references/references_uuid.csv");
    }
}
