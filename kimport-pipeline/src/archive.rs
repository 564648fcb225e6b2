//! Result archive packaging.
//!
//! ## Layout
//!
//! ```text
//! fichiers_kimaiko/<Collection>.csv   one generated table per collection
//! references/references_uuid.csv      identity audit
//! README.md                           usage notes and import order
//! manifest.json                       machine-readable manifest
//! ```
//!
//! Directory and file names come from [`ArchiveLayout`](crate::config::ArchiveLayout).

use std::fmt::Write as _;
use std::io::{Cursor, Write};
use std::path::Path;

use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::audit::AuditTable;
use crate::config::PipelineOptions;
use crate::error::Result;
use crate::project::OutputTable;
use crate::report::PipelineReport;
use crate::writer::write_table_csv;

/// A complete, internally consistent import archive.
#[derive(Debug, Clone)]
pub struct ResultArchive {
    bytes: Vec<u8>,
    entries: Vec<String>,
    report: PipelineReport,
}

impl ResultArchive {
    /// Zip bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Entry paths, in archive order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn report(&self) -> &PipelineReport {
        &self.report
    }

    /// Write the zip bytes to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), &self.bytes)?;
        Ok(())
    }
}

#[derive(Serialize)]
struct Manifest<'a> {
    generator: &'static str,
    version: &'static str,
    import_order: &'a [String],
    cyclic_collections: &'a [String],
    files: Files<'a>,
    collections: &'a [crate::report::CollectionReport],
    options: &'a PipelineOptions,
}

#[derive(Serialize)]
struct Files<'a> {
    tables: Vec<String>,
    audit: String,
    readme: &'a str,
}

/// Serialize tables, audit and manifests into a zip archive.
pub(crate) fn package(
    tables: &[OutputTable],
    audit: &AuditTable,
    report: PipelineReport,
    options: &PipelineOptions,
) -> Result<ResultArchive> {
    let layout = &options.layout;
    let file_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut entries = Vec::new();
    let mut buf = Vec::new();

    let mut table_paths = Vec::with_capacity(tables.len());
    for table in tables {
        let path = layout.table_path(table.name());
        buf.clear();
        write_table_csv(table.batch(), &mut buf)?;
        zip.start_file(path.as_str(), file_options)?;
        zip.write_all(&buf)?;
        tracing::debug!(entry = %path, bytes = buf.len(), "archived table");
        table_paths.push(path.clone());
        entries.push(path);
    }

    let audit_path = layout.audit_path();
    buf.clear();
    audit.write_csv(&mut buf)?;
    zip.start_file(audit_path.as_str(), file_options)?;
    zip.write_all(&buf)?;
    entries.push(audit_path.clone());

    zip.start_file(layout.readme_file.as_str(), file_options)?;
    zip.write_all(render_readme(&report, options).as_bytes())?;
    entries.push(layout.readme_file.clone());

    let manifest = Manifest {
        generator: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        import_order: &report.import_order.ordered,
        cyclic_collections: &report.import_order.cyclic,
        files: Files {
            tables: table_paths,
            audit: audit_path,
            readme: &layout.readme_file,
        },
        collections: &report.collections,
        options,
    };
    zip.start_file(layout.manifest_file.as_str(), file_options)?;
    serde_json::to_writer_pretty(&mut zip, &manifest)?;
    entries.push(layout.manifest_file.clone());

    let bytes = zip.finish()?.into_inner();
    tracing::info!(entries = entries.len(), bytes = bytes.len(), "packaged result archive");

    Ok(ResultArchive {
        bytes,
        entries,
        report,
    })
}

/// Human-readable manifest describing the layout and import order.
pub fn render_readme(report: &PipelineReport, options: &PipelineOptions) -> String {
    let layout = &options.layout;
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "# Import Kimaiko - Fichiers Générés\n");
    let _ = writeln!(out, "## Structure des dossiers\n");
    let _ = writeln!(out, "### {}/", layout.tables_dir);
    let _ = writeln!(
        out,
        "Contient un fichier par modèle, prêt à être importé dans Kimaiko.\n"
    );
    let _ = writeln!(out, "### {}/", layout.references_dir);
    let _ = writeln!(
        out,
        "- {} : correspondance entre les valeurs originales et les UUID générés",
        layout.audit_file
    );
    let _ = writeln!(
        out,
        "  - une ligne de statistiques par modèle (total, uniques, mappés, NA)\n"
    );

    let _ = writeln!(out, "## Ordre d'import\n");
    let _ = writeln!(
        out,
        "Importez d'abord les modèles référencés, puis ceux qui les référencent :\n"
    );
    for (i, name) in report.import_order.ordered.iter().enumerate() {
        let rows = report.collection(name).map_or(0, |c| c.rows);
        let _ = writeln!(
            out,
            "{}. `{}` ({} lignes)",
            i + 1,
            layout.table_path(name),
            rows
        );
    }
    if report.import_order.has_cycles() {
        let _ = writeln!(
            out,
            "\nAttention : références circulaires entre {}. Importez ces modèles sans leurs colonnes de référence, puis mettez-les à jour.",
            report.import_order.cyclic.join(", ")
        );
    }

    let _ = writeln!(out, "\n## Notes importantes\n");
    let _ = writeln!(
        out,
        "- Les références multiples dans une cellule sont séparées par \"{}\"",
        options.reference_delimiter
    );
    let _ = writeln!(
        out,
        "- Les références introuvables sont retirées ; une cellule sans référence valide reste vide"
    );
    let unresolved = report.unresolved_tokens();
    if unresolved > 0 {
        let _ = writeln!(
            out,
            "- {unresolved} référence(s) n'ont pas pu être résolues (détail dans {})",
            layout.manifest_file
        );
    }
    let _ = writeln!(
        out,
        "- Les statistiques de mapping sont incluses dans {}",
        layout.audit_file
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::CollectionReport;
    use kimport_mapping::ImportOrder;

    fn report() -> PipelineReport {
        PipelineReport {
            collections: vec![
                CollectionReport {
                    name: "Invoices".into(),
                    rows: 3,
                    ..Default::default()
                },
                CollectionReport {
                    name: "Suppliers".into(),
                    rows: 2,
                    ..Default::default()
                },
            ],
            import_order: ImportOrder {
                ordered: vec!["Suppliers".into(), "Invoices".into()],
                cyclic: vec![],
            },
        }
    }

    #[test]
    fn test_readme_lists_import_order() {
        let readme = render_readme(&report(), &PipelineOptions::default());
        let suppliers = readme.find("1. `fichiers_kimaiko/Suppliers.csv` (2 lignes)").unwrap();
        let invoices = readme.find("2. `fichiers_kimaiko/Invoices.csv` (3 lignes)").unwrap();
        assert!(suppliers < invoices);
        assert!(readme.contains("references_uuid.csv"));
        assert!(!readme.contains("circulaires"));
    }

    #[test]
    fn test_package_entries() {
        let archive = package(&[], &AuditTable::new(), report(), &PipelineOptions::default()).unwrap();
        assert_eq!(
            archive.entries(),
            &["references/references_uuid.csv", "README.md", "manifest.json"]
        );

        let mut zip = zip::ZipArchive::new(Cursor::new(archive.bytes())).unwrap();
        let manifest: serde_json::Value =
            serde_json::from_reader(zip.by_name("manifest.json").unwrap()).unwrap();
        assert_eq!(manifest["import_order"], serde_json::json!(["Suppliers", "Invoices"]));
        assert_eq!(manifest["options"]["reference_delimiter"], ", ");
        assert_eq!(manifest["generator"], "kimport-pipeline");
    }
}
