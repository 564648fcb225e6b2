use crate::cli::SourceArg;
use crate::config::csv_options;
use crate::error::{CliError, CliResult};
use crate::output;
use colored::Colorize;
use kimport_mapping::MappingLoader;
use kimport_pipeline::{Pipeline, PipelineOptions};
use std::path::Path;

/// Structural checks on the mapping, then a preflight against the sources
/// when any are given.
pub fn run(mapping: &Path, sources: &[SourceArg], csv_delimiter: char) -> CliResult<()> {
    let spec = MappingLoader::from_path(mapping)?.into_spec();

    let issues = spec.issues();
    if !issues.is_empty() {
        return Err(CliError::Invalid(
            issues.iter().map(ToString::to_string).collect(),
        ));
    }

    if !sources.is_empty() {
        let registry = super::load_sources(sources, &csv_options(csv_delimiter)?)?;
        Pipeline::new(PipelineOptions::default()).preflight(&spec, &registry)?;
    }

    println!(
        "{} {} ({} collections)",
        "Valid".green().bold(),
        mapping.display(),
        spec.len()
    );
    println!("{}", output::format_import_order(&spec.import_order()));
    Ok(())
}
