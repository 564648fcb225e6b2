use crate::cli::SourceArg;
use crate::config::{csv_options, resolve_options, OptionOverrides};
use crate::error::{CliError, CliResult};
use crate::output;
use colored::Colorize;
use kimport_mapping::MappingLoader;
use kimport_pipeline::Pipeline;
use std::path::Path;

pub struct GenerateArgs<'a> {
    pub mapping: &'a Path,
    pub sources: &'a [SourceArg],
    pub output: &'a Path,
    pub overrides: OptionOverrides,
    pub csv_delimiter: char,
    pub json: bool,
    pub quiet: bool,
}

pub fn run(args: GenerateArgs<'_>, config_path: Option<&Path>) -> CliResult<()> {
    let options = resolve_options(config_path, &args.overrides)?;
    let spec = MappingLoader::from_path(args.mapping)?.compile()?;
    let registry = super::load_sources(args.sources, &csv_options(args.csv_delimiter)?)?;

    let mut pipeline = Pipeline::new(options);
    let archive = pipeline.run(&spec, registry)?;
    archive.write_to(args.output).map_err(|e| {
        CliError::Output(format!("cannot write {}: {e}", args.output.display()))
    })?;

    let report = archive.report();
    if args.json {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| CliError::Output(format!("cannot serialize report: {e}")))?;
        println!("{json}");
        return Ok(());
    }
    if args.quiet {
        return Ok(());
    }

    println!("{}", output::report_table(report));
    println!();
    println!("{}", output::format_import_order(&report.import_order));
    if let Some(unresolved) = output::format_unresolved(report) {
        eprintln!("{unresolved}");
    }
    println!(
        "\n{} {} ({} tables, {} rows)",
        "Wrote".green().bold(),
        args.output.display(),
        report.collections.len(),
        report.total_rows()
    );
    Ok(())
}
