use crate::error::{CliError, CliResult};
use kimport_pipeline::{load_options, PipelineOptions, UnresolvedPolicy};
use kimport_tabular::CsvReadOptions;
use std::path::Path;

/// Pipeline settings given on the command line.
#[derive(Debug, Clone, Default)]
pub struct OptionOverrides {
    pub strict: bool,
    pub delimiter: Option<String>,
    pub no_optimize: bool,
}

/// Resolve pipeline options: flags > `--config` file > defaults.
pub fn resolve_options(
    config_path: Option<&Path>,
    overrides: &OptionOverrides,
) -> CliResult<PipelineOptions> {
    let mut options = match config_path {
        Some(path) => load_options(path)?,
        None => PipelineOptions::default(),
    };

    if overrides.strict {
        options.unresolved_references = UnresolvedPolicy::Strict;
    }
    if let Some(delimiter) = &overrides.delimiter {
        options.reference_delimiter = delimiter.clone();
    }
    if overrides.no_optimize {
        options.optimize_tables = false;
    }

    options.validate()?;
    Ok(options)
}

/// CSV reader options for source spreadsheets.
pub fn csv_options(delimiter: char) -> CliResult<CsvReadOptions> {
    if !delimiter.is_ascii() {
        return Err(CliError::Usage(format!(
            "--csv-delimiter must be a single ASCII character, got '{delimiter}'"
        )));
    }
    Ok(CsvReadOptions {
        delimiter: delimiter as u8,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flags_override_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "reference_delimiter = \";\"\noptimize_tables = true").unwrap();

        let from_file = resolve_options(Some(file.path()), &OptionOverrides::default()).unwrap();
        assert_eq!(from_file.reference_delimiter, ";");
        assert_eq!(from_file.unresolved_references, UnresolvedPolicy::Lenient);

        let overridden = resolve_options(
            Some(file.path()),
            &OptionOverrides {
                strict: true,
                delimiter: Some(" | ".into()),
                no_optimize: true,
            },
        )
        .unwrap();
        assert_eq!(overridden.reference_delimiter, " | ");
        assert_eq!(overridden.unresolved_references, UnresolvedPolicy::Strict);
        assert!(!overridden.optimize_tables);
    }

    #[test]
    fn blank_delimiter_flag_rejected() {
        let err = resolve_options(
            None,
            &OptionOverrides {
                delimiter: Some(" ".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn csv_delimiter_must_be_ascii() {
        assert_eq!(csv_options(';').unwrap().delimiter, b';');
        assert!(csv_options('§').is_err());
    }
}
