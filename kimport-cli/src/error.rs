use colored::Colorize;
use std::fmt;
use std::process;

/// Exit codes for the CLI.
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

/// Unified error type for CLI operations.
pub enum CliError {
    /// Generation failed.
    Pipeline(kimport_pipeline::PipelineError),
    /// Mapping document unreadable or invalid.
    Mapping(kimport_mapping::MappingError),
    /// Source spreadsheet unreadable.
    Source(kimport_tabular::TabularError),
    /// Options file issues.
    Config(kimport_pipeline::ConfigError),
    /// Mapping document with structural issues, all of them listed.
    Invalid(Vec<String>),
    /// Output file issues.
    Output(String),
    /// Argument / usage errors.
    Usage(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Pipeline(e) => {
                write!(f, "{} {e}", "error:".red().bold())?;
                if let kimport_pipeline::PipelineError::UnresolvedReference { .. } = e.root() {
                    write!(
                        f,
                        "\n  {} rerun without --strict to drop unknown keys",
                        "help:".cyan().bold()
                    )?;
                }
                Ok(())
            }
            CliError::Mapping(e) => write!(f, "{} {e}", "error:".red().bold()),
            CliError::Source(e) => write!(f, "{} {e}", "error:".red().bold()),
            CliError::Config(e) => write!(f, "{} {e}", "error:".red().bold()),
            CliError::Invalid(issues) => {
                write!(
                    f,
                    "{} mapping has {} issue(s)",
                    "error:".red().bold(),
                    issues.len()
                )?;
                for issue in issues {
                    write!(f, "\n  - {issue}")?;
                }
                Ok(())
            }
            CliError::Output(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::Usage(msg) => write!(f, "{} {msg}", "error:".red().bold()),
        }
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<kimport_pipeline::PipelineError> for CliError {
    fn from(e: kimport_pipeline::PipelineError) -> Self {
        CliError::Pipeline(e)
    }
}

impl From<kimport_mapping::MappingError> for CliError {
    fn from(e: kimport_mapping::MappingError) -> Self {
        CliError::Mapping(e)
    }
}

impl From<kimport_tabular::TabularError> for CliError {
    fn from(e: kimport_tabular::TabularError) -> Self {
        CliError::Source(e)
    }
}

impl From<kimport_pipeline::ConfigError> for CliError {
    fn from(e: kimport_pipeline::ConfigError) -> Self {
        CliError::Config(e)
    }
}

/// Print error and exit with the appropriate code.
pub fn exit_with_error(err: CliError) -> ! {
    eprintln!("{err}");
    let code = match &err {
        CliError::Usage(_) => EXIT_USAGE,
        _ => EXIT_ERROR,
    };
    process::exit(code)
}

pub type CliResult<T> = std::result::Result<T, CliError>;
