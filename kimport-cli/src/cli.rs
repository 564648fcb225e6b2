use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kimport", about = "Kimaiko import archive generator", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output (also respects NO_COLOR env var)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Path to a pipeline options file (TOML, or JSON with a .json extension)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate an import archive from a mapping and legacy spreadsheets
    Generate {
        /// Mapping document (JSON)
        #[arg(long, short = 'm')]
        mapping: PathBuf,

        /// Source table as NAME=PATH (CSV); repeatable
        #[arg(long = "source", short = 's', value_name = "NAME=PATH", value_parser = parse_source, required = true)]
        sources: Vec<SourceArg>,

        /// Archive to write
        #[arg(long, short = 'o', default_value = "import_kimaiko.zip")]
        output: PathBuf,

        /// Fail on reference keys with no identity instead of dropping them
        #[arg(long)]
        strict: bool,

        /// Separator between keys in multi-valued reference cells
        #[arg(long)]
        delimiter: Option<String>,

        /// Keep output tables in their loaded representation
        #[arg(long)]
        no_optimize: bool,

        /// Field separator of the source CSV files
        #[arg(long, default_value_t = ',')]
        csv_delimiter: char,

        /// Print the run report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Check a mapping document, and optionally its sources, without generating
    Validate {
        /// Mapping document (JSON)
        #[arg(long, short = 'm')]
        mapping: PathBuf,

        /// Source table as NAME=PATH (CSV); repeatable
        #[arg(long = "source", short = 's', value_name = "NAME=PATH", value_parser = parse_source)]
        sources: Vec<SourceArg>,

        /// Field separator of the source CSV files
        #[arg(long, default_value_t = ',')]
        csv_delimiter: char,
    },
}

/// A `NAME=PATH` source table argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArg {
    pub name: String,
    pub path: PathBuf,
}

fn parse_source(raw: &str) -> Result<SourceArg, String> {
    let (name, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing table name in '{raw}'"));
    }
    if path.is_empty() {
        return Err(format!("missing path in '{raw}'"));
    }
    Ok(SourceArg {
        name: name.to_string(),
        path: PathBuf::from(path),
    })
}
