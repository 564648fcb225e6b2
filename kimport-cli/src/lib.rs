//! kimport CLI library.
//!
//! This crate provides the argument types, command handlers and output
//! helpers behind the `kimport` binary. Other front ends can build a
//! [`Cli`](cli::Cli) programmatically and call [`run`], or call the command
//! handlers in [`commands`] directly.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

use cli::{Cli, Commands};

/// Dispatch a parsed [`Cli`] to the appropriate command handler.
pub fn run(cli: Cli) -> error::CliResult<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Generate {
            mapping,
            sources,
            output,
            strict,
            delimiter,
            no_optimize,
            csv_delimiter,
            json,
        } => commands::generate::run(
            commands::generate::GenerateArgs {
                mapping: &mapping,
                sources: &sources,
                output: &output,
                overrides: config::OptionOverrides {
                    strict,
                    delimiter,
                    no_optimize,
                },
                csv_delimiter,
                json,
                quiet: cli.quiet,
            },
            config_path,
        ),

        Commands::Validate {
            mapping,
            sources,
            csv_delimiter,
        } => commands::validate::run(&mapping, &sources, csv_delimiter),
    }
}
