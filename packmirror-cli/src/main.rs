//! Packmirror CLI - Command-line interface
//!
//! This binary drives the packmirror library: `sync` updates a mirror
//! directory from upstream, `status` inspects one.

mod commands;
mod error;
mod progress;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use commands::status::StatusArgs;
use commands::sync::SyncArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "packmirror")]
#[command(version, about = "Incremental mirror for Composer package repositories", long_about = None)]
struct Cli {
    /// Configuration file (default: <config dir>/packmirror/config.ini)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize the mirror with upstream
    Sync(SyncArgs),
    /// Show the state of a mirror directory
    Status(StatusArgs),
}

fn main() {
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    process::exit(code);
}

fn run(cli: Cli) -> Result<i32, CliError> {
    let file = commands::common::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync(args) => {
            let _logging = commands::common::start_logging(&file, cli.verbose)?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|e| CliError::Runtime(e.to_string()))?;
            runtime.block_on(commands::sync::run(args, file))
        }
        Commands::Status(args) => commands::status::run(args, file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_flags() {
        let cli = Cli::try_parse_from([
            "packmirror",
            "-v",
            "sync",
            "--mirror",
            "https://a.example",
            "--mirror",
            "https://b.example",
            "-j",
            "8",
            "--no-progress",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Sync(args) => {
                assert_eq!(args.mirrors.len(), 2);
                assert_eq!(args.concurrency, Some(8));
                assert!(args.no_progress);
            }
            Commands::Status(_) => panic!("expected sync"),
        }
    }
}
