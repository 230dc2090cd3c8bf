//! Sync command - bring the mirror up to date with upstream.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;
use packmirror::config::{ConfigFile, MirrorConfig};
use packmirror::sync::{RunStatus, RunSummary, SyncOrchestrator};
use tracing::info;

use super::common::resolve_output;
use crate::error::CliError;
use crate::progress::IndicatifProgress;

/// Arguments for the sync command.
#[derive(Debug, Default, Args)]
pub struct SyncArgs {
    /// Mirror output directory (overrides config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Mirror base URL; repeat for several (replaces configured mirrors)
    #[arg(short = 'm', long = "mirror", value_name = "URL")]
    pub mirrors: Vec<String>,

    /// Canonical repository URL (overrides config)
    #[arg(long, value_name = "URL")]
    pub canonical: Option<String>,

    /// Maximum concurrent downloads
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Failures after which a mirror is disabled for the run
    #[arg(long)]
    pub threshold: Option<usize>,

    /// Store documents gzip-compressed
    #[arg(long)]
    pub gzip: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,
}

/// Merge CLI flags over the configuration file.
pub fn build_config(args: &SyncArgs, file: &ConfigFile) -> Result<MirrorConfig, CliError> {
    let mut config = file.mirror.clone();
    config.output_dir = resolve_output(args.output.clone(), file);

    if let Some(ref canonical) = args.canonical {
        config = config.with_canonical_url(canonical.trim_end_matches('/'));
    }
    if !args.mirrors.is_empty() {
        config.mirrors = args
            .mirrors
            .iter()
            .map(|m| m.trim_end_matches('/').to_string())
            .collect();
    }
    if let Some(concurrency) = args.concurrency {
        config = config.with_concurrency(concurrency);
    }
    if let Some(threshold) = args.threshold {
        config = config.with_breaker_threshold(threshold);
    }
    if args.gzip {
        config = config.with_gzip(true);
    }

    config.validate()?;
    Ok(config)
}

/// Run the sync command, returning the process exit code.
pub async fn run(args: SyncArgs, file: ConfigFile) -> Result<i32, CliError> {
    let config = build_config(&args, &file)?;
    info!(
        output = %config.output_dir.display(),
        canonical = %config.canonical_url,
        "Sync requested"
    );

    let mut orchestrator = SyncOrchestrator::from_config(config)?;
    if !args.no_progress && console::user_attended_stderr() {
        orchestrator = orchestrator.with_progress(Arc::new(IndicatifProgress::new()));
    }

    let summary = orchestrator.run().await?;
    print_summary(&summary);
    Ok(summary.exit_code())
}

fn print_summary(summary: &RunSummary) {
    let status = match summary.status {
        RunStatus::NothingToDo | RunStatus::UpToDate => style(summary.status.to_string()).cyan(),
        RunStatus::Completed => style(summary.status.to_string()).green(),
        RunStatus::Incomplete => style(summary.status.to_string()).yellow(),
    };

    println!();
    println!("{} {}", style("Sync").bold(), status.bold());
    println!(
        "  Fetched: {}  Skipped: {}  Unresolved: {}  Time: {:.1}s",
        summary.total_fetched(),
        summary.total_skipped(),
        summary.unresolved.len(),
        summary.elapsed().num_milliseconds() as f64 / 1000.0
    );

    if !summary.disabled_mirrors.is_empty() {
        println!();
        println!("{}", style("Disabled mirrors:").yellow());
        for origin in &summary.disabled_mirrors {
            println!("  - {}", origin);
        }
    }

    if !summary.unresolved.is_empty() {
        println!();
        println!("{}", style("Unresolved documents:").red());
        for resource in &summary.unresolved {
            match resource.owner {
                Some(ref owner) => {
                    println!("  - {} (from {}): {}", resource.path, owner, resource.reason)
                }
                None => println!("  - {}: {}", resource.path, resource.reason),
            }
        }
    }
}
