//! Status command - inspect a mirror directory without touching the network.

use std::path::PathBuf;

use clap::Args;
use console::style;
use packmirror::config::{ConfigFile, StoreLayout};
use packmirror::store::{LocalStore, ResourceStore, StoreError};

use super::common::resolve_output;
use crate::error::CliError;

/// Arguments for the status command.
#[derive(Debug, Default, Args)]
pub struct StatusArgs {
    /// Mirror directory (overrides config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// State of a mirror directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorStatus {
    /// SHA-256 of the committed root index, if any.
    pub index_hash: Option<String>,
    /// A staged root index is waiting for a complete run.
    pub staged: bool,
    /// A cold start has not finished yet.
    pub cold_start_pending: bool,
    /// The provider/package tree exists.
    pub tree_present: bool,
}

/// Read the mirror state from a store.
pub fn inspect(store: &dyn ResourceStore, layout: &StoreLayout) -> Result<MirrorStatus, StoreError> {
    let index_hash = if store.exists(&layout.index) {
        Some(store.hash_of_stored(&layout.index)?)
    } else {
        None
    };

    Ok(MirrorStatus {
        index_hash,
        staged: store.exists(&layout.staging),
        cold_start_pending: store.exists(&layout.marker),
        tree_present: store.exists(&layout.package_root),
    })
}

/// Run the status command.
pub fn run(args: StatusArgs, file: ConfigFile) -> Result<i32, CliError> {
    let dir = resolve_output(args.output, &file);
    let store = LocalStore::new(&dir).with_gzip(file.mirror.gzip);
    let status = inspect(&store, &file.mirror.layout)
        .map_err(|e| CliError::Status(format!("{}: {}", dir.display(), e)))?;

    println!("{} {}", style("Mirror:").bold(), dir.display());
    match status.index_hash {
        Some(ref hash) => println!("  Root index:  {}", hash),
        None => println!("  Root index:  {}", style("not synced yet").yellow()),
    }
    println!("  Package tree: {}", yes_no(status.tree_present));
    println!("  Staged index: {}", yes_no(status.staged));
    if status.cold_start_pending {
        println!(
            "  {}",
            style("Cold start pending: the next sync refetches everything").yellow()
        );
    }
    Ok(0)
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
