//! Per-run synchronization state and phases.

use std::fmt;

use chrono::Local;
use tracing::info;

use crate::config::StoreLayout;
use crate::error::MirrorResult;
use crate::store::ResourceStore;

/// Whether a run is a cold start.
///
/// Computed once at the start of a run and passed by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncState {
    /// Everything is fetched; existing documents are not trusted.
    pub initialized: bool,
}

impl SyncState {
    /// Inspect the store and record a cold start.
    ///
    /// A run is cold when the package tree is missing or a previous cold
    /// run left its marker behind. The marker is written here and only
    /// removed once a cold run commits, so an interrupted cold start is
    /// resumed as cold.
    pub fn establish(store: &dyn ResourceStore, layout: &StoreLayout) -> MirrorResult<Self> {
        let tree_missing = !store.exists(&layout.package_root);
        let marker_present = store.exists(&layout.marker);
        let initialized = tree_missing || marker_present;

        if initialized && !marker_present {
            let stamp = Local::now().to_rfc3339();
            store.write(&layout.marker, stamp.as_bytes())?;
        }

        info!(
            initialized,
            tree_missing,
            resumed = marker_present,
            "Sync state established"
        );
        Ok(Self { initialized })
    }

    /// Whether a document already in the store can be trusted.
    pub fn trusts_existing(self) -> bool {
        !self.initialized
    }
}

/// Phases of a synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Start,
    IndexSync,
    ProviderExpand,
    ProviderFetch,
    PackageSync,
    Commit,
    Cleanup,
    Done,
    Error,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncPhase::Start => "start",
            SyncPhase::IndexSync => "index-sync",
            SyncPhase::ProviderExpand => "provider-expand",
            SyncPhase::ProviderFetch => "provider-fetch",
            SyncPhase::PackageSync => "package-sync",
            SyncPhase::Commit => "commit",
            SyncPhase::Cleanup => "cleanup",
            SyncPhase::Done => "done",
            SyncPhase::Error => "error",
        };
        f.write_str(name)
    }
}
