//! Root index change detection and staging.

use tracing::{debug, info, warn};

use super::root::RootIndex;
use crate::config::StoreLayout;
use crate::error::{MirrorError, MirrorResult};
use crate::store::ResourceStore;
use crate::sync::SyncState;

/// Result of comparing a fetched root index with the mirrored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    /// Identical to the canonical index; nothing was written.
    Unchanged,
    /// Written to the staging location, awaiting commit.
    Staged,
}

/// Decides whether the root index changed since the last sync.
pub struct ChangeDetector<'a> {
    store: &'a dyn ResourceStore,
    layout: &'a StoreLayout,
}

impl<'a> ChangeDetector<'a> {
    pub fn new(store: &'a dyn ResourceStore, layout: &'a StoreLayout) -> Self {
        Self { store, layout }
    }

    /// Compare `index` with the canonical index and stage it when changed.
    ///
    /// A cold start always counts as changed. The canonical index itself is
    /// never written here.
    pub fn detect(&self, index: &RootIndex, state: SyncState) -> MirrorResult<ChangeStatus> {
        let fetched = self.store.hash(index.raw());

        if !state.initialized && self.store.exists(&self.layout.index) {
            match self.store.hash_of_stored(&self.layout.index) {
                Ok(stored) if stored == fetched => {
                    info!(hash = %fetched, "Root index unchanged");
                    return Ok(ChangeStatus::Unchanged);
                }
                Ok(stored) => {
                    debug!(stored = %stored, fetched = %fetched, "Root index changed");
                }
                Err(e) => {
                    warn!(key = %self.layout.index, error = %e, "Cannot hash mirrored root index, treating as changed");
                }
            }
        }

        self.store
            .write(&self.layout.staging, index.raw())
            .map_err(|source| MirrorError::Stage {
                path: self.layout.staging.clone(),
                source,
            })?;
        info!(key = %self.layout.staging, hash = %fetched, "Root index staged");
        Ok(ChangeStatus::Staged)
    }
}
