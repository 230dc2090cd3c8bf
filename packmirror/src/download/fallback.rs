//! Single retry pass against the canonical source.

use bytes::Bytes;
use tracing::{info, warn};

use super::outcome::PoolOutcome;
use super::pool::DownloadPool;
use crate::error::MirrorResult;
use crate::fetch::FetchSource;

/// Re-submits failed fetches to the canonical (non-mirror) source.
///
/// Each call is one pass: whatever fails here is left unresolved and is
/// never handed back to the router.
#[derive(Debug)]
pub struct FallbackRouter<'a> {
    source: &'a FetchSource,
    pool: &'a DownloadPool,
}

impl<'a> FallbackRouter<'a> {
    /// Create a router sharing the run's fetch source and pool.
    pub fn new(source: &'a FetchSource, pool: &'a DownloadPool) -> Self {
        Self { source, pool }
    }

    /// Retry exactly the failed keys of `failed` against the canonical source.
    ///
    /// `owner` labels the phase in logs (the provider whose packages are
    /// retried, or `providers`).
    pub async fn fallback<S, E>(
        &self,
        failed: &PoolOutcome,
        owner: &str,
        on_success: S,
        on_each: E,
    ) -> MirrorResult<PoolOutcome>
    where
        S: FnMut(&str, Bytes) -> MirrorResult<()>,
        E: FnMut(),
    {
        if !failed.has_failures() {
            return Ok(PoolOutcome::default());
        }

        info!(
            owner,
            count = failed.failure_count(),
            canonical = self.source.canonical_base(),
            "Retrying failed fetches against canonical source"
        );

        let items = failed
            .failures()
            .keys()
            .map(|key| (key.clone(), self.source.canonical_request(key)));
        let outcome = self.pool.run(items, on_success, on_each).await?;

        for (key, failure) in outcome.failures() {
            warn!(
                owner,
                key = %key,
                uri = %failure.uri,
                error = %failure.message,
                "Unresolved after fallback"
            );
        }

        Ok(outcome)
    }
}
