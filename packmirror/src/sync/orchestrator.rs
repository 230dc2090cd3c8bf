//! Synchronization run orchestrator.
//!
//! Sequences one run over the mirror:
//!
//! ```text
//! Start ─► IndexSync ─┬─► Done (NothingToDo)
//!                     ▼
//!              ProviderExpand ─┬─► Commit ─► Cleanup ─► Done (UpToDate)
//!                              ▼
//!              ProviderFetch ─► PackageSync (per provider) ─► Commit ─► Cleanup ─► Done
//! ```
//!
//! Every fetch phase runs through the download pool against the mirror
//! rotation, feeds the circuit breaker, and retries its failures once
//! against the canonical source. Any fatal error aborts the run before the
//! canonical root index is touched.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::{error, info, warn};

use super::progress::{NullProgress, ProgressSink};
use super::state::{SyncPhase, SyncState};
use super::summary::{PhaseSummary, RunStatus, RunSummary, UnresolvedResource};
use crate::config::MirrorConfig;
use crate::download::{DownloadPool, FallbackRouter, PoolOutcome};
use crate::error::{MirrorError, MirrorResult};
use crate::fetch::{join_url, FetchSource, HttpClient, ReqwestClient};
use crate::index::{
    expand_packages, expand_providers, ChangeDetector, ChangeStatus, Resource, RootIndex,
    WorkingSet,
};
use crate::mirror::{CircuitBreaker, MirrorRegistry};
use crate::store::{LocalStore, ResourceStore};

/// Label of the provider fetch phase.
const PROVIDERS_LABEL: &str = "providers";

/// Mutable state of a single run.
struct RunContext {
    state: SyncState,
    registry: MirrorRegistry,
    breaker: CircuitBreaker,
    phases: Vec<PhaseSummary>,
    unresolved: Vec<UnresolvedResource>,
    disabled: Vec<String>,
    started_at: DateTime<Local>,
}

impl RunContext {
    fn finish(self, status: RunStatus) -> RunSummary {
        RunSummary {
            status,
            phases: self.phases,
            unresolved: self.unresolved,
            disabled_mirrors: self.disabled,
            started_at: self.started_at,
            finished_at: Local::now(),
        }
    }
}

/// Runs mirror synchronizations.
///
/// The orchestrator itself is stateless between runs: mirror health and
/// the rotation are rebuilt from configuration for every call to
/// [`run`](Self::run).
pub struct SyncOrchestrator {
    config: MirrorConfig,
    store: Arc<dyn ResourceStore>,
    source: FetchSource,
    pool: DownloadPool,
    progress: Arc<dyn ProgressSink>,
}

impl fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("config", &self.config)
            .field("source", &self.source)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl SyncOrchestrator {
    /// Create an orchestrator over explicit store and HTTP client.
    pub fn new(
        config: MirrorConfig,
        store: Arc<dyn ResourceStore>,
        client: Arc<dyn HttpClient>,
    ) -> Self {
        let source = FetchSource::new(client, config.canonical_url.clone());
        let pool = DownloadPool::new(config.concurrency);
        Self {
            config,
            store,
            source,
            pool,
            progress: Arc::new(NullProgress),
        }
    }

    /// Create an orchestrator writing to `config.output_dir` over HTTP.
    pub fn from_config(config: MirrorConfig) -> MirrorResult<Self> {
        config.validate()?;
        let client = ReqwestClient::new(config.timeout, &config.user_agent)?;
        let store = LocalStore::new(&config.output_dir).with_gzip(config.gzip);
        Ok(Self::new(config, Arc::new(store), Arc::new(client)))
    }

    /// Report progress to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Run one synchronization.
    ///
    /// Resource-level failures are reported in the summary. `Err` is only
    /// returned for fatal conditions, in which case the canonical root index
    /// is left as it was.
    pub async fn run(&self) -> MirrorResult<RunSummary> {
        info!(
            canonical = self.source.canonical_base(),
            mirrors = ?self.config.rotation(),
            concurrency = self.pool.concurrency(),
            breaker_threshold = self.config.breaker_threshold,
            "Starting mirror sync"
        );

        match self.execute().await {
            Ok(summary) => {
                info!(
                    phase = %SyncPhase::Done,
                    status = %summary.status,
                    fetched = summary.total_fetched(),
                    skipped = summary.total_skipped(),
                    unresolved = summary.unresolved.len(),
                    disabled_mirrors = summary.disabled_mirrors.len(),
                    "Mirror sync finished"
                );
                Ok(summary)
            }
            Err(e) => {
                error!(phase = %SyncPhase::Error, error = %e, "Mirror sync aborted");
                Err(e)
            }
        }
    }

    async fn execute(&self) -> MirrorResult<RunSummary> {
        let started_at = Local::now();
        let layout = &self.config.layout;
        let store = self.store.as_ref();

        info!(phase = %SyncPhase::Start, "Establishing sync state");
        let state = SyncState::establish(store, layout)?;
        let mut run = RunContext {
            state,
            registry: MirrorRegistry::new(self.config.rotation())?,
            breaker: CircuitBreaker::new(self.config.breaker_threshold),
            phases: Vec::new(),
            unresolved: Vec::new(),
            disabled: Vec::new(),
            started_at,
        };

        let index = self.fetch_index().await?;
        if ChangeDetector::new(store, layout).detect(&index, state)? == ChangeStatus::Unchanged {
            self.progress.report("Root index unchanged, nothing to do");
            return Ok(run.finish(RunStatus::NothingToDo));
        }

        let providers = expand_providers(&index)?;
        info!(
            phase = %SyncPhase::ProviderExpand,
            providers = providers.len(),
            initialized = state.initialized,
            "Providers expanded"
        );

        if state.trusts_existing() && providers.iter().all(|p| store.exists(p.path())) {
            run.phases.push(PhaseSummary {
                phase: SyncPhase::ProviderFetch,
                label: PROVIDERS_LABEL.to_string(),
                fetched: 0,
                skipped: providers.len(),
                failed: 0,
            });
            self.progress.report("All providers already up to date");
            self.commit()?;
            self.cleanup(state)?;
            return Ok(run.finish(RunStatus::UpToDate));
        }

        let provider_failures = self
            .sync_resources(SyncPhase::ProviderFetch, PROVIDERS_LABEL, &providers, &mut run)
            .await?;
        let blocked: BTreeSet<String> = provider_failures.failures().keys().cloned().collect();

        for provider in &providers {
            if blocked.contains(provider.path()) {
                continue;
            }
            let Some(packages) = self.provider_packages(&index, provider.path(), &mut run)? else {
                continue;
            };
            self.sync_resources(SyncPhase::PackageSync, provider.path(), &packages, &mut run)
                .await?;
        }

        if !blocked.is_empty() {
            warn!(
                phase = %SyncPhase::Commit,
                providers = blocked.len(),
                "Commit withheld: provider documents missing"
            );
            self.progress.report(&format!(
                "{} provider document(s) could not be fetched; root index not committed",
                blocked.len()
            ));
            return Ok(run.finish(RunStatus::Incomplete));
        }

        self.commit()?;
        self.cleanup(state)?;

        let status = if run.unresolved.is_empty() {
            RunStatus::Completed
        } else {
            RunStatus::Incomplete
        };
        Ok(run.finish(status))
    }

    /// Fetch and parse the root index from the canonical source.
    async fn fetch_index(&self) -> MirrorResult<RootIndex> {
        let url = join_url(self.source.canonical_base(), &self.config.layout.index);
        info!(phase = %SyncPhase::IndexSync, url = %url, "Fetching root index");

        let (_, _, result) = self.source.request(url.clone()).resolve().await;
        let body = result.map_err(|e| MirrorError::IndexFetch {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        RootIndex::parse(body, &url)
    }

    /// Package working set of one stored provider document.
    ///
    /// An unreadable or malformed provider document is recorded as
    /// unresolved and yields `None`.
    fn provider_packages(
        &self,
        index: &RootIndex,
        provider: &str,
        run: &mut RunContext,
    ) -> MirrorResult<Option<WorkingSet>> {
        let reason = match self.store.read(provider) {
            Ok(document) => match expand_packages(index, provider, &document) {
                Ok(packages) => return Ok(Some(packages)),
                Err(MirrorError::ProviderParse { reason, .. }) => reason,
                Err(e) => return Err(e),
            },
            Err(e) => e.to_string(),
        };

        warn!(
            phase = %SyncPhase::PackageSync,
            provider,
            reason = %reason,
            "Provider document unusable, skipping its packages"
        );
        run.unresolved.push(UnresolvedResource {
            path: provider.to_string(),
            owner: None,
            uri: None,
            reason,
        });
        Ok(None)
    }

    /// Fetch a working set through the mirrors, then the canonical fallback.
    ///
    /// Returns the failures left after fallback; they are also recorded as
    /// unresolved in `run`.
    async fn sync_resources(
        &self,
        phase: SyncPhase,
        label: &str,
        resources: &WorkingSet,
        run: &mut RunContext,
    ) -> MirrorResult<PoolOutcome> {
        let (outcome, skipped) = self
            .fetch_phase(label, resources, run.state, &run.registry)
            .await?;
        self.trip_breaker(&outcome, run);

        let mut fetched = outcome.succeeded();
        let remaining = if outcome.has_failures() {
            let retried = self.fallback_phase(label, &outcome).await?;
            self.trip_breaker(&retried, run);
            fetched += retried.succeeded();
            retried
        } else {
            outcome
        };

        for (path, failure) in remaining.failures() {
            run.unresolved.push(UnresolvedResource {
                path: path.clone(),
                owner: resources
                    .get(path)
                    .and_then(Resource::owner)
                    .map(str::to_string),
                uri: Some(failure.uri.clone()),
                reason: failure.message.clone(),
            });
        }

        let failed = remaining.failure_count();
        info!(phase = %phase, label, fetched, skipped, failed, "Phase complete");
        run.phases.push(PhaseSummary {
            phase,
            label: label.to_string(),
            fetched,
            skipped,
            failed,
        });
        Ok(remaining)
    }

    /// One pool run over the mirror rotation, skipping trusted documents.
    ///
    /// Returns the outcome and the number of skipped resources.
    async fn fetch_phase(
        &self,
        label: &str,
        resources: &WorkingSet,
        state: SyncState,
        registry: &MirrorRegistry,
    ) -> MirrorResult<(PoolOutcome, usize)> {
        let store = self.store.as_ref();
        let progress = self.progress.as_ref();
        let mut skipped = 0;

        progress.start(label, resources.len() as u64);
        let items = resources.iter().filter_map(|resource| {
            if state.trusts_existing() && store.exists(resource.path()) {
                skipped += 1;
                progress.advance();
                return None;
            }
            let fetch = self.source.mirror_request(registry, resource.path());
            Some((resource.path().to_string(), fetch))
        });
        let outcome = self
            .pool
            .run(
                items,
                |key, body| store.write(key, &body).map_err(MirrorError::from),
                || progress.advance(),
            )
            .await;
        progress.end();

        Ok((outcome?, skipped))
    }

    /// Retry a phase's failures once against the canonical source.
    async fn fallback_phase(&self, label: &str, failed: &PoolOutcome) -> MirrorResult<PoolOutcome> {
        let store = self.store.as_ref();
        let progress = self.progress.as_ref();

        progress.start(&format!("{label} (canonical)"), failed.failure_count() as u64);
        let outcome = FallbackRouter::new(&self.source, &self.pool)
            .fallback(
                failed,
                label,
                |key, body| store.write(key, &body).map_err(MirrorError::from),
                || progress.advance(),
            )
            .await;
        progress.end();
        outcome
    }

    fn trip_breaker(&self, outcome: &PoolOutcome, run: &mut RunContext) {
        let disabled = run.breaker.evaluate(outcome, &mut run.registry);
        for origin in &disabled {
            self.progress
                .report(&format!("Mirror {origin} disabled after repeated failures"));
        }
        run.disabled.extend(disabled);
    }

    /// Promote the staged root index.
    fn commit(&self) -> MirrorResult<()> {
        let layout = &self.config.layout;
        self.store
            .rename(&layout.staging, &layout.index)
            .map_err(|source| MirrorError::Commit {
                from: layout.staging.clone(),
                to: layout.index.clone(),
                source,
            })?;
        info!(phase = %SyncPhase::Commit, key = %layout.index, "Root index committed");
        Ok(())
    }

    /// Drop the cold-start marker after a committed cold run.
    fn cleanup(&self, state: SyncState) -> MirrorResult<()> {
        if state.initialized {
            self.store.remove(&self.config.layout.marker)?;
            info!(phase = %SyncPhase::Cleanup, "Cold start complete");
        }
        Ok(())
    }
}
