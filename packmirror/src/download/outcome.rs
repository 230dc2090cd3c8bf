//! Per-phase download results.

use std::collections::BTreeMap;

use crate::fetch::FetchError;

/// A single failed fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    /// Request URI.
    pub uri: String,
    /// Origin the request went to; `None` when it never left the process.
    pub origin: Option<String>,
    /// HTTP status, when the server answered.
    pub status: Option<u16>,
    /// Human-readable reason.
    pub message: String,
}

impl FetchFailure {
    /// Build a failure record from a fetch error.
    pub fn new(uri: impl Into<String>, origin: Option<String>, error: &FetchError) -> Self {
        Self {
            uri: uri.into(),
            origin,
            status: error.status(),
            message: error.to_string(),
        }
    }
}

/// Aggregated result of one pool phase.
///
/// Every key submitted to the pool ends up either counted as a success or
/// present in [`failures`](Self::failures), exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolOutcome {
    succeeded: usize,
    failures: BTreeMap<String, FetchFailure>,
}

impl PoolOutcome {
    /// Record a successful fetch.
    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    /// Record a failed fetch for `key`.
    pub fn record_failure(&mut self, key: String, failure: FetchFailure) {
        self.failures.insert(key, failure);
    }

    /// Number of successful fetches.
    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    /// Failed fetches by key.
    pub fn failures(&self) -> &BTreeMap<String, FetchFailure> {
        &self.failures
    }

    /// Number of failed fetches.
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Whether any fetch failed.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Number of keys that reached a terminal outcome.
    pub fn submitted(&self) -> usize {
        self.succeeded + self.failures.len()
    }
}
