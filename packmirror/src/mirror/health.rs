//! Circuit breaker for failing mirror hosts.
//!
//! Failures are tallied per origin across all pool phases of one run. Once
//! an origin in rotation reaches the threshold it is removed from the
//! [`MirrorRegistry`] for the remainder of the run, so later phases only
//! route to hosts that still answer.
//!
//! # Phase boundaries
//!
//! The breaker consumes the [`PoolOutcome`] of a finished phase. It never
//! observes in-flight requests, so the registry is never mutated while a
//! phase is running.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::registry::MirrorRegistry;
use crate::download::PoolOutcome;

/// Cumulative failure counts per origin for the current run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorHealth {
    failures: BTreeMap<String, usize>,
}

impl MirrorHealth {
    /// Failures recorded for an origin.
    pub fn failures(&self, origin: &str) -> usize {
        self.failures.get(origin).copied().unwrap_or(0)
    }

    /// All origins with at least one failure.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.failures.iter().map(|(origin, count)| (origin.as_str(), *count))
    }

    fn add(&mut self, origin: &str, count: usize) {
        *self.failures.entry(origin.to_string()).or_insert(0) += count;
    }
}

/// Disables mirror hosts whose failure count crosses a threshold.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    threshold: usize,
    health: MirrorHealth,
}

impl CircuitBreaker {
    /// Create a breaker with the given threshold (minimum 1).
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: threshold.max(1),
            health: MirrorHealth::default(),
        }
    }

    /// Failure threshold.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Failure tallies so far.
    pub fn health(&self) -> &MirrorHealth {
        &self.health
    }

    /// Fold a finished phase into the tallies and disable tripped hosts.
    ///
    /// Returns the origins removed from the registry by this call.
    pub fn evaluate(&mut self, outcome: &PoolOutcome, registry: &mut MirrorRegistry) -> Vec<String> {
        let mut phase_counts: BTreeMap<&str, usize> = BTreeMap::new();
        for failure in outcome.failures().values() {
            if let Some(origin) = failure.origin.as_deref() {
                *phase_counts.entry(origin).or_insert(0) += 1;
            }
        }
        for (origin, count) in phase_counts {
            self.health.add(origin, count);
            debug!(
                origin,
                phase_failures = count,
                total_failures = self.health.failures(origin),
                "Mirror failures tallied"
            );
        }

        let tripped: Vec<String> = registry
            .hosts()
            .iter()
            .map(|m| m.origin().to_string())
            .filter(|origin| self.health.failures(origin) >= self.threshold)
            .collect();

        let mut disabled = Vec::new();
        for origin in tripped {
            if registry.remove(&origin) {
                warn!(
                    origin = %origin,
                    failures = self.health.failures(&origin),
                    threshold = self.threshold,
                    remaining = registry.len(),
                    "Mirror disabled for the rest of this run"
                );
                disabled.push(origin);
            }
        }
        disabled
    }
}
