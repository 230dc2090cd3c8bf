//! Run results.

use std::fmt;

use chrono::{DateTime, Local};

use super::state::SyncPhase;

/// Final status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The root index did not change.
    NothingToDo,
    /// The index changed but every provider was already present.
    UpToDate,
    /// All resources were materialized and the index committed.
    Completed,
    /// Some resources could not be fetched from any source.
    Incomplete,
}

impl RunStatus {
    /// Process exit code for this status.
    pub fn exit_code(self) -> i32 {
        match self {
            RunStatus::NothingToDo | RunStatus::UpToDate | RunStatus::Completed => 0,
            RunStatus::Incomplete => 1,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RunStatus::NothingToDo => "nothing to do",
            RunStatus::UpToDate => "all providers up to date",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
        };
        f.write_str(text)
    }
}

/// Counts for one fetch phase (one provider set or one provider's packages).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSummary {
    pub phase: SyncPhase,
    pub label: String,
    /// Documents fetched and stored, including fallback successes.
    pub fetched: usize,
    /// Documents already present and trusted.
    pub skipped: usize,
    /// Documents still missing after fallback.
    pub failed: usize,
}

/// A document that could not be fetched from any source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedResource {
    pub path: String,
    /// Provider that listed the document; `None` for provider documents.
    pub owner: Option<String>,
    /// Last URI attempted; `None` when the document was present but unusable.
    pub uri: Option<String>,
    pub reason: String,
}

/// Summary of a synchronization run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub status: RunStatus,
    pub phases: Vec<PhaseSummary>,
    pub unresolved: Vec<UnresolvedResource>,
    /// Mirror origins disabled by the circuit breaker.
    pub disabled_mirrors: Vec<String>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl RunSummary {
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    pub fn total_fetched(&self) -> usize {
        self.phases.iter().map(|p| p.fetched).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.phases.iter().map(|p| p.skipped).sum()
    }

    /// Run duration.
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
