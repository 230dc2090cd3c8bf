//! Synchronization runs.
//!
//! - `state`: cold/warm detection and run phases
//! - `orchestrator`: the phase sequence of one run
//! - `progress`: progress reporting hooks
//! - `summary`: what a run did

mod orchestrator;
mod progress;
mod state;
mod summary;

pub use orchestrator::SyncOrchestrator;
pub use progress::{NullProgress, ProgressSink};
pub use state::{SyncPhase, SyncState};
pub use summary::{PhaseSummary, RunStatus, RunSummary, UnresolvedResource};
