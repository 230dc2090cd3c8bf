//! Pooled fetching of provider and package documents.
//!
//! - `pool`: bounded-concurrency execution of lazy request sequences
//! - `outcome`: per-phase success counts and failure records
//! - `fallback`: one retry pass against the canonical source
//!
//! # Architecture
//!
//! ```text
//! SyncOrchestrator
//!         │
//!         ├── DownloadPool (one run per phase)
//!         │       └── PoolOutcome
//!         │
//!         └── FallbackRouter (failed keys → canonical source, once)
//! ```

mod fallback;
mod outcome;
mod pool;

pub use fallback::FallbackRouter;
pub use outcome::{FetchFailure, PoolOutcome};
pub use pool::DownloadPool;
