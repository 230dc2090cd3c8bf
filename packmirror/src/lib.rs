//! Packmirror - incremental mirroring of Composer package repositories
//!
//! This library keeps a local copy of a Composer-style repository
//! (`packages.json`, the provider documents it includes and the package
//! documents those list) consistent with an upstream source while fetching
//! as little as possible.
//!
//! # Architecture
//!
//! ```text
//! SyncOrchestrator
//!     │
//!     ├── index      root index parsing, change detection, expansion
//!     ├── download   bounded pool + canonical fallback
//!     ├── mirror     host rotation + circuit breaker
//!     ├── fetch      HttpClient seam, request routing
//!     └── store      ResourceStore (local directory or memory)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use packmirror::config::MirrorConfig;
//! use packmirror::sync::SyncOrchestrator;
//!
//! # async fn run() -> packmirror::error::MirrorResult<()> {
//! let config = MirrorConfig::new("/srv/mirror")
//!     .with_mirror("https://mirror.example")
//!     .with_concurrency(16);
//! let summary = SyncOrchestrator::from_config(config)?.run().await?;
//! println!("{}: {} documents fetched", summary.status, summary.total_fetched());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod download;
pub mod error;
pub mod fetch;
pub mod index;
pub mod logging;
pub mod mirror;
pub mod store;
pub mod sync;

pub use config::MirrorConfig;
pub use error::{MirrorError, MirrorResult};
pub use sync::{RunStatus, RunSummary, SyncOrchestrator};
