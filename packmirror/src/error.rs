//! Error types for the mirror engine.
//!
//! Only structural failures surface as [`MirrorError`]. Failures of
//! individual provider or package fetches are collected per phase in a
//! [`PoolOutcome`](crate::download::PoolOutcome) and never abort a run.

use thiserror::Error;

use crate::config::ConfigError;
use crate::store::StoreError;

/// Result type for mirror operations.
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Fatal errors that abort a synchronization run before commit.
#[derive(Debug, Error)]
pub enum MirrorError {
    /// The upstream root index could not be fetched.
    #[error("failed to fetch root index from {url}: {reason}")]
    IndexFetch { url: String, reason: String },

    /// The upstream root index is not a valid document.
    #[error("failed to parse root index from {url}: {reason}")]
    IndexParse { url: String, reason: String },

    /// A provider document is not a valid document.
    ///
    /// Returned by package expansion; the orchestrator treats it as an
    /// unresolved provider rather than aborting.
    #[error("failed to parse provider document {path}: {reason}")]
    ProviderParse { path: String, reason: String },

    /// The new root index could not be written to its staging location.
    #[error("failed to stage root index at {path}: {source}")]
    Stage {
        path: String,
        #[source]
        source: StoreError,
    },

    /// The staged root index could not be promoted.
    #[error("failed to promote {from} to {to}: {source}")]
    Commit {
        from: String,
        to: String,
        #[source]
        source: StoreError,
    },

    /// The resource store rejected an operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be created.
    #[error("HTTP client error: {0}")]
    Http(String),

    /// A resource path failed normalization.
    #[error("invalid resource path: {0}")]
    InvalidPath(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_fetch_display() {
        let err = MirrorError::IndexFetch {
            url: "https://repo.example/packages.json".to_string(),
            reason: "HTTP 503".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to fetch root index from https://repo.example/packages.json: HTTP 503"
        );
    }

    #[test]
    fn test_stage_error_has_source() {
        use std::error::Error as _;

        let err = MirrorError::Stage {
            path: ".packages.json".to_string(),
            source: StoreError::InvalidPath("..".to_string()),
        };
        assert!(err.to_string().contains(".packages.json"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_store_error_converts() {
        let err: MirrorError = StoreError::NotFound("p/a.json".to_string()).into();
        assert!(matches!(err, MirrorError::Store(_)));
    }
}
