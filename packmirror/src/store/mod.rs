//! Resource storage for mirrored documents.
//!
//! The engine addresses every document by a relative, `/`-separated key such
//! as `p/provider-2019$abc.json`. A [`ResourceStore`] maps those keys onto
//! some backing storage. Single-key writes must be atomic: a reader observes
//! either the previous content or the new content, never a partial file.
//!
//! Two implementations are provided:
//! - [`LocalStore`] writes into a directory tree, optionally gzip-compressed
//! - [`MemoryStore`] keeps everything in a map (tests, dry runs)

mod local;
mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

use std::io;
use std::path::PathBuf;

use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors raised by a [`ResourceStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The requested key does not exist.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The key is not a safe relative path.
    #[error("invalid resource key: {0}")]
    InvalidPath(String),

    /// The store refuses writes.
    #[error("store is read-only")]
    ReadOnly,
}

/// Storage contract consumed by the synchronization engine.
///
/// All operations are synchronous; the engine only suspends on network I/O.
pub trait ResourceStore: Send + Sync {
    /// Whether a document, or a directory of documents, exists under `key`.
    fn exists(&self, key: &str) -> bool;

    /// Read the full logical content of a document.
    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Atomically replace the content of a document.
    fn write(&self, key: &str, data: &[u8]) -> Result<(), StoreError>;

    /// Atomically move a document to a new key, replacing any existing one.
    fn rename(&self, from: &str, to: &str) -> Result<(), StoreError>;

    /// Remove a document. Returns `false` if it did not exist.
    fn remove(&self, key: &str) -> Result<bool, StoreError>;

    /// Content digest used for change detection.
    fn hash(&self, data: &[u8]) -> String {
        sha256_hex(data)
    }

    /// Digest of the stored logical content of `key`.
    fn hash_of_stored(&self, key: &str) -> Result<String, StoreError> {
        let data = self.read(key)?;
        Ok(self.hash(&data))
    }
}

/// Lowercase hexadecimal SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Validate a store key.
///
/// Keys are relative, use `/` as separator and never contain empty, `.` or
/// `..` segments.
pub(crate) fn check_key(key: &str) -> Result<(), StoreError> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidPath(key.to_string()))
    }
}
