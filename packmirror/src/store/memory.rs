//! In-memory resource store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::RwLock;

use super::{check_key, ResourceStore, StoreError};

/// Resource store backed by an ordered map.
///
/// A key "exists" if it is stored directly or if any stored key lives below
/// it (`p` exists once `p/a.json` is written), matching directory semantics
/// of [`LocalStore`](super::LocalStore).
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
    read_only: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with documents.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let store = Self::new();
        {
            let mut map = store.entries.write();
            for (key, value) in entries {
                map.insert(key.into(), value.into());
            }
        }
        store
    }

    /// Make subsequent writes, renames and removals fail.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// All stored keys in lexical order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Content of a key, if stored.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.read().get(key).cloned()
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.read_only.load(Ordering::SeqCst) {
            Err(StoreError::ReadOnly)
        } else {
            Ok(())
        }
    }
}

impl ResourceStore for MemoryStore {
    fn exists(&self, key: &str) -> bool {
        let entries = self.entries.read();
        if entries.contains_key(key) {
            return true;
        }
        let prefix = format!("{key}/");
        entries
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix))
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.entries
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn write(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        check_key(key)?;
        self.check_writable()?;
        self.entries.write().insert(key.to_string(), data.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn rename(&self, from: &str, to: &str) -> Result<(), StoreError> {
        check_key(to)?;
        self.check_writable()?;
        let mut entries = self.entries.write();
        let data = entries
            .remove(from)
            .ok_or_else(|| StoreError::NotFound(from.to_string()))?;
        entries.insert(to.to_string(), data);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        self.check_writable()?;
        Ok(self.entries.write().remove(key).is_some())
    }
}
