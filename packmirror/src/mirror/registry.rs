//! Ordered set of mirror hosts with round-robin selection.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::ConfigError;
use crate::fetch::{join_url, origin_of};

/// A mirror base URL and its origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror {
    base: String,
    origin: String,
}

impl Mirror {
    /// Parse a mirror base URL.
    pub fn new(base: &str) -> Result<Self, ConfigError> {
        let origin = origin_of(base).ok_or_else(|| ConfigError::InvalidUrl(base.to_string()))?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            origin,
        })
    }

    /// Base URL without trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// `scheme://host[:port]` identity used for failure accounting.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Absolute URL of a resource path on this mirror.
    pub fn url_for(&self, path: &str) -> String {
        join_url(&self.base, path)
    }
}

/// Mirror hosts available for routing during one run.
///
/// Selection is round-robin over the remaining hosts. Hosts are only ever
/// removed, never re-added, for the lifetime of the registry.
#[derive(Debug)]
pub struct MirrorRegistry {
    mirrors: Vec<Mirror>,
    cursor: AtomicUsize,
}

impl MirrorRegistry {
    /// Build a registry from base URLs, in order. Duplicate bases collapse.
    pub fn new<I, S>(bases: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mirrors: Vec<Mirror> = Vec::new();
        for base in bases {
            let mirror = Mirror::new(base.as_ref())?;
            if !mirrors.iter().any(|m| m.base == mirror.base) {
                mirrors.push(mirror);
            }
        }
        Ok(Self {
            mirrors,
            cursor: AtomicUsize::new(0),
        })
    }

    /// All hosts still in rotation.
    pub fn hosts(&self) -> &[Mirror] {
        &self.mirrors
    }

    /// Next host in rotation, or `None` once every host has been removed.
    pub fn next(&self) -> Option<&Mirror> {
        if self.mirrors.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.mirrors.len();
        self.mirrors.get(index)
    }

    /// Whether any host with this origin is still in rotation.
    pub fn contains(&self, origin: &str) -> bool {
        self.mirrors.iter().any(|m| m.origin == origin)
    }

    /// Remove every host with this origin. Returns `true` if any was removed.
    pub fn remove(&mut self, origin: &str) -> bool {
        let before = self.mirrors.len();
        self.mirrors.retain(|m| m.origin != origin);
        before != self.mirrors.len()
    }

    /// Number of hosts in rotation.
    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    /// Whether every host has been removed.
    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin() {
        let registry =
            MirrorRegistry::new(["https://a.example", "https://b.example", "https://c.example"])
                .unwrap();

        let picks: Vec<_> = (0..6)
            .map(|_| registry.next().unwrap().origin().to_string())
            .collect();

        assert_eq!(
            picks,
            vec![
                "https://a.example",
                "https://b.example",
                "https://c.example",
                "https://a.example",
                "https://b.example",
                "https://c.example",
            ]
        );
    }

    #[test]
    fn test_remove_is_permanent() {
        let mut registry =
            MirrorRegistry::new(["https://a.example", "https://b.example"]).unwrap();

        assert!(registry.remove("https://a.example"));
        assert!(!registry.remove("https://a.example"));
        assert!(!registry.contains("https://a.example"));

        for _ in 0..4 {
            assert_eq!(registry.next().unwrap().origin(), "https://b.example");
        }
    }

    #[test]
    fn test_all_removed_yields_none() {
        let mut registry = MirrorRegistry::new(["https://a.example"]).unwrap();
        registry.remove("https://a.example");

        assert!(registry.is_empty());
        assert!(registry.next().is_none());
    }

    #[test]
    fn test_mirror_with_path_prefix() {
        let mirror = Mirror::new("https://a.example/packagist/").unwrap();
        assert_eq!(mirror.base(), "https://a.example/packagist");
        assert_eq!(mirror.origin(), "https://a.example");
        assert_eq!(
            mirror.url_for("p/a$h1.json"),
            "https://a.example/packagist/p/a$h1.json"
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let registry =
            MirrorRegistry::new(["https://a.example", "https://a.example/"]).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(MirrorRegistry::new(["a.example"]).is_err());
    }
}
