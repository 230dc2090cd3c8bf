//! Expansion of index documents into working sets of resources.
//!
//! A root index expands into provider documents through its
//! `provider-includes` templates; each provider document expands into
//! package documents through the root index's `providers-url` template.
//! Resource paths double as store keys and as paths relative to any mirror
//! base URL, so the destination of a document is a pure function of its
//! source identity.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::root::{ProviderReference, RootIndex};
use crate::error::{MirrorError, MirrorResult};
use crate::store::check_key;

const HASH_PLACEHOLDER: &str = "%hash%";
const PACKAGE_PLACEHOLDER: &str = "%package%";

/// A document to mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    path: String,
    owner: Option<String>,
}

impl Resource {
    /// A provider document.
    pub fn provider(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            owner: None,
        }
    }

    /// A package document listed by the provider at `owner`.
    pub fn package(path: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            owner: Some(owner.into()),
        }
    }

    /// Normalized relative path; both the store key and the source path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Provider that listed this package.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }
}

/// Insertion-ordered set of resources, unique by path.
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    resources: Vec<Resource>,
    positions: HashMap<String, usize>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource unless one with the same path is already present.
    pub fn push(&mut self, resource: Resource) -> bool {
        if self.positions.contains_key(&resource.path) {
            return false;
        }
        self.positions
            .insert(resource.path.clone(), self.resources.len());
        self.resources.push(resource);
        true
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Resource> {
        self.resources.iter()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.positions.contains_key(path)
    }

    /// Resource stored under `path`.
    pub fn get(&self, path: &str) -> Option<&Resource> {
        self.positions.get(path).map(|&i| &self.resources[i])
    }
}

impl<'a> IntoIterator for &'a WorkingSet {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}

/// Normalize a template-expanded URI into a resource path.
///
/// Leading slashes are stripped; empty, `.` and `..` segments are rejected.
pub fn normalize_path(uri: &str) -> MirrorResult<String> {
    let path = uri.trim_start_matches('/');
    check_key(path).map_err(|_| MirrorError::InvalidPath(uri.to_string()))?;
    Ok(path.to_string())
}

/// Substitute `%package%` and `%hash%` in a URI template.
pub fn expand_template(template: &str, package: &str, hash: &str) -> String {
    template
        .replace(PACKAGE_PLACEHOLDER, package)
        .replace(HASH_PLACEHOLDER, hash)
}

/// Provider documents referenced by a root index, in upstream order.
///
/// An include that does not normalize to a safe path makes the whole index
/// unusable and is reported as an error.
pub fn expand_providers(index: &RootIndex) -> MirrorResult<WorkingSet> {
    let mut set = WorkingSet::new();
    for (template, reference) in index.provider_includes() {
        let path = normalize_path(&template.replace(HASH_PLACEHOLDER, &reference.sha256))?;
        set.push(Resource::provider(path));
    }
    Ok(set)
}

#[derive(Deserialize)]
struct ProviderDocument {
    providers: Map<String, Value>,
}

/// Package documents listed by one provider document.
///
/// Fails with [`MirrorError::ProviderParse`] when the document itself is
/// malformed. Individual entries without a usable hash or path are skipped
/// with a warning.
pub fn expand_packages(
    index: &RootIndex,
    provider_path: &str,
    document: &[u8],
) -> MirrorResult<WorkingSet> {
    let parsed: ProviderDocument =
        serde_json::from_slice(document).map_err(|e| MirrorError::ProviderParse {
            path: provider_path.to_string(),
            reason: e.to_string(),
        })?;

    let mut set = WorkingSet::new();
    for (name, value) in parsed.providers {
        let reference = match serde_json::from_value::<ProviderReference>(value) {
            Ok(reference) => reference,
            Err(e) => {
                warn!(
                    provider = provider_path,
                    package = %name,
                    error = %e,
                    "Skipping package entry"
                );
                continue;
            }
        };

        let uri = expand_template(index.providers_url(), &name, &reference.sha256);
        match normalize_path(&uri) {
            Ok(path) => {
                set.push(Resource::package(path, provider_path));
            }
            Err(e) => {
                warn!(
                    provider = provider_path,
                    package = %name,
                    error = %e,
                    "Skipping package entry"
                );
            }
        }
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use proptest::prelude::*;

    fn index(json: &'static str) -> RootIndex {
        RootIndex::parse(Bytes::from_static(json.as_bytes()), "https://repo.example/packages.json")
            .unwrap()
    }

    #[test]
    fn test_expand_providers_substitutes_hash_in_order() {
        let index = index(
            r#"{"provider-includes": {
                "p/b$%hash%.json": {"sha256": "h2"},
                "/p/a$%hash%.json": {"sha256": "h1"}
            }}"#,
        );

        let set = expand_providers(&index).unwrap();

        let paths: Vec<&str> = set.iter().map(Resource::path).collect();
        assert_eq!(paths, vec!["p/b$h2.json", "p/a$h1.json"]);
        assert!(set.iter().all(|r| r.owner().is_none()));
    }

    #[test]
    fn test_expand_providers_collapses_duplicates() {
        let index = index(
            r#"{"provider-includes": {
                "p/a$%hash%.json": {"sha256": "h1"},
                "/p/a$%hash%.json": {"sha256": "h1"}
            }}"#,
        );
        assert_eq!(expand_providers(&index).unwrap().len(), 1);
    }

    #[test]
    fn test_expand_providers_rejects_traversal() {
        let index = index(r#"{"provider-includes": {"p/../../etc$%hash%": {"sha256": "h"}}}"#);
        assert!(matches!(
            expand_providers(&index),
            Err(MirrorError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_expand_packages_uses_providers_url() {
        let index = index(r#"{"providers-url": "/%package%.json"}"#);
        let doc = br#"{"providers": {
            "vendor/x": {"sha256": "s1"},
            "vendor/y": {"sha256": "s2"}
        }}"#;

        let set = expand_packages(&index, "p/a$h1.json", doc).unwrap();

        let paths: Vec<&str> = set.iter().map(Resource::path).collect();
        assert_eq!(paths, vec!["vendor/x.json", "vendor/y.json"]);
        assert!(set.iter().all(|r| r.owner() == Some("p/a$h1.json")));
    }

    #[test]
    fn test_working_set_get_keeps_first_owner() {
        let mut set = WorkingSet::new();
        assert!(set.push(Resource::package("vendor/x.json", "p/a$h1.json")));
        assert!(!set.push(Resource::package("vendor/x.json", "p/b$h2.json")));
        assert!(set.push(Resource::provider("p/c$h3.json")));

        let first = set.get("vendor/x.json").unwrap();
        assert_eq!(first.owner(), Some("p/a$h1.json"));
        assert_eq!(set.get("p/c$h3.json").unwrap().owner(), None);
        assert!(set.get("vendor/missing.json").is_none());
    }

    #[test]
    fn test_expand_packages_default_template() {
        let index = index("{}");
        let doc = br#"{"providers": {"acme/tool": {"sha256": "abc"}}}"#;

        let set = expand_packages(&index, "p/a$h1.json", doc).unwrap();

        assert!(set.contains("p/acme/tool$abc.json"));
    }

    #[test]
    fn test_expand_packages_skips_bad_entries() {
        let index = index(r#"{"providers-url": "/p/%package%$%hash%.json"}"#);
        let doc = br#"{"providers": {
            "vendor/ok": {"sha256": "1"},
            "vendor/nohash": {},
            "../escape": {"sha256": "2"}
        }}"#;

        let set = expand_packages(&index, "p/a$h1.json", doc).unwrap();

        let paths: Vec<&str> = set.iter().map(Resource::path).collect();
        assert_eq!(paths, vec!["p/vendor/ok$1.json"]);
    }

    #[test]
    fn test_malformed_provider_document() {
        let index = index("{}");
        let err = expand_packages(&index, "p/a$h1.json", b"not json").unwrap_err();
        match err {
            MirrorError::ProviderParse { path, .. } => assert_eq!(path, "p/a$h1.json"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_expand_template() {
        assert_eq!(
            expand_template("/p/%package%$%hash%.json", "vendor/x", "abc"),
            "/p/vendor/x$abc.json"
        );
    }

    proptest! {
        #[test]
        fn prop_normalize_strips_leading_slashes(
            segments in prop::collection::vec("[a-z0-9$_-]{1,12}", 1..6),
            slashes in 0usize..3,
        ) {
            let joined = segments.join("/");
            let uri = format!("{}{}", "/".repeat(slashes), joined);
            prop_assert_eq!(normalize_path(&uri).unwrap(), joined);
        }

        #[test]
        fn prop_normalize_rejects_dot_segments(
            head in prop::collection::vec("[a-z0-9]{1,8}", 0..3),
            tail in prop::collection::vec("[a-z0-9]{1,8}", 0..3),
            dots in prop::sample::select(vec![".", ".."]),
        ) {
            let mut segments = head;
            segments.push(dots.to_string());
            segments.extend(tail);
            let uri = segments.join("/");
            prop_assert!(normalize_path(&uri).is_err());
        }
    }
}
