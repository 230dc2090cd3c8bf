//! The upstream root index (`packages.json`).

use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{MirrorError, MirrorResult};
use crate::store::sha256_hex;

/// Template used when the index does not declare `providers-url`.
pub const DEFAULT_PROVIDERS_URL: &str = "/p/%package%$%hash%.json";

/// Content reference to a provider document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProviderReference {
    pub sha256: String,
}

#[derive(Deserialize)]
struct RawRootIndex {
    #[serde(rename = "providers-url")]
    providers_url: Option<String>,
    #[serde(rename = "provider-includes", default)]
    provider_includes: Map<String, Value>,
}

/// Parsed root index.
///
/// The raw upstream bytes are kept as the canonical serialized form: they
/// are hashed for change detection and written verbatim on commit.
#[derive(Debug, Clone)]
pub struct RootIndex {
    raw: Bytes,
    providers_url: String,
    provider_includes: Vec<(String, ProviderReference)>,
}

impl RootIndex {
    /// Parse a root index fetched from `url`.
    pub fn parse(raw: Bytes, url: &str) -> MirrorResult<Self> {
        let parse_error = |reason: String| MirrorError::IndexParse {
            url: url.to_string(),
            reason,
        };

        let parsed: RawRootIndex =
            serde_json::from_slice(&raw).map_err(|e| parse_error(e.to_string()))?;

        let provider_includes = parsed
            .provider_includes
            .into_iter()
            .map(|(template, value)| {
                serde_json::from_value::<ProviderReference>(value)
                    .map(|reference| (template.clone(), reference))
                    .map_err(|e| parse_error(format!("provider-includes[{template}]: {e}")))
            })
            .collect::<MirrorResult<Vec<_>>>()?;

        Ok(Self {
            raw,
            providers_url: parsed
                .providers_url
                .unwrap_or_else(|| DEFAULT_PROVIDERS_URL.to_string()),
            provider_includes,
        })
    }

    /// Upstream bytes, exactly as received.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// SHA-256 hex of the raw bytes.
    pub fn hash(&self) -> String {
        sha256_hex(&self.raw)
    }

    /// Package document URL template.
    pub fn providers_url(&self) -> &str {
        &self.providers_url
    }

    /// Provider document templates in upstream order.
    pub fn provider_includes(&self) -> &[(String, ProviderReference)] {
        &self.provider_includes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://repo.example/packages.json";

    #[test]
    fn test_parse_preserves_include_order() {
        let raw = Bytes::from_static(
            br#"{
                "packages": [],
                "providers-url": "/p/%package%$%hash%.json",
                "provider-includes": {
                    "p/provider-2019$%hash%.json": {"sha256": "bbb"},
                    "p/provider-2013$%hash%.json": {"sha256": "aaa"},
                    "p/provider-latest$%hash%.json": {"sha256": "ccc"}
                }
            }"#,
        );

        let index = RootIndex::parse(raw.clone(), URL).unwrap();

        let templates: Vec<&str> = index
            .provider_includes()
            .iter()
            .map(|(t, _)| t.as_str())
            .collect();
        assert_eq!(
            templates,
            vec![
                "p/provider-2019$%hash%.json",
                "p/provider-2013$%hash%.json",
                "p/provider-latest$%hash%.json",
            ]
        );
        assert_eq!(index.provider_includes()[1].1.sha256, "aaa");
        assert_eq!(index.raw(), &raw);
        assert_eq!(index.hash(), sha256_hex(&raw));
    }

    #[test]
    fn test_default_providers_url() {
        let index = RootIndex::parse(Bytes::from_static(b"{}"), URL).unwrap();
        assert_eq!(index.providers_url(), DEFAULT_PROVIDERS_URL);
        assert!(index.provider_includes().is_empty());
    }

    #[test]
    fn test_invalid_json_is_parse_error() {
        let err = RootIndex::parse(Bytes::from_static(b"<html>"), URL).unwrap_err();
        match err {
            MirrorError::IndexParse { url, .. } => assert_eq!(url, URL),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_include_without_hash_is_parse_error() {
        let raw = Bytes::from_static(br#"{"provider-includes": {"p/a$%hash%.json": {}}}"#);
        let err = RootIndex::parse(raw, URL).unwrap_err();
        assert!(err.to_string().contains("p/a$%hash%.json"));
    }
}
