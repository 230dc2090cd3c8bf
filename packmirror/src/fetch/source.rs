//! Request routing between mirrors and the canonical source.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::Url;

use super::http::{BoxFuture, FetchError, HttpClient};
use crate::mirror::MirrorRegistry;

/// Join a base URL and a relative resource path.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Origin (`scheme://host[:port]`) of a URL, used as circuit breaker identity.
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed.host_str()?;
    Some(parsed.origin().ascii_serialization())
}

/// A request that has been routed but not yet executed.
///
/// Nothing happens on the network until the download pool resolves it.
pub struct PendingFetch {
    uri: String,
    origin: Option<String>,
    response: BoxFuture<'static, Result<Bytes, FetchError>>,
}

impl fmt::Debug for PendingFetch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingFetch")
            .field("uri", &self.uri)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl PendingFetch {
    /// A fetch that fails without touching the network.
    pub fn failed(uri: impl Into<String>, error: FetchError) -> Self {
        Self {
            uri: uri.into(),
            origin: None,
            response: Box::pin(async move { Err(error) }),
        }
    }

    /// Request URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Origin the request is sent to.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Execute the request.
    pub async fn resolve(self) -> (String, Option<String>, Result<Bytes, FetchError>) {
        let result = self.response.await;
        (self.uri, self.origin, result)
    }
}

/// Builds pending fetches against mirrors or the canonical source.
#[derive(Clone)]
pub struct FetchSource {
    client: Arc<dyn HttpClient>,
    canonical: String,
}

impl fmt::Debug for FetchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchSource")
            .field("canonical", &self.canonical)
            .finish_non_exhaustive()
    }
}

impl FetchSource {
    /// Create a source with the given client and canonical base URL.
    pub fn new(client: Arc<dyn HttpClient>, canonical: impl Into<String>) -> Self {
        Self {
            client,
            canonical: canonical.into().trim_end_matches('/').to_string(),
        }
    }

    /// The current primary (canonical) base URL.
    pub fn canonical_base(&self) -> &str {
        &self.canonical
    }

    /// Build a lazy request for an absolute URI.
    pub fn request(&self, uri: impl Into<String>) -> PendingFetch {
        let uri = uri.into();
        PendingFetch {
            origin: origin_of(&uri),
            response: self.client.get(&uri),
            uri,
        }
    }

    /// Route a resource path to the canonical source.
    pub fn canonical_request(&self, path: &str) -> PendingFetch {
        self.request(join_url(&self.canonical, path))
    }

    /// Route a resource path to the next mirror in rotation.
    ///
    /// Fails immediately when every mirror has been disabled.
    pub fn mirror_request(&self, registry: &MirrorRegistry, path: &str) -> PendingFetch {
        match registry.next() {
            Some(mirror) => self.request(mirror.url_for(path)),
            None => PendingFetch::failed(path, FetchError::NoMirrorAvailable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::http::tests::MockHttpClient;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://repo.example/", "/p/a$h1.json"),
            "https://repo.example/p/a$h1.json"
        );
        assert_eq!(
            join_url("https://repo.example/base", "packages.json"),
            "https://repo.example/base/packages.json"
        );
    }

    #[test]
    fn test_origin_of() {
        assert_eq!(
            origin_of("https://m1.example/sub/p/a.json").as_deref(),
            Some("https://m1.example")
        );
        assert_eq!(
            origin_of("http://m1.example:8080/a.json").as_deref(),
            Some("http://m1.example:8080")
        );
        assert_eq!(origin_of("not a url"), None);
    }

    #[tokio::test]
    async fn test_request_is_lazy_until_resolved() {
        let mock = Arc::new(MockHttpClient::new());
        mock.respond("https://repo.example/p/a.json", "{}");
        let source = FetchSource::new(mock.clone(), "https://repo.example/");

        let pending = source.canonical_request("p/a.json");
        assert_eq!(pending.uri(), "https://repo.example/p/a.json");
        assert_eq!(pending.origin(), Some("https://repo.example"));

        let (uri, origin, result) = pending.resolve().await;
        assert_eq!(uri, "https://repo.example/p/a.json");
        assert_eq!(origin.as_deref(), Some("https://repo.example"));
        assert_eq!(result.unwrap(), Bytes::from_static(b"{}"));
    }

    #[tokio::test]
    async fn test_mirror_request_rotates() {
        let mock = Arc::new(MockHttpClient::new());
        let source = FetchSource::new(mock, "https://repo.example");
        let registry = MirrorRegistry::new(["https://m1.example", "https://m2.example"]).unwrap();

        let first = source.mirror_request(&registry, "p/a.json");
        let second = source.mirror_request(&registry, "p/a.json");

        assert_eq!(first.uri(), "https://m1.example/p/a.json");
        assert_eq!(second.uri(), "https://m2.example/p/a.json");
    }

    #[tokio::test]
    async fn test_mirror_request_without_mirrors_fails_fast() {
        let mock = Arc::new(MockHttpClient::new());
        let source = FetchSource::new(mock.clone(), "https://repo.example");
        let mut registry = MirrorRegistry::new(["https://m1.example"]).unwrap();
        registry.remove("https://m1.example");

        let (_, origin, result) = source.mirror_request(&registry, "p/a.json").resolve().await;

        assert_eq!(origin, None);
        assert_eq!(result.unwrap_err(), FetchError::NoMirrorAvailable);
        assert_eq!(mock.call_count(), 0);
    }
}
