//! Bounded-concurrency fetch engine.
//!
//! The pool drains a lazy iterator of `(key, PendingFetch)` pairs. Items
//! are only pulled from the iterator when a concurrency slot frees up, so
//! callers can run per-item checks (such as skipping documents that are
//! already present) without materializing the whole working set.
//!
//! Callbacks run on the task that drives the pool, one completion at a
//! time, so they may borrow state mutably without synchronization.

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tracing::{debug, trace};

use super::outcome::{FetchFailure, PoolOutcome};
use crate::error::MirrorResult;
use crate::fetch::PendingFetch;

/// Fetches a sequence of pending requests with bounded concurrency.
#[derive(Debug, Clone)]
pub struct DownloadPool {
    /// Maximum number of requests in flight.
    concurrency: usize,
}

impl DownloadPool {
    /// Create a pool (minimum width 1).
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Pool width.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run every item to a terminal outcome.
    ///
    /// `on_success(key, body)` is invoked for each successful fetch and
    /// `on_each()` exactly once per key regardless of outcome. Failed fetches
    /// are recorded in the returned [`PoolOutcome`]; nothing is retried.
    ///
    /// An error returned by `on_success` aborts the phase: requests still in
    /// flight are dropped and the error is propagated.
    pub async fn run<I, S, E>(
        &self,
        items: I,
        mut on_success: S,
        mut on_each: E,
    ) -> MirrorResult<PoolOutcome>
    where
        I: IntoIterator<Item = (String, PendingFetch)>,
        S: FnMut(&str, Bytes) -> MirrorResult<()>,
        E: FnMut(),
    {
        let mut outcome = PoolOutcome::default();

        let mut completions = stream::iter(items)
            .map(|(key, fetch)| async move {
                trace!(key = %key, uri = fetch.uri(), "Fetch started");
                let (uri, origin, result) = fetch.resolve().await;
                (key, uri, origin, result)
            })
            .buffer_unordered(self.concurrency);

        while let Some((key, uri, origin, result)) = completions.next().await {
            match result {
                Ok(body) => {
                    trace!(key = %key, bytes = body.len(), "Fetch complete");
                    outcome.record_success();
                    let stored = on_success(&key, body);
                    on_each();
                    stored?;
                }
                Err(error) => {
                    debug!(
                        key = %key,
                        uri = %uri,
                        origin = origin.as_deref().unwrap_or("-"),
                        error = %error,
                        "Fetch failed"
                    );
                    outcome.record_failure(key, FetchFailure::new(uri, origin, &error));
                    on_each();
                }
            }
        }

        Ok(outcome)
    }
}

impl Default for DownloadPool {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MirrorError;
    use crate::fetch::{FetchError, FetchSource, MockHttpClient};
    use crate::store::StoreError;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn source_with(paths: &[(&str, Option<&str>)]) -> (Arc<MockHttpClient>, FetchSource) {
        let mock = Arc::new(MockHttpClient::new());
        for (path, body) in paths {
            let url = format!("https://repo.example/{path}");
            match body {
                Some(body) => mock.respond(&url, body.to_string()),
                None => mock.fail(&url, FetchError::Status { status: 500 }),
            }
        }
        let source = FetchSource::new(mock.clone(), "https://repo.example");
        (mock, source)
    }

    #[test]
    fn test_pool_min_concurrency() {
        assert_eq!(DownloadPool::new(0).concurrency(), 1);
        assert_eq!(DownloadPool::new(8).concurrency(), 8);
        assert_eq!(DownloadPool::default().concurrency(), 25);
    }

    #[tokio::test]
    async fn test_every_key_gets_one_outcome_and_one_on_each() {
        let (_, source) = source_with(&[
            ("a.json", Some("A")),
            ("b.json", None),
            ("c.json", Some("C")),
        ]);
        let pool = DownloadPool::new(2);
        let mut bodies = BTreeMap::new();
        let mut each = 0;

        let items = ["a.json", "b.json", "c.json"]
            .into_iter()
            .map(|key| (key.to_string(), source.canonical_request(key)));
        let outcome = pool
            .run(
                items,
                |key, body| {
                    bodies.insert(key.to_string(), body);
                    Ok(())
                },
                || each += 1,
            )
            .await
            .unwrap();

        assert_eq!(each, 3);
        assert_eq!(outcome.succeeded(), 2);
        assert_eq!(outcome.submitted(), 3);
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies["a.json"], Bytes::from_static(b"A"));
        let failure = &outcome.failures()["b.json"];
        assert_eq!(failure.status, Some(500));
        assert_eq!(failure.uri, "https://repo.example/b.json");
        assert_eq!(failure.origin.as_deref(), Some("https://repo.example"));
    }

    #[tokio::test]
    async fn test_no_retry_inside_pool() {
        let (mock, source) = source_with(&[("b.json", None)]);
        let pool = DownloadPool::new(4);

        let items = std::iter::once(("b.json".to_string(), source.canonical_request("b.json")));
        let outcome = pool.run(items, |_, _| Ok(()), || {}).await.unwrap();

        assert_eq!(outcome.failure_count(), 1);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_iterator_is_pulled_lazily() {
        let (_, source) = source_with(&[("a.json", Some("A")), ("b.json", Some("B"))]);
        let pool = DownloadPool::new(1);
        let pulled = AtomicUsize::new(0);
        let mut pulled_at_first_completion = None;

        let items = ["a.json", "b.json"].into_iter().map(|key| {
            pulled.fetch_add(1, Ordering::SeqCst);
            (key.to_string(), source.canonical_request(key))
        });
        pool.run(
            items,
            |_, _| {
                pulled_at_first_completion.get_or_insert(pulled.load(Ordering::SeqCst));
                Ok(())
            },
            || {},
        )
        .await
        .unwrap();

        assert_eq!(pulled.load(Ordering::SeqCst), 2);
        assert_eq!(pulled_at_first_completion, Some(1));
    }

    #[tokio::test]
    async fn test_bounded_concurrency() {
        struct SlowClient {
            in_flight: Arc<AtomicUsize>,
            peak: Arc<AtomicUsize>,
        }

        impl crate::fetch::HttpClient for SlowClient {
            fn get(
                &self,
                _url: &str,
            ) -> crate::fetch::BoxFuture<'static, Result<Bytes, FetchError>> {
                let in_flight = Arc::clone(&self.in_flight);
                let peak = Arc::clone(&self.peak);
                Box::pin(async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(Bytes::from_static(b"{}"))
                })
            }
        }

        let peak = Arc::new(AtomicUsize::new(0));
        let client = SlowClient {
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::clone(&peak),
        };
        let source = FetchSource::new(Arc::new(client), "https://repo.example");
        let pool = DownloadPool::new(3);

        let items = (0..20).map(|i| {
            let key = format!("p/{i}.json");
            let fetch = source.canonical_request(&key);
            (key, fetch)
        });
        let outcome = pool.run(items, |_, _| Ok(()), || {}).await.unwrap();

        assert_eq!(outcome.succeeded(), 20);
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_store_error_aborts_phase() {
        let (_, source) = source_with(&[("a.json", Some("A"))]);
        let pool = DownloadPool::new(1);
        let mut each = 0;

        let items = std::iter::once(("a.json".to_string(), source.canonical_request("a.json")));
        let result = pool
            .run(
                items,
                |_, _| Err(MirrorError::Store(StoreError::ReadOnly)),
                || each += 1,
            )
            .await;

        assert!(matches!(result, Err(MirrorError::Store(StoreError::ReadOnly))));
        assert_eq!(each, 1);
    }
}
