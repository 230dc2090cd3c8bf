//! HTTP client abstraction for testability

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

use crate::error::{MirrorError, MirrorResult};

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Why a single fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP {status}")]
    Status { status: u16 },

    /// Connection, DNS, TLS or body read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request exceeded the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// Every mirror has been disabled for this run.
    #[error("no healthy mirror available")]
    NoMirrorAvailable,
}

impl FetchError {
    /// HTTP status code, when the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status } => Some(*status),
            _ => None,
        }
    }

    fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else if let Some(status) = error.status() {
            Self::Status {
                status: status.as_u16(),
            }
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Trait for HTTP client operations.
///
/// The returned future owns everything it needs and performs no I/O until
/// it is polled, so requests can be built ahead of time and handed to the
/// download pool.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request and returns the full response body.
    fn get(&self, url: &str) -> BoxFuture<'static, Result<Bytes, FetchError>>;
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a client with the given timeout and user agent.
    pub fn new(timeout: Duration, user_agent: &str) -> MirrorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| MirrorError::Http(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> BoxFuture<'static, Result<Bytes, FetchError>> {
        let request = self.client.get(url);
        Box::pin(async move {
            let response = request.send().await.map_err(FetchError::from_reqwest)?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                });
            }

            response.bytes().await.map_err(FetchError::from_reqwest)
        })
    }
}
