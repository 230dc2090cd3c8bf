//! Network access for the mirror engine.
//!
//! - `http`: the [`HttpClient`] seam and its reqwest implementation
//! - `source`: routing of resource paths to mirrors or the canonical source

mod http;
mod source;

pub use http::{BoxFuture, FetchError, HttpClient, ReqwestClient};
pub use source::{join_url, origin_of, FetchSource, PendingFetch};

#[cfg(test)]
pub use http::tests::MockHttpClient;
