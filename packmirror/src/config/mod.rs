//! Configuration for the mirror engine.
//!
//! [`MirrorConfig`] carries every tunable of a synchronization run and is
//! built either programmatically (builder methods) or from an INI file via
//! [`ConfigFile`].

mod file;

pub use file::{default_config_path, ConfigFile};

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use thiserror::Error;

/// Default canonical repository.
pub const DEFAULT_CANONICAL_URL: &str = "https://repo.packagist.org";

/// Default number of concurrent fetches per pool phase.
pub const DEFAULT_CONCURRENCY: usize = 25;

/// Default number of failures after which a mirror host is disabled.
pub const DEFAULT_BREAKER_THRESHOLD: usize = 1000;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or parse the configuration file.
    #[error("failed to load {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// A value has the wrong format.
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    /// A URL is not an absolute http(s) URL.
    #[error("invalid URL {0}: expected an absolute http or https URL")]
    InvalidUrl(String),
}

/// Names of the well-known documents inside the mirror.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    /// Canonical root index.
    pub index: String,
    /// Staging copy of the root index, promoted on commit.
    pub staging: String,
    /// Marker present while a cold start is in progress.
    pub marker: String,
    /// Root of the provider/package tree.
    pub package_root: String,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            index: "packages.json".to_string(),
            staging: ".packages.json".to_string(),
            marker: ".init".to_string(),
            package_root: "p".to_string(),
        }
    }
}

/// Configuration for a mirror synchronization run.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Canonical (non-mirror) repository base URL.
    ///
    /// The root index is always loaded from here, and failed fetches fall
    /// back to it.
    pub canonical_url: String,

    /// Mirror base URLs used in rotation for provider and package documents.
    ///
    /// When empty, the canonical URL is the only host in rotation.
    pub mirrors: Vec<String>,

    /// Directory the mirror is written to.
    pub output_dir: PathBuf,

    /// Maximum concurrent fetches per pool phase.
    pub concurrency: usize,

    /// Failures per host within one run before the host is disabled.
    pub breaker_threshold: usize,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// User agent sent with every request.
    pub user_agent: String,

    /// Store documents gzip-compressed.
    pub gzip: bool,

    /// Names of well-known documents.
    pub layout: StoreLayout,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            canonical_url: DEFAULT_CANONICAL_URL.to_string(),
            mirrors: Vec::new(),
            output_dir: PathBuf::from("mirror"),
            concurrency: DEFAULT_CONCURRENCY,
            breaker_threshold: DEFAULT_BREAKER_THRESHOLD,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("packmirror/{}", env!("CARGO_PKG_VERSION")),
            gzip: false,
            layout: StoreLayout::default(),
        }
    }
}

impl MirrorConfig {
    /// Create a new configuration writing into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
        }
    }

    /// Set the canonical repository URL.
    pub fn with_canonical_url(mut self, url: impl Into<String>) -> Self {
        self.canonical_url = url.into();
        self
    }

    /// Add a mirror to the rotation.
    pub fn with_mirror(mut self, url: impl Into<String>) -> Self {
        self.mirrors.push(url.into());
        self
    }

    /// Set the pool width.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the circuit breaker threshold.
    pub fn with_breaker_threshold(mut self, threshold: usize) -> Self {
        self.breaker_threshold = threshold.max(1);
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Enable or disable gzip storage.
    pub fn with_gzip(mut self, gzip: bool) -> Self {
        self.gzip = gzip;
        self
    }

    /// Base URLs in rotation, falling back to the canonical URL.
    pub fn rotation(&self) -> Vec<String> {
        if self.mirrors.is_empty() {
            vec![self.canonical_url.clone()]
        } else {
            self.mirrors.clone()
        }
    }

    /// Check that all URLs are usable and numeric limits are positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for url in std::iter::once(&self.canonical_url).chain(self.mirrors.iter()) {
            check_url(url)?;
        }
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                key: "concurrency".to_string(),
                value: "0".to_string(),
            });
        }
        if self.breaker_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                key: "breaker_threshold".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn check_url(url: &str) -> Result<(), ConfigError> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(ConfigError::InvalidUrl(url.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MirrorConfig::default();
        assert_eq!(config.canonical_url, DEFAULT_CANONICAL_URL);
        assert!(config.mirrors.is_empty());
        assert_eq!(config.concurrency, 25);
        assert_eq!(config.breaker_threshold, 1000);
        assert!(!config.gzip);
        assert_eq!(config.layout.index, "packages.json");
        assert_eq!(config.layout.staging, ".packages.json");
    }

    #[test]
    fn test_builder_pattern() {
        let config = MirrorConfig::new("/srv/mirror")
            .with_canonical_url("https://repo.example")
            .with_mirror("https://m1.example")
            .with_mirror("https://m2.example")
            .with_concurrency(8)
            .with_breaker_threshold(10)
            .with_timeout(Duration::from_secs(5))
            .with_gzip(true);

        assert_eq!(config.output_dir, PathBuf::from("/srv/mirror"));
        assert_eq!(config.mirrors.len(), 2);
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.breaker_threshold, 10);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.gzip);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_clamps_to_one() {
        let config = MirrorConfig::default()
            .with_concurrency(0)
            .with_breaker_threshold(0);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.breaker_threshold, 1);
    }

    #[test]
    fn test_rotation_falls_back_to_canonical() {
        let config = MirrorConfig::default().with_canonical_url("https://repo.example");
        assert_eq!(config.rotation(), vec!["https://repo.example".to_string()]);

        let config = config.with_mirror("https://m1.example");
        assert_eq!(config.rotation(), vec!["https://m1.example".to_string()]);
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let config = MirrorConfig::default().with_mirror("ftp://m1.example");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));

        let config = MirrorConfig::default().with_canonical_url("not a url");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let mut config = MirrorConfig::default();
        config.concurrency = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { key, .. }) if key == "concurrency"
        ));
    }
}
