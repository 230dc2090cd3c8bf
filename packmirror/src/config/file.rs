//! INI configuration file support.
//!
//! ```ini
//! [mirror]
//! canonical_url = https://repo.packagist.org
//! mirrors = https://mirror-a.example, https://mirror-b.example
//! output_dir = /srv/packagist
//! gzip = false
//!
//! [http]
//! concurrency = 25
//! timeout_secs = 30
//! breaker_threshold = 1000
//! user_agent = packmirror
//!
//! [logging]
//! level = info
//! directory = /var/log/packmirror
//! ```
//!
//! Missing keys keep their defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use super::{ConfigError, MirrorConfig};
use crate::logging::LoggingConfig;

/// Parsed configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    /// Engine configuration.
    pub mirror: MirrorConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default location: `<config dir>/packmirror/config.ini`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("packmirror").join("config.ini"))
}

impl ConfigFile {
    /// Load from the default location, or defaults if no file exists there.
    pub fn load() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Load {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("mirror")) {
            let mirror = &mut config.mirror;
            if let Some(url) = section.get("canonical_url") {
                mirror.canonical_url = url.trim().trim_end_matches('/').to_string();
            }
            if let Some(list) = section.get("mirrors") {
                mirror.mirrors = list
                    .split(',')
                    .map(|s| s.trim().trim_end_matches('/'))
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            if let Some(dir) = section.get("output_dir") {
                mirror.output_dir = PathBuf::from(dir.trim());
            }
            if let Some(gzip) = parse_value::<bool>(section, "gzip")? {
                mirror.gzip = gzip;
            }
        }

        if let Some(section) = ini.section(Some("http")) {
            let mirror = &mut config.mirror;
            if let Some(concurrency) = parse_value::<usize>(section, "concurrency")? {
                mirror.concurrency = concurrency;
            }
            if let Some(secs) = parse_value::<u64>(section, "timeout_secs")? {
                mirror.timeout = Duration::from_secs(secs);
            }
            if let Some(threshold) = parse_value::<usize>(section, "breaker_threshold")? {
                mirror.breaker_threshold = threshold;
            }
            if let Some(agent) = section.get("user_agent") {
                mirror.user_agent = agent.trim().to_string();
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(level) = section.get("level") {
                config.logging.filter = level.trim().to_string();
            }
            if let Some(dir) = section.get("directory") {
                config.logging.directory = Some(PathBuf::from(dir.trim()));
            }
        }

        config.mirror.validate()?;
        Ok(config)
    }
}

fn parse_value<T: FromStr>(section: &Properties, key: &str) -> Result<Option<T>, ConfigError> {
    match section.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let config = ConfigFile::parse(
            r#"
[mirror]
canonical_url = https://repo.example/
mirrors = https://m1.example, https://m2.example/
output_dir = /srv/mirror
gzip = true

[http]
concurrency = 10
timeout_secs = 5
breaker_threshold = 50
user_agent = test-agent

[logging]
level = debug
directory = /tmp/logs
"#,
        )
        .unwrap();

        assert_eq!(config.mirror.canonical_url, "https://repo.example");
        assert_eq!(
            config.mirror.mirrors,
            vec!["https://m1.example".to_string(), "https://m2.example".to_string()]
        );
        assert_eq!(config.mirror.output_dir, PathBuf::from("/srv/mirror"));
        assert!(config.mirror.gzip);
        assert_eq!(config.mirror.concurrency, 10);
        assert_eq!(config.mirror.timeout, Duration::from_secs(5));
        assert_eq!(config.mirror.breaker_threshold, 50);
        assert_eq!(config.mirror.user_agent, "test-agent");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.logging.directory, Some(PathBuf::from("/tmp/logs")));
    }

    #[test]
    fn test_missing_sections_keep_defaults() {
        let config = ConfigFile::parse("[mirror]\noutput_dir = out\n").unwrap();
        assert_eq!(config.mirror.concurrency, 25);
        assert_eq!(config.mirror.breaker_threshold, 1000);
        assert_eq!(config.mirror.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_invalid_number() {
        let err = ConfigFile::parse("[http]\nconcurrency = many\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "concurrency"));
    }

    #[test]
    fn test_invalid_mirror_url() {
        let err = ConfigFile::parse("[mirror]\nmirrors = not-a-url\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigFile::load_from(Path::new("/nonexistent/packmirror.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Load { .. }));
    }
}
