//! CLI error type and exit codes.

use std::fmt;

use packmirror::config::ConfigError;
use packmirror::logging::LoggingError;
use packmirror::MirrorError;

/// Exit code for fatal errors.
pub const EXIT_FATAL: i32 = 2;

/// Errors surfaced to the user by the CLI.
#[derive(Debug)]
pub enum CliError {
    /// Invalid or unreadable configuration.
    Config(String),
    /// Logging could not be set up.
    Logging(String),
    /// The async runtime could not be started.
    Runtime(String),
    /// A synchronization run aborted.
    Sync(MirrorError),
    /// The mirror could not be inspected.
    Status(String),
}

impl CliError {
    /// Process exit code.
    pub fn exit_code(&self) -> i32 {
        EXIT_FATAL
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Logging(msg) => write!(f, "Logging error: {}", msg),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            CliError::Sync(e) => write!(f, "Sync failed: {}", e),
            CliError::Status(msg) => write!(f, "Status error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Sync(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e.to_string())
    }
}

impl From<MirrorError> for CliError {
    fn from(e: MirrorError) -> Self {
        match e {
            MirrorError::Config(e) => CliError::Config(e.to_string()),
            other => CliError::Sync(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_exit_code() {
        let err = CliError::Config("bad".to_string());
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "Configuration error: bad");
    }

    #[test]
    fn test_mirror_config_error_maps_to_config() {
        let err: CliError = MirrorError::Config(ConfigError::InvalidUrl("x".to_string())).into();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn test_sync_error_keeps_source() {
        use std::error::Error as _;

        let err: CliError = MirrorError::Http("tls".to_string()).into();
        assert!(err.source().is_some());
    }
}
