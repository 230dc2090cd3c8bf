//! Helpers shared by CLI commands.

use std::path::{Path, PathBuf};

use packmirror::config::ConfigFile;
use packmirror::logging::{init_logging, LoggingGuard};
use tracing::debug;

use crate::error::CliError;

/// Load the configuration file.
///
/// An explicit path must exist; otherwise the default location is used when
/// present, and built-in defaults when not.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            Ok(ConfigFile::load_from(path)?)
        }
        None => Ok(ConfigFile::load()?),
    }
}

/// Install logging from the configuration, raising the level for `-v`.
pub fn start_logging(config: &ConfigFile, verbose: u8) -> Result<LoggingGuard, CliError> {
    let mut logging = config.logging.clone();
    match verbose {
        0 => {}
        1 => logging.filter = "debug".to_string(),
        _ => logging.filter = "trace".to_string(),
    }
    logging.ansi = console::colors_enabled_stderr();

    let guard = init_logging(&logging)?;
    debug!(filter = %logging.directive(), "Logging initialized");
    Ok(guard)
}

/// Resolve the output directory: CLI flag over configuration.
pub fn resolve_output(cli: Option<PathBuf>, config: &ConfigFile) -> PathBuf {
    cli.unwrap_or_else(|| config.mirror.output_dir.clone())
}
