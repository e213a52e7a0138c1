//! Logging setup
//!
//! Installs a `tracing` subscriber from [`LoggingConfig`]. `RUST_LOG` wins
//! over the configured level. Output goes to stderr, or to the configured
//! file, so stdout stays free for command output.

use crate::config::{ConfigError, LoggingConfig};
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Build the event filter: `RUST_LOG` if set, otherwise the configured level
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, ConfigError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(format!("measureset={}", config.level))
        .map_err(|e| ConfigError::Logging(format!("invalid log level '{}': {}", config.level, e)))
}

/// Initialize the global subscriber
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = build_env_filter(config)?;
    let json = match config.format.as_str() {
        "json" => true,
        "pretty" | "text" => false,
        other => {
            return Err(ConfigError::Logging(format!(
                "unknown log format '{}' (expected pretty or json)",
                other
            )))
        }
    };

    let base = Registry::default().with(filter);

    let result = match (&config.file, json) {
        (Some(path), json) => {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        ConfigError::Logging(format!("failed to create log directory: {}", e))
                    })?;
                }
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    ConfigError::Logging(format!("failed to open log file {:?}: {}", path, e))
                })?;
            let writer = Mutex::new(file);

            if json {
                base.with(fmt::layer().json().with_target(true).with_writer(writer))
                    .try_init()
            } else {
                base.with(
                    fmt::layer()
                        .with_target(true)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .try_init()
            }
        }
        (None, true) => base
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        (None, false) => base
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| ConfigError::Logging(e.to_string()))
}
