//! Structured logging initialization.
//!
//! Thin wrapper over `tracing-subscriber` so every binary and test harness
//! in the workspace configures logging the same way. The filter honors
//! `RUST_LOG` and falls back to the configured default level.

use crate::error::MediaButlerError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, EnvFilter};

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line, for log shippers
    Json,
    /// Human-readable multi-line output
    Pretty,
    /// Single-line human-readable output
    Compact,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. "info")
    pub default_level: String,
    pub format: LogFormat,
    /// Include span targets in output
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            format: LogFormat::Compact,
            with_target: false,
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Safe to call once per process; a second call returns a
/// `ConfigurationError` instead of panicking.
pub fn init_logging(config: &LogConfig) -> Result<(), MediaButlerError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_level))
        .map_err(|e| {
            MediaButlerError::configuration(format!("Invalid log filter: {e}"), "RUST_LOG")
        })?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    result.map_err(|e| MediaButlerError::ConfigurationError {
        message: format!("Failed to install tracing subscriber: {e}"),
        key: None,
    })?;

    tracing::debug!(format = ?config.format, "Logging initialized");
    Ok(())
}
