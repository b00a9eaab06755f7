//! Structured logging initialization.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{TelemetryError, TelemetryResult};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "info,tlm=debug";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// JSON when `RUST_ENV=production`, pretty otherwise.
    pub fn from_env() -> Self {
        let is_production = std::env::var("RUST_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);
        if is_production {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter directives used when `RUST_LOG` is unset.
    pub default_filter: String,
    /// Also append plain-text logs to this file.
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::from_env(),
            default_filter: DEFAULT_FILTER.to_string(),
            log_file: None,
        }
    }
}

/// Install the global subscriber.
///
/// # Errors
/// Fails if the log file cannot be opened or a subscriber is already set.
pub fn init_logging(config: &LoggingConfig) -> TelemetryResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .map_err(|e| TelemetryError::LoggingInit(format!("invalid filter: {e}")))?;

    let json_layer = (config.format == LogFormat::Json).then(|| {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
    });
    let pretty_layer = (config.format == LogFormat::Pretty).then(|| {
        fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_names(true)
    });

    let file_layer = match &config.log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(pretty_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::debug!(
        format = ?config.format,
        log_file = ?config.log_file,
        "Logging initialized"
    );
    Ok(())
}
