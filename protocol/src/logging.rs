//! # Structured Logging
//!
//! The pool crates only emit `tracing` events; the embedder owns the
//! subscriber. [`try_init`] installs a reasonable default: an `EnvFilter`
//! seeded from `RUST_LOG` (falling back to [`LogConfig::directives`]) and a
//! compact or JSON formatter. Test harnesses use [`LogConfig::for_tests`],
//! which routes output through libtest's capture.

use serde::Deserialize;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, TestWriter};
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor the caller says otherwise.
pub const DEFAULT_DIRECTIVES: &str = "pool_contracts=info,pool_protocol=info";

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human-readable records.
    #[default]
    Compact,
    /// One JSON object per line, for log aggregation.
    Json,
}

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directives, e.g. `pool_contracts=debug`.
    #[serde(default = "default_directives")]
    pub directives: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Write through libtest's output capture instead of stdout.
    #[serde(skip)]
    pub capture_for_tests: bool,
}

fn default_directives() -> String {
    DEFAULT_DIRECTIVES.to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directives: default_directives(),
            format: LogFormat::default(),
            capture_for_tests: false,
        }
    }
}

impl LogConfig {
    /// Debug-level pool logs, captured per test.
    pub fn for_tests() -> Self {
        Self {
            directives: "pool_contracts=debug,pool_protocol=debug".to_string(),
            format: LogFormat::Compact,
            capture_for_tests: true,
        }
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// [`TryInitError`] if a global subscriber is already set. Test helpers
/// that run once per test can ignore it.
pub fn try_init(config: &LogConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.directives));
    let writer = if config.capture_for_tests {
        BoxMakeWriter::new(TestWriter::default())
    } else {
        BoxMakeWriter::new(std::io::stdout)
    };

    let registry = tracing_subscriber::registry().with(filter);
    match config.format {
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_writer(writer))
            .try_init()?,
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer))
            .try_init()?,
    }

    tracing::debug!(format = ?config.format, directives = %config.directives, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_reads_from_json_with_defaults() {
        let config: LogConfig = serde_json::from_str(r#"{"format":"json"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.directives, DEFAULT_DIRECTIVES);
        assert!(!config.capture_for_tests);
    }

    #[test]
    fn second_init_reports_error() {
        let _ = try_init(&LogConfig::for_tests());
        assert!(try_init(&LogConfig::for_tests()).is_err());
    }
}
