//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format string; unknown values fall back to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Event filter.
    pub filter: EnvFilter,
    /// Output format.
    pub format: LogFormat,
    /// Optional file to append to instead of stderr.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds logging configuration from config settings with env overrides.
    ///
    /// `RUST_LOG` wins over the configured level. `verbose` raises the default
    /// level from `info` to `debug` for this crate.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        let directive = default_directive(settings.level.as_deref(), verbose);
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&directive))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        Self {
            filter,
            format: settings
                .format
                .as_deref()
                .map_or_else(LogFormat::default, LogFormat::parse),
            file: settings.file.clone(),
        }
    }
}

fn default_directive(level: Option<&str>, verbose: bool) -> String {
    match level.map(str::trim).filter(|l| !l.is_empty()) {
        Some(level) => level.to_string(),
        None if verbose => "warn,dashvault=debug".to_string(),
        None => "warn,dashvault=info".to_string(),
    }
}
