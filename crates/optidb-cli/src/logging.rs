//! Logging and tracing setup for the optidb binary
//!
//! Console output goes to stderr so reports on stdout stay clean. JSON logs
//! are written to daily rolling files when enabled.

use crate::settings::Settings;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory where JSON log files are written
    pub log_dir: PathBuf,

    /// Whether to write JSON logs to files
    pub enable_json_logs: bool,

    /// Whether to log to stderr
    pub enable_console_logs: bool,

    /// Whether to include file/line information in console logs
    pub include_location: bool,

    /// Default filter, overridden by RUST_LOG
    pub default_filter: String,
}

impl LoggingConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            log_dir: settings.log_dir(),
            enable_json_logs: settings.logging.json,
            enable_console_logs: true,
            include_location: cfg!(debug_assertions),
            default_filter: settings.logging.filter.clone(),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Installs the global subscriber.
///
/// The returned guard flushes the file writer on drop and must be held until exit.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let mut layers = Vec::new();
    let mut guard = None;

    if config.enable_console_logs {
        let console_layer = fmt::layer()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .compact()
            .with_filter(config.env_filter())
            .boxed();

        layers.push(console_layer);
    }

    if config.enable_json_logs {
        std::fs::create_dir_all(&config.log_dir)?;

        let file_appender = tracing_appender::rolling::daily(&config.log_dir, "optidb.log");
        let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(file_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(config.env_filter())
            .boxed();

        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = %config.log_dir.display(),
        json_enabled = config.enable_json_logs,
        "logging initialized"
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_default_settings() {
        let config = LoggingConfig::from_settings(&Settings::default());
        assert!(config.enable_console_logs);
        assert!(!config.enable_json_logs);
        assert!(config.log_dir.ends_with("optidb/logs"));
        assert!(config.default_filter.contains("optidb_analyzer=info"));
    }

    #[test]
    fn test_config_follows_log_settings() {
        let mut settings = Settings::default();
        settings.logging.json = true;
        settings.logging.filter = "debug".to_string();
        settings.logging.directory = Some(PathBuf::from("/tmp/optidb-logs"));

        let config = LoggingConfig::from_settings(&settings);
        assert!(config.enable_json_logs);
        assert_eq!(config.default_filter, "debug");
        assert_eq!(config.log_dir, PathBuf::from("/tmp/optidb-logs"));
    }
}
