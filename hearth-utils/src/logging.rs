//! Logging infrastructure for hearth
//!
//! Provides unified logging setup using the tracing ecosystem.

use std::path::Path;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{paths, HearthError, Result};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "HEARTH_LOG";

/// Log output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Log to stderr (for the server)
    Stderr,
    /// Log to file (for the client, which owns the terminal)
    File,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output destination
    pub output: LogOutput,
    /// Log level filter (e.g., "info", "hearth_server=debug,tokio=warn")
    pub filter: String,
    /// Include file/line in logs
    pub file_line: bool,
    /// Optional custom log file name (defaults to "hearth.log")
    pub file_name: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "info".into(),
            file_line: false,
            file_name: None,
        }
    }
}

impl LogConfig {
    /// Create config for the server (stderr, operator facing)
    pub fn server() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: std::env::var(LOG_ENV).unwrap_or_else(|_| "info".into()),
            file_line: false,
            file_name: None,
        }
    }

    /// Create config for the client (file logging, since the screen is in use)
    pub fn client() -> Self {
        Self {
            output: LogOutput::File,
            filter: std::env::var(LOG_ENV).unwrap_or_else(|_| "warn".into()),
            file_line: true,
            file_name: Some("client.log".into()),
        }
    }
}

/// Initialize logging with custom configuration
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| HearthError::config(format!("Invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_file(config.file_line)
        .with_line_number(config.file_line);

    match config.output {
        LogOutput::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| HearthError::internal(format!("Failed to init logging: {}", e)))?;
        }
        LogOutput::File => {
            let file_name = config.file_name.as_deref().unwrap_or("hearth.log");
            let file = open_log_file(&paths::log_dir(), file_name)?;

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer.with_writer(file).with_ansi(false))
                .try_init()
                .map_err(|e| HearthError::internal(format!("Failed to init logging: {}", e)))?;
        }
    }

    Ok(())
}

/// Open (creating if needed) a log file for appending
fn open_log_file(dir: &Path, file_name: &str) -> Result<std::fs::File> {
    std::fs::create_dir_all(dir).map_err(|e| HearthError::FileWrite {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let log_path = dir.join(file_name);
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .map_err(|e| HearthError::FileWrite {
            path: log_path,
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.output, LogOutput::Stderr);
        assert_eq!(config.filter, "info");
        assert!(config.file_name.is_none());
    }

    #[test]
    fn test_client_config_logs_to_file() {
        let config = LogConfig::client();
        assert_eq!(config.output, LogOutput::File);
        assert_eq!(config.file_name.as_deref(), Some("client.log"));
    }

    #[test]
    fn test_server_config_logs_to_stderr() {
        let config = LogConfig::server();
        assert_eq!(config.output, LogOutput::Stderr);
    }

    #[test]
    fn test_invalid_filter_rejected() {
        let config = LogConfig {
            filter: "hearth=notalevel[".into(),
            ..Default::default()
        };
        let result = init_logging_with_config(config);
        assert!(matches!(result, Err(HearthError::Config(_))));
    }

    #[test]
    fn test_open_log_file_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");

        open_log_file(&nested, "test.log").unwrap();
        assert!(nested.join("test.log").exists());
    }
}
