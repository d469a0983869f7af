use anyhow::Result;
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const LOG_FILE_NAME: &str = "seo-engine.log";

/// Logging settings
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// trace, debug, info, warn, error, or a full filter directive
    pub level: String,
    pub format: LogFormat,
    /// File output is disabled when unset
    pub log_dir: Option<PathBuf>,
    pub rotation: LogRotation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogRotation {
    Daily,
    Hourly,
    Never,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            log_dir: None,
            rotation: LogRotation::Daily,
        }
    }
}

impl LogConfig {
    /// Build logging settings from the `[server]` config section
    pub fn from_server_config(server: &crate::config::ServerConfig) -> Self {
        Self {
            level: server.log_level.clone(),
            format: parse_format(&server.log_format),
            log_dir: server.log_dir.as_ref().map(PathBuf::from),
            rotation: parse_rotation(&server.log_rotation),
        }
    }

    pub fn with_log_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

fn parse_format(value: &str) -> LogFormat {
    match value.to_lowercase().as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    }
}

fn parse_rotation(value: &str) -> LogRotation {
    match value.to_lowercase().as_str() {
        "hourly" => LogRotation::Hourly,
        "never" => LogRotation::Never,
        _ => LogRotation::Daily,
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop; keep it alive for
/// the lifetime of the process.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)?;
            let appender = match config.rotation {
                LogRotation::Daily => rolling::daily(dir, LOG_FILE_NAME),
                LogRotation::Hourly => rolling::hourly(dir, LOG_FILE_NAME),
                LogRotation::Never => rolling::never(dir, LOG_FILE_NAME),
            };
            let (writer, guard) = non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;

    tracing::info!(level = %config.level, "logging initialised");
    if let Some(dir) = &config.log_dir {
        tracing::info!("log directory: {}", dir.display());
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    #[test]
    fn test_from_server_config() {
        let server = ServerConfig {
            log_level: "debug".to_string(),
            log_format: "JSON".to_string(),
            log_dir: Some("/tmp/seo-logs".to_string()),
            log_rotation: "hourly".to_string(),
            ..ServerConfig::default()
        };
        let config = LogConfig::from_server_config(&server);
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.rotation, LogRotation::Hourly);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/seo-logs")));
    }

    #[test]
    fn test_unknown_values_fall_back() {
        assert_eq!(parse_format("yaml"), LogFormat::Text);
        assert_eq!(parse_rotation("weekly"), LogRotation::Daily);
    }
}
