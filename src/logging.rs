use std::path::PathBuf;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_log::LogTracer;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the logging system
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level for the application (default: INFO)
    pub level: Level,
    /// Path to store log files. If None, logs only go to stdout/stderr
    pub log_dir: Option<String>,
    /// Whether to colorize terminal output (default: true)
    pub colorize: bool,
    /// Log file name used when log_dir is set
    pub log_file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_dir: None,
            colorize: true,
            log_file_name: "voicechat-gateway".to_string(),
        }
    }
}

/// Guard that keeps the file appender worker thread alive.
///
/// Must stay in scope for the duration of the program so buffered log lines
/// reach the file.
#[allow(dead_code)]
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the logging system with the given configuration.
///
/// Initialization errors are handled gracefully so repeated calls (e.g. in
/// tests) never panic.
pub fn init_logging(config: LoggingConfig) -> LogGuard {
    // Forward log-crate records to tracing; ignore repeat initialization.
    let _ = LogTracer::init();

    let level_filter = match config.level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("voicechat_gateway={level_filter}")));

    let time_format = "%Y-%m-%d %H:%M:%S".to_string();

    let mut layers = Vec::new();

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_ansi(config.colorize)
        .with_timer(ChronoUtc::new(time_format.clone()))
        .boxed();
    layers.push(stdout_layer);

    let mut file_guard = None;
    if let Some(log_dir) = &config.log_dir {
        let log_dir = PathBuf::from(log_dir);
        if !log_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(&log_dir) {
                eprintln!("Failed to create log directory: {e}");
                return LogGuard { _file_guard: None };
            }
        }

        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, log_dir, config.log_file_name.clone());
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        file_guard = Some(guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_timer(ChronoUtc::new(time_format))
            .with_writer(non_blocking)
            .boxed();
        layers.push(file_layer);
    }

    // try_init so another subscriber set by a test harness is not an error.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init();

    LogGuard {
        _file_guard: file_guard,
    }
}

/// Parse a textual level, falling back to INFO.
pub fn parse_level(level: Option<&str>) -> Level {
    match level.map(|l| l.to_lowercase()).as_deref() {
        Some("trace") => Level::TRACE,
        Some("debug") => Level::DEBUG,
        Some("warn") => Level::WARN,
        Some("error") => Level::ERROR,
        _ => Level::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_known_and_unknown() {
        assert_eq!(parse_level(Some("debug")), Level::DEBUG);
        assert_eq!(parse_level(Some("WARN")), Level::WARN);
        assert_eq!(parse_level(Some("bogus")), Level::INFO);
        assert_eq!(parse_level(None), Level::INFO);
    }
}
