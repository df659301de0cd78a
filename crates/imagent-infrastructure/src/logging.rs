//! Tracing subscriber setup for the binary.

use imagent_core::config::LoggingSettings;
use imagent_core::Result;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt};

pub const LOG_FILE_PREFIX: &str = "imagent.log";

/// Keeps the background log writer alive. Drop it at exit to flush.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Builds the filter: `RUST_LOG` when set, otherwise the configured level.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Installs the global subscriber.
///
/// Warnings and errors always go to stderr. When logging is enabled, events
/// at the configured level also go to a daily-rolling file
/// `<log_dir>/imagent.log.YYYY-MM-DD`. A subscriber that is already installed
/// is left in place.
pub fn init_logging(settings: &LoggingSettings, log_dir: &Path) -> Result<LoggingGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(LevelFilter::WARN);

    let (file_layer, file_guard) = if settings.enabled {
        std::fs::create_dir_all(log_dir)?;
        let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(env_filter(&settings.level));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let init_result = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    if let Err(err) = init_result {
        tracing::warn!(error = %err, "tracing already initialized; skipping setup");
    }

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_log_dir_and_tolerates_reinit() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("logs");
        let settings = LoggingSettings::default();

        let _first = init_logging(&settings, &log_dir).unwrap();
        assert!(log_dir.is_dir());

        let _second = init_logging(&settings, &log_dir).unwrap();
    }

    #[test]
    fn test_disabled_logging_skips_file_layer() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("never");
        let settings = LoggingSettings {
            enabled: false,
            ..LoggingSettings::default()
        };

        let _guard = init_logging(&settings, &log_dir).unwrap();
        assert!(!log_dir.exists());
    }
}
