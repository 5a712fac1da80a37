//! Logging setup shared by the plugin binary and tests.

use std::path::Path;

use rclonevol_shared::errors::{VolumeError, VolumeResult};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Log file name inside the log directory (rotated daily).
pub const LOG_FILE: &str = "rclonevol.log";

/// Env filter from `RUST_LOG`, falling back to `default_level`.
pub fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install a global subscriber writing to `writer`.
///
/// Ignored if a subscriber is already installed.
pub fn register_to_tracing(writer: NonBlocking, env_filter: EnvFilter, ansi: bool) {
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(ansi),
        )
        .try_init();
}

/// Initialize logging to stderr, or to `<log_dir>/rclonevol.log` with daily
/// rotation when a directory is given.
///
/// The returned guard flushes buffered lines on drop and must be kept alive
/// for the lifetime of the process.
pub fn init_logging(log_dir: Option<&Path>, default_level: &str) -> VolumeResult<WorkerGuard> {
    let filter = env_filter(default_level);

    let guard = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir).map_err(|e| {
                VolumeError::Storage(format!(
                    "failed to create log dir {}: {}",
                    dir.display(),
                    e
                ))
            })?;
            let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            register_to_tracing(writer, filter, false);
            guard
        }
        None => {
            let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
            register_to_tracing(writer, filter, true);
            guard
        }
    };

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_logging_to_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("logs");

        let guard = init_logging(Some(&log_dir), "debug").unwrap();
        tracing::info!("log line");
        drop(guard);

        assert!(log_dir.is_dir());
    }
}
