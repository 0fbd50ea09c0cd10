use std::path::Path;
use std::time::Instant;

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::error::{ActivityLoggerError, Result};

/// File name prefix of the daily rolling log files
pub const LOG_FILE_PREFIX: &str = "activity_logger.log";

/// Initialize structured logging.
///
/// `RUST_LOG` takes precedence over the configured level. When a log
/// directory is configured, JSON lines are also written to daily rolling
/// files there; keep the returned guard alive until exit so buffered lines
/// are flushed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ActivityLoggerError::InvalidConfig(format!("Failed to create log filter: {e}")))?;

    let console_layer = if config.format == "json" {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .json()
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    };

    let registry = Registry::default().with(env_filter).with(console_layer);

    let guard = if let Some(log_dir) = config.file_path.as_deref() {
        let file_appender = rolling::daily(Path::new(log_dir), LOG_FILE_PREFIX);
        let (non_blocking_appender, guard) = non_blocking(file_appender);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_appender)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .json();

        registry
            .with(file_layer)
            .try_init()
            .map_err(|e| ActivityLoggerError::InvalidConfig(format!("Failed to install logger: {e}")))?;
        Some(guard)
    } else {
        registry
            .try_init()
            .map_err(|e| ActivityLoggerError::InvalidConfig(format!("Failed to install logger: {e}")))?;
        None
    };

    info!(level = %config.level, format = %config.format, "Logging system initialized");
    Ok(guard)
}

/// Logs how long an operation took
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    /// Start timing `operation`
    #[must_use]
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    /// Operation name
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }

    /// Elapsed time so far
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    /// Log completion and return the duration in milliseconds
    pub fn finish(self) -> u128 {
        let duration = self.start.elapsed().as_millis();
        tracing::info!(operation = self.operation, duration_ms = duration, "Operation completed");
        duration
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            let duration = self.start.elapsed().as_millis();
            tracing::debug!(operation = self.operation, duration_ms = duration, "Operation finished");
        }
    }
}
