//! Audit log for the DICOM bridge
//!
//! Every run appends JSON events to a daily file under the configured log
//! directory. Files older than the retention count are deleted by the
//! appender when it rolls over. The writer runs on its own thread, so a slow
//! or failing disk never stalls a transfer.

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::constants::logging;
use crate::errors::{AppError, ConfigError, Result};

/// Open the rotating audit log, or `None` when file logging is off
///
/// The returned guard flushes buffered lines when dropped and must be held
/// for as long as events should reach the file.
pub fn audit_writer(config: &LoggingConfig) -> Result<Option<(NonBlocking, WorkerGuard)>> {
    if !config.file_logging {
        return Ok(None);
    }

    let dir = config
        .log_directory()
        .ok_or_else(|| ConfigError::InvalidValue {
            field: "logging.log_dir".to_string(),
            value: String::new(),
            reason: "No log directory could be determined".to_string(),
        })?;
    std::fs::create_dir_all(&dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(logging::FILE_PREFIX)
        .filename_suffix(logging::FILE_SUFFIX)
        .max_log_files(config.max_log_files)
        .build(&dir)
        .map_err(|e| {
            AppError::generic(format!(
                "Failed to open audit log in {}: {}",
                dir.display(),
                e
            ))
        })?;

    Ok(Some(tracing_appender::non_blocking(appender)))
}

/// Directive enabling this crate's events at `level`
pub fn crate_directive(level: &str) -> Result<Directive> {
    format!("dicom_bridge={}", level)
        .parse()
        .map_err(|e| AppError::generic(format!("Invalid log level '{}': {}", level, e)))
}

/// Filter letting only this crate's events through at `level`
pub fn crate_filter(level: &str) -> Result<EnvFilter> {
    Ok(EnvFilter::default().add_directive(crate_directive(level)?))
}
