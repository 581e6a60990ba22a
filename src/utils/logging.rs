//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the EventHub crate.

use tracing::{info, warn, error, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use crate::config::LoggingConfig;
use crate::utils::errors::{ErrorSeverity, EventHubError, Result};

/// Initialize logging based on configuration
///
/// The returned guard flushes the file writer on drop and must be held for
/// as long as the process logs to the file.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let (file_layer, guard) = match &config.file_path {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "eventhub.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_writer(std::io::stdout).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_writer(std::io::stdout).boxed()
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| EventHubError::Config(format!("Failed to install logger: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log a store operation outcome
pub fn log_store_operation(table: &str, operation: &str, record_id: Option<&str>, success: bool) {
    if success {
        debug!(
            table = table,
            operation = operation,
            record_id = record_id,
            "Store operation completed"
        );
    } else {
        warn!(
            table = table,
            operation = operation,
            record_id = record_id,
            "Store operation failed"
        );
    }
}

/// Log a change feed notification applied to a projection
pub fn log_feed_notification(table: &str, kind: &str, record_id: &str, applied: bool) {
    debug!(
        table = table,
        kind = kind,
        record_id = record_id,
        applied = applied,
        "Change feed notification"
    );
}

/// Log admin actions
pub fn log_admin_action(admin_id: &str, action: &str, target: Option<&str>, details: Option<&str>) {
    warn!(
        admin_id = admin_id,
        action = action,
        target = target,
        details = details,
        "Admin action performed"
    );
}

/// Log API errors with context, at the level their severity calls for
pub fn log_api_error(api: &str, error: &EventHubError, context: Option<&str>) {
    let severity = error.severity();
    let recoverable = error.is_recoverable();
    match severity {
        ErrorSeverity::Info => {
            info!(api = api, error = %error, context = context, "API error occurred");
        }
        ErrorSeverity::Warning => {
            warn!(api = api, error = %error, context = context, recoverable = recoverable, "API error occurred");
        }
        ErrorSeverity::Error | ErrorSeverity::Critical => error!(
            api = api,
            error = %error,
            context = context,
            severity = %severity,
            recoverable = recoverable,
            "API error occurred"
        ),
    }
}

/// Log remote calls
pub fn log_remote_call(operation: &str, table: &str, duration_ms: u64, success: bool) {
    if success {
        debug!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Remote call completed"
        );
    } else {
        error!(
            operation = operation,
            table = table,
            duration_ms = duration_ms,
            "Remote call failed"
        );
    }
}
