//! Logging and observability
//!
//! Structured logging through `tracing`, with console output and optional JSON
//! files with rotation.
//!
//! # Example
//!
//! ```no_run
//! use packline::logging::init_logging;
//! use packline::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(project_id = "P-1", "Reconciling");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the result of one synchronization pass
///
/// # Example
///
/// ```no_run
/// use packline::log_sync_pass;
/// use std::time::Duration;
///
/// log_sync_pass!(12, 11, 1, 3, Duration::from_millis(40));
/// ```
#[macro_export]
macro_rules! log_sync_pass {
    ($attempted:expr, $persisted:expr, $failed:expr, $skipped:expr, $duration:expr) => {
        if $failed > 0 {
            tracing::warn!(
                attempted = $attempted,
                persisted = $persisted,
                failed = $failed,
                skipped = $skipped,
                duration_ms = $duration.as_millis() as u64,
                "Synchronization pass finished with failures"
            );
        } else {
            tracing::info!(
                attempted = $attempted,
                persisted = $persisted,
                skipped = $skipped,
                duration_ms = $duration.as_millis() as u64,
                "Synchronization pass finished"
            );
        }
    };
}

/// Log a committed reconciliation
///
/// # Example
///
/// ```no_run
/// use packline::log_reconcile_outcome;
///
/// log_reconcile_outcome!("P-1", 100, 400, 1);
/// ```
#[macro_export]
macro_rules! log_reconcile_outcome {
    ($project_id:expr, $export_quantity:expr, $remain_quantity:expr, $attempts:expr) => {
        tracing::info!(
            project_id = %$project_id,
            export_quantity = $export_quantity,
            remain_quantity = $remain_quantity,
            attempts = $attempts,
            "Export quantity reconciled"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use packline::log_error_with_context;
/// use packline::domain::PacklineError;
///
/// let error = PacklineError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use packline::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    #[test]
    fn test_macros_expand_without_subscriber() {
        crate::log_sync_pass!(3usize, 2usize, 1usize, 0usize, Duration::from_millis(5));
        crate::log_sync_pass!(3usize, 3usize, 0usize, 0usize, Duration::from_millis(5));
        crate::log_reconcile_outcome!("P-1", 100u64, 400u64, 1usize);
        crate::log_retry_attempt!(1, 3, "timeout");
        crate::log_error_with_context!("boom", "test");
    }
}
