//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - Human-readable console output filtered by level or `RUST_LOG`
//! - Optional JSON log files with daily or hourly rotation
//!
//! # Example
//!
//! ```no_run
//! use pharmaledger::logging::init_logging;
//! use pharmaledger::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(session_id = 42, "Batch ingested");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a batch
///
/// # Example
///
/// ```no_run
/// use pharmaledger::log_ingest_start;
///
/// log_ingest_start!("grls_2024-05-01.xlsx", 120, 340);
/// ```
#[macro_export]
macro_rules! log_ingest_start {
    ($source_file:expr, $manufacturers:expr, $consumers:expr) => {
        tracing::info!(
            source_file = %$source_file,
            manufacturer_records = $manufacturers,
            consumer_records = $consumers,
            "Starting ingestion"
        );
    };
}

/// Log a unit that was rolled back and skipped
///
/// # Example
///
/// ```no_run
/// use pharmaledger::log_unit_failure;
/// use pharmaledger::domain::LedgerError;
///
/// let error = LedgerError::EntityWrite("consumer X: timeout".to_string());
/// log_unit_failure!("consumer", 2, "X", &error);
/// ```
#[macro_export]
macro_rules! log_unit_failure {
    ($kind:expr, $index:expr, $entity:expr, $error:expr) => {
        tracing::warn!(
            entity_kind = %$kind,
            index = $index,
            entity = %$entity,
            error = %$error,
            "Unit failed, skipping"
        );
    };
}

/// Log batch progress
///
/// # Example
///
/// ```no_run
/// use pharmaledger::log_batch_progress;
///
/// log_batch_progress!(100, 1000);
/// ```
#[macro_export]
macro_rules! log_batch_progress {
    ($current:expr, $total:expr) => {
        tracing::debug!(
            current = $current,
            total = $total,
            progress_pct = ($current as f64 / ($total as f64).max(1.0) * 100.0),
            "Processing batch"
        );
    };
}

/// Log an error with context
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
