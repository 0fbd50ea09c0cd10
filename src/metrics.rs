//! Metric names and recording helpers.
//!
//! The library only records; installing an exporter is up to the binary
//! embedding it. Without a recorder every call is a no-op.

use std::time::Duration;

use metrics::{counter, histogram};

/// Store operations by operation name and status
pub const DB_OPERATIONS_TOTAL: &str = "activity_logger_db_operations_total";
/// Store operation latency
pub const DB_OPERATION_DURATION: &str = "activity_logger_db_operation_duration_seconds";
/// Routine submissions by outcome
pub const ROUTINES_SUBMITTED_TOTAL: &str = "activity_logger_routines_submitted_total";
/// Physical user routine rows written
pub const ROUTINE_ROWS_WRITTEN_TOTAL: &str = "activity_logger_routine_rows_written_total";
/// Raw snapshots ingested by outcome
pub const RAW_SNAPSHOTS_TOTAL: &str = "activity_logger_raw_snapshots_total";
/// Errors by kind and operation
pub const ERRORS_TOTAL: &str = "activity_logger_errors_total";

const fn status(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
}

/// Record one store operation
pub fn record_db_operation(operation: &'static str, duration: Duration, success: bool) {
    counter!(DB_OPERATIONS_TOTAL, "operation" => operation, "status" => status(success)).increment(1);
    histogram!(DB_OPERATION_DURATION, "operation" => operation).record(duration.as_secs_f64());
    if !success {
        counter!(ERRORS_TOTAL, "kind" => "database", "operation" => operation).increment(1);
    }
}

/// Record a routine submission and how many rows it wrote
pub fn record_routine_submission(success: bool, dry_run: bool, rows: usize) {
    let mode = if dry_run { "dry_run" } else { "commit" };
    counter!(ROUTINES_SUBMITTED_TOTAL, "status" => status(success), "mode" => mode).increment(1);
    if success && !dry_run {
        counter!(ROUTINE_ROWS_WRITTEN_TOTAL).increment(rows as u64);
    }
}

/// Record a raw snapshot ingestion
pub fn record_raw_snapshot(success: bool) {
    counter!(RAW_SNAPSHOTS_TOTAL, "status" => status(success)).increment(1);
}

/// Record an error of `kind` raised by `operation`
pub fn record_error(kind: &'static str, operation: &'static str) {
    counter!(ERRORS_TOTAL, "kind" => kind, "operation" => operation).increment(1);
}
