//! Error types for the activity-logger library.
//!
//! This module provides custom error types using `thiserror`. The variants map
//! onto the failure classes callers care about: bad input, missing records,
//! retryable conflicts, rolled-back transactions and unreachable databases.

use std::fmt;

use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur in the activity-logger application.
#[derive(Error, Debug)]
pub enum ActivityLoggerError {
    /// Malformed or missing payload fields, detected before any database work
    #[error("Validation error: {0}")]
    Validation(String),

    /// A lookup by key or id matched nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique-constraint violation or lock contention; resubmit the whole request
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A write path step failed and the transaction was rolled back
    #[error("Transaction cancelled, nothing was saved:\n{}", StepFailures(.failures))]
    Transaction {
        /// Every failed step, in execution order
        failures: Vec<StepFailure>,
    },

    /// The connection pool or database could not be reached
    #[error("Connection error: {0}")]
    Connection(String),

    /// Any other database error
    #[error("Database error: {0}")]
    Database(#[source] rusqlite::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Result with `ActivityLoggerError`
pub type Result<T> = std::result::Result<T, ActivityLoggerError>;

/// One failed step of a multi-step write.
#[derive(Debug)]
pub struct StepFailure {
    /// Short name of the step ("device", "logger application", ...)
    pub step: &'static str,
    /// Human readable reason
    pub message: String,
    /// Whether the underlying cause was a conflict
    pub conflict: bool,
}

impl StepFailure {
    /// Record a step that failed with an error.
    #[must_use]
    pub fn failed(step: &'static str, error: &ActivityLoggerError) -> Self {
        Self {
            step,
            message: error.to_string(),
            conflict: matches!(error, ActivityLoggerError::Conflict(_)),
        }
    }

    /// Record a step that could not run because a prerequisite failed.
    #[must_use]
    pub fn skipped(step: &'static str, missing: &str) -> Self {
        Self {
            step,
            message: format!("skipped, no {missing} available"),
            conflict: false,
        }
    }

    /// Record a step that did not run because the transaction had already
    /// been rolled back.
    #[must_use]
    pub fn aborted(step: &'static str) -> Self {
        Self {
            step,
            message: "skipped, transaction was already rolled back".to_string(),
            conflict: false,
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.message)
    }
}

struct StepFailures<'a>(&'a [StepFailure]);

impl fmt::Display for StepFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for failure in self.0 {
            writeln!(f, "- {failure}")?;
        }
        Ok(())
    }
}

impl ActivityLoggerError {
    /// True when resubmitting the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Conflict(_) => true,
            Self::Transaction { failures } => failures.iter().any(|f| f.conflict),
            _ => false,
        }
    }

    /// Short label used when counting errors
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Transaction { .. } => "transaction",
            Self::Connection(_) => "connection",
            Self::Database(_) => "database",
            Self::Serialization(_) => "serialization",
            Self::InvalidConfig(_) => "config",
            Self::Io(_) => "io",
        }
    }
}

impl From<rusqlite::Error> for ActivityLoggerError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) if is_unique_violation(&err) => {
                Self::Conflict(err.to_string())
            },
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => Self::Conflict(err.to_string()),
            Some(ErrorCode::CannotOpen | ErrorCode::NotADatabase) => Self::Connection(err.to_string()),
            _ => Self::Database(err),
        }
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        },
        _ => false,
    }
}

impl From<r2d2::Error> for ActivityLoggerError {
    fn from(err: r2d2::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

impl From<config::ConfigError> for ActivityLoggerError {
    fn from(err: config::ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
