//! Activity Logger - routine and activity snapshot store
//!
//! A Rust library for persisting mobile activity snapshots and recognized
//! usage routines in SQLite and reading them back as aggregates.
//!
//! # Features
//!
//! - Filtered join queries with bound parameters
//! - Flat-row to aggregate hydration for one-to-many results
//! - Atomic six-table routine submission with per-step failure reports
//! - Raw snapshot ingestion and idempotent reference entity creation

/// Configuration management
pub mod config;
/// Database facade and connection pooling
pub mod db;
/// Error types
pub mod error;
/// Filtered query assembly
pub mod filter;
/// Flat join rows to one-to-many aggregates
pub mod hydrator;
/// Logging setup and utilities
pub mod logging;
/// Metric names and recording helpers
pub mod metrics;
/// Data models and payloads
pub mod models;
/// Per-entity store operations
pub mod queries;
/// Database schema definitions
pub mod schema;
/// Input validation and normalization
pub mod validation;
/// Transactional routine and snapshot writes
pub mod writer;

// Re-export key components for easier access
pub use db::Database;
pub use error::{ActivityLoggerError, Result};
pub use filter::{FilteredQuery, QueryFilters};
pub use models::{Application, RawLogData, RoutineType, UserRoutine};
pub use writer::RoutineWriter;
