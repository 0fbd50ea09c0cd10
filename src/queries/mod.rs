//! Per-entity store operations.
//!
//! Every function takes the connection (or a transaction, which derefs to
//! one) explicitly, so a caller can run several of them atomically.

pub mod applications;
pub mod country_codes;
pub mod devices;
pub mod logger_applications;
pub mod raw_measurements;
pub mod routine_classes;
pub mod user_routines;
