//! Filtered query assembly
//!
//! Builds a parameterized predicate clause on top of a base join query. The
//! base query must already join `devices` and `logger_applications` under
//! their table names, since the device and logger application predicates are
//! qualified with them.

use rusqlite::{params_from_iter, Connection, Row, Statement};

use crate::error::{ActivityLoggerError, Result};
use crate::schema::{devices, logger_applications};

/// Time bounds compare at millisecond precision, matching the stored format
const MILLIS: &str = "'%Y-%m-%dT%H:%M:%fZ'";

/// Optional caller supplied filter values.
///
/// Empty strings are treated the same as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilters {
    /// Exact device name
    pub device_name: Option<String>,
    /// Exact logger application name
    pub logger_application_name: Option<String>,
    /// Inclusive lower bound for the start time column
    pub start_time: Option<String>,
    /// Inclusive upper bound for the end time column
    pub end_time: Option<String>,
}

impl QueryFilters {
    /// Create an empty filter set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by device name
    #[must_use]
    pub fn device(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    /// Filter by logger application name
    #[must_use]
    pub fn logger_application(mut self, name: impl Into<String>) -> Self {
        self.logger_application_name = Some(name.into());
        self
    }

    /// Filter on a start time lower bound
    #[must_use]
    pub fn starting_at(mut self, time: impl Into<String>) -> Self {
        self.start_time = Some(time.into());
        self
    }

    /// Filter on an end time upper bound
    #[must_use]
    pub fn ending_at(mut self, time: impl Into<String>) -> Self {
        self.end_time = Some(time.into());
        self
    }

    /// True if no filter value is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [&self.device_name, &self.logger_application_name, &self.start_time, &self.end_time]
            .into_iter()
            .all(|value| present(value.as_deref()).is_none())
    }
}

/// A SQL text with its positional parameters in binding order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredQuery {
    sql: String,
    params: Vec<String>,
}

impl FilteredQuery {
    /// Append the present filters to `base_query`.
    ///
    /// Fragments are appended in a fixed order (device, logger application,
    /// start time, end time). The first one is introduced with `WHERE`, the
    /// rest with `AND`. Every value becomes a bound parameter.
    pub fn build(
        base_query: &str,
        device_name: Option<&str>,
        logger_application_name: Option<&str>,
        start_time_column: &str,
        start_time: Option<&str>,
        end_time_column: &str,
        end_time: Option<&str>,
    ) -> Result<Self> {
        if base_query.trim().is_empty() {
            return Err(ActivityLoggerError::Validation("base query must not be empty".to_string()));
        }

        let mut query = Self {
            sql: base_query.to_string(),
            params: Vec::new(),
        };

        if let Some(name) = present(device_name) {
            query.push(&format!("{}.{} = ?", devices::TABLE, devices::NAME), name);
        }
        if let Some(name) = present(logger_application_name) {
            query.push(
                &format!("{}.{} = ?", logger_applications::TABLE, logger_applications::NAME),
                name,
            );
        }
        if let Some(start) = present(start_time) {
            query.push(
                &format!("strftime({MILLIS}, ?) <= strftime({MILLIS}, {start_time_column})"),
                start,
            );
        }
        if let Some(end) = present(end_time) {
            query.push(&format!("strftime({MILLIS}, {end_time_column}) <= strftime({MILLIS}, ?)"), end);
        }

        Ok(query)
    }

    /// Apply a [`QueryFilters`] bundle to `base_query`
    pub fn from_filters(
        base_query: &str,
        filters: &QueryFilters,
        start_time_column: &str,
        end_time_column: &str,
    ) -> Result<Self> {
        Self::build(
            base_query,
            filters.device_name.as_deref(),
            filters.logger_application_name.as_deref(),
            start_time_column,
            filters.start_time.as_deref(),
            end_time_column,
            filters.end_time.as_deref(),
        )
    }

    /// Append a trailing clause such as `ORDER BY`
    #[must_use]
    pub fn then(mut self, suffix: &str) -> Self {
        self.sql.push(' ');
        self.sql.push_str(suffix);
        self
    }

    /// The assembled SQL text
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameters in binding order
    #[must_use]
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Prepare the statement and map every row with `f`
    pub fn query_map<T, F>(&self, conn: &Connection, f: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let mut stmt: Statement<'_> = conn.prepare(&self.sql)?;
        let rows = stmt
            .query_map(params_from_iter(self.params.iter()), f)?
            .collect::<rusqlite::Result<Vec<T>>>()?;
        Ok(rows)
    }

    fn push(&mut self, fragment: &str, value: &str) {
        let keyword = if self.params.is_empty() { "WHERE" } else { "AND" };
        self.sql.push_str(&format!(" {keyword} {fragment}"));
        self.params.push(value.to_string());
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
