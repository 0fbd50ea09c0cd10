//! Logger applications that report snapshots.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::Result;
use crate::models::LoggerApplication;
use crate::schema::logger_applications;

fn map_logger_application(row: &Row<'_>) -> rusqlite::Result<LoggerApplication> {
    Ok(LoggerApplication {
        logger_application_id: row.get(0)?,
        logger_application_name: row.get(1)?,
    })
}

fn select_columns() -> String {
    format!(
        "SELECT {}, {} FROM {}",
        logger_applications::ID,
        logger_applications::NAME,
        logger_applications::TABLE
    )
}

/// Whether a logger application with this name exists
pub fn has(conn: &Connection, name: &str) -> Result<bool> {
    let exists = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
            logger_applications::TABLE,
            logger_applications::NAME
        ),
        params![name],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Insert a logger application. An existing name is a conflict.
pub fn insert(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES (?1)",
            logger_applications::TABLE,
            logger_applications::NAME
        ),
        params![name],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Look up a logger application by name
pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<LoggerApplication>> {
    let found = conn
        .query_row(
            &format!("{} WHERE {} = ?1", select_columns(), logger_applications::NAME),
            params![name],
            map_logger_application,
        )
        .optional()?;
    Ok(found)
}

/// Look up a logger application by id
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<LoggerApplication>> {
    let found = conn
        .query_row(
            &format!("{} WHERE {} = ?1", select_columns(), logger_applications::ID),
            params![id],
            map_logger_application,
        )
        .optional()?;
    Ok(found)
}

/// Resolve a logger application id, creating the row if absent.
pub fn find_or_create(conn: &Connection, name: &str) -> Result<i64> {
    let inserted = conn.execute(
        &format!(
            "INSERT INTO {} ({}) VALUES (?1) ON CONFLICT({}) DO NOTHING",
            logger_applications::TABLE,
            logger_applications::NAME,
            logger_applications::NAME
        ),
        params![name],
    )?;
    if inserted > 0 {
        debug!(logger_application = name, "Created logger application");
    }

    let id = conn.query_row(
        &format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            logger_applications::ID,
            logger_applications::TABLE,
            logger_applications::NAME
        ),
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Delete a logger application by name
pub fn delete(conn: &Connection, name: &str) -> Result<bool> {
    let deleted = conn.execute(
        &format!(
            "DELETE FROM {} WHERE {} = ?1",
            logger_applications::TABLE,
            logger_applications::NAME
        ),
        params![name],
    )?;
    Ok(deleted > 0)
}

/// List every logger application ordered by id
pub fn get_all(conn: &Connection) -> Result<Vec<LoggerApplication>> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY {}", select_columns(), logger_applications::ID))?;
    let found = stmt
        .query_map([], map_logger_application)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(found)
}
