//! Installed applications, keyed by display name and package class.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::Result;
use crate::models::Application;
use crate::schema::application;

fn map_application(row: &Row<'_>) -> rusqlite::Result<Application> {
    Ok(Application {
        application_id: row.get(0)?,
        application_name: row.get(1)?,
        package_class_name: row.get(2)?,
    })
}

fn select_columns() -> String {
    format!(
        "SELECT {}, {}, {} FROM {}",
        application::ID,
        application::NAME,
        application::PACKAGE_CLASS_NAME,
        application::TABLE
    )
}

/// Whether the `(name, package)` pair is stored
pub fn has(conn: &Connection, name: &str, package_class_name: &str) -> Result<bool> {
    let exists = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1 AND {} = ?2)",
            application::TABLE,
            application::NAME,
            application::PACKAGE_CLASS_NAME
        ),
        params![name, package_class_name],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Insert an application. An existing `(name, package)` pair is a conflict.
pub fn insert(conn: &Connection, name: &str, package_class_name: &str) -> Result<i64> {
    conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}) VALUES (?1, ?2)",
            application::TABLE,
            application::NAME,
            application::PACKAGE_CLASS_NAME
        ),
        params![name, package_class_name],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Look up an application by its full key
pub fn find(conn: &Connection, name: &str, package_class_name: &str) -> Result<Option<Application>> {
    let found = conn
        .query_row(
            &format!(
                "{} WHERE {} = ?1 AND {} = ?2",
                select_columns(),
                application::NAME,
                application::PACKAGE_CLASS_NAME
            ),
            params![name, package_class_name],
            map_application,
        )
        .optional()?;
    Ok(found)
}

/// All applications sharing a display name, regardless of package.
pub fn find_by_name(conn: &Connection, name: &str) -> Result<Vec<Application>> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE {} = ?1 ORDER BY {}",
        select_columns(),
        application::NAME,
        application::ID
    ))?;
    let found = stmt
        .query_map(params![name], map_application)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(found)
}

/// Look up an application by id
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Application>> {
    let found = conn
        .query_row(
            &format!("{} WHERE {} = ?1", select_columns(), application::ID),
            params![id],
            map_application,
        )
        .optional()?;
    Ok(found)
}

/// Resolve an application id, creating the row if it does not exist yet.
pub fn find_or_create(conn: &Connection, name: &str, package_class_name: &str) -> Result<i64> {
    let inserted = conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}) VALUES (?1, ?2) ON CONFLICT({}, {}) DO NOTHING",
            application::TABLE,
            application::NAME,
            application::PACKAGE_CLASS_NAME,
            application::NAME,
            application::PACKAGE_CLASS_NAME
        ),
        params![name, package_class_name],
    )?;
    if inserted > 0 {
        debug!(application = name, package_class_name, "Created application");
    }

    let id = conn.query_row(
        &format!(
            "SELECT {} FROM {} WHERE {} = ?1 AND {} = ?2",
            application::ID,
            application::TABLE,
            application::NAME,
            application::PACKAGE_CLASS_NAME
        ),
        params![name, package_class_name],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Delete an application. Returns false when nothing matched.
pub fn delete(conn: &Connection, name: &str, package_class_name: &str) -> Result<bool> {
    let deleted = conn.execute(
        &format!(
            "DELETE FROM {} WHERE {} = ?1 AND {} = ?2",
            application::TABLE,
            application::NAME,
            application::PACKAGE_CLASS_NAME
        ),
        params![name, package_class_name],
    )?;
    Ok(deleted > 0)
}

/// List every application ordered by id
pub fn get_all(conn: &Connection) -> Result<Vec<Application>> {
    let mut stmt = conn.prepare(&format!("{} ORDER BY {}", select_columns(), application::ID))?;
    let found = stmt
        .query_map([], map_application)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(found)
}
