//! Routine classes, unique per type, name and owning device.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::error::Result;
use crate::filter::{FilteredQuery, QueryFilters};
use crate::models::{RoutineClass, RoutineType};
use crate::schema::routine_classes;

const CLASS_QUERY: &str = r"
SELECT rc.id, rc.routine_type_id, rc.routine_class_name, devices.device_id, devices.device_name
FROM routine_classes AS rc
INNER JOIN devices ON rc.owner_device_id_fk = devices.device_id";

fn map_routine_class(row: &Row<'_>) -> rusqlite::Result<RoutineClass> {
    Ok(RoutineClass {
        id: row.get(0)?,
        routine_type_id: row.get(1)?,
        routine_class_name: row.get(2)?,
        device_id: row.get(3)?,
        device_name: row.get(4)?,
    })
}

/// Whether the class exists for this device
pub fn has(conn: &Connection, routine_type: RoutineType, name: &str, device_id: i64) -> Result<bool> {
    let exists = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1 AND {} = ?2 AND {} = ?3)",
            routine_classes::TABLE,
            routine_classes::TYPE_ID,
            routine_classes::NAME,
            routine_classes::OWNER_DEVICE_ID
        ),
        params![routine_type, name, device_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Insert a class. An existing `(type, name, device)` key is a conflict.
pub fn insert(conn: &Connection, routine_type: RoutineType, name: &str, device_id: i64) -> Result<i64> {
    conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}, {}) VALUES (?1, ?2, ?3)",
            routine_classes::TABLE,
            routine_classes::TYPE_ID,
            routine_classes::NAME,
            routine_classes::OWNER_DEVICE_ID
        ),
        params![routine_type, name, device_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Look up a class by its full key
pub fn find(
    conn: &Connection,
    routine_type: RoutineType,
    name: &str,
    device_id: i64,
) -> Result<Option<RoutineClass>> {
    let found = conn
        .query_row(
            &format!(
                "{CLASS_QUERY} WHERE rc.routine_type_id = ?1 AND rc.routine_class_name = ?2 \
                 AND rc.owner_device_id_fk = ?3"
            ),
            params![routine_type, name, device_id],
            map_routine_class,
        )
        .optional()?;
    Ok(found)
}

/// Look up a class by id
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<RoutineClass>> {
    let found = conn
        .query_row(&format!("{CLASS_QUERY} WHERE rc.id = ?1"), params![id], map_routine_class)
        .optional()?;
    Ok(found)
}

/// Resolve a class id by `(type, name, owner)`, creating it if absent.
pub fn find_or_create(conn: &Connection, routine_type: RoutineType, name: &str, device_id: i64) -> Result<i64> {
    let inserted = conn.execute(
        &format!(
            "INSERT INTO {table} ({ty}, {name}, {owner}) VALUES (?1, ?2, ?3) \
             ON CONFLICT({ty}, {name}, {owner}) DO NOTHING",
            table = routine_classes::TABLE,
            ty = routine_classes::TYPE_ID,
            name = routine_classes::NAME,
            owner = routine_classes::OWNER_DEVICE_ID
        ),
        params![routine_type, name, device_id],
    )?;
    if inserted > 0 {
        debug!(routine_class = name, %routine_type, device_id, "Created routine class");
    }

    let id = conn.query_row(
        &format!(
            "SELECT {} FROM {} WHERE {} = ?1 AND {} = ?2 AND {} = ?3",
            routine_classes::ID,
            routine_classes::TABLE,
            routine_classes::TYPE_ID,
            routine_classes::NAME,
            routine_classes::OWNER_DEVICE_ID
        ),
        params![routine_type, name, device_id],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Every class of one routine type, across devices.
pub fn get_by_type(conn: &Connection, routine_type: RoutineType) -> Result<Vec<RoutineClass>> {
    let mut stmt = conn.prepare(&format!("{CLASS_QUERY} WHERE rc.routine_type_id = ?1 ORDER BY rc.id"))?;
    let found = stmt
        .query_map(params![routine_type], map_routine_class)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(found)
}

/// Delete a class by id
pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute(
        &format!("DELETE FROM {} WHERE {} = ?1", routine_classes::TABLE, routine_classes::ID),
        params![id],
    )?;
    Ok(deleted > 0)
}

/// List classes ordered by id. Only the device name filter applies.
pub fn get_all(conn: &Connection, filters: &QueryFilters) -> Result<Vec<RoutineClass>> {
    let query = FilteredQuery::build(
        CLASS_QUERY,
        filters.device_name.as_deref(),
        None,
        "",
        None,
        "",
        None,
    )?
    .then("ORDER BY rc.id");
    query.query_map(conn, map_routine_class)
}
