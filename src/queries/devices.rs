//! Devices, identified by their hashed name.

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::filter::{FilteredQuery, QueryFilters};
use crate::models::{Device, NewDevice};
use crate::schema::devices;

fn select_columns() -> String {
    format!(
        "SELECT {}, {}, {}, {}, {} FROM {}",
        devices::ID,
        devices::NAME,
        devices::PLATFORM,
        devices::CREATED,
        devices::COUNTRY_CODE,
        devices::TABLE
    )
}

fn map_device(row: &Row<'_>) -> rusqlite::Result<Device> {
    Ok(Device {
        device_id: row.get(0)?,
        device_name: row.get(1)?,
        platform: row.get(2)?,
        device_timestamp: row.get(3)?,
        country_code: row.get(4)?,
    })
}

/// Whether a device with this name exists
pub fn has(conn: &Connection, name: &str) -> Result<bool> {
    let exists = conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)", devices::TABLE, devices::NAME),
        params![name],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Insert a device. An existing name surfaces as a conflict.
pub fn insert(conn: &Connection, device: &NewDevice) -> Result<i64> {
    conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}, {}) VALUES (?1, ?2, ?3)",
            devices::TABLE,
            devices::NAME,
            devices::PLATFORM,
            devices::COUNTRY_CODE
        ),
        params![device.device_name, device.platform, device.country_code],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Look up a device by name
pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Device>> {
    let device = conn
        .query_row(
            &format!("{} WHERE {} = ?1", select_columns(), devices::NAME),
            params![name],
            map_device,
        )
        .optional()?;
    Ok(device)
}

/// Look up a device by id
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Device>> {
    let device = conn
        .query_row(
            &format!("{} WHERE {} = ?1", select_columns(), devices::ID),
            params![id],
            map_device,
        )
        .optional()?;
    Ok(device)
}

/// Resolve a device id by name, creating the device with placeholder
/// platform and country code when it does not exist yet.
pub fn find_or_create(conn: &Connection, name: &str, defaults: &StoreConfig) -> Result<i64> {
    let inserted = conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}, {}) VALUES (?1, ?2, ?3) ON CONFLICT({}) DO NOTHING",
            devices::TABLE,
            devices::NAME,
            devices::PLATFORM,
            devices::COUNTRY_CODE,
            devices::NAME
        ),
        params![name, defaults.default_platform, defaults.default_country_code],
    )?;
    if inserted > 0 {
        debug!(device = name, "Created device");
    }

    let id = conn.query_row(
        &format!("SELECT {} FROM {} WHERE {} = ?1", devices::ID, devices::TABLE, devices::NAME),
        params![name],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Delete a device by name. Fails if measurements or routine classes still
/// reference it.
pub fn delete(conn: &Connection, name: &str) -> Result<bool> {
    let deleted = conn.execute(
        &format!("DELETE FROM {} WHERE {} = ?1", devices::TABLE, devices::NAME),
        params![name],
    )?;
    Ok(deleted > 0)
}

/// List devices ordered by id. Only the device name and creation time
/// filters apply; the logger application filter is ignored.
pub fn get_all(conn: &Connection, filters: &QueryFilters) -> Result<Vec<Device>> {
    let filters = QueryFilters {
        logger_application_name: None,
        ..filters.clone()
    };
    let query = FilteredQuery::from_filters(&select_columns(), &filters, devices::CREATED, devices::CREATED)?
        .then(&format!("ORDER BY {}", devices::ID));
    query.query_map(conn, map_device)
}
