//! Raw activity snapshots and the applications reported with them.

use rusqlite::{params, Connection, Row};

use crate::error::Result;
use crate::filter::{FilteredQuery, QueryFilters};
use crate::hydrator::{self, Aggregate, RepeatingRow};
use crate::models::{GpsData, MeasuredApplication, RawMeasurement};
use crate::schema::{measurement_applications, raw_measurements};

// devices and logger_applications stay unaliased for the filter predicates.
const MEASUREMENT_QUERY: &str = r"
SELECT rm.measurement_id, rm.measurement_timestamp, rm.latitude, rm.longitude, rm.cell_id,
       logger_applications.logger_application_name, devices.device_name,
       a.application_id, a.application_name, a.package_class_name, ma.launch_time
FROM raw_measurements AS rm
INNER JOIN devices ON rm.device_id_fk = devices.device_id
INNER JOIN logger_applications ON rm.logger_application_id_fk = logger_applications.logger_application_id
LEFT JOIN measurement_applications AS ma ON ma.measurement_id_fk = rm.measurement_id
LEFT JOIN application AS a ON ma.application_id_fk = a.application_id";

const ORDERING: &str = "ORDER BY rm.measurement_id, ma.rowid";

struct MeasurementRow {
    measurement: RawMeasurement,
    application: Option<MeasuredApplication>,
}

impl RepeatingRow for MeasurementRow {
    type Head = RawMeasurement;
    type Child = MeasuredApplication;

    fn split(self) -> (RawMeasurement, Option<MeasuredApplication>) {
        (self.measurement, self.application)
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<MeasurementRow> {
    let gps = GpsData::from_columns(row.get(2)?, row.get(3)?);
    let application = match row.get::<_, Option<i64>>(7)? {
        Some(application_id) => Some(MeasuredApplication {
            application_id,
            application_name: row.get(8)?,
            package_class_name: row.get(9)?,
            launch_time: row.get(10)?,
        }),
        None => None,
    };
    Ok(MeasurementRow {
        measurement: RawMeasurement {
            measurement_id: row.get(0)?,
            measurement_timestamp: row.get(1)?,
            latitude: gps.map(|g| g.latitude),
            longitude: gps.map(|g| g.longitude),
            cell_id: row.get(4)?,
            logger_application_name: row.get(5)?,
            device_name: row.get(6)?,
            applications: Vec::new(),
        },
        application,
    })
}

fn assemble(aggregate: Aggregate<RawMeasurement, MeasuredApplication>) -> RawMeasurement {
    RawMeasurement {
        applications: aggregate.children,
        ..aggregate.head
    }
}

/// Whether a snapshot with this id exists
pub fn has(conn: &Connection, id: i64) -> Result<bool> {
    let exists = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
            raw_measurements::TABLE,
            raw_measurements::ID
        ),
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Insert a snapshot. The timestamp is assigned by the database; a missing
/// GPS fix is stored as the out-of-range sentinel.
pub fn insert(
    conn: &Connection,
    device_id: i64,
    logger_application_id: i64,
    cell_id: i32,
    gps: Option<GpsData>,
) -> Result<i64> {
    let (latitude, longitude) = GpsData::to_columns(gps);
    conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5)",
            raw_measurements::TABLE,
            raw_measurements::LATITUDE,
            raw_measurements::LONGITUDE,
            raw_measurements::CELL_ID,
            raw_measurements::LOGGER_APPLICATION_ID,
            raw_measurements::DEVICE_ID
        ),
        params![latitude, longitude, cell_id, logger_application_id, device_id],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Link an application that was running when the snapshot was taken.
pub fn add_application(
    conn: &Connection,
    measurement_id: i64,
    application_id: i64,
    launch_time: Option<&str>,
) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}, {}) VALUES (?1, ?2, ?3)",
            measurement_applications::TABLE,
            measurement_applications::MEASUREMENT_ID,
            measurement_applications::APPLICATION_ID,
            measurement_applications::LAUNCH_TIME
        ),
        params![measurement_id, application_id, launch_time],
    )?;
    Ok(())
}

/// Read one snapshot with its applications
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<RawMeasurement>> {
    let mut stmt = conn.prepare(&format!("{MEASUREMENT_QUERY} WHERE rm.measurement_id = ?1 {ORDERING}"))?;
    let rows = stmt.query_map(params![id], map_row)?;
    let first = hydrator::try_hydrate_first(rows)?;
    Ok(first.map(assemble))
}

/// Delete a snapshot and its application links. Fails while user routines
/// still reference it.
pub fn delete(conn: &Connection, id: i64) -> Result<bool> {
    conn.execute(
        &format!(
            "DELETE FROM {} WHERE {} = ?1",
            measurement_applications::TABLE,
            measurement_applications::MEASUREMENT_ID
        ),
        params![id],
    )?;
    let deleted = conn.execute(
        &format!("DELETE FROM {} WHERE {} = ?1", raw_measurements::TABLE, raw_measurements::ID),
        params![id],
    )?;
    Ok(deleted > 0)
}

/// List snapshots with their applications. Time filters apply to the
/// insertion timestamp.
pub fn get_all(conn: &Connection, filters: &QueryFilters) -> Result<Vec<RawMeasurement>> {
    let column = format!("rm.{}", raw_measurements::TIMESTAMP);
    let query = FilteredQuery::from_filters(MEASUREMENT_QUERY, filters, &column, &column)?.then(ORDERING);
    let rows = query.query_map(conn, map_row)?;
    Ok(hydrator::hydrate(rows).into_iter().map(assemble).collect())
}
