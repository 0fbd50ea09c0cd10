//! Recognized user routines.
//!
//! A routine with N applications is stored as N rows sharing everything but
//! the application reference. A routine without applications is one row with
//! a NULL application. Reads join the six tables and fold the rows back with
//! the hydrator.

use rusqlite::{params, Connection, Row};

use crate::error::Result;
use crate::filter::{FilteredQuery, QueryFilters};
use crate::hydrator::{self, Aggregate, RepeatingRow};
use crate::models::{Application, GpsData, UserRoutine};
use crate::schema::user_routines;

// devices and logger_applications stay unaliased for the filter predicates.
const ROUTINE_QUERY: &str = r"
SELECT ur.user_routines_id, ur.start_time, ur.end_time, ur.routine_class_id_fk,
       ur.application_id_fk, ur.raw_measurement_id_fk, ur.confidence,
       a.application_name, a.package_class_name,
       rc.routine_type_id, rc.routine_class_name,
       rm.latitude, rm.longitude, rm.cell_id,
       devices.device_name, logger_applications.logger_application_name
FROM user_routines AS ur
LEFT JOIN application AS a ON ur.application_id_fk = a.application_id
INNER JOIN routine_classes AS rc ON ur.routine_class_id_fk = rc.id
INNER JOIN raw_measurements AS rm ON ur.raw_measurement_id_fk = rm.measurement_id
INNER JOIN devices ON rm.device_id_fk = devices.device_id
INNER JOIN logger_applications ON rm.logger_application_id_fk = logger_applications.logger_application_id";

const ORDERING: &str = "ORDER BY ur.user_routines_id";

/// Column values for one physical user routine row
#[derive(Debug, Clone, PartialEq)]
pub struct NewUserRoutine<'a> {
    /// Routine start
    pub start_time: &'a str,
    /// Routine end
    pub end_time: &'a str,
    /// Routine class id
    pub routine_class_id: i64,
    /// Application id, `None` for a routine without applications
    pub application_id: Option<i64>,
    /// Raw measurement id
    pub raw_measurement_id: i64,
    /// Recognition confidence
    pub confidence: f64,
}

/// The shared part of a routine's rows. The first row's id is kept as the
/// routine id but does not take part in the comparison.
struct RoutineHead(UserRoutine);

impl PartialEq for RoutineHead {
    #[allow(clippy::float_cmp)]
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (&self.0, &other.0);
        a.raw_measurement_id == b.raw_measurement_id
            && a.routine_class_id == b.routine_class_id
            && a.start_time == b.start_time
            && a.end_time == b.end_time
            && a.confidence == b.confidence
    }
}

struct RoutineRow {
    head: RoutineHead,
    application: Option<Application>,
}

impl RepeatingRow for RoutineRow {
    type Head = RoutineHead;
    type Child = Application;

    fn split(self) -> (RoutineHead, Option<Application>) {
        (self.head, self.application)
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<RoutineRow> {
    let application = match row.get::<_, Option<i64>>(4)? {
        Some(application_id) => Some(Application {
            application_id,
            application_name: row.get(7)?,
            package_class_name: row.get(8)?,
        }),
        None => None,
    };
    let gps = GpsData::from_columns(row.get(11)?, row.get(12)?);
    let routine = UserRoutine {
        user_routines_id: row.get(0)?,
        start_time: row.get(1)?,
        end_time: row.get(2)?,
        routine_class_id: row.get(3)?,
        raw_measurement_id: row.get(5)?,
        confidence: row.get(6)?,
        application: Vec::new(),
        routine_type_id: row.get(9)?,
        routine_class_name: row.get(10)?,
        latitude: gps.map(|g| g.latitude),
        longitude: gps.map(|g| g.longitude),
        cell_id: row.get(13)?,
        device_name: row.get(14)?,
        logger_application_name: row.get(15)?,
    };
    Ok(RoutineRow {
        head: RoutineHead(routine),
        application,
    })
}

fn assemble(aggregate: Aggregate<RoutineHead, Application>) -> UserRoutine {
    UserRoutine {
        application: aggregate.children,
        ..aggregate.head.0
    }
}

/// Whether a routine row with this id exists
pub fn has(conn: &Connection, id: i64) -> Result<bool> {
    let exists = conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1)",
            user_routines::TABLE,
            user_routines::ID
        ),
        params![id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

/// Insert one physical routine row and return its id.
pub fn insert(conn: &Connection, routine: &NewUserRoutine<'_>) -> Result<i64> {
    conn.execute(
        &format!(
            "INSERT INTO {} ({}, {}, {}, {}, {}, {}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            user_routines::TABLE,
            user_routines::START_TIME,
            user_routines::END_TIME,
            user_routines::ROUTINE_CLASS_ID,
            user_routines::APPLICATION_ID,
            user_routines::RAW_MEASUREMENT_ID,
            user_routines::CONFIDENCE
        ),
        params![
            routine.start_time,
            routine.end_time,
            routine.routine_class_id,
            routine.application_id,
            routine.raw_measurement_id,
            routine.confidence
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Read the routine starting at `id`.
///
/// Rows are scanned forward from `id` but only within the raw measurement
/// of that row, so a neighbouring routine can never be merged in. Reading
/// stops at the first row that does not belong to the routine.
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<UserRoutine>> {
    let mut stmt = conn.prepare(&format!(
        "{ROUTINE_QUERY} WHERE ur.user_routines_id >= ?1 AND ur.raw_measurement_id_fk = \
         (SELECT raw_measurement_id_fk FROM user_routines WHERE user_routines_id = ?1) {ORDERING}"
    ))?;
    let rows = stmt.query_map(params![id], map_row)?;
    let first = hydrator::try_hydrate_first(rows)?;
    Ok(first.map(assemble))
}

/// Delete every row of the routine starting at `id`.
pub fn delete(conn: &Connection, id: i64) -> Result<usize> {
    let deleted = conn.execute(
        &format!(
            "DELETE FROM {table} WHERE {id_col} >= ?1 AND {raw} = \
             (SELECT {raw} FROM {table} WHERE {id_col} = ?1)",
            table = user_routines::TABLE,
            id_col = user_routines::ID,
            raw = user_routines::RAW_MEASUREMENT_ID
        ),
        params![id],
    )?;
    Ok(deleted)
}

/// List routines matching `filters`, one aggregate per logical routine.
/// Time filters apply to the routine's start and end times.
pub fn get_all(conn: &Connection, filters: &QueryFilters) -> Result<Vec<UserRoutine>> {
    let start = format!("ur.{}", user_routines::START_TIME);
    let end = format!("ur.{}", user_routines::END_TIME);
    let query = FilteredQuery::from_filters(ROUTINE_QUERY, filters, &start, &end)?.then(ORDERING);
    let rows = query.query_map(conn, map_row)?;
    Ok(hydrator::hydrate(rows).into_iter().map(assemble).collect())
}
