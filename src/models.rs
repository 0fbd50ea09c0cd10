//! Data models for devices, measurements and routines
//!
//! This module contains the domain records returned by the store, the
//! aggregates rebuilt by the hydrator and the payload shapes posted by
//! clients. Field names serialize in camelCase to match the client payloads.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::schema::GPS_NOT_AVAILABLE;

/// Informative classification of a routine class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum RoutineType {
    /// Location routine
    Location,
    /// Application usage routine
    Application,
    /// Combined location and application routine
    Combination,
}

impl RoutineType {
    /// Numeric id stored in `routine_classes.routine_type_id`
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::Location => 0,
            Self::Application => 1,
            Self::Combination => 2,
        }
    }
}

impl TryFrom<i64> for RoutineType {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Location),
            1 => Ok(Self::Application),
            2 => Ok(Self::Combination),
            other => Err(format!("unknown routine type id {other}, expected 0, 1 or 2")),
        }
    }
}

impl From<RoutineType> for i64 {
    fn from(value: RoutineType) -> Self {
        value.id()
    }
}

impl fmt::Display for RoutineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Location => "location",
            Self::Application => "application",
            Self::Combination => "combination",
        };
        f.write_str(name)
    }
}

impl ToSql for RoutineType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.id()))
    }
}

impl FromSql for RoutineType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let id = value.as_i64()?;
        Self::try_from(id).map_err(|_| FromSqlError::OutOfRange(id))
    }
}

/// A device (user) known to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Database primary key
    pub device_id: i64,
    /// Unique device name, usually a SHA1 hash
    pub device_name: String,
    /// Platform description
    pub platform: String,
    /// Creation timestamp (UTC, ISO 8601)
    pub device_timestamp: String,
    /// Mobile country code
    pub country_code: i32,
}

/// Data for creating a new device
#[derive(Debug, Clone)]
pub struct NewDevice {
    /// Unique device name
    pub device_name: String,
    /// Platform description
    pub platform: String,
    /// Mobile country code
    pub country_code: i32,
}

/// A logging context on the client side
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerApplication {
    /// Database primary key
    pub logger_application_id: i64,
    /// Unique logger application name
    pub logger_application_name: String,
}

/// An application referenced by a routine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    /// Database primary key, ignored on input
    #[serde(default)]
    pub application_id: i64,
    /// Display name
    pub application_name: String,
    /// Package or class name
    pub package_class_name: String,
}

/// An application that was running when a raw measurement was taken
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasuredApplication {
    /// Database primary key of the application
    pub application_id: i64,
    /// Display name
    pub application_name: String,
    /// Package or class name
    pub package_class_name: String,
    /// Launch time reported by the client
    pub launch_time: Option<String>,
}

/// A GPS fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsData {
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
}

impl GpsData {
    /// Rebuild a fix from stored columns, `None` when the sentinel was stored
    #[must_use]
    pub fn from_columns(latitude: f64, longitude: f64) -> Option<Self> {
        #[allow(clippy::float_cmp)]
        let missing = latitude == GPS_NOT_AVAILABLE || longitude == GPS_NOT_AVAILABLE;
        (!missing).then_some(Self { latitude, longitude })
    }

    /// Split an optional fix into storable columns
    #[must_use]
    pub fn to_columns(gps: Option<Self>) -> (f64, f64) {
        gps.map_or((GPS_NOT_AVAILABLE, GPS_NOT_AVAILABLE), |g| (g.latitude, g.longitude))
    }
}

/// A stored activity snapshot with its context and running applications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMeasurement {
    /// Database primary key
    pub measurement_id: i64,
    /// Insertion timestamp assigned by the store
    pub measurement_timestamp: String,
    /// Latitude, `None` when no fix was available
    pub latitude: Option<f64>,
    /// Longitude, `None` when no fix was available
    pub longitude: Option<f64>,
    /// Cell identifier
    pub cell_id: i32,
    /// Logging context name
    pub logger_application_name: String,
    /// Device name
    pub device_name: String,
    /// Applications reported with the snapshot
    #[serde(default)]
    pub applications: Vec<MeasuredApplication>,
}

/// A device-specific named routine class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineClass {
    /// Database primary key
    pub id: i64,
    /// Routine type
    pub routine_type_id: RoutineType,
    /// Class name
    pub routine_class_name: String,
    /// Owner device id
    pub device_id: i64,
    /// Owner device name
    pub device_name: String,
}

/// A recognized routine, both as submitted by clients and as read back.
///
/// On input `user_routines_id`, `routine_class_id`, `raw_measurement_id` and
/// the application ids are ignored; the store assigns them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRoutine {
    /// Canonical id (the first physical row of the routine)
    #[serde(default)]
    pub user_routines_id: i64,
    /// Routine start (ISO 8601)
    pub start_time: String,
    /// Routine end (ISO 8601)
    pub end_time: String,
    /// Routine class id
    #[serde(default)]
    pub routine_class_id: i64,
    /// Raw measurement holding the routine's context
    #[serde(default)]
    pub raw_measurement_id: i64,
    /// Recognition confidence between 0.0 and 1.0
    pub confidence: f64,
    /// Applications used during the routine
    #[serde(default)]
    pub application: Vec<Application>,
    /// Routine type
    pub routine_type_id: RoutineType,
    /// Routine class name
    pub routine_class_name: String,
    /// Latitude, `None` when unknown
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude, `None` when unknown
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Cell identifier
    #[serde(default = "unknown_cell")]
    pub cell_id: i32,
    /// Device name
    pub device_name: String,
    /// Logging context name
    pub logger_application_name: String,
}

impl UserRoutine {
    /// GPS fix of the routine, if both coordinates are known
    #[must_use]
    pub fn gps(&self) -> Option<GpsData> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(GpsData { latitude, longitude }),
            _ => None,
        }
    }
}

/// An application entry in a raw snapshot payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedApplication {
    /// Display name
    pub name: String,
    /// Package or class name
    pub class_name: String,
    /// Launch time as reported by the client
    #[serde(default)]
    pub launch_time: Option<String>,
}

/// A periodic activity snapshot posted by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLogData {
    /// Client side capture time (epoch millis)
    #[serde(default = "unknown_timestamp")]
    pub timestamp: i64,
    /// Client side capture time as text
    #[serde(default)]
    pub time_string_presentation: String,
    /// Cell identifier
    #[serde(default = "unknown_cell")]
    pub cell_id: i32,
    /// Running applications
    #[serde(default)]
    pub apps: Vec<LoggedApplication>,
    /// GPS fix, when available
    #[serde(default)]
    pub gps_data: Option<GpsData>,
}

const fn unknown_cell() -> i32 {
    -1
}

const fn unknown_timestamp() -> i64 {
    -1
}

/// A mobile country code entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryCode {
    /// Mobile country code
    pub code: i32,
    /// Two letter abbreviation
    pub abbreviation: String,
    /// Country name
    pub name: String,
}
