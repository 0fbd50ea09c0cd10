use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

use crate::error::{ActivityLoggerError, Result};
use crate::filter::QueryFilters;
use crate::models::{Application, GpsData, LoggedApplication, RawLogData, UserRoutine};

/// Longest accepted name for devices, classes and applications
pub const MAX_NAME_LENGTH: usize = 255;

/// Format of every timestamp written to the store
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

fn invalid(message: impl Into<String>) -> ActivityLoggerError {
    ActivityLoggerError::Validation(message.into())
}

/// Validation utilities for incoming payloads and query parameters
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate a device, logger application, class or application name
    pub fn validate_name(field: &str, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(invalid(format!("{field} cannot be empty")));
        }

        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(invalid(format!("{field} too long (max {MAX_NAME_LENGTH} characters)")));
        }

        if name.contains('\0') || name.contains('\r') || name.contains('\n') {
            return Err(invalid(format!("{field} contains invalid characters")));
        }

        Ok(())
    }

    /// Parse a client timestamp and return it as UTC text.
    ///
    /// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.f]` with an optional `+HH`
    /// or `+HH:MM` offset, and plain dates. Values without an offset are
    /// taken as UTC.
    pub fn normalize_timestamp(field: &str, value: &str) -> Result<String> {
        Self::parse_timestamp(value)
            .map(|time| time.format(TIMESTAMP_FORMAT).to_string())
            .ok_or_else(|| invalid(format!("{field} is not a valid timestamp: {value:?}")))
    }

    fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if let Ok(time) = DateTime::parse_from_rfc3339(value) {
            return Some(time.with_timezone(&Utc));
        }
        for format in OFFSET_FORMATS {
            if let Ok(time) = DateTime::<FixedOffset>::parse_from_str(value, format) {
                return Some(time.with_timezone(&Utc));
            }
        }
        for format in NAIVE_FORMATS {
            if let Ok(time) = NaiveDateTime::parse_from_str(value, format) {
                return Some(time.and_utc());
            }
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|time| time.and_utc())
    }

    /// Validate a recognition confidence
    pub fn validate_confidence(confidence: f64) -> Result<()> {
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(invalid(format!("confidence must be between 0.0 and 1.0, got {confidence}")));
        }
        Ok(())
    }

    /// Validate a GPS fix
    pub fn validate_gps(gps: &GpsData) -> Result<()> {
        if !(-90.0..=90.0).contains(&gps.latitude) {
            return Err(invalid(format!("latitude out of range: {}", gps.latitude)));
        }
        if !(-180.0..=180.0).contains(&gps.longitude) {
            return Err(invalid(format!("longitude out of range: {}", gps.longitude)));
        }
        Ok(())
    }

    fn validate_application(application: &Application) -> Result<()> {
        Self::validate_name("applicationName", &application.application_name)?;
        if application.package_class_name.chars().count() > MAX_NAME_LENGTH {
            return Err(invalid("packageClassName too long"));
        }
        Ok(())
    }

    fn validate_logged_application(application: &LoggedApplication) -> Result<()> {
        Self::validate_name("app name", &application.name)?;
        if application.class_name.chars().count() > MAX_NAME_LENGTH {
            return Err(invalid("app className too long"));
        }
        Ok(())
    }

    /// Validate a submitted routine and return it with normalized timestamps.
    pub fn validate_routine(routine: UserRoutine) -> Result<UserRoutine> {
        Self::validate_name("deviceName", &routine.device_name)?;
        Self::validate_name("loggerApplicationName", &routine.logger_application_name)?;
        Self::validate_name("routineClassName", &routine.routine_class_name)?;
        Self::validate_confidence(routine.confidence)?;

        match (routine.latitude, routine.longitude) {
            (Some(latitude), Some(longitude)) => Self::validate_gps(&GpsData { latitude, longitude })?,
            (None, None) => {},
            _ => return Err(invalid("latitude and longitude must be given together")),
        }

        for application in &routine.application {
            Self::validate_application(application)?;
        }

        let start_time = Self::normalize_timestamp("startTime", &routine.start_time)?;
        let end_time = Self::normalize_timestamp("endTime", &routine.end_time)?;
        if start_time > end_time {
            return Err(invalid("startTime cannot be after endTime"));
        }

        Ok(UserRoutine {
            start_time,
            end_time,
            ..routine
        })
    }

    /// Validate a raw snapshot
    pub fn validate_raw_log(data: &RawLogData) -> Result<()> {
        if let Some(gps) = &data.gps_data {
            Self::validate_gps(gps)?;
        }
        for application in &data.apps {
            Self::validate_logged_application(application)?;
        }
        Ok(())
    }

    /// Normalize the time bounds of a filter set so SQLite can compare them.
    pub fn normalize_filters(filters: &QueryFilters) -> Result<QueryFilters> {
        let normalize = |field: &str, value: &Option<String>| -> Result<Option<String>> {
            match value.as_deref() {
                Some(value) if !value.is_empty() => Self::normalize_timestamp(field, value).map(Some),
                _ => Ok(None),
            }
        };
        Ok(QueryFilters {
            start_time: normalize("start time", &filters.start_time)?,
            end_time: normalize("end time", &filters.end_time)?,
            ..filters.clone()
        })
    }
}
