//! Database schema definitions
//!
//! This module provides constants for table and column names used with rusqlite.
//! The DDL itself lives in `migrations/`.

/// Latitude/longitude stored when a measurement carries no GPS fix.
pub const GPS_NOT_AVAILABLE: f64 = -1000.0;

/// Devices table schema
pub mod devices {
    /// Table name
    pub const TABLE: &str = "devices";
    /// Primary key column
    pub const ID: &str = "device_id";
    /// Unique device name (usually a SHA1 hash)
    pub const NAME: &str = "device_name";
    /// Platform description column
    pub const PLATFORM: &str = "platform";
    /// Creation timestamp column
    pub const CREATED: &str = "device_creation_timestamp";
    /// Mobile country code column
    pub const COUNTRY_CODE: &str = "country_code";
}

/// Logger applications table schema
pub mod logger_applications {
    /// Table name
    pub const TABLE: &str = "logger_applications";
    /// Primary key column
    pub const ID: &str = "logger_application_id";
    /// Unique logging context name
    pub const NAME: &str = "logger_application_name";
}

/// Applications table schema
pub mod application {
    /// Table name
    pub const TABLE: &str = "application";
    /// Primary key column
    pub const ID: &str = "application_id";
    /// Display name column
    pub const NAME: &str = "application_name";
    /// Package or class name column
    pub const PACKAGE_CLASS_NAME: &str = "package_class_name";
}

/// Raw measurements table schema
pub mod raw_measurements {
    /// Table name
    pub const TABLE: &str = "raw_measurements";
    /// Primary key column
    pub const ID: &str = "measurement_id";
    /// Insertion timestamp column, assigned by the database
    pub const TIMESTAMP: &str = "measurement_timestamp";
    /// Latitude column
    pub const LATITUDE: &str = "latitude";
    /// Longitude column
    pub const LONGITUDE: &str = "longitude";
    /// Cell identifier column
    pub const CELL_ID: &str = "cell_id";
    /// Foreign key to logger applications
    pub const LOGGER_APPLICATION_ID: &str = "logger_application_id_fk";
    /// Foreign key to devices
    pub const DEVICE_ID: &str = "device_id_fk";
}

/// Applications running at the time of a raw measurement
pub mod measurement_applications {
    /// Table name
    pub const TABLE: &str = "measurement_applications";
    /// Foreign key to raw measurements
    pub const MEASUREMENT_ID: &str = "measurement_id_fk";
    /// Foreign key to applications
    pub const APPLICATION_ID: &str = "application_id_fk";
    /// Client reported launch time
    pub const LAUNCH_TIME: &str = "launch_time";
}

/// Routine classes table schema
pub mod routine_classes {
    /// Table name
    pub const TABLE: &str = "routine_classes";
    /// Primary key column
    pub const ID: &str = "id";
    /// Routine type (0 location, 1 application, 2 combination)
    pub const TYPE_ID: &str = "routine_type_id";
    /// Class name column
    pub const NAME: &str = "routine_class_name";
    /// Foreign key to the owning device
    pub const OWNER_DEVICE_ID: &str = "owner_device_id_fk";
}

/// User routines table schema
pub mod user_routines {
    /// Table name
    pub const TABLE: &str = "user_routines";
    /// Primary key column
    pub const ID: &str = "user_routines_id";
    /// Routine start column
    pub const START_TIME: &str = "start_time";
    /// Routine end column
    pub const END_TIME: &str = "end_time";
    /// Foreign key to routine classes
    pub const ROUTINE_CLASS_ID: &str = "routine_class_id_fk";
    /// Nullable foreign key to applications
    pub const APPLICATION_ID: &str = "application_id_fk";
    /// Foreign key to raw measurements
    pub const RAW_MEASUREMENT_ID: &str = "raw_measurement_id_fk";
    /// Recognition confidence column
    pub const CONFIDENCE: &str = "confidence";
}

/// Country codes reference table schema
pub mod country_codes {
    /// Table name
    pub const TABLE: &str = "country_codes";
    /// Mobile country code (primary key)
    pub const CODE: &str = "code";
    /// Country abbreviation column
    pub const ABBREVIATION: &str = "abbreviation";
    /// Country name column
    pub const NAME: &str = "name";
}
