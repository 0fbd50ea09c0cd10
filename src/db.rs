use std::fs;
use std::path::Path;
use std::time::Instant;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{debug, info};

use crate::config::{AppConfig, DatabaseConfig, StoreConfig};
use crate::error::{ActivityLoggerError, Result};
use crate::filter::QueryFilters;
use crate::metrics;
use crate::models::{
    Application, CountryCode, Device, LoggerApplication, RawLogData, RawMeasurement, RoutineClass, RoutineType,
    UserRoutine,
};
use crate::queries::{
    applications, country_codes, devices, logger_applications, raw_measurements, routine_classes, user_routines,
};
use crate::validation::InputValidator;
use crate::writer::RoutineWriter;

/// Type alias for the database connection pool
pub type DbPool = Pool<SqliteConnectionManager>;
/// A connection checked out of the pool
pub type DbConnection = r2d2::PooledConnection<SqliteConnectionManager>;

const MIGRATIONS: [(&str, &str); 2] = [
    (
        "create_routine_tables",
        include_str!("../migrations/2024-05-02-000000_create_routine_tables/up.sql"),
    ),
    (
        "seed_country_codes",
        include_str!("../migrations/2024-05-02-000001_seed_country_codes/up.sql"),
    ),
];

/// Request level entry point: one pooled connection per call
pub struct Database {
    pool: DbPool,
    writer: RoutineWriter,
}

impl Database {
    /// Open (and create if needed) the database file with default settings
    pub fn new(database_url: &str) -> Result<Self> {
        let config = DatabaseConfig {
            url: database_url.to_string(),
            ..DatabaseConfig::default()
        };
        Self::open(&config, StoreConfig::default())
    }

    /// Open the database described by a loaded configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::open(&config.database, config.store.clone())
    }

    /// Open the database file, build the pool and run migrations
    pub fn open(config: &DatabaseConfig, defaults: StoreConfig) -> Result<Self> {
        if let Some(parent) = Path::new(&config.url).parent() {
            fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(&config.url).with_init(init_connection);
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(config.connection_timeout())
            .build(manager)?;

        info!(url = %config.url, max_connections = config.max_connections, "Opened database");
        Self::with_pool(pool, defaults)
    }

    /// A private in-memory database, mostly for tests and dry runs
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(init_connection);
        // Every in-memory connection is its own database, so keep exactly one alive.
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;
        Self::with_pool(pool, StoreConfig::default())
    }

    fn with_pool(pool: DbPool, defaults: StoreConfig) -> Result<Self> {
        let conn = pool.get()?;
        Self::run_migrations(&conn)?;
        drop(conn);

        Ok(Self {
            pool,
            writer: RoutineWriter::new(defaults),
        })
    }

    /// Run database migrations
    fn run_migrations(conn: &Connection) -> Result<()> {
        for (name, sql) in MIGRATIONS {
            conn.execute_batch(sql)?;
            debug!(migration = name, "Applied migration");
        }
        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> Result<DbConnection> {
        Ok(self.pool.get()?)
    }

    fn read<T>(&self, operation: &'static str, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let start = Instant::now();
        let result = self.get_connection().and_then(|conn| f(&conn));
        metrics::record_db_operation(operation, start.elapsed(), result.is_ok());
        result
    }

    /// Store a recognized routine, returning its canonical id
    pub fn submit_routine(&self, routine: &UserRoutine) -> Result<i64> {
        let mut conn = self.get_connection()?;
        self.writer.submit(&mut conn, routine)
    }

    /// Validate and run a submission without persisting anything, returning
    /// what the routine table would contain
    pub fn submit_routine_dry_run(&self, routine: &UserRoutine) -> Result<Vec<UserRoutine>> {
        let mut conn = self.get_connection()?;
        self.writer.submit_dry_run(&mut conn, routine)
    }

    /// Store a raw activity snapshot, returning the measurement id
    pub fn ingest_raw_data(&self, device_hash: &str, data: &RawLogData) -> Result<i64> {
        let mut conn = self.get_connection()?;
        self.writer.ingest_raw_data(&mut conn, device_hash, data)
    }

    /// List routines matching `filters`
    pub fn get_user_routines(&self, filters: &QueryFilters) -> Result<Vec<UserRoutine>> {
        let filters = InputValidator::normalize_filters(filters)?;
        self.read("get_user_routines", |conn| user_routines::get_all(conn, &filters))
    }

    /// Get the routine with canonical id `id`
    pub fn get_user_routine(&self, id: i64) -> Result<UserRoutine> {
        self.read("get_user_routine", |conn| user_routines::find_by_id(conn, id))?
            .ok_or_else(|| ActivityLoggerError::NotFound(format!("user routine {id}")))
    }

    /// Delete the routine with canonical id `id`
    pub fn delete_user_routine(&self, id: i64) -> Result<()> {
        let deleted = self.read("delete_user_routine", |conn| user_routines::delete(conn, id))?;
        if deleted == 0 {
            return Err(ActivityLoggerError::NotFound(format!("user routine {id}")));
        }
        Ok(())
    }

    /// List devices; the logger application filter does not apply
    pub fn get_devices(&self, filters: &QueryFilters) -> Result<Vec<Device>> {
        let filters = InputValidator::normalize_filters(filters)?;
        self.read("get_devices", |conn| devices::get_all(conn, &filters))
    }

    /// Get a device by name
    pub fn get_device(&self, name: &str) -> Result<Device> {
        self.read("get_device", |conn| devices::find_by_name(conn, name))?
            .ok_or_else(|| ActivityLoggerError::NotFound(format!("device {name:?}")))
    }

    /// List logger applications
    pub fn get_logger_applications(&self) -> Result<Vec<LoggerApplication>> {
        self.read("get_logger_applications", logger_applications::get_all)
    }

    /// Get the applications with display name `name`
    pub fn get_applications_by_name(&self, name: &str) -> Result<Vec<Application>> {
        let found = self.read("get_applications_by_name", |conn| applications::find_by_name(conn, name))?;
        if found.is_empty() {
            return Err(ActivityLoggerError::NotFound(format!("application {name:?}")));
        }
        Ok(found)
    }

    /// List routine classes; only the device filter applies
    pub fn get_routine_classes(&self, filters: &QueryFilters) -> Result<Vec<RoutineClass>> {
        self.read("get_routine_classes", |conn| routine_classes::get_all(conn, filters))
    }

    /// List routine classes of one type
    pub fn get_routine_classes_by_type(&self, routine_type: RoutineType) -> Result<Vec<RoutineClass>> {
        self.read("get_routine_classes_by_type", |conn| {
            routine_classes::get_by_type(conn, routine_type)
        })
    }

    /// Get a raw measurement with its applications
    pub fn get_raw_measurement(&self, id: i64) -> Result<RawMeasurement> {
        self.read("get_raw_measurement", |conn| raw_measurements::find_by_id(conn, id))?
            .ok_or_else(|| ActivityLoggerError::NotFound(format!("raw measurement {id}")))
    }

    /// List raw measurements matching `filters`
    pub fn get_raw_measurements(&self, filters: &QueryFilters) -> Result<Vec<RawMeasurement>> {
        let filters = InputValidator::normalize_filters(filters)?;
        self.read("get_raw_measurements", |conn| raw_measurements::get_all(conn, &filters))
    }

    /// List the country code reference table
    pub fn get_country_codes(&self) -> Result<Vec<CountryCode>> {
        self.read("get_country_codes", country_codes::get_all)
    }

    /// Get one country code
    pub fn get_country_code(&self, code: i32) -> Result<CountryCode> {
        self.read("get_country_code", |conn| country_codes::find(conn, code))?
            .ok_or_else(|| ActivityLoggerError::NotFound(format!("country code {code}")))
    }
}

fn init_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
}
