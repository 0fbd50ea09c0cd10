#![allow(dead_code)]

use activity_logger::models::{Application, RoutineType, UserRoutine};
use activity_logger::Database;
use tempfile::TempDir;

/// The six tables touched by a routine submission
pub const WRITE_TABLES: [&str; 6] = [
    "devices",
    "logger_applications",
    "raw_measurements",
    "routine_classes",
    "application",
    "user_routines",
];

pub fn temp_db() -> (TempDir, Database) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("activity.db");
    let db = Database::new(path.to_str().expect("temp path is not UTF-8")).expect("Failed to create database");
    (dir, db)
}

pub fn count(db: &Database, table: &str) -> i64 {
    let conn = db.get_connection().expect("Failed to get connection");
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .expect("Failed to count rows")
}

pub fn app(name: &str, package: &str) -> Application {
    Application {
        application_id: 0,
        application_name: name.to_string(),
        package_class_name: package.to_string(),
    }
}

pub fn routine(device: &str, logger: &str, class: &str, applications: Vec<Application>) -> UserRoutine {
    UserRoutine {
        user_routines_id: 0,
        start_time: "2012-09-01T00:00:00+03:00".to_string(),
        end_time: "2012-09-30T23:59:59+03:00".to_string(),
        routine_class_id: 0,
        raw_measurement_id: 0,
        confidence: 0.8,
        application: applications,
        routine_type_id: RoutineType::Combination,
        routine_class_name: class.to_string(),
        latitude: Some(61.31835),
        longitude: Some(24.39843),
        cell_id: 40,
        device_name: device.to_string(),
        logger_application_name: logger.to_string(),
    }
}

pub fn home_routine() -> UserRoutine {
    routine(
        "abc123",
        "TestLogger",
        "Home",
        vec![app("Mail", "com.example.mail"), app("Maps", "com.example.maps")],
    )
}
