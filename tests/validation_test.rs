//! Tests for payload validation and timestamp normalization

mod common;

use activity_logger::models::{GpsData, LoggedApplication, RawLogData};
use activity_logger::validation::{InputValidator, MAX_NAME_LENGTH};
use activity_logger::{ActivityLoggerError, QueryFilters};
use common::{app, home_routine};

#[test]
fn test_validate_name_valid() {
    assert!(InputValidator::validate_name("deviceName", "a619ed32f7d0de86a002757fbf8b29f4d1ab0aae").is_ok());
}

#[test]
fn test_validate_name_empty_or_whitespace() {
    assert!(InputValidator::validate_name("deviceName", "").is_err());
    assert!(InputValidator::validate_name("deviceName", "   ").is_err());
}

#[test]
fn test_validate_name_length_boundary() {
    assert!(InputValidator::validate_name("n", &"a".repeat(MAX_NAME_LENGTH)).is_ok());
    assert!(InputValidator::validate_name("n", &"a".repeat(MAX_NAME_LENGTH + 1)).is_err());
}

#[test]
fn test_validate_name_control_characters() {
    assert!(InputValidator::validate_name("n", "Home\0").is_err());
    assert!(InputValidator::validate_name("n", "Home\nWork").is_err());
}

#[test]
fn test_validate_confidence_bounds() {
    assert!(InputValidator::validate_confidence(0.0).is_ok());
    assert!(InputValidator::validate_confidence(1.0).is_ok());
    assert!(InputValidator::validate_confidence(-0.01).is_err());
    assert!(InputValidator::validate_confidence(1.01).is_err());
    assert!(InputValidator::validate_confidence(f64::NAN).is_err());
}

#[test]
fn test_validate_gps_ranges() {
    assert!(InputValidator::validate_gps(&GpsData { latitude: 60.0, longitude: 24.0 }).is_ok());
    assert!(InputValidator::validate_gps(&GpsData { latitude: 91.0, longitude: 24.0 }).is_err());
    assert!(InputValidator::validate_gps(&GpsData { latitude: 60.0, longitude: -181.0 }).is_err());
}

#[test]
fn test_validate_routine_normalizes_times() {
    let routine = InputValidator::validate_routine(home_routine()).expect("valid routine");
    assert_eq!(routine.start_time, "2012-08-31T21:00:00.000Z");
    assert_eq!(routine.end_time, "2012-09-30T20:59:59.000Z");
}

#[test]
fn test_validate_routine_rejects_reversed_range() {
    let mut routine = home_routine();
    routine.start_time = "2012-10-01 00:00:00+03".to_string();
    let err = InputValidator::validate_routine(routine).expect_err("start after end");
    assert!(matches!(err, ActivityLoggerError::Validation(_)));
}

#[test]
fn test_validate_routine_rejects_half_gps() {
    let mut routine = home_routine();
    routine.longitude = None;
    assert!(InputValidator::validate_routine(routine).is_err());

    let mut routine = home_routine();
    routine.latitude = None;
    routine.longitude = None;
    assert!(InputValidator::validate_routine(routine).is_ok());
}

#[test]
fn test_validate_routine_rejects_unnamed_application() {
    let mut routine = home_routine();
    routine.application.push(app("", "com.example.blank"));
    assert!(InputValidator::validate_routine(routine).is_err());
}

#[test]
fn test_validate_raw_log() {
    let mut data = RawLogData {
        timestamp: 0,
        time_string_presentation: String::new(),
        cell_id: 1,
        apps: vec![LoggedApplication {
            name: "Mail".to_string(),
            class_name: "com.example.mail".to_string(),
            launch_time: None,
        }],
        gps_data: None,
    };
    assert!(InputValidator::validate_raw_log(&data).is_ok());

    data.gps_data = Some(GpsData { latitude: -1000.0, longitude: -1000.0 });
    assert!(InputValidator::validate_raw_log(&data).is_err());
}

#[test]
fn test_normalize_filters_only_touches_times() {
    let filters = QueryFilters::new()
        .device("abc123")
        .starting_at("2012-10-02 19:00:00+03")
        .ending_at("");
    let normalized = InputValidator::normalize_filters(&filters).expect("valid filters");

    assert_eq!(normalized.device_name.as_deref(), Some("abc123"));
    assert_eq!(normalized.start_time.as_deref(), Some("2012-10-02T16:00:00.000Z"));
    assert_eq!(normalized.end_time, None);
}
