mod common;

use activity_logger::{ActivityLoggerError, FilteredQuery, QueryFilters};
use common::{home_routine, routine, temp_db};
use proptest::prelude::*;

fn seeded() -> (tempfile::TempDir, activity_logger::Database) {
    let (dir, db) = temp_db();
    db.submit_routine(&home_routine()).expect("submit home");

    let mut october = routine("def456", "OtherLogger", "Work", Vec::new());
    october.start_time = "2012-10-03 12:00:00+03".to_string();
    october.end_time = "2012-10-03 16:30:00+03".to_string();
    db.submit_routine(&october).expect("submit work");
    (dir, db)
}

#[test]
fn test_no_filters_returns_everything() {
    let (_dir, db) = seeded();
    assert_eq!(db.get_user_routines(&QueryFilters::default()).expect("list").len(), 2);
}

#[test]
fn test_device_and_logger_filters() {
    let (_dir, db) = seeded();

    let by_device = db.get_user_routines(&QueryFilters::new().device("def456")).expect("list");
    assert_eq!(by_device.len(), 1);
    assert_eq!(by_device[0].routine_class_name, "Work");

    let by_logger = db
        .get_user_routines(&QueryFilters::new().logger_application("TestLogger"))
        .expect("list");
    assert_eq!(by_logger.len(), 1);
    assert_eq!(by_logger[0].application.len(), 2);

    let none = db
        .get_user_routines(&QueryFilters::new().device("def456").logger_application("TestLogger"))
        .expect("list");
    assert!(none.is_empty());
}

#[test]
fn test_time_filters_are_inclusive() {
    let (_dir, db) = seeded();

    let from_october = db
        .get_user_routines(&QueryFilters::new().starting_at("2012-10-03 12:00:00+03"))
        .expect("list");
    assert_eq!(from_october.len(), 1);
    assert_eq!(from_october[0].device_name, "def456");

    let until_september = db
        .get_user_routines(&QueryFilters::new().ending_at("2012-09-30T23:59:59+03:00"))
        .expect("list");
    assert_eq!(until_september.len(), 1);
    assert_eq!(until_september[0].device_name, "abc123");
}

#[test]
fn test_empty_filter_values_are_ignored() {
    let (_dir, db) = seeded();
    let filters = QueryFilters::new().device("").logger_application("").starting_at("").ending_at("");
    assert!(filters.is_empty());
    assert_eq!(db.get_user_routines(&filters).expect("list").len(), 2);
}

#[test]
fn test_invalid_time_filter_is_a_validation_error() {
    let (_dir, db) = seeded();
    let err = db
        .get_user_routines(&QueryFilters::new().starting_at("soon"))
        .expect_err("bad time");
    assert!(matches!(err, ActivityLoggerError::Validation(_)));
}

#[test]
fn test_device_listing_ignores_logger_filter() {
    let (_dir, db) = seeded();
    let devices = db
        .get_devices(&QueryFilters::new().logger_application("does not matter"))
        .expect("list");
    assert_eq!(devices.len(), 2);
    let devices = db.get_devices(&QueryFilters::new().device("abc123")).expect("list");
    assert_eq!(devices.len(), 1);
}

fn optional_value() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), Just(Some(String::new())), "[a-z0-9]{1,8}".prop_map(Some)]
}

proptest! {
    #[test]
    fn prop_one_where_and_one_param_per_present_filter(
        device in optional_value(),
        logger in optional_value(),
        start in optional_value(),
        end in optional_value(),
    ) {
        let base = "SELECT 1 FROM devices, logger_applications";
        let query = FilteredQuery::build(
            base,
            device.as_deref(),
            logger.as_deref(),
            "s",
            start.as_deref(),
            "e",
            end.as_deref(),
        ).unwrap();

        let present: Vec<&String> = [&device, &logger, &start, &end]
            .into_iter()
            .filter_map(|v| v.as_ref().filter(|v| !v.is_empty()))
            .collect();

        prop_assert_eq!(query.params().len(), present.len());
        for (param, expected) in query.params().iter().zip(&present) {
            prop_assert_eq!(param, *expected);
        }
        prop_assert_eq!(query.sql().matches(" WHERE ").count(), usize::from(!present.is_empty()));
        prop_assert_eq!(query.sql().matches(" AND ").count(), present.len().saturating_sub(1));
        prop_assert_eq!(query.sql().matches('?').count(), present.len());
        if present.is_empty() {
            prop_assert_eq!(query.sql(), base);
        }
    }
}

#[test]
fn test_time_filters_keep_millisecond_precision() {
    let (_dir, db) = temp_db();
    let mut late = routine("abc123", "TestLogger", "Home", Vec::new());
    late.end_time = "2012-09-30T23:59:59.900+03:00".to_string();
    db.submit_routine(&late).expect("submit routine");

    let before = db
        .get_user_routines(&QueryFilters::new().ending_at("2012-09-30T20:59:59.100Z"))
        .expect("list");
    assert!(before.is_empty());

    let exact = db
        .get_user_routines(&QueryFilters::new().ending_at("2012-09-30T20:59:59.900Z"))
        .expect("list");
    assert_eq!(exact.len(), 1);

    let after_start = db
        .get_user_routines(&QueryFilters::new().starting_at("2012-08-31T21:00:00.001Z"))
        .expect("list");
    assert!(after_start.is_empty());
}
