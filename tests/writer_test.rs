mod common;

use activity_logger::models::{GpsData, LoggedApplication, RawLogData, RoutineType};
use activity_logger::schema::GPS_NOT_AVAILABLE;
use activity_logger::{ActivityLoggerError, QueryFilters};
use common::{app, count, home_routine, routine, temp_db, WRITE_TABLES};

#[test]
fn test_submit_and_read_back_by_id() {
    let (_dir, db) = temp_db();

    let id = db.submit_routine(&home_routine()).expect("Failed to submit routine");
    let stored = db.get_user_routine(id).expect("Failed to read routine");

    assert_eq!(stored.user_routines_id, id);
    assert_eq!(stored.device_name, "abc123");
    assert_eq!(stored.logger_application_name, "TestLogger");
    assert_eq!(stored.routine_class_name, "Home");
    assert_eq!(stored.start_time, "2012-08-31T21:00:00.000Z");
    assert_eq!(stored.end_time, "2012-09-30T20:59:59.000Z");
    assert_eq!(stored.cell_id, 40);
    assert_eq!(stored.latitude, Some(61.31835));
    let names: Vec<&str> = stored.application.iter().map(|a| a.application_name.as_str()).collect();
    assert_eq!(names, ["Mail", "Maps"]);
    assert!(stored.application.iter().all(|a| a.application_id > 0));

    assert_eq!(count(&db, "user_routines"), 2);
    assert_eq!(count(&db, "raw_measurements"), 1);
}

#[test]
fn test_application_routine_rows_share_everything_but_the_application() {
    let (_dir, db) = temp_db();
    let mut calendar = routine(
        "abc123",
        "TestLogger",
        "Home",
        vec![app("Calendar", "com.example.calendar"), app("Mail", "com.example.mail")],
    );
    calendar.routine_type_id = RoutineType::Application;

    let id = db.submit_routine(&calendar).expect("Failed to submit routine");

    let conn = db.get_connection().expect("Failed to get connection");
    let mut stmt = conn
        .prepare(
            "SELECT user_routines_id, routine_class_id_fk, raw_measurement_id_fk, confidence, application_id_fk \
             FROM user_routines ORDER BY user_routines_id",
        )
        .expect("Failed to prepare");
    let rows: Vec<(i64, i64, i64, f64, Option<i64>)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)))
        .expect("Failed to query")
        .collect::<Result<_, _>>()
        .expect("Failed to read rows");

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].0, id);
    assert_eq!(rows[0].1, rows[1].1);
    assert_eq!(rows[0].2, rows[1].2);
    assert!((rows[0].3 - 0.8).abs() < f64::EPSILON);
    assert!((rows[1].3 - 0.8).abs() < f64::EPSILON);
    assert!(rows[0].4.is_some());
    assert!(rows[1].4.is_some());
    assert_ne!(rows[0].4, rows[1].4);

    let stored = db.get_user_routine(id).expect("Failed to read routine");
    assert_eq!(stored.routine_type_id, RoutineType::Application);
    let names: Vec<&str> = stored.application.iter().map(|a| a.application_name.as_str()).collect();
    assert_eq!(names, ["Calendar", "Mail"]);
}

#[test]
fn test_routine_without_applications_has_single_row() {
    let (_dir, db) = temp_db();

    let id = db
        .submit_routine(&routine("abc123", "TestLogger", "Commute", Vec::new()))
        .expect("Failed to submit routine");

    assert_eq!(count(&db, "user_routines"), 1);
    assert_eq!(count(&db, "application"), 0);
    let stored = db.get_user_routine(id).expect("Failed to read routine");
    assert!(stored.application.is_empty());

    let conn = db.get_connection().expect("Failed to get connection");
    let application_id: Option<i64> = conn
        .query_row("SELECT application_id_fk FROM user_routines WHERE user_routines_id = ?1", [id], |row| {
            row.get(0)
        })
        .expect("Failed to read row");
    assert_eq!(application_id, None);
}

#[test]
fn test_reference_rows_are_reused() {
    let (_dir, db) = temp_db();

    let first = db.submit_routine(&home_routine()).expect("Failed to submit first routine");
    let second = db.submit_routine(&home_routine()).expect("Failed to submit second routine");

    assert_ne!(first, second);
    assert_eq!(count(&db, "devices"), 1);
    assert_eq!(count(&db, "logger_applications"), 1);
    assert_eq!(count(&db, "routine_classes"), 1);
    assert_eq!(count(&db, "application"), 2);
    assert_eq!(count(&db, "raw_measurements"), 2);
    assert_eq!(count(&db, "user_routines"), 4);
}

#[test]
fn test_adjacent_identical_routines_stay_separate() {
    let (_dir, db) = temp_db();

    let first = db.submit_routine(&home_routine()).expect("Failed to submit first routine");
    let second = db.submit_routine(&home_routine()).expect("Failed to submit second routine");

    assert_eq!(db.get_user_routine(first).expect("first").application.len(), 2);
    assert_eq!(db.get_user_routine(second).expect("second").application.len(), 2);

    let all = db.get_user_routines(&QueryFilters::default()).expect("Failed to list routines");
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].user_routines_id, first);
    assert_eq!(all[1].user_routines_id, second);
}

#[test]
fn test_forced_failure_in_each_table_rolls_back_everything() {
    for failing in WRITE_TABLES {
        let (_dir, db) = temp_db();
        {
            let conn = db.get_connection().expect("Failed to get connection");
            conn.execute_batch(&format!(
                "CREATE TRIGGER fail_{failing} BEFORE INSERT ON {failing} BEGIN SELECT RAISE(ABORT, 'forced'); END;"
            ))
            .expect("Failed to create trigger");
        }

        let err = db.submit_routine(&home_routine()).expect_err("submission should fail");
        match &err {
            ActivityLoggerError::Transaction { failures } => {
                assert!(!failures.is_empty(), "no failures reported for {failing}");
                assert!(err.to_string().contains("forced"), "{failing}: {err}");
            },
            other => panic!("unexpected error for {failing}: {other}"),
        }
        assert!(!err.is_retryable());

        for table in WRITE_TABLES {
            assert_eq!(count(&db, table), 0, "{table} kept rows after failure in {failing}");
        }
    }
}

#[test]
fn test_transaction_ending_failure_in_each_table_leaves_no_rows() {
    for failing in WRITE_TABLES {
        let (_dir, db) = temp_db();
        {
            let conn = db.get_connection().expect("Failed to get connection");
            conn.execute_batch(&format!(
                "CREATE TRIGGER fail_{failing} BEFORE INSERT ON {failing} BEGIN SELECT RAISE(ROLLBACK, 'forced'); END;"
            ))
            .expect("Failed to create trigger");
        }

        let err = db.submit_routine(&home_routine()).expect_err("submission should fail");
        assert!(matches!(err, ActivityLoggerError::Transaction { .. }), "{failing}: {err}");
        assert!(err.to_string().contains("forced"), "{failing}: {err}");

        for table in WRITE_TABLES {
            assert_eq!(count(&db, table), 0, "{table} kept rows after rollback in {failing}");
        }
    }
}

#[test]
fn test_rolled_back_device_step_stops_the_write() {
    let (_dir, db) = temp_db();
    {
        let conn = db.get_connection().expect("Failed to get connection");
        conn.execute_batch("CREATE TRIGGER fail_devices BEFORE INSERT ON devices BEGIN SELECT RAISE(ROLLBACK, 'forced'); END;")
            .expect("Failed to create trigger");
    }

    let err = db.submit_routine(&home_routine()).expect_err("submission should fail");
    let ActivityLoggerError::Transaction { failures } = err else {
        panic!("expected a transaction error");
    };
    let steps: Vec<&str> = failures.iter().map(|f| f.step).collect();
    assert_eq!(
        steps,
        ["device", "logger application", "raw measurement", "routine class", "application", "user routine"]
    );
    assert!(failures[1..].iter().all(|f| f.message.contains("already rolled back")));
    assert_eq!(count(&db, "logger_applications"), 0);
    assert_eq!(count(&db, "application"), 0);
}

#[test]
fn test_failed_device_step_reports_dependent_steps_as_skipped() {
    let (_dir, db) = temp_db();
    {
        let conn = db.get_connection().expect("Failed to get connection");
        conn.execute_batch("CREATE TRIGGER fail_devices BEFORE INSERT ON devices BEGIN SELECT RAISE(ABORT, 'forced'); END;")
            .expect("Failed to create trigger");
    }

    let err = db.submit_routine(&home_routine()).expect_err("submission should fail");
    let ActivityLoggerError::Transaction { failures } = err else {
        panic!("expected a transaction error");
    };
    let steps: Vec<&str> = failures.iter().map(|f| f.step).collect();
    assert_eq!(steps, ["device", "raw measurement", "routine class", "user routine"]);
    assert!(failures[1].message.starts_with("skipped"));
}

#[test]
fn test_invalid_payload_is_rejected_before_writing() {
    let (_dir, db) = temp_db();

    let mut bad = home_routine();
    bad.confidence = 1.5;
    let err = db.submit_routine(&bad).expect_err("confidence out of range");
    assert!(matches!(err, ActivityLoggerError::Validation(_)));

    let mut bad = home_routine();
    bad.start_time = "not a time".to_string();
    assert!(matches!(db.submit_routine(&bad), Err(ActivityLoggerError::Validation(_))));

    for table in WRITE_TABLES {
        assert_eq!(count(&db, table), 0);
    }
}

#[test]
fn test_dry_run_returns_routines_and_persists_nothing() {
    let (_dir, db) = temp_db();

    let routines = db.submit_routine_dry_run(&home_routine()).expect("Dry run failed");
    assert_eq!(routines.len(), 1);
    assert_eq!(routines[0].application.len(), 2);
    assert_eq!(routines[0].routine_class_name, "Home");

    for table in WRITE_TABLES {
        assert_eq!(count(&db, table), 0, "{table} kept rows after dry run");
    }
}

#[test]
fn test_ingest_raw_data_links_applications() {
    let (_dir, db) = temp_db();

    let data = RawLogData {
        timestamp: 1_346_500_000_000,
        time_string_presentation: "2012-09-01 14:46:40".to_string(),
        cell_id: 30,
        apps: vec![
            LoggedApplication {
                name: "Mail".to_string(),
                class_name: "com.example.mail".to_string(),
                launch_time: Some("2012-09-01 14:40:00".to_string()),
            },
            LoggedApplication {
                name: "Clock".to_string(),
                class_name: "com.example.clock".to_string(),
                launch_time: None,
            },
        ],
        gps_data: None,
    };

    let id = db.ingest_raw_data("a619ed32f7d0", &data).expect("Failed to ingest");
    let stored = db.get_raw_measurement(id).expect("Failed to read measurement");

    assert_eq!(stored.device_name, "a619ed32f7d0");
    assert_eq!(stored.logger_application_name, "RoutineLoggerX");
    assert_eq!(stored.cell_id, 30);
    assert_eq!(stored.latitude, None);
    assert_eq!(stored.applications.len(), 2);
    assert_eq!(stored.applications[0].launch_time.as_deref(), Some("2012-09-01 14:40:00"));
    assert_eq!(stored.applications[1].launch_time, None);

    let conn = db.get_connection().expect("Failed to get connection");
    let latitude: f64 = conn
        .query_row("SELECT latitude FROM raw_measurements WHERE measurement_id = ?1", [id], |row| row.get(0))
        .expect("Failed to read latitude");
    assert!((latitude - GPS_NOT_AVAILABLE).abs() < f64::EPSILON);

    let device = db.get_device("a619ed32f7d0").expect("Failed to read device");
    assert_eq!(device.platform, "plat");
    assert_eq!(device.country_code, 244);
}

#[test]
fn test_ingest_with_gps_keeps_coordinates() {
    let (_dir, db) = temp_db();
    let data = RawLogData {
        timestamp: -1,
        time_string_presentation: String::new(),
        cell_id: -1,
        apps: Vec::new(),
        gps_data: Some(GpsData {
            latitude: 62.519,
            longitude: 25.945,
        }),
    };

    let id = db.ingest_raw_data("abc123", &data).expect("Failed to ingest");
    let stored = db.get_raw_measurement(id).expect("Failed to read measurement");
    assert_eq!(stored.latitude, Some(62.519));
    assert_eq!(stored.longitude, Some(25.945));
    assert!(stored.applications.is_empty());
}

#[test]
fn test_concurrent_submissions_share_reference_rows() {
    let (_dir, db) = temp_db();
    let db = std::sync::Arc::new(db);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let db = std::sync::Arc::clone(&db);
            std::thread::spawn(move || {
                let apps = vec![app("Mail", "com.example.mail"), app(&format!("App {i}"), "com.example.x")];
                db.submit_routine(&routine("abc123", "TestLogger", "Home", apps))
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("thread panicked").expect("submission failed");
    }

    assert_eq!(count(&db, "devices"), 1);
    assert_eq!(count(&db, "routine_classes"), 1);
    assert_eq!(count(&db, "application"), 5);
    assert_eq!(count(&db, "user_routines"), 8);
}

#[test]
fn test_missing_routine_is_not_found() {
    let (_dir, db) = temp_db();
    assert!(matches!(db.get_user_routine(42), Err(ActivityLoggerError::NotFound(_))));
    assert!(matches!(db.get_raw_measurement(42), Err(ActivityLoggerError::NotFound(_))));
}

#[test]
fn test_delete_routine_removes_all_its_rows() {
    let (_dir, db) = temp_db();
    let first = db.submit_routine(&home_routine()).expect("Failed to submit first routine");
    let second = db.submit_routine(&home_routine()).expect("Failed to submit second routine");

    db.delete_user_routine(first).expect("Failed to delete routine");

    assert_eq!(count(&db, "user_routines"), 2);
    assert!(matches!(db.get_user_routine(first), Err(ActivityLoggerError::NotFound(_))));
    assert_eq!(db.get_user_routine(second).expect("second survives").application.len(), 2);
    assert!(matches!(db.delete_user_routine(first), Err(ActivityLoggerError::NotFound(_))));
    assert_eq!(db.get_applications_by_name("Mail").expect("Mail").len(), 1);
}
