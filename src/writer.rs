//! Transactional write paths.
//!
//! A routine submission touches six tables. All of it runs in one
//! `IMMEDIATE` transaction that commits only when every step succeeded;
//! otherwise it is rolled back and every failed or skipped step is reported.

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{ActivityLoggerError, Result, StepFailure};
use crate::filter::QueryFilters;
use crate::logging::OperationTimer;
use crate::metrics;
use crate::models::{RawLogData, UserRoutine};
use crate::queries::user_routines::NewUserRoutine;
use crate::queries::{applications, devices, logger_applications, raw_measurements, routine_classes, user_routines};
use crate::validation::InputValidator;

/// Step names used in transaction failure reports
pub mod steps {
    /// Resolve the device
    pub const DEVICE: &str = "device";
    /// Resolve the logger application
    pub const LOGGER_APPLICATION: &str = "logger application";
    /// Insert the raw measurement
    pub const RAW_MEASUREMENT: &str = "raw measurement";
    /// Resolve the routine class
    pub const ROUTINE_CLASS: &str = "routine class";
    /// Resolve the applications
    pub const APPLICATION: &str = "application";
    /// Insert the user routine rows
    pub const USER_ROUTINE: &str = "user routine";
}

/// Writes routines and raw snapshots atomically
#[derive(Debug, Clone, Default)]
pub struct RoutineWriter {
    defaults: StoreConfig,
}

impl RoutineWriter {
    /// Create a writer that uses `defaults` for implicitly created rows
    #[must_use]
    pub const fn new(defaults: StoreConfig) -> Self {
        Self { defaults }
    }

    /// Store a recognized routine and return its canonical id (the first
    /// inserted user routine row).
    pub fn submit(&self, conn: &mut Connection, routine: &UserRoutine) -> Result<i64> {
        let timer = OperationTimer::new("submit_routine");
        let routine = InputValidator::validate_routine(routine.clone())?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = match write_routine(&tx, &routine, &self.defaults) {
            Ok(ids) => tx.commit().map_err(ActivityLoggerError::from).map(|()| ids),
            Err(failures) => Err(rollback(tx, failures)),
        };
        metrics::record_db_operation(timer.operation(), timer.elapsed(), outcome.is_ok());

        match outcome {
            Ok(ids) => {
                metrics::record_routine_submission(true, false, ids.len());
                let id = ids.first().copied().ok_or_else(|| {
                    ActivityLoggerError::NotFound("no user routine row was written".to_string())
                })?;
                info!(
                    user_routines_id = id,
                    rows = ids.len(),
                    device = %routine.device_name,
                    "Stored user routine"
                );
                timer.finish();
                Ok(id)
            },
            Err(err) => {
                metrics::record_routine_submission(false, false, 0);
                Err(err)
            },
        }
    }

    /// Run a full submission, read back every stored routine inside the
    /// transaction and roll back. Nothing is persisted.
    pub fn submit_dry_run(&self, conn: &mut Connection, routine: &UserRoutine) -> Result<Vec<UserRoutine>> {
        let timer = OperationTimer::new("submit_routine_dry_run");
        let routine = InputValidator::validate_routine(routine.clone())?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = match write_routine(&tx, &routine, &self.defaults) {
            Ok(ids) => {
                let stored = user_routines::get_all(&tx, &QueryFilters::default());
                tx.rollback()?;
                debug!(rows = ids.len(), "Dry run rolled back");
                stored
            },
            Err(failures) => Err(rollback(tx, failures)),
        };

        metrics::record_routine_submission(outcome.is_ok(), true, 0);
        timer.finish();
        outcome
    }

    /// Store a raw activity snapshot for the device identified by
    /// `device_hash`, using the default logger application. Returns the
    /// measurement id.
    pub fn ingest_raw_data(&self, conn: &mut Connection, device_hash: &str, data: &RawLogData) -> Result<i64> {
        let timer = OperationTimer::new("ingest_raw_data");
        InputValidator::validate_name("device hash", device_hash)?;
        InputValidator::validate_raw_log(data)?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let outcome = write_raw_data(&tx, device_hash, data, &self.defaults).and_then(|id| {
            tx.commit()?;
            Ok(id)
        });
        metrics::record_raw_snapshot(outcome.is_ok());
        metrics::record_db_operation(timer.operation(), timer.elapsed(), outcome.is_ok());

        match &outcome {
            Ok(id) => {
                info!(measurement_id = id, device = device_hash, apps = data.apps.len(), "Stored raw snapshot");
                timer.finish();
            },
            Err(err) => warn!(device = device_hash, error = %err, "Raw snapshot rejected"),
        }
        outcome
    }
}

fn rollback(tx: Transaction<'_>, failures: Vec<StepFailure>) -> ActivityLoggerError {
    if tx.is_autocommit() {
        debug!("Transaction was already rolled back by SQLite");
    } else if let Err(err) = tx.rollback() {
        warn!(error = %err, "Rollback failed, transaction is discarded on drop");
    }
    ActivityLoggerError::Transaction { failures }
}

/// Routine write steps in execution order
const STEP_ORDER: [&str; 6] = [
    steps::DEVICE,
    steps::LOGGER_APPLICATION,
    steps::RAW_MEASUREMENT,
    steps::ROUTINE_CLASS,
    steps::APPLICATION,
    steps::USER_ROUTINE,
];

/// Failure bookkeeping for one routine write
struct StepRun<'c> {
    conn: &'c Connection,
    failures: Vec<StepFailure>,
}

impl<'c> StepRun<'c> {
    const fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            failures: Vec::new(),
        }
    }

    fn attempt<T>(&mut self, step: &'static str, op: impl FnOnce() -> Result<T>) -> Option<T> {
        match op() {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(step, error = %err, "Routine write step failed");
                self.failures.push(StepFailure::failed(step, &err));
                None
            },
        }
    }

    fn skip(&mut self, step: &'static str, missing: &[&str]) {
        self.failures.push(StepFailure::skipped(step, &missing.join(" or ")));
    }

    fn failed(&self, step: &str) -> bool {
        self.failures.iter().any(|f| f.step == step)
    }

    /// A failure ended the SQLite transaction itself (`RAISE(ROLLBACK)`,
    /// full disk, I/O error). Any later statement would autocommit.
    fn aborted(&self) -> bool {
        !self.failures.is_empty() && self.conn.is_autocommit()
    }

    /// Stop after `last`, reporting every later step as not run.
    fn abandon(mut self, last: &str) -> Vec<StepFailure> {
        warn!(step = last, "Transaction rolled back mid-write, stopping");
        for step in STEP_ORDER.into_iter().skip_while(|step| *step != last).skip(1) {
            self.failures.push(StepFailure::aborted(step));
        }
        self.failures
    }
}

/// Run the six write steps. Independent steps run even after a failure so
/// every problem is reported; dependent steps are reported as skipped. Once
/// SQLite has ended the transaction nothing more is run.
fn write_routine(
    conn: &Connection,
    routine: &UserRoutine,
    defaults: &StoreConfig,
) -> std::result::Result<Vec<i64>, Vec<StepFailure>> {
    let mut run = StepRun::new(conn);

    let device_id = run.attempt(steps::DEVICE, || devices::find_or_create(conn, &routine.device_name, defaults));
    if run.aborted() {
        return Err(run.abandon(steps::DEVICE));
    }

    let logger_application_id = run.attempt(steps::LOGGER_APPLICATION, || {
        logger_applications::find_or_create(conn, &routine.logger_application_name)
    });
    if run.aborted() {
        return Err(run.abandon(steps::LOGGER_APPLICATION));
    }

    let raw_measurement_id = match (device_id, logger_application_id) {
        (Some(device_id), Some(logger_application_id)) => run.attempt(steps::RAW_MEASUREMENT, || {
            raw_measurements::insert(conn, device_id, logger_application_id, routine.cell_id, routine.gps())
        }),
        (device_id, logger_application_id) => {
            let mut missing = Vec::new();
            if device_id.is_none() {
                missing.push(steps::DEVICE);
            }
            if logger_application_id.is_none() {
                missing.push(steps::LOGGER_APPLICATION);
            }
            run.skip(steps::RAW_MEASUREMENT, &missing);
            None
        },
    };
    if run.aborted() {
        return Err(run.abandon(steps::RAW_MEASUREMENT));
    }

    let routine_class_id = match device_id {
        Some(device_id) => run.attempt(steps::ROUTINE_CLASS, || {
            routine_classes::find_or_create(conn, routine.routine_type_id, &routine.routine_class_name, device_id)
        }),
        None => {
            run.skip(steps::ROUTINE_CLASS, &[steps::DEVICE]);
            None
        },
    };
    if run.aborted() {
        return Err(run.abandon(steps::ROUTINE_CLASS));
    }

    let application_ids = resolve_applications(&mut run, routine);
    if run.aborted() {
        return Err(run.abandon(steps::APPLICATION));
    }

    let (Some(raw_measurement_id), Some(routine_class_id), Some(application_ids)) =
        (raw_measurement_id, routine_class_id, application_ids)
    else {
        let missing: Vec<&str> = [
            (raw_measurement_id.is_none(), steps::RAW_MEASUREMENT),
            (routine_class_id.is_none(), steps::ROUTINE_CLASS),
            (run.failed(steps::APPLICATION), steps::APPLICATION),
        ]
        .into_iter()
        .filter_map(|(missing, step)| missing.then_some(step))
        .collect();
        run.skip(steps::USER_ROUTINE, &missing);
        return Err(run.failures);
    };

    let mut ids = Vec::with_capacity(application_ids.len());
    for application_id in application_ids {
        let row = NewUserRoutine {
            start_time: &routine.start_time,
            end_time: &routine.end_time,
            routine_class_id,
            application_id,
            raw_measurement_id,
            confidence: routine.confidence,
        };
        match run.attempt(steps::USER_ROUTINE, || user_routines::insert(conn, &row)) {
            Some(id) => ids.push(id),
            None => return Err(run.failures),
        }
    }

    if run.failures.is_empty() {
        Ok(ids)
    } else {
        Err(run.failures)
    }
}

/// Resolve every application id. An empty list resolves to a single
/// absent reference so the routine still gets one row.
fn resolve_applications(run: &mut StepRun<'_>, routine: &UserRoutine) -> Option<Vec<Option<i64>>> {
    if routine.application.is_empty() {
        return Some(vec![None]);
    }

    let conn = run.conn;
    let mut ids = Vec::with_capacity(routine.application.len());
    let mut complete = true;
    for application in &routine.application {
        match run.attempt(steps::APPLICATION, || {
            applications::find_or_create(conn, &application.application_name, &application.package_class_name)
        }) {
            Some(id) => ids.push(Some(id)),
            None if run.aborted() => return None,
            None => complete = false,
        }
    }
    complete.then_some(ids)
}

fn write_raw_data(conn: &Connection, device_hash: &str, data: &RawLogData, defaults: &StoreConfig) -> Result<i64> {
    let device_id = devices::find_or_create(conn, device_hash, defaults)?;
    let logger_application_id = logger_applications::find_or_create(conn, &defaults.default_logger_application)?;
    let measurement_id = raw_measurements::insert(conn, device_id, logger_application_id, data.cell_id, data.gps_data)?;

    for app in &data.apps {
        let application_id = applications::find_or_create(conn, &app.name, &app.class_name)?;
        raw_measurements::add_application(conn, measurement_id, application_id, app.launch_time.as_deref())?;
    }

    Ok(measurement_id)
}
