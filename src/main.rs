use std::io::Read;
use std::path::{Path, PathBuf};

use activity_logger::config::AppConfig;
use activity_logger::logging::init_logging;
use activity_logger::metrics;
use activity_logger::models::{RawLogData, RoutineType, UserRoutine};
use activity_logger::{ActivityLoggerError, Database, QueryFilters};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database file, overrides the configured `database.url`
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Only records of this device
    #[arg(short, long)]
    device: Option<String>,

    /// Only records of this logger application
    #[arg(short, long)]
    logger: Option<String>,

    /// Lower time bound (ISO 8601 or "YYYY-MM-DD HH:MM:SS+HH")
    #[arg(short, long)]
    start: Option<String>,

    /// Upper time bound
    #[arg(short, long)]
    end: Option<String>,
}

impl From<FilterArgs> for QueryFilters {
    fn from(args: FilterArgs) -> Self {
        Self {
            device_name: args.device,
            logger_application_name: args.logger,
            start_time: args.start,
            end_time: args.end,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and run migrations
    Init,
    /// Store a routine read from a JSON file ("-" for stdin)
    Submit {
        /// Routine payload
        file: PathBuf,
    },
    /// Run a routine submission without saving and print the resulting routines
    TestSubmit {
        /// Routine payload
        file: PathBuf,
    },
    /// Store a raw activity snapshot
    Ingest {
        /// Device hash the snapshot belongs to
        #[arg(short, long)]
        device: String,
        /// Snapshot payload
        file: PathBuf,
    },
    /// List user routines
    Routines(FilterArgs),
    /// Show one user routine
    Routine {
        /// Canonical routine id
        id: i64,
    },
    /// List devices
    Devices(FilterArgs),
    /// Show one device
    Device {
        /// Device name
        name: String,
    },
    /// List routine classes
    Classes {
        /// Only classes owned by this device
        #[arg(short, long)]
        device: Option<String>,
        /// Only classes of this type (0 location, 1 application, 2 combination)
        #[arg(short = 't', long = "type")]
        routine_type: Option<i64>,
    },
    /// Show a raw measurement with its applications
    Measurement {
        /// Measurement id
        id: i64,
    },
    /// List raw measurements
    Measurements(FilterArgs),
    /// List mobile country codes
    CountryCodes {
        /// Show a single code
        code: Option<i32>,
    },
}

fn main() -> Result<()> {
    let mut config = AppConfig::load().context("Failed to load configuration")?;
    let _log_guard = init_logging(&config.logging)?;

    let cli = Cli::parse();
    if let Some(database) = cli.database {
        config.database.url = database;
    }

    info!(level = %config.get_log_level(), "Starting activity-logger");
    let db = Database::from_config(&config).context("Failed to open database")?;

    match cli.command {
        Commands::Init => {
            let codes = db.get_country_codes()?;
            info!(url = %config.database.url, country_codes = codes.len(), "Database ready");
        },
        Commands::Submit { file } => {
            let routine: UserRoutine = read_payload(&file)?;
            match db.submit_routine(&routine) {
                Ok(id) => print_json(&serde_json::json!({ "userRoutinesId": id }))?,
                Err(err) => return Err(report("submit", err)),
            }
        },
        Commands::TestSubmit { file } => {
            let routine: UserRoutine = read_payload(&file)?;
            print_json(&db.submit_routine_dry_run(&routine).map_err(|e| report("test-submit", e))?)?;
        },
        Commands::Ingest { device, file } => {
            let data: RawLogData = read_payload(&file)?;
            let id = db.ingest_raw_data(&device, &data).map_err(|e| report("ingest", e))?;
            print_json(&serde_json::json!({ "measurementId": id }))?;
        },
        Commands::Routines(filters) => print_json(&db.get_user_routines(&filters.into())?)?,
        Commands::Routine { id } => print_json(&db.get_user_routine(id)?)?,
        Commands::Devices(filters) => print_json(&db.get_devices(&filters.into())?)?,
        Commands::Device { name } => print_json(&db.get_device(&name)?)?,
        Commands::Classes { device, routine_type } => {
            let classes = match routine_type {
                Some(id) => {
                    let routine_type = RoutineType::try_from(id).map_err(ActivityLoggerError::Validation)?;
                    let mut classes = db.get_routine_classes_by_type(routine_type)?;
                    if let Some(device) = device.filter(|d| !d.is_empty()) {
                        classes.retain(|c| c.device_name == device);
                    }
                    classes
                },
                None => db.get_routine_classes(&QueryFilters {
                    device_name: device,
                    ..QueryFilters::default()
                })?,
            };
            print_json(&classes)?;
        },
        Commands::Measurement { id } => print_json(&db.get_raw_measurement(id)?)?,
        Commands::Measurements(filters) => print_json(&db.get_raw_measurements(&filters.into())?)?,
        Commands::CountryCodes { code } => match code {
            Some(code) => print_json(&db.get_country_code(code)?)?,
            None => print_json(&db.get_country_codes()?)?,
        },
    }

    Ok(())
}

/// Read and parse a JSON payload; malformed input is a validation error.
fn read_payload<T: serde::de::DeserializeOwned>(file: &Path) -> Result<T> {
    let text = if file.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        text
    } else {
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?
    };
    serde_json::from_str(&text)
        .map_err(|e| ActivityLoggerError::Validation(format!("malformed payload: {e}")).into())
}

fn report(operation: &'static str, err: ActivityLoggerError) -> anyhow::Error {
    metrics::record_error(err.kind(), operation);
    if err.is_retryable() {
        error!(error = %err, "Request conflicted with another writer, resubmit it");
    } else {
        error!(error = %err, "Request failed");
    }
    err.into()
}

#[allow(clippy::print_stdout)]
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
