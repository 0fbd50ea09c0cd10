use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{ActivityLoggerError, Result};

/// Environment variable prefix, e.g. `ACTIVITY_LOGGER__DATABASE__URL`
pub const ENV_PREFIX: &str = "ACTIVITY_LOGGER";

/// Application configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings
    pub database: DatabaseConfig,
    /// Logging settings
    pub logging: LoggingConfig,
    /// Placeholder values used when reference rows are created implicitly
    pub store: StoreConfig,
}

/// Database connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file path
    pub url: String,
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection
    pub connection_timeout_secs: u64,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,
    /// Directory for daily rolling JSON log files
    pub file_path: Option<String>,
    /// Console format, "json" or "text"
    pub format: String,
}

/// Defaults for reference rows created on first use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Platform stored for devices created implicitly
    pub default_platform: String,
    /// Mobile country code stored for devices created implicitly
    pub default_country_code: i32,
    /// Logging context used for raw snapshot ingestion
    pub default_logger_application: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "data/activity_logger.db".to_string(),
            max_connections: 10,
            connection_timeout_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_path: None,
            format: "text".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_platform: "plat".to_string(),
            default_country_code: 244,
            default_logger_application: "RoutineLoggerX".to_string(),
        }
    }
}

impl DatabaseConfig {
    /// Pool checkout timeout
    #[must_use]
    pub const fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// defaults, `config/default`, `config/local`, then environment.
    pub fn load() -> Result<Self> {
        Self::load_from(&["config/default", "config/local"])
    }

    /// Load configuration using the given optional config files.
    pub fn load_from(files: &[&str]) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = Config::builder()
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", defaults.database.max_connections)?
            .set_default("database.connection_timeout_secs", defaults.database.connection_timeout_secs)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            .set_default("store.default_platform", defaults.store.default_platform)?
            .set_default("store.default_country_code", i64::from(defaults.store.default_country_code))?
            .set_default("store.default_logger_application", defaults.store.default_logger_application)?;

        for file in files {
            builder = builder.add_source(File::with_name(file).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(invalid("database.url must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(invalid("max_connections must be greater than 0"));
        }
        if self.database.connection_timeout_secs == 0 {
            return Err(invalid("connection_timeout_secs must be greater than 0"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(invalid(&format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(invalid(&format!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format, valid_formats
            )));
        }

        if self.store.default_platform.trim().is_empty() {
            return Err(invalid("store.default_platform must not be empty"));
        }
        if !(100..=999).contains(&self.store.default_country_code) {
            return Err(invalid("store.default_country_code must be a three digit mobile country code"));
        }
        if self.store.default_logger_application.trim().is_empty() {
            return Err(invalid("store.default_logger_application must not be empty"));
        }

        Ok(())
    }

    /// Get log level from environment or config
    #[must_use]
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }
}

fn invalid(message: &str) -> ActivityLoggerError {
    ActivityLoggerError::InvalidConfig(message.to_string())
}
