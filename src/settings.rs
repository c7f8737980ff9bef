use chrono::Duration;
use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use crate::validation::DurationBounds;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub debug: bool,
    pub enable_swagger: bool,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_ms: u64,
    pub min_class_minutes: i64,
    pub max_class_hours: i64,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let config = Config::builder()
            // Load from environment variables with APP_ prefix
            .add_source(Environment::with_prefix("APP").prefix_separator("_"))
            .set_default("debug", false)?
            .set_default("enable_swagger", true)?
            .set_default("port", 8080)?
            .set_default("database_url", "sqlite://gym_booking.db")?
            .set_default("db_max_connections", 5)?
            .set_default("db_timeout_ms", 5000)?
            .set_default("min_class_minutes", 1)?
            .set_default("max_class_hours", 24)?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        settings.checked_duration_bounds()?;
        Ok(settings)
    }

    /// Bounds for class durations. Values are range-checked by `from_env`;
    /// settings built by hand with out-of-range values fall back to the
    /// defaults.
    pub fn duration_bounds(&self) -> DurationBounds {
        self.checked_duration_bounds().unwrap_or_default()
    }

    fn checked_duration_bounds(&self) -> Result<DurationBounds, ConfigError> {
        let min = Duration::try_minutes(self.min_class_minutes).ok_or_else(|| {
            ConfigError::Message(format!(
                "min_class_minutes out of range: {}",
                self.min_class_minutes
            ))
        })?;
        let max = Duration::try_hours(self.max_class_hours).ok_or_else(|| {
            ConfigError::Message(format!(
                "max_class_hours out of range: {}",
                self.max_class_hours
            ))
        })?;
        if min < Duration::zero() || max < min {
            return Err(ConfigError::Message(format!(
                "invalid class duration bounds: min {} minutes, max {} hours",
                self.min_class_minutes, self.max_class_hours
            )));
        }
        Ok(DurationBounds { min, max })
    }

    pub fn db_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.db_timeout_ms)
    }
}
