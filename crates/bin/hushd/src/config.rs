//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `hush.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::time::Duration;

use hush_adapter_virtual::DeviceSettings;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Periodic maintenance.
    pub reconcile: ReconcileConfig,
    /// Simulated device.
    pub device: DeviceConfig,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
    /// Milliseconds a writer waits on a locked database file.
    pub busy_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Seconds between two stale-trigger sweeps.
    pub sweep_interval_secs: u64,
}

/// Simulated device knobs.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Maximum number of regions watched at once.
    pub region_capacity: usize,
    /// Allow exact timers.
    pub exact_timers: bool,
}

impl Config {
    /// Load configuration from `hush.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("hush.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HUSH_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("HUSH_SWEEP_INTERVAL_SECS") {
            if let Ok(secs) = val.parse() {
                self.reconcile.sweep_interval_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("HUSH_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.reconcile.sweep_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "sweep interval must be non-zero".to_string(),
            ));
        }
        if self.device.region_capacity == 0 {
            return Err(ConfigError::Validation(
                "region capacity must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn database_busy_timeout(&self) -> Duration {
        Duration::from_millis(self.database.busy_timeout_ms)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile.sweep_interval_secs)
    }

    #[must_use]
    pub fn device_settings(&self) -> DeviceSettings {
        DeviceSettings {
            region_capacity: self.device.region_capacity,
            exact_timers: self.device.exact_timers,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:hush.db?mode=rwc".to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "hushd=info,hush_app=info,hush_adapter_virtual=info".to_string(),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: 900,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let settings = DeviceSettings::default();
        Self {
            region_capacity: settings.region_capacity,
            exact_timers: settings.exact_timers,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
