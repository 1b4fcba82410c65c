//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `motiontrigger.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use motiontrigger_adapter_virtual::DeviceSpec;
use motiontrigger_domain::config::TriggerConfig;
use motiontrigger_domain::error::{TriggerError, ValidationError};
use motiontrigger_domain::id::InstanceId;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Runtime settings shared by every instance.
    pub runtime: RuntimeConfig,
    /// Automation instances.
    pub instances: Vec<InstanceConfig>,
    /// Simulated devices of the virtual registry.
    pub devices: Vec<DeviceSpec>,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
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
pub struct RuntimeConfig {
    /// Seconds to wait after start before recovering persisted state.
    pub settle_secs: u64,
}

/// One automation instance.
#[derive(Debug, Deserialize)]
pub struct InstanceConfig {
    pub id: InstanceId,
    #[serde(flatten)]
    pub trigger: TriggerConfig,
}

impl Config {
    /// Load configuration from `motiontrigger.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// result does not validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("motiontrigger.toml")?;
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
        if let Ok(val) = std::env::var("MOTIONTRIGGER_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("MOTIONTRIGGER_SETTLE_SECS") {
            if let Ok(secs) = val.parse() {
                self.runtime.settle_secs = secs;
            }
        }
        if let Ok(val) = std::env::var("MOTIONTRIGGER_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for instance in &self.instances {
            if instance.id.as_str().trim().is_empty() {
                return Err(ValidationError::EmptyName.into());
            }
            if !seen.insert(&instance.id) {
                return Err(ValidationError::DuplicateId(instance.id.to_string()).into());
            }
            instance
                .trigger
                .validate()
                .map_err(|source| ConfigError::Instance {
                    id: instance.id.to_string(),
                    source,
                })?;
        }

        let mut devices = HashSet::new();
        for device in &self.devices {
            if device.id.as_str().trim().is_empty() {
                return Err(ValidationError::EmptyName.into());
            }
            if !devices.insert(&device.id) {
                return Err(ValidationError::DuplicateId(device.id.to_string()).into());
            }
        }
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.runtime.settle_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:motiontrigger.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "motiontriggerd=info,motiontrigger_app=info".to_string(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { settle_secs: 10 }
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
    #[error("invalid configuration")]
    Validation(#[from] ValidationError),
    /// An instance's trigger configuration is invalid.
    #[error("invalid instance {id}")]
    Instance {
        id: String,
        #[source]
        source: TriggerError,
    },
}
