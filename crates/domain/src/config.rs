//! Per-instance configuration of the automation.
//!
//! Field names follow the host platform's camelCase module schema so an
//! exported module configuration deserialises unchanged.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::dimmer::DimmerLevel;
use crate::error::{TriggerError, ValidationError};
use crate::id::DeviceId;
use crate::precondition::Precondition;
use crate::window::TimeWindow;

/// Longest accepted release timeout, one year in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 365 * 24 * 60 * 60;

/// Immutable configuration of one automation instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TriggerConfig {
    /// Sensors whose activity arms the trigger.
    pub security_sensors: Vec<DeviceId>,
    /// Lights switched by the automation.
    pub lights: Vec<DeviceId>,
    /// Lights that, when already on, suppress a new trigger.
    pub extra_lights: Vec<DeviceId>,
    /// Comparisons that must all hold.
    pub preconditions: Vec<Precondition>,
    /// Windows of the day during which triggering is allowed.
    pub time_active: Vec<TimeWindow>,
    /// Seconds to keep the lights on after the sensors go quiet.
    pub timeout: u64,
    /// Poll the preconditions while triggered.
    pub recheck_preconditions: bool,
    pub dimmer_level: DimmerLevel,
}

impl TriggerConfig {
    /// Create a builder for constructing a [`TriggerConfig`].
    #[must_use]
    pub fn builder() -> TriggerConfigBuilder {
        TriggerConfigBuilder::default()
    }

    /// Delay before releasing the lights, `None` for an immediate release.
    #[must_use]
    pub fn release_delay(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError::Validation`] when:
    /// - `security_sensors` is empty ([`ValidationError::NoSecuritySensors`])
    /// - `lights` is empty ([`ValidationError::NoLights`])
    /// - `timeout` exceeds [`MAX_TIMEOUT_SECS`] ([`ValidationError::TimeoutOutOfRange`])
    pub fn validate(&self) -> Result<(), TriggerError> {
        if self.security_sensors.is_empty() {
            return Err(ValidationError::NoSecuritySensors.into());
        }
        if self.lights.is_empty() {
            return Err(ValidationError::NoLights.into());
        }
        if self.timeout > MAX_TIMEOUT_SECS {
            return Err(ValidationError::TimeoutOutOfRange(self.timeout).into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`TriggerConfig`].
#[derive(Debug, Default)]
pub struct TriggerConfigBuilder {
    config: TriggerConfig,
}

impl TriggerConfigBuilder {
    #[must_use]
    pub fn security_sensor(mut self, id: impl Into<DeviceId>) -> Self {
        self.config.security_sensors.push(id.into());
        self
    }

    #[must_use]
    pub fn light(mut self, id: impl Into<DeviceId>) -> Self {
        self.config.lights.push(id.into());
        self
    }

    #[must_use]
    pub fn extra_light(mut self, id: impl Into<DeviceId>) -> Self {
        self.config.extra_lights.push(id.into());
        self
    }

    #[must_use]
    pub fn precondition(mut self, precondition: Precondition) -> Self {
        self.config.preconditions.push(precondition);
        self
    }

    #[must_use]
    pub fn time_active(mut self, window: TimeWindow) -> Self {
        self.config.time_active.push(window);
        self
    }

    #[must_use]
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.timeout = seconds;
        self
    }

    #[must_use]
    pub fn recheck_preconditions(mut self, recheck: bool) -> Self {
        self.config.recheck_preconditions = recheck;
        self
    }

    #[must_use]
    pub fn dimmer_level(mut self, level: DimmerLevel) -> Self {
        self.config.dimmer_level = level;
        self
    }

    /// Consume the builder, validate, and return a [`TriggerConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError::Validation`] if sensors or lights are missing.
    pub fn build(self) -> Result<TriggerConfig, TriggerError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
