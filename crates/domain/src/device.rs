//! Device: a point-in-time view of something in the host registry.
//!
//! The automation never caches devices: it reads a [`Device`] snapshot
//! whenever it needs a level and issues [`DeviceCommand`]s to change one.

mod command;
mod level;

pub use command::DeviceCommand;
pub use level::Level;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;

/// The registry's device type tag.
///
/// Only binary and multilevel switches/sensors take part in the automation;
/// every other type is carried verbatim so it can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceType {
    SwitchBinary,
    SensorBinary,
    SwitchMultilevel,
    SensorMultilevel,
    Other(String),
}

impl DeviceType {
    /// Binary devices report `on`/`off`.
    #[must_use]
    pub fn is_binary(&self) -> bool {
        matches!(self, Self::SwitchBinary | Self::SensorBinary)
    }

    /// Multilevel devices report a numeric level.
    #[must_use]
    pub fn is_multilevel(&self) -> bool {
        matches!(self, Self::SwitchMultilevel | Self::SensorMultilevel)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::SwitchBinary => "switchBinary",
            Self::SensorBinary => "sensorBinary",
            Self::SwitchMultilevel => "switchMultilevel",
            Self::SensorMultilevel => "sensorMultilevel",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for DeviceType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "switchBinary" => Self::SwitchBinary,
            "sensorBinary" => Self::SensorBinary,
            "switchMultilevel" => Self::SwitchMultilevel,
            "sensorMultilevel" => Self::SensorMultilevel,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for DeviceType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<DeviceType> for String {
    fn from(value: DeviceType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The device type cannot take part in evaluation or actuation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported device type {device_type} for {device_id}")]
pub struct UnsupportedDeviceType {
    pub device_id: DeviceId,
    pub device_type: DeviceType,
}

/// Snapshot of a registry device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub device_type: DeviceType,
    pub level: Level,
    #[serde(default)]
    pub title: String,
    /// Set when the last change was issued by an automation rather than by hand.
    #[serde(default)]
    pub auto: bool,
}

impl Device {
    #[must_use]
    pub fn new(id: impl Into<DeviceId>, device_type: DeviceType, level: Level) -> Self {
        let id = id.into();
        Self {
            title: id.to_string(),
            id,
            device_type,
            level,
            auto: false,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Whether the device currently reports activity.
    ///
    /// Binary devices are active when `on`, multilevel devices when their
    /// level is above zero.
    ///
    /// # Errors
    ///
    /// Returns [`UnsupportedDeviceType`] for any other device type.
    pub fn is_active(&self) -> Result<bool, UnsupportedDeviceType> {
        if self.device_type.is_binary() {
            Ok(self.level.is_on())
        } else if self.device_type.is_multilevel() {
            Ok(self.level.as_number().is_some_and(|n| n > 0.0))
        } else {
            Err(UnsupportedDeviceType {
                device_id: self.id.clone(),
                device_type: self.device_type.clone(),
            })
        }
    }
}
