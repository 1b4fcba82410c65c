//! Virtual device declarations and command handling.
//!
//! Devices are declared with a [`DeviceSpec`] (typically from the daemon's
//! `[[devices]]` configuration). Switches accept commands, sensors only
//! change through [`VirtualRegistry::set_level`](crate::VirtualRegistry::set_level).

mod switch;

use serde::{Deserialize, Serialize};

use motiontrigger_domain::device::{Device, DeviceCommand, DeviceType, Level};
use motiontrigger_domain::error::{TriggerError, ValidationError};
use motiontrigger_domain::id::DeviceId;

/// Declaration of a simulated device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSpec {
    pub id: DeviceId,
    pub device_type: DeviceType,
    /// Initial level, `off` or `0` by default.
    #[serde(default)]
    pub level: Option<Level>,
    #[serde(default)]
    pub title: Option<String>,
}

impl DeviceSpec {
    #[must_use]
    pub fn new(id: impl Into<DeviceId>, device_type: DeviceType) -> Self {
        Self {
            id: id.into(),
            device_type,
            level: None,
            title: None,
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }

    /// Build the device snapshot this spec describes.
    #[must_use]
    pub fn into_device(self) -> Device {
        let level = self
            .level
            .unwrap_or_else(|| resting_level(&self.device_type));
        let device = Device::new(self.id, self.device_type, level);
        match self.title {
            Some(title) => device.with_title(title),
            None => device,
        }
    }
}

fn resting_level(device_type: &DeviceType) -> Level {
    if device_type.is_multilevel() {
        Level::from(0.0)
    } else {
        Level::off()
    }
}

/// Apply `command` to `device`, returning whether its level changed.
///
/// # Errors
///
/// Returns [`ValidationError::UnsupportedCommand`] for devices that are not
/// switches.
pub(crate) fn apply_command(
    device: &mut Device,
    command: DeviceCommand,
) -> Result<bool, TriggerError> {
    let Some(level) = switch::level_after(&device.device_type, command) else {
        return Err(ValidationError::UnsupportedCommand {
            device: device.id.to_string(),
            command: command.to_string(),
        }
        .into());
    };
    let changed = !device.level.strict_eq(&level);
    device.level = level;
    Ok(changed)
}
