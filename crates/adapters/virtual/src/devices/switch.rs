//! Virtual switches: binary relays and dimmers.

use motiontrigger_domain::device::{DeviceCommand, DeviceType, Level};
use motiontrigger_domain::dimmer::MAX_DIMMER_LEVEL;

/// Level a switch reports after `command`, `None` for non-switches.
///
/// Dimmers switched `on` go to full level.
pub(crate) fn level_after(device_type: &DeviceType, command: DeviceCommand) -> Option<Level> {
    match (device_type, command) {
        (DeviceType::SwitchBinary, DeviceCommand::On) => Some(Level::on()),
        (DeviceType::SwitchBinary, DeviceCommand::Off) => Some(Level::off()),
        (DeviceType::SwitchBinary, DeviceCommand::Exact { level }) => {
            Some(if level > 0 { Level::on() } else { Level::off() })
        }
        (DeviceType::SwitchMultilevel, DeviceCommand::On) => {
            Some(Level::from(f64::from(MAX_DIMMER_LEVEL)))
        }
        (DeviceType::SwitchMultilevel, DeviceCommand::Off) => Some(Level::from(0.0)),
        (DeviceType::SwitchMultilevel, DeviceCommand::Exact { level }) => {
            Some(Level::from(f64::from(level.min(MAX_DIMMER_LEVEL))))
        }
        _ => None,
    }
}
