//! Evaluator: sensor activity, preconditions and time windows.
//!
//! Evaluation never fails: missing devices are skipped, unsupported device
//! types and unknown operators are logged and count as not satisfied.

use chrono::{DateTime, TimeZone};

use motiontrigger_domain::device::{Device, DeviceCommand, DeviceType};
use motiontrigger_domain::id::DeviceId;
use motiontrigger_domain::precondition::Precondition;
use motiontrigger_domain::window::{TimeWindow, check_windows};

use crate::ports::DeviceRegistry;

/// Fetch a device, treating registry failures like a missing device.
pub(crate) async fn lookup<R: DeviceRegistry>(registry: &R, id: &DeviceId) -> Option<Device> {
    match registry.get(id).await {
        Ok(Some(device)) => Some(device),
        Ok(None) => {
            tracing::debug!(device = %id, "device not found");
            None
        }
        Err(err) => {
            tracing::warn!(device = %id, error = %err, "failed to read device");
            None
        }
    }
}

/// Whether at least one of `devices` reports activity.
///
/// An empty list is never active.
pub async fn check_device<R: DeviceRegistry>(registry: &R, devices: &[DeviceId]) -> bool {
    let mut status = false;
    for id in devices {
        let Some(device) = lookup(registry, id).await else {
            continue;
        };
        match device.is_active() {
            Ok(active) => status |= active,
            Err(err) => {
                tracing::error!(
                    device = %err.device_id,
                    device_type = %err.device_type,
                    "unsupported device type"
                );
            }
        }
    }
    status
}

/// Whether every precondition holds and, when windows are configured, `now`
/// falls inside one of them.
pub async fn check_precondition<R, Tz>(
    registry: &R,
    preconditions: &[Precondition],
    windows: &[TimeWindow],
    now: &DateTime<Tz>,
) -> bool
where
    R: DeviceRegistry,
    Tz: TimeZone,
{
    let mut check = true;
    for precondition in preconditions {
        let Some(device) = lookup(registry, &precondition.device).await else {
            continue;
        };
        match precondition.holds(&device.level) {
            Some(true) => {}
            Some(false) => {
                tracing::debug!(%precondition, level = %device.level, "precondition failed");
                check = false;
            }
            None => {
                tracing::error!(
                    operator = %precondition.test_operator,
                    "unknown comparison operator"
                );
                check = false;
            }
        }
    }
    tracing::debug!(check, "evaluated preconditions");

    if check && check_windows(windows, now) == Some(false) {
        tracing::debug!("outside of every time window");
        check = false;
    }
    check
}

/// Command switching a light on or off, `None` for devices that cannot be
/// switched.
///
/// Multilevel lights go to `level` when switched on and are turned off
/// outright when the level is zero.
#[must_use]
pub fn light_command(device_type: &DeviceType, mode: bool, level: u8) -> Option<DeviceCommand> {
    match device_type {
        DeviceType::SwitchBinary if mode => Some(DeviceCommand::On),
        DeviceType::SwitchBinary => Some(DeviceCommand::Off),
        DeviceType::SwitchMultilevel => {
            let level = if mode { level } else { 0 };
            if level == 0 {
                Some(DeviceCommand::Off)
            } else {
                Some(DeviceCommand::Exact { level })
            }
        }
        _ => None,
    }
}
