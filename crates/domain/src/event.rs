//! Event: an immutable record of a device level change.
//!
//! The registry publishes one [`DeviceEvent`] per `metrics:level` change;
//! automation instances listen for the ones concerning their sensors.

use serde::{Deserialize, Serialize};

use crate::device::Level;
use crate::id::DeviceId;
use crate::time::{Timestamp, now};

/// A device reported a new level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    pub device_id: DeviceId,
    pub level: Level,
    pub timestamp: Timestamp,
}

impl DeviceEvent {
    #[must_use]
    pub fn level_changed(device_id: DeviceId, level: Level) -> Self {
        Self {
            device_id,
            level,
            timestamp: now(),
        }
    }
}
