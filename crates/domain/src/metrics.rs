//! Metrics of the virtual switch an automation instance exposes.
//!
//! These are persisted by the host so that a restart can resume a pending
//! release or a triggered state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::DeviceId;
use crate::time::Timestamp;

const ICON_BASE: &str = "/ZAutomation/api/v1/load/modulemedia/MotionTrigger";

/// Enable state of the virtual switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchLevel {
    On,
    #[default]
    Off,
}

impl SwitchLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for SwitchLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SwitchLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            other => Err(other.to_string()),
        }
    }
}

/// Display status shown as the switch's icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Off,
    On,
    Triggered,
    Timeout,
}

impl Status {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
            Self::Triggered => "triggered",
            Self::Timeout => "timeout",
        }
    }

    /// Icon path served by the host for this status.
    #[must_use]
    pub fn icon(self) -> String {
        format!("{ICON_BASE}/icon_{}.png", self.as_str())
    }
}

impl From<SwitchLevel> for Status {
    fn from(level: SwitchLevel) -> Self {
        match level {
            SwitchLevel::On => Self::On,
            SwitchLevel::Off => Self::Off,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "on" => Ok(Self::On),
            "triggered" => Ok(Self::Triggered),
            "timeout" => Ok(Self::Timeout),
            other => Err(other.to_string()),
        }
    }
}

/// Persisted metrics of the virtual switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub device_id: DeviceId,
    /// Whether the automation is enabled.
    pub level: SwitchLevel,
    /// Whether the lights are currently driven by the automation.
    pub triggered: bool,
    /// Absolute release deadline while a release timer is armed.
    pub timeout: Option<Timestamp>,
    pub icon: Status,
    pub title: String,
    pub probe_title: String,
}

impl Metrics {
    /// Defaults of a freshly created switch.
    #[must_use]
    pub fn new(device_id: DeviceId, title: impl Into<String>) -> Self {
        Self {
            device_id,
            level: SwitchLevel::Off,
            triggered: false,
            timeout: None,
            icon: Status::Off,
            title: title.into(),
            probe_title: "controller".to_string(),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.level == SwitchLevel::On
    }
}
