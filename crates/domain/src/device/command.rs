//! Commands the automation sends to registry devices.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A command understood by switch devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum DeviceCommand {
    On,
    Off,
    /// Set a multilevel device to an exact level.
    Exact { level: u8 },
}

impl DeviceCommand {
    /// Registry command name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Exact { .. } => "exact",
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact { level } => write!(f, "exact({level})"),
            other => f.write_str(other.name()),
        }
    }
}
