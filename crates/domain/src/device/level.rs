//! Device level: the `metrics:level` value of a registry device.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A device's current level, or a value compared against one.
///
/// Binary devices report the texts `on`/`off`, multilevel devices a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Level {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Level {
    #[must_use]
    pub fn on() -> Self {
        Self::Text("on".to_string())
    }

    #[must_use]
    pub fn off() -> Self {
        Self::Text("off".to_string())
    }

    /// Whether this is the binary `on` level.
    #[must_use]
    pub fn is_on(&self) -> bool {
        match self {
            Self::Text(text) => text == "on",
            Self::Bool(value) => *value,
            Self::Number(_) => false,
        }
    }

    /// Numeric reading of a multilevel device.
    ///
    /// Numeric texts are accepted since some devices report their level as
    /// a string.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(text) => text.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    /// Numeric view used by dimmer formulas: binary `on`/`off` read as 99/0.
    #[must_use]
    pub fn as_dimmer_input(&self) -> Option<f64> {
        match self {
            Self::Text(text) if text == "on" => Some(99.0),
            Self::Text(text) if text == "off" => Some(0.0),
            Self::Bool(value) => Some(if *value { 99.0 } else { 0.0 }),
            other => other.as_number(),
        }
    }

    /// Strict equality: values of different kinds are never equal.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn strict_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            _ => false,
        }
    }

    /// Ordering between values of the same kind, `None` otherwise.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<f64> for Level {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Level {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}
