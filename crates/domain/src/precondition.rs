//! Precondition: a comparison against another device's level.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::device::Level;
use crate::id::DeviceId;

/// Comparison operator of a precondition.
///
/// Unrecognised operators are kept so they can be reported; they never
/// evaluate to a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Unknown(String),
}

impl Operator {
    /// Compare a device level against a configured value.
    ///
    /// Returns `None` for [`Operator::Unknown`]. Mixed-kind values are
    /// never equal and never ordered.
    #[must_use]
    pub fn apply(&self, level: &Level, value: &Level) -> Option<bool> {
        let ordering = || level.compare(value);
        let result = match self {
            Self::Eq => level.strict_eq(value),
            Self::Ne => !level.strict_eq(value),
            Self::Gt => ordering() == Some(Ordering::Greater),
            Self::Lt => ordering() == Some(Ordering::Less),
            Self::Ge => matches!(ordering(), Some(Ordering::Greater | Ordering::Equal)),
            Self::Le => matches!(ordering(), Some(Ordering::Less | Ordering::Equal)),
            Self::Unknown(_) => return None,
        };
        Some(result)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Unknown(op) => op,
        }
    }
}

impl From<String> for Operator {
    fn from(value: String) -> Self {
        match value.as_str() {
            "=" => Self::Eq,
            "!=" => Self::Ne,
            ">" => Self::Gt,
            "<" => Self::Lt,
            ">=" => Self::Ge,
            "<=" => Self::Le,
            _ => Self::Unknown(value),
        }
    }
}

impl From<&str> for Operator {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Operator> for String {
    fn from(value: Operator) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `{device, testOperator, testValue}` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Precondition {
    pub device: DeviceId,
    pub test_operator: Operator,
    pub test_value: Level,
}

impl Precondition {
    #[must_use]
    pub fn new(device: impl Into<DeviceId>, test_operator: Operator, test_value: Level) -> Self {
        Self {
            device: device.into(),
            test_operator,
            test_value,
        }
    }

    /// Evaluate against the device's current level; `None` when the
    /// operator is unknown.
    #[must_use]
    pub fn holds(&self, level: &Level) -> Option<bool> {
        self.test_operator.apply(level, &self.test_value)
    }
}

impl fmt::Display for Precondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.device, self.test_operator, self.test_value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_all_known_operators() {
        for (raw, op) in [
            ("=", Operator::Eq),
            ("!=", Operator::Ne),
            (">", Operator::Gt),
            ("<", Operator::Lt),
            (">=", Operator::Ge),
            ("<=", Operator::Le),
        ] {
            assert_eq!(Operator::from(raw), op);
            assert_eq!(op.as_str(), raw);
        }
    }

    #[test]
    fn should_return_none_for_unknown_operator() {
        let op = Operator::from("~=");
        assert_eq!(op.apply(&Level::Number(1.0), &Level::Number(1.0)), None);
    }

    #[test]
    fn should_compare_numbers() {
        let five = Level::Number(5.0);
        let ten = Level::Number(10.0);
        assert_eq!(Operator::Lt.apply(&five, &ten), Some(true));
        assert_eq!(Operator::Gt.apply(&five, &ten), Some(false));
        assert_eq!(Operator::Ge.apply(&ten, &ten), Some(true));
        assert_eq!(Operator::Le.apply(&ten, &five), Some(false));
        assert_eq!(Operator::Eq.apply(&five, &five), Some(true));
        assert_eq!(Operator::Ne.apply(&five, &ten), Some(true));
    }

    #[test]
    fn should_compare_binary_levels_by_text() {
        assert_eq!(Operator::Eq.apply(&Level::on(), &Level::on()), Some(true));
        assert_eq!(Operator::Eq.apply(&Level::off(), &Level::on()), Some(false));
        assert_eq!(Operator::Ne.apply(&Level::off(), &Level::on()), Some(true));
    }

    #[test]
    fn should_fail_ordering_between_mixed_kinds() {
        assert_eq!(
            Operator::Gt.apply(&Level::Number(5.0), &Level::from("a")),
            Some(false)
        );
        assert_eq!(
            Operator::Le.apply(&Level::Number(5.0), &Level::from("a")),
            Some(false)
        );
    }

    #[test]
    fn should_deserialize_precondition_from_camel_case_json() {
        let json = serde_json::json!({
            "device": "lux.sensor",
            "testOperator": "<",
            "testValue": 40
        });
        let p: Precondition = serde_json::from_value(json).unwrap();
        assert_eq!(p.device, DeviceId::new("lux.sensor"));
        assert_eq!(p.test_operator, Operator::Lt);
        assert_eq!(p.holds(&Level::Number(12.0)), Some(true));
        assert_eq!(p.to_string(), "lux.sensor < 40");
    }

    #[test]
    fn should_keep_unknown_operator_when_deserializing() {
        let json = serde_json::json!({
            "device": "lux.sensor",
            "testOperator": "between",
            "testValue": 40
        });
        let p: Precondition = serde_json::from_value(json).unwrap();
        assert_eq!(p.test_operator, Operator::Unknown("between".to_string()));
        assert_eq!(p.holds(&Level::Number(12.0)), None);
    }
}
