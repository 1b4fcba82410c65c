//! Dimmer level applied to multilevel lights when the automation triggers.
//!
//! Configured either as a fixed level or as a [`Formula`] evaluated at
//! trigger time. Both resolve to an integer in `0..=99`.

mod formula;

pub use formula::{Formula, FormulaContext, FormulaError, MAX_NESTING};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Highest level a multilevel device accepts.
pub const MAX_DIMMER_LEVEL: u8 = 99;

/// Configured dimmer level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDimmerLevel", into = "RawDimmerLevel")]
pub enum DimmerLevel {
    Fixed(u8),
    Formula(Formula),
}

impl Default for DimmerLevel {
    fn default() -> Self {
        Self::Fixed(MAX_DIMMER_LEVEL)
    }
}

impl DimmerLevel {
    /// Resolve to a concrete level.
    ///
    /// # Errors
    ///
    /// Returns [`FormulaError`] when the formula cannot be parsed or
    /// evaluated. Callers fall back to [`MAX_DIMMER_LEVEL`].
    pub fn resolve(&self, ctx: &FormulaContext) -> Result<u8, FormulaError> {
        match self {
            Self::Fixed(level) => Ok((*level).min(MAX_DIMMER_LEVEL)),
            Self::Formula(formula) => formula.evaluate(ctx).map(clamp_level),
        }
    }
}

/// Truncate towards zero and clamp into `0..=99`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_level(value: f64) -> u8 {
    value.trunc().clamp(0.0, f64::from(MAX_DIMMER_LEVEL)) as u8
}

/// Wire form: an integer, or a string holding digits or a formula.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawDimmerLevel {
    Int(i64),
    Text(String),
}

impl TryFrom<RawDimmerLevel> for DimmerLevel {
    type Error = ValidationError;

    fn try_from(raw: RawDimmerLevel) -> Result<Self, Self::Error> {
        let fixed = |n: i64| {
            u8::try_from(n)
                .ok()
                .filter(|level| *level <= MAX_DIMMER_LEVEL)
                .map(Self::Fixed)
                .ok_or(ValidationError::DimmerLevelOutOfRange(n))
        };
        match raw {
            RawDimmerLevel::Int(n) => fixed(n),
            RawDimmerLevel::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    Ok(Self::default())
                } else if trimmed.bytes().all(|b| b.is_ascii_digit()) {
                    let n = trimmed
                        .parse::<i64>()
                        .map_err(|_| ValidationError::DimmerLevelOutOfRange(i64::MAX))?;
                    fixed(n)
                } else {
                    Ok(Self::Formula(Formula::new(text)))
                }
            }
        }
    }
}

impl From<DimmerLevel> for RawDimmerLevel {
    fn from(value: DimmerLevel) -> Self {
        match value {
            DimmerLevel::Fixed(level) => Self::Int(i64::from(level)),
            DimmerLevel::Formula(formula) => Self::Text(formula.source().to_string()),
        }
    }
}
