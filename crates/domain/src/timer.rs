//! Timer bookkeeping for the release timeout and the precondition recheck.

use std::fmt;
use std::time::Duration;

use crate::time::Timestamp;

/// Period of the precondition recheck while triggered.
pub const RECHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Identifies one scheduled timer.
///
/// A firing carries the token it was armed with; a firing whose token no
/// longer matches the current one belongs to a cancelled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

impl TimerToken {
    #[must_use]
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State of the single-shot release timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseState {
    #[default]
    Idle,
    Scheduled {
        deadline: Timestamp,
        token: TimerToken,
    },
}

impl ReleaseState {
    #[must_use]
    pub fn is_scheduled(&self) -> bool {
        matches!(self, Self::Scheduled { .. })
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Timestamp> {
        match self {
            Self::Scheduled { deadline, .. } => Some(*deadline),
            Self::Idle => None,
        }
    }

    /// Whether a firing with `token` belongs to the armed timer.
    #[must_use]
    pub fn is_armed_with(&self, token: TimerToken) -> bool {
        matches!(self, Self::Scheduled { token: armed, .. } if *armed == token)
    }
}
