//! Time-of-day windows restricting when the automation may trigger.
//!
//! A window is a pair of `HH:MM` strings. When `end` is before `start`
//! the window crosses midnight: the boundary that does not contain the
//! current day is moved by one day and recomputed on the wall clock, so a
//! daylight-saving shift between the two boundaries is absorbed.

use std::fmt;

use chrono::{DateTime, Days, NaiveTime, TimeDelta, TimeZone, Timelike};
use serde::{Deserialize, Serialize};

use crate::time::resolve_local;

/// A parsed `HH:MM` time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    /// Parse `H:M`, `HH:MM` and mixed one/two digit forms.
    ///
    /// Returns `None` for anything else, including out-of-range values.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let (hour, minute) = input.split_once(':')?;
        let hour = parse_component(hour)?;
        let minute = parse_component(minute)?;
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    #[must_use]
    pub fn as_naive(self) -> NaiveTime {
        self.0
    }
}

fn parse_component(raw: &str) -> Option<u32> {
    if raw.is_empty() || raw.len() > 2 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

/// A daily window during which triggering is permitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window, `HH:MM`.
    pub start: String,
    /// End of the window, `HH:MM`, inclusive.
    pub end: String,
}

impl TimeWindow {
    #[must_use]
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Check whether `now` lies inside this window.
    ///
    /// Comparison happens at minute resolution: the whole `end` minute is
    /// still inside the window. Returns `None` when either boundary cannot
    /// be parsed or resolved.
    #[must_use]
    pub fn contains<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<bool> {
        let start = TimeOfDay::parse(&self.start)?.as_naive();
        let end = TimeOfDay::parse(&self.end)?.as_naive();
        let tz = now.timezone();
        // truncate on the instant: `with_second` gives up on ambiguous local times
        let now = now.clone()
            - TimeDelta::seconds(i64::from(now.second()))
            - TimeDelta::nanoseconds(i64::from(now.nanosecond()));
        let today = now.date_naive();

        let mut start_at = resolve_local(&tz, today.and_time(start))?;
        let mut end_at = resolve_local(&tz, today.and_time(end))?;

        if end_at < start_at {
            if now > start_at {
                let tomorrow = today.checked_add_days(Days::new(1))?;
                end_at = resolve_local(&tz, tomorrow.and_time(end))?;
            } else if end_at >= now {
                let yesterday = today.checked_sub_days(Days::new(1))?;
                start_at = resolve_local(&tz, yesterday.and_time(start))?;
            }
        }

        Some(now >= start_at && now <= end_at)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Evaluate a list of windows (logical OR).
///
/// Malformed windows are skipped. Returns `None` when no window could be
/// checked, so an empty or fully malformed list never overrides the
/// caller's result.
#[must_use]
pub fn check_windows<Tz: TimeZone>(windows: &[TimeWindow], now: &DateTime<Tz>) -> Option<bool> {
    let mut checked = None;
    for window in windows {
        match window.contains(now) {
            Some(true) => return Some(true),
            Some(false) => checked = Some(false),
            None => {}
        }
    }
    checked
}
