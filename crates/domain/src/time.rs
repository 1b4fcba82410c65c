//! Time and timestamp helpers.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// UTC timestamp used for persisted deadlines and event times.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Return the current wall-clock time in the host's local zone.
#[must_use]
pub fn local_now() -> DateTime<Local> {
    Local::now()
}

/// Resolve a wall-clock date-time in `tz`.
///
/// Ambiguous times (clocks going back) pick the earliest instant. Times that
/// do not exist (clocks going forward) are moved past the gap, one hour
/// being the only shift observed in practice.
#[must_use]
pub fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive).earliest().or_else(|| {
        let shifted = naive + chrono::Duration::hours(1);
        tz.from_local_datetime(&shifted).earliest()
    })
}
