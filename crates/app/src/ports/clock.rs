//! Clock port.

use std::sync::Arc;

use chrono::{DateTime, Local};

/// Source of wall-clock time.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;
}

/// The host's clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        motiontrigger_domain::time::local_now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> DateTime<Local> {
        (**self).now()
    }
}
