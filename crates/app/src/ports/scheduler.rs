//! Scheduler port: the release timer and the recheck interval.

use std::time::Duration;

use motiontrigger_domain::timer::TimerToken;

/// Arms and cancels the two timers of one automation instance.
///
/// At most one release and one recheck are armed at any time: arming
/// again replaces the previous timer. A timer reports back with the
/// [`TimerToken`] it was armed with.
pub trait Scheduler {
    /// Arm the single-shot release timer.
    fn schedule_release(&mut self, delay: Duration) -> TimerToken;

    /// Cancel the release timer, if any.
    fn cancel_release(&mut self);

    /// Arm the repeating recheck timer.
    fn start_recheck(&mut self, period: Duration) -> TimerToken;

    /// Cancel the recheck timer, if any.
    fn stop_recheck(&mut self);
}
