//! Tokio-backed [`Scheduler`]: timers are tasks posting to the engine inbox.

use std::time::Duration;

use tokio::sync::mpsc::{UnboundedSender, WeakUnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at, sleep};

use motiontrigger_domain::timer::TimerToken;

use super::EngineMessage;
use crate::ports::Scheduler;

/// Runs the release timer and the recheck interval as tokio tasks.
///
/// Timer tasks only hold a weak handle on the inbox, so they never keep a
/// stopped engine alive.
pub struct TokioScheduler {
    inbox: WeakUnboundedSender<EngineMessage>,
    next: u64,
    release: Option<JoinHandle<()>>,
    recheck: Option<JoinHandle<()>>,
}

impl TokioScheduler {
    #[must_use]
    pub fn new(inbox: &UnboundedSender<EngineMessage>) -> Self {
        Self {
            inbox: inbox.downgrade(),
            next: 0,
            release: None,
            recheck: None,
        }
    }

    fn next_token(&mut self) -> TimerToken {
        self.next += 1;
        TimerToken::new(self.next)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_release(&mut self, delay: Duration) -> TimerToken {
        self.cancel_release();
        let token = self.next_token();
        let inbox = self.inbox.clone();
        self.release = Some(tokio::spawn(async move {
            sleep(delay).await;
            if let Some(inbox) = inbox.upgrade() {
                let _ = inbox.send(EngineMessage::ReleaseDue(token));
            }
        }));
        token
    }

    fn cancel_release(&mut self) {
        if let Some(handle) = self.release.take() {
            handle.abort();
        }
    }

    fn start_recheck(&mut self, period: Duration) -> TimerToken {
        self.stop_recheck();
        let token = self.next_token();
        let inbox = self.inbox.clone();
        self.recheck = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(inbox) = inbox.upgrade() else {
                    break;
                };
                if inbox.send(EngineMessage::Recheck(token)).is_err() {
                    break;
                }
            }
        }));
        token
    }

    fn stop_recheck(&mut self) {
        if let Some(handle) = self.recheck.take() {
            handle.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        self.cancel_release();
        self.stop_recheck();
    }
}
