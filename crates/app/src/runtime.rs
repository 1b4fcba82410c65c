//! Runtime: one actor task per automation instance.
//!
//! The task owns its [`TriggerEngine`] and handles one [`EngineMessage`]
//! or device event at a time, so a trigger evaluation, a timer firing and a
//! command never interleave. Device events are only listened to once the
//! settle delay has elapsed and the persisted state has been recovered.

mod scheduler;

use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use motiontrigger_domain::config::TriggerConfig;
use motiontrigger_domain::event::DeviceEvent;
use motiontrigger_domain::id::InstanceId;
use motiontrigger_domain::metrics::Metrics;
use motiontrigger_domain::timer::TimerToken;

pub use self::scheduler::TokioScheduler;
use crate::engine::TriggerEngine;
use crate::event_bus::{InProcessEventBus, SensorSubscription};
use crate::ports::{Clock, DeviceRegistry, MetricsStore};

/// Delay before recovering persisted state, leaving the host time to
/// bring its devices up.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(10);

/// Inbox message of an instance task.
#[derive(Debug)]
pub enum EngineMessage {
    /// Command sent to the virtual switch.
    Command(String),
    ReleaseDue(TimerToken),
    Recheck(TimerToken),
    /// Snapshot request.
    Metrics(oneshot::Sender<Metrics>),
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    pub settle_delay: Duration,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// Handle on a running instance task.
pub struct EngineHandle {
    instance: InstanceId,
    inbox: mpsc::UnboundedSender<EngineMessage>,
    task: JoinHandle<()>,
}

impl EngineHandle {
    #[must_use]
    pub fn instance(&self) -> &InstanceId {
        &self.instance
    }

    /// Send a command to the virtual switch. Returns `false` when the task
    /// is gone.
    pub fn command(&self, command: impl Into<String>) -> bool {
        self.inbox
            .send(EngineMessage::Command(command.into()))
            .is_ok()
    }

    /// Current metrics, `None` when the task is gone.
    pub async fn metrics(&self) -> Option<Metrics> {
        let (tx, rx) = oneshot::channel();
        self.inbox.send(EngineMessage::Metrics(tx)).ok()?;
        rx.await.ok()
    }

    /// Stop the task and wait for it to persist its state.
    pub async fn shutdown(self) {
        let _ = self.inbox.send(EngineMessage::Shutdown);
        if let Err(err) = self.task.await {
            tracing::error!(instance = %self.instance, error = %err, "instance task failed");
        }
    }
}

/// Spawn the task of one automation instance.
pub fn spawn<R, M, C>(
    instance: InstanceId,
    config: TriggerConfig,
    registry: R,
    store: M,
    clock: C,
    bus: &InProcessEventBus,
    options: RuntimeOptions,
) -> EngineHandle
where
    R: DeviceRegistry + Send + Sync + 'static,
    M: MetricsStore + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    let (inbox, messages) = mpsc::unbounded_channel();
    let scheduler = TokioScheduler::new(&inbox);
    let engine = TriggerEngine::new(instance.clone(), config, registry, store, scheduler, clock);
    let task = tokio::spawn(run(engine, messages, bus.clone(), options));
    EngineHandle {
        instance,
        inbox,
        task,
    }
}

async fn run<R, M, C>(
    mut engine: TriggerEngine<R, M, TokioScheduler, C>,
    mut messages: mpsc::UnboundedReceiver<EngineMessage>,
    bus: InProcessEventBus,
    options: RuntimeOptions,
) where
    R: DeviceRegistry + Send + Sync,
    M: MetricsStore + Send + Sync,
    C: Clock + Send + Sync,
{
    if let Err(err) = engine.load().await {
        tracing::error!(instance = %engine.instance(), error = %err, "failed to load metrics");
    }
    tracing::info!(instance = %engine.instance(), "instance started");

    let sensors = engine.config().security_sensors.clone();
    let settle = tokio::time::sleep(options.settle_delay);
    tokio::pin!(settle);
    let mut events: Option<SensorSubscription> = None;

    loop {
        tokio::select! {
            () = &mut settle, if events.is_none() => {
                events = Some(bus.watch(sensors.iter().cloned()));
                engine.recover().await;
            }
            message = messages.recv() => match message {
                None | Some(EngineMessage::Shutdown) => break,
                Some(EngineMessage::Command(command)) => engine.handle_command(&command).await,
                Some(EngineMessage::ReleaseDue(token)) => engine.release_due(token).await,
                Some(EngineMessage::Recheck(token)) => engine.recheck_due(token).await,
                Some(EngineMessage::Metrics(reply)) => {
                    let _ = reply.send(engine.metrics().clone());
                }
            },
            event = next_event(&mut events) => match event {
                Ok(event) => {
                    tracing::debug!(
                        instance = %engine.instance(),
                        device = %event.device_id,
                        level = %event.level,
                        "security sensor changed"
                    );
                    engine.trigger_sensor().await;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(instance = %engine.instance(), skipped, "missed device events");
                    engine.trigger_sensor().await;
                }
                Err(RecvError::Closed) => {
                    tracing::warn!(instance = %engine.instance(), "device event bus closed");
                    events = Some(bus.watch(sensors.iter().cloned()));
                }
            },
        }
    }

    engine.stop().await;
    tracing::info!(instance = %engine.instance(), "instance stopped");
}

async fn next_event(events: &mut Option<SensorSubscription>) -> Result<DeviceEvent, RecvError> {
    match events {
        Some(events) => events.recv().await,
        None => std::future::pending().await,
    }
}
