//! In-process device event bus backed by a tokio broadcast channel.
//!
//! The registry publishes every level change; each automation instance
//! holds a [`SensorSubscription`] that only yields the changes of its own
//! security sensors.

use std::collections::HashSet;
use std::future::Future;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use motiontrigger_domain::error::TriggerError;
use motiontrigger_domain::event::DeviceEvent;
use motiontrigger_domain::id::DeviceId;

use crate::ports::EventPublisher;

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when nobody listens. Clones share the same
/// channel.
#[derive(Clone)]
pub struct InProcessEventBus {
    sender: broadcast::Sender<DeviceEvent>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receive every event published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.sender.subscribe()
    }

    /// Receive the events of `devices` published from now on.
    #[must_use]
    pub fn watch(&self, devices: impl IntoIterator<Item = DeviceId>) -> SensorSubscription {
        SensorSubscription {
            devices: devices.into_iter().collect(),
            receiver: self.sender.subscribe(),
        }
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(
        &self,
        event: DeviceEvent,
    ) -> impl Future<Output = Result<(), TriggerError>> + Send {
        tracing::trace!(device = %event.device_id, level = %event.level, "publishing level change");
        // send only fails without receivers
        let _ = self.sender.send(event);
        async { Ok(()) }
    }
}

/// Subscription restricted to a set of devices. Dropping it unsubscribes.
pub struct SensorSubscription {
    devices: HashSet<DeviceId>,
    receiver: broadcast::Receiver<DeviceEvent>,
}

impl SensorSubscription {
    /// Wait for the next event of a watched device.
    ///
    /// # Errors
    ///
    /// [`RecvError::Lagged`] when events were dropped because this
    /// subscription fell behind, whatever device they concerned.
    /// [`RecvError::Closed`] once the bus is gone.
    pub async fn recv(&mut self) -> Result<DeviceEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.devices.contains(&event.device_id) {
                return Ok(event);
            }
        }
    }

    #[must_use]
    pub fn watches(&self, device: &DeviceId) -> bool {
        self.devices.contains(device)
    }
}
