//! Event bus port: publish/subscribe for device level changes.

use std::future::Future;

use motiontrigger_domain::error::TriggerError;
use motiontrigger_domain::event::DeviceEvent;

/// Publishes device events to interested subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: DeviceEvent)
    -> impl Future<Output = Result<(), TriggerError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        event: DeviceEvent,
    ) -> impl Future<Output = Result<(), TriggerError>> + Send {
        (**self).publish(event)
    }
}
