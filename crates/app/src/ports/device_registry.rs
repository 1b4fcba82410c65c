//! Device registry port: the host's view of sensors and lights.

use std::future::Future;
use std::sync::Arc;

use motiontrigger_domain::device::{Device, DeviceCommand};
use motiontrigger_domain::error::TriggerError;
use motiontrigger_domain::id::DeviceId;

/// Read access to device snapshots and a command channel to devices.
///
/// Change notifications are not part of this trait: registries publish
/// [`DeviceEvent`](motiontrigger_domain::event::DeviceEvent)s through an
/// [`EventPublisher`](super::EventPublisher).
pub trait DeviceRegistry {
    /// Current snapshot of a device, `None` when unknown.
    fn get(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, TriggerError>> + Send;

    /// Send a command to a device.
    fn perform_command(
        &self,
        id: &DeviceId,
        command: DeviceCommand,
    ) -> impl Future<Output = Result<(), TriggerError>> + Send;

    /// Mark whether the device's last change was made by an automation.
    fn set_auto(
        &self,
        id: &DeviceId,
        auto: bool,
    ) -> impl Future<Output = Result<(), TriggerError>> + Send;
}

impl<T: DeviceRegistry + Send + Sync> DeviceRegistry for Arc<T> {
    fn get(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, TriggerError>> + Send {
        (**self).get(id)
    }

    fn perform_command(
        &self,
        id: &DeviceId,
        command: DeviceCommand,
    ) -> impl Future<Output = Result<(), TriggerError>> + Send {
        (**self).perform_command(id, command)
    }

    fn set_auto(
        &self,
        id: &DeviceId,
        auto: bool,
    ) -> impl Future<Output = Result<(), TriggerError>> + Send {
        (**self).set_auto(id, auto)
    }
}
