//! # motiontrigger-adapter-virtual
//!
//! Simulated device registry: sensors and lights that live in memory.
//!
//! Every level change (a command to a light, or [`VirtualRegistry::set_level`]
//! on a sensor) is published as a
//! [`DeviceEvent`](motiontrigger_domain::event::DeviceEvent), which is how
//! automation instances learn about sensor activity.
//!
//! ## Dependency rule
//!
//! Depends on `motiontrigger-app` (port traits) and `motiontrigger-domain` only.

mod devices;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use motiontrigger_app::ports::{DeviceRegistry, EventPublisher};
use motiontrigger_domain::device::{Device, DeviceCommand, Level};
use motiontrigger_domain::error::{NotFoundError, TriggerError};
use motiontrigger_domain::event::DeviceEvent;
use motiontrigger_domain::id::DeviceId;

pub use devices::DeviceSpec;

/// In-memory registry publishing level changes through `P`.
pub struct VirtualRegistry<P> {
    devices: Mutex<HashMap<DeviceId, Device>>,
    publisher: P,
}

impl<P> VirtualRegistry<P>
where
    P: EventPublisher + Send + Sync,
{
    #[must_use]
    pub fn new(publisher: P) -> Self {
        Self {
            devices: Mutex::new(HashMap::new()),
            publisher,
        }
    }

    /// Create a registry holding the declared devices.
    #[must_use]
    pub fn with_devices(publisher: P, specs: impl IntoIterator<Item = DeviceSpec>) -> Self {
        let registry = Self::new(publisher);
        for spec in specs {
            registry.add(spec);
        }
        registry
    }

    /// Declare a device, replacing any previous one with the same id.
    pub fn add(&self, spec: DeviceSpec) {
        let device = spec.into_device();
        tracing::debug!(device = %device.id, device_type = %device.device_type, "virtual device added");
        self.lock().insert(device.id.clone(), device);
    }

    /// Identifiers of every declared device, sorted.
    #[must_use]
    pub fn device_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Change a device's level by hand, as a person or a sensor would.
    ///
    /// # Errors
    ///
    /// Returns [`TriggerError::NotFound`] for unknown devices, or the
    /// publisher's error.
    pub async fn set_level(&self, id: &DeviceId, level: Level) -> Result<(), TriggerError> {
        let changed = {
            let mut devices = self.lock();
            let device = devices.get_mut(id).ok_or_else(|| not_found(id))?;
            let changed = !device.level.strict_eq(&level);
            device.level = level.clone();
            device.auto = false;
            changed
        };
        if changed {
            self.publisher
                .publish(DeviceEvent::level_changed(id.clone(), level))
                .await?;
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DeviceId, Device>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<P> DeviceRegistry for VirtualRegistry<P>
where
    P: EventPublisher + Send + Sync,
{
    async fn get(&self, id: &DeviceId) -> Result<Option<Device>, TriggerError> {
        Ok(self.lock().get(id).cloned())
    }

    async fn perform_command(
        &self,
        id: &DeviceId,
        command: DeviceCommand,
    ) -> Result<(), TriggerError> {
        let changed = {
            let mut known = self.lock();
            let device = known.get_mut(id).ok_or_else(|| not_found(id))?;
            devices::apply_command(device, command)?
                .then(|| device.level.clone())
        };
        tracing::debug!(device = %id, %command, "virtual device command");
        if let Some(level) = changed {
            self.publisher
                .publish(DeviceEvent::level_changed(id.clone(), level))
                .await?;
        }
        Ok(())
    }

    async fn set_auto(&self, id: &DeviceId, auto: bool) -> Result<(), TriggerError> {
        let mut devices = self.lock();
        let device = devices.get_mut(id).ok_or_else(|| not_found(id))?;
        device.auto = auto;
        Ok(())
    }
}

fn not_found(id: &DeviceId) -> TriggerError {
    NotFoundError {
        entity: "Device",
        id: id.to_string(),
    }
    .into()
}
