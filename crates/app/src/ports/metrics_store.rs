//! Metrics store port: persistence of the virtual switch metrics.

use std::future::Future;
use std::sync::Arc;

use motiontrigger_domain::error::TriggerError;
use motiontrigger_domain::id::DeviceId;
use motiontrigger_domain::metrics::Metrics;

/// Persists [`Metrics`] keyed by the virtual device id.
pub trait MetricsStore {
    /// Load the metrics saved for a virtual device.
    fn load(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Metrics>, TriggerError>> + Send;

    /// Create or replace the metrics of a virtual device.
    fn save(&self, metrics: &Metrics) -> impl Future<Output = Result<(), TriggerError>> + Send;
}

impl<T: MetricsStore + Send + Sync> MetricsStore for Arc<T> {
    fn load(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Metrics>, TriggerError>> + Send {
        (**self).load(device_id)
    }

    fn save(&self, metrics: &Metrics) -> impl Future<Output = Result<(), TriggerError>> + Send {
        (**self).save(metrics)
    }
}
