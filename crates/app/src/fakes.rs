//! In-memory port implementations shared by the unit tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};

use motiontrigger_domain::device::{Device, DeviceCommand, DeviceType, Level};
use motiontrigger_domain::error::{NotFoundError, TriggerError};
use motiontrigger_domain::id::DeviceId;
use motiontrigger_domain::metrics::Metrics;
use motiontrigger_domain::timer::TimerToken;

use crate::ports::{Clock, DeviceRegistry, MetricsStore, Scheduler};

#[derive(Default)]
pub(crate) struct InMemoryRegistry {
    devices: Mutex<HashMap<DeviceId, Device>>,
    commands: Mutex<Vec<(DeviceId, DeviceCommand)>>,
}

impl InMemoryRegistry {
    pub(crate) fn with(self, id: &str, device_type: DeviceType, level: Level) -> Self {
        self.insert(Device::new(id, device_type, level));
        self
    }

    pub(crate) fn insert(&self, device: Device) {
        self.devices
            .lock()
            .unwrap()
            .insert(device.id.clone(), device);
    }

    pub(crate) fn set_level(&self, id: &str, level: Level) {
        let mut devices = self.devices.lock().unwrap();
        devices.get_mut(&DeviceId::new(id)).unwrap().level = level;
    }

    pub(crate) fn level(&self, id: &str) -> Level {
        self.devices.lock().unwrap()[&DeviceId::new(id)].level.clone()
    }

    pub(crate) fn is_auto(&self, id: &str) -> bool {
        self.devices.lock().unwrap()[&DeviceId::new(id)].auto
    }

    pub(crate) fn commands(&self) -> Vec<(DeviceId, DeviceCommand)> {
        self.commands.lock().unwrap().clone()
    }

    pub(crate) fn clear_commands(&self) {
        self.commands.lock().unwrap().clear();
    }
}

impl DeviceRegistry for InMemoryRegistry {
    fn get(
        &self,
        id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Device>, TriggerError>> + Send {
        let result = self.devices.lock().unwrap().get(id).cloned();
        async { Ok(result) }
    }

    fn perform_command(
        &self,
        id: &DeviceId,
        command: DeviceCommand,
    ) -> impl Future<Output = Result<(), TriggerError>> + Send {
        let mut devices = self.devices.lock().unwrap();
        let result = match devices.get_mut(id) {
            Some(device) => {
                let multilevel = device.device_type.is_multilevel();
                device.level = match command {
                    DeviceCommand::On if multilevel => Level::from(99.0),
                    DeviceCommand::Off if multilevel => Level::from(0.0),
                    DeviceCommand::On => Level::on(),
                    DeviceCommand::Off => Level::off(),
                    DeviceCommand::Exact { level } => Level::from(f64::from(level)),
                };
                self.commands.lock().unwrap().push((id.clone(), command));
                Ok(())
            }
            None => Err(NotFoundError {
                entity: "Device",
                id: id.to_string(),
            }
            .into()),
        };
        async { result }
    }

    fn set_auto(
        &self,
        id: &DeviceId,
        auto: bool,
    ) -> impl Future<Output = Result<(), TriggerError>> + Send {
        if let Some(device) = self.devices.lock().unwrap().get_mut(id) {
            device.auto = auto;
        }
        async { Ok(()) }
    }
}

#[derive(Default)]
pub(crate) struct InMemoryMetricsStore {
    store: Mutex<HashMap<DeviceId, Metrics>>,
    saves: Mutex<usize>,
}

impl InMemoryMetricsStore {
    pub(crate) fn stored(&self, id: &DeviceId) -> Option<Metrics> {
        self.store.lock().unwrap().get(id).cloned()
    }

    pub(crate) fn seed(&self, metrics: Metrics) {
        self.store
            .lock()
            .unwrap()
            .insert(metrics.device_id.clone(), metrics);
    }

    pub(crate) fn saves(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

impl MetricsStore for InMemoryMetricsStore {
    fn load(
        &self,
        device_id: &DeviceId,
    ) -> impl Future<Output = Result<Option<Metrics>, TriggerError>> + Send {
        let result = self.stored(device_id);
        async { Ok(result) }
    }

    fn save(&self, metrics: &Metrics) -> impl Future<Output = Result<(), TriggerError>> + Send {
        self.seed(metrics.clone());
        *self.saves.lock().unwrap() += 1;
        async { Ok(()) }
    }
}

/// Records the armed timers instead of running them.
#[derive(Debug, Default)]
pub(crate) struct RecordingScheduler {
    next: u64,
    pub(crate) release: Option<(TimerToken, Duration)>,
    pub(crate) recheck: Option<(TimerToken, Duration)>,
    pub(crate) releases_scheduled: usize,
}

impl RecordingScheduler {
    fn next_token(&mut self) -> TimerToken {
        self.next += 1;
        TimerToken::new(self.next)
    }
}

impl Scheduler for RecordingScheduler {
    fn schedule_release(&mut self, delay: Duration) -> TimerToken {
        assert!(self.release.is_none(), "release timer armed twice");
        let token = self.next_token();
        self.release = Some((token, delay));
        self.releases_scheduled += 1;
        token
    }

    fn cancel_release(&mut self) {
        self.release = None;
    }

    fn start_recheck(&mut self, period: Duration) -> TimerToken {
        assert!(self.recheck.is_none(), "recheck timer armed twice");
        let token = self.next_token();
        self.recheck = Some((token, period));
        token
    }

    fn stop_recheck(&mut self) {
        self.recheck = None;
    }
}

pub(crate) struct FixedClock(Mutex<DateTime<Local>>);

impl FixedClock {
    pub(crate) fn at(hour: u32, minute: u32) -> Self {
        Self(Mutex::new(local(hour, minute)))
    }

    pub(crate) fn set(&self, now: DateTime<Local>) {
        *self.0.lock().unwrap() = now;
    }

    pub(crate) fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += chrono::Duration::from_std(by).unwrap();
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        *self.0.lock().unwrap()
    }
}

/// A winter weekday, clear of any DST transition.
pub(crate) fn local(hour: u32, minute: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 1, 15, hour, minute, 0)
        .single()
        .unwrap()
}
