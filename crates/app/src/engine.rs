//! Trigger engine: the state machine of one automation instance.
//!
//! ```text
//!            sensor active, preconditions hold, lights off
//!   Idle ─────────────────────────────────────────────────▶ Triggered
//!    ▲                                                          │
//!    │ release timer fires            sensors quiet (timeout>0) │
//!    └──────────────────────── Releasing ◀──────────────────────┘
//! ```
//!
//! Every operation runs to completion on `&mut self`; the
//! [`runtime`](crate::runtime) feeds commands, sensor changes and timer
//! firings one at a time. Timers report back with the [`TimerToken`] they
//! were armed with, so a firing of a cancelled timer is recognised and
//! dropped. Failures of individual devices are logged and never abort an
//! operation.

use chrono::{TimeDelta, Utc};

use motiontrigger_domain::config::TriggerConfig;
use motiontrigger_domain::dimmer::{DimmerLevel, FormulaContext, MAX_DIMMER_LEVEL};
use motiontrigger_domain::error::TriggerError;
use motiontrigger_domain::id::InstanceId;
use motiontrigger_domain::metrics::{Metrics, Status, SwitchLevel};
use motiontrigger_domain::timer::{RECHECK_INTERVAL, ReleaseState, TimerToken};

use crate::evaluator::{check_device, check_precondition, light_command, lookup};
use crate::ports::{Clock, DeviceRegistry, MetricsStore, Scheduler};

/// One automation instance: its configuration, metrics and timers.
pub struct TriggerEngine<R, M, S, C> {
    instance: InstanceId,
    config: TriggerConfig,
    registry: R,
    store: M,
    scheduler: S,
    clock: C,
    metrics: Metrics,
    saved: Option<Metrics>,
    release: ReleaseState,
    recheck: Option<TimerToken>,
}

impl<R, M, S, C> TriggerEngine<R, M, S, C>
where
    R: DeviceRegistry,
    M: MetricsStore,
    S: Scheduler,
    C: Clock,
{
    /// Create an engine with fresh metrics; call [`load`](Self::load) to
    /// pick up persisted ones.
    pub fn new(
        instance: InstanceId,
        config: TriggerConfig,
        registry: R,
        store: M,
        scheduler: S,
        clock: C,
    ) -> Self {
        let metrics = Metrics::new(
            instance.virtual_device_id(),
            format!("Motion trigger {instance}"),
        );
        Self {
            instance,
            config,
            registry,
            store,
            scheduler,
            clock,
            metrics,
            saved: None,
            release: ReleaseState::Idle,
            recheck: None,
        }
    }

    #[must_use]
    pub fn instance(&self) -> &InstanceId {
        &self.instance
    }

    #[must_use]
    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[must_use]
    pub fn release_state(&self) -> ReleaseState {
        self.release
    }

    #[must_use]
    pub fn is_rechecking(&self) -> bool {
        self.recheck.is_some()
    }

    /// Restore the persisted metrics, creating them on first start.
    ///
    /// # Errors
    ///
    /// Returns the store error when the metrics can be neither read nor
    /// created.
    pub async fn load(&mut self) -> Result<(), TriggerError> {
        let device_id = self.instance.virtual_device_id();
        match self.store.load(&device_id).await? {
            Some(metrics) => {
                tracing::debug!(instance = %self.instance, ?metrics, "restored metrics");
                self.saved = Some(metrics.clone());
                self.metrics = metrics;
            }
            None => {
                self.store.save(&self.metrics).await?;
                self.saved = Some(self.metrics.clone());
            }
        }
        Ok(())
    }

    /// Resume after a restart, once the host had time to settle.
    ///
    /// A persisted release deadline is re-armed for its remaining time, or
    /// released at once when it already passed. Otherwise a persisted
    /// triggered state is re-evaluated against the current sensors.
    #[tracing::instrument(skip(self), fields(instance = %self.instance))]
    pub async fn recover(&mut self) {
        for sensor in &self.config.security_sensors {
            if matches!(self.registry.get(sensor).await, Ok(None)) {
                tracing::error!(device = %sensor, "security sensor not found");
            }
        }

        if let Some(deadline) = self.metrics.timeout {
            let now = self.clock.now().with_timezone(&Utc);
            match (deadline - now).to_std() {
                Ok(remaining) if !remaining.is_zero() => {
                    tracing::info!(?remaining, "restarting release timeout");
                    self.scheduler.cancel_release();
                    let token = self.scheduler.schedule_release(remaining);
                    self.release = ReleaseState::Scheduled { deadline, token };
                }
                _ => {
                    tracing::info!("release deadline passed while stopped");
                    self.switch_device(false).await;
                }
            }
        } else if self.metrics.triggered {
            tracing::info!("resuming triggered state");
            self.trigger_sensor().await;
        }
        self.persist().await;
    }

    /// Handle a command sent to the virtual switch. Only `on` and `off`
    /// are understood.
    pub async fn handle_command(&mut self, command: &str) {
        match command.parse::<SwitchLevel>() {
            Ok(SwitchLevel::On) => self.enable().await,
            Ok(SwitchLevel::Off) => self.disable().await,
            Err(other) => {
                tracing::debug!(instance = %self.instance, command = %other, "ignoring command");
            }
        }
    }

    /// Enable the automation and evaluate the sensors right away.
    #[tracing::instrument(skip(self), fields(instance = %self.instance))]
    pub async fn enable(&mut self) {
        self.metrics.level = SwitchLevel::On;
        self.metrics.icon = Status::On;
        self.persist().await;
        self.trigger_sensor().await;
    }

    /// Disable the automation, releasing the lights when triggered.
    #[tracing::instrument(skip(self), fields(instance = %self.instance))]
    pub async fn disable(&mut self) {
        self.metrics.level = SwitchLevel::Off;
        self.metrics.icon = Status::Off;
        self.cancel_recheck();
        self.clear_release();
        self.persist().await;
        if self.metrics.triggered {
            self.switch_device(false).await;
        }
    }

    /// Evaluate the sensors after a change.
    #[tracing::instrument(skip(self), fields(instance = %self.instance))]
    pub async fn trigger_sensor(&mut self) {
        if !self.metrics.is_enabled() {
            return;
        }

        // a running recheck keeps its period while the instance stays triggered
        self.clear_release();

        if check_device(&self.registry, &self.config.security_sensors).await {
            let lights = check_device(&self.registry, &self.config.lights).await;
            let extra_lights = check_device(&self.registry, &self.config.extra_lights).await;
            let precondition = self.check_precondition().await;
            let triggered = self.metrics.triggered;
            tracing::info!(
                precondition,
                lights,
                extra_lights,
                triggered,
                "security sensor active"
            );

            if precondition && !lights && !extra_lights {
                self.switch_device(true).await;
            } else if triggered && (!self.config.recheck_preconditions || precondition) {
                self.metrics.icon = Status::Triggered;
            }

            // the interval catches failed preconditions while triggered
            if self.metrics.triggered && self.config.recheck_preconditions {
                self.ensure_recheck();
            }
        } else if self.metrics.triggered {
            self.untrigger().await;
        }
        self.persist().await;
    }

    /// Recheck firing.
    pub async fn recheck_due(&mut self, token: TimerToken) {
        if self.recheck != Some(token) {
            tracing::debug!(instance = %self.instance, %token, "ignoring stale recheck");
            return;
        }
        self.check_interval().await;
    }

    /// Release the lights when the preconditions stopped holding.
    ///
    /// Skipped unless enabled and triggered with no release pending.
    #[tracing::instrument(skip(self), fields(instance = %self.instance))]
    pub async fn check_interval(&mut self) {
        if !self.metrics.is_enabled() || !self.metrics.triggered || self.release.is_scheduled() {
            return;
        }
        let check = self.check_precondition().await;
        tracing::debug!(check, "rechecked preconditions");
        if !check {
            self.untrigger().await;
        }
        self.persist().await;
    }

    /// Release timer firing.
    pub async fn release_due(&mut self, token: TimerToken) {
        if !self.release.is_armed_with(token) {
            tracing::debug!(instance = %self.instance, %token, "ignoring stale release");
            return;
        }
        tracing::info!(instance = %self.instance, "release timeout elapsed");
        self.switch_device(false).await;
    }

    /// Start releasing the lights: arm the release timer, or switch off at
    /// once without a timeout.
    #[tracing::instrument(skip(self), fields(instance = %self.instance))]
    pub async fn untrigger(&mut self) {
        match self.config.release_delay() {
            Some(delay) => {
                tracing::info!(?delay, "starting release timeout");
                self.cancel_recheck();
                self.arm_release(delay);
                self.persist().await;
            }
            None => {
                tracing::info!("releasing immediately");
                self.switch_device(false).await;
            }
        }
    }

    /// Drive every configured light on or off and record the result.
    ///
    /// Switching on is refused while disabled.
    #[tracing::instrument(skip(self), fields(instance = %self.instance))]
    pub async fn switch_device(&mut self, mode: bool) {
        if mode && !self.metrics.is_enabled() {
            tracing::warn!("refusing to switch on while disabled");
            return;
        }

        let mut dimmer_level = MAX_DIMMER_LEVEL;
        if mode {
            self.metrics.icon = Status::Triggered;
            if self.config.recheck_preconditions {
                self.ensure_recheck();
            }
            dimmer_level = self.resolve_dimmer_level().await;
        } else {
            self.cancel_recheck();
            self.metrics.icon = Status::from(self.metrics.level);
        }
        self.clear_release();
        self.metrics.triggered = mode;
        self.persist().await;

        tracing::info!(mode, dimmer_level, "switching lights");
        for id in &self.config.lights {
            let Some(device) = lookup(&self.registry, id).await else {
                continue;
            };
            let Some(command) = light_command(&device.device_type, mode, dimmer_level) else {
                tracing::error!(
                    device = %id,
                    device_type = %device.device_type,
                    "unsupported light type"
                );
                continue;
            };
            if let Err(err) = self.registry.perform_command(id, command).await {
                tracing::error!(device = %id, %command, error = %err, "failed to switch light");
                continue;
            }
            if let Err(err) = self.registry.set_auto(id, mode).await {
                tracing::warn!(device = %id, error = %err, "failed to flag light");
            }
        }
    }

    /// Cancel both timers on shutdown.
    ///
    /// The triggered flag survives so that the next start resumes it.
    #[tracing::instrument(skip(self), fields(instance = %self.instance))]
    pub async fn stop(&mut self) {
        self.cancel_recheck();
        self.clear_release();
        if self.metrics.icon == Status::Timeout {
            self.metrics.icon = Status::Triggered;
        }
        self.persist().await;
    }

    async fn check_precondition(&self) -> bool {
        let now = self.clock.now();
        check_precondition(
            &self.registry,
            &self.config.preconditions,
            &self.config.time_active,
            &now,
        )
        .await
    }

    async fn resolve_dimmer_level(&self) -> u8 {
        let mut ctx = FormulaContext::at(&self.clock.now());
        if let DimmerLevel::Formula(formula) = &self.config.dimmer_level {
            // a parse error is reported by `resolve` below
            for id in formula.device_refs().unwrap_or_default() {
                if let Some(level) = lookup(&self.registry, &id)
                    .await
                    .and_then(|device| device.level.as_dimmer_input())
                {
                    ctx.levels.insert(id, level);
                }
            }
        }

        match self.config.dimmer_level.resolve(&ctx) {
            Ok(level) => level,
            Err(err) => {
                tracing::error!(error = %err, "could not calculate dimmer level");
                MAX_DIMMER_LEVEL
            }
        }
    }

    fn arm_release(&mut self, delay: std::time::Duration) {
        self.scheduler.cancel_release();
        let token = self.scheduler.schedule_release(delay);
        let now = self.clock.now().with_timezone(&Utc);
        let deadline = TimeDelta::from_std(delay)
            .ok()
            .and_then(|delay| now.checked_add_signed(delay))
            .unwrap_or(now);
        self.release = ReleaseState::Scheduled { deadline, token };
        self.metrics.timeout = Some(deadline);
        self.metrics.icon = Status::Timeout;
    }

    fn clear_release(&mut self) {
        self.scheduler.cancel_release();
        self.release = ReleaseState::Idle;
        self.metrics.timeout = None;
    }

    fn ensure_recheck(&mut self) {
        if self.recheck.is_none() {
            self.recheck = Some(self.scheduler.start_recheck(RECHECK_INTERVAL));
        }
    }

    fn cancel_recheck(&mut self) {
        if self.recheck.take().is_some() {
            self.scheduler.stop_recheck();
        }
    }

    /// Save the metrics when they changed since the last save.
    async fn persist(&mut self) {
        if self.saved.as_ref() == Some(&self.metrics) {
            return;
        }
        match self.store.save(&self.metrics).await {
            Ok(()) => self.saved = Some(self.metrics.clone()),
            Err(err) => {
                tracing::error!(instance = %self.instance, error = %err, "failed to save metrics");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::fakes::{FixedClock, InMemoryMetricsStore, InMemoryRegistry, RecordingScheduler, local};
    use motiontrigger_domain::device::{DeviceCommand, DeviceType, Level};
    use motiontrigger_domain::dimmer::Formula;
    use motiontrigger_domain::id::DeviceId;
    use motiontrigger_domain::precondition::{Operator, Precondition};
    use motiontrigger_domain::window::TimeWindow;

    type Engine =
        TriggerEngine<InMemoryRegistry, InMemoryMetricsStore, RecordingScheduler, FixedClock>;

    fn registry() -> InMemoryRegistry {
        InMemoryRegistry::default()
            .with("motion", DeviceType::SensorBinary, Level::off())
            .with("lux", DeviceType::SensorMultilevel, Level::from(10.0))
            .with("hall", DeviceType::SwitchBinary, Level::off())
            .with("dimmer", DeviceType::SwitchMultilevel, Level::from(0.0))
            .with("lamp", DeviceType::SwitchBinary, Level::off())
    }

    fn base_config() -> motiontrigger_domain::config::TriggerConfigBuilder {
        TriggerConfig::builder()
            .security_sensor("motion")
            .light("hall")
            .light("dimmer")
    }

    fn engine_with(config: TriggerConfig) -> Engine {
        TriggerEngine::new(
            InstanceId::new("7"),
            config,
            registry(),
            InMemoryMetricsStore::default(),
            RecordingScheduler::default(),
            FixedClock::at(12, 0),
        )
    }

    async fn enabled(config: TriggerConfig) -> Engine {
        let mut engine = engine_with(config);
        engine.load().await.unwrap();
        engine.handle_command("on").await;
        engine
    }

    async fn motion(engine: &mut Engine, active: bool) {
        let level = if active { Level::on() } else { Level::off() };
        engine.registry.set_level("motion", level);
        engine.trigger_sensor().await;
    }

    fn release_token(engine: &Engine) -> TimerToken {
        engine.scheduler.release.unwrap().0
    }

    fn stored(engine: &Engine) -> Metrics {
        engine
            .store
            .stored(&engine.instance.virtual_device_id())
            .unwrap()
    }

    #[tokio::test]
    async fn should_create_metrics_on_first_load() {
        let mut engine = engine_with(base_config().build().unwrap());
        engine.load().await.unwrap();

        let metrics = stored(&engine);
        assert_eq!(metrics.device_id, DeviceId::new("MotionTrigger_7"));
        assert_eq!(metrics.level, SwitchLevel::Off);
        assert!(!metrics.triggered);
    }

    #[tokio::test]
    async fn should_ignore_sensors_while_disabled() {
        let mut engine = engine_with(base_config().build().unwrap());
        engine.load().await.unwrap();

        motion(&mut engine, true).await;

        assert!(!engine.metrics().triggered);
        assert!(engine.registry.commands().is_empty());
    }

    #[tokio::test]
    async fn should_ignore_unknown_commands() {
        let mut engine = engine_with(base_config().build().unwrap());
        engine.load().await.unwrap();
        let saves = engine.store.saves();

        engine.handle_command("exact").await;

        assert!(!engine.metrics().is_enabled());
        assert_eq!(engine.store.saves(), saves);
    }

    #[tokio::test]
    async fn should_switch_lights_on_when_sensor_trips() {
        let mut engine = enabled(base_config().timeout(60).build().unwrap()).await;

        motion(&mut engine, true).await;

        assert!(engine.metrics().triggered);
        assert_eq!(engine.metrics().icon, Status::Triggered);
        assert_eq!(
            engine.registry.commands(),
            vec![
                (DeviceId::new("hall"), DeviceCommand::On),
                (DeviceId::new("dimmer"), DeviceCommand::Exact { level: 99 }),
            ]
        );
        assert!(engine.registry.is_auto("hall"));
        assert!(engine.registry.is_auto("dimmer"));
        assert!(stored(&engine).triggered);
        assert!(!engine.is_rechecking());
    }

    #[tokio::test]
    async fn should_not_trigger_when_lights_already_on() {
        let mut engine = enabled(base_config().extra_light("lamp").build().unwrap()).await;
        engine.registry.set_level("lamp", Level::on());

        motion(&mut engine, true).await;

        assert!(!engine.metrics().triggered);
        assert!(engine.registry.commands().is_empty());
    }

    #[tokio::test]
    async fn should_not_trigger_when_precondition_fails() {
        let config = base_config()
            .precondition(Precondition::new("lux", Operator::Lt, Level::from(5.0)))
            .build()
            .unwrap();
        let mut engine = enabled(config).await;

        motion(&mut engine, true).await;
        assert!(!engine.metrics().triggered);

        engine.registry.set_level("lux", Level::from(2.0));
        engine.trigger_sensor().await;
        assert!(engine.metrics().triggered);
    }

    #[tokio::test]
    async fn should_not_trigger_outside_time_window() {
        let config = base_config()
            .time_active(TimeWindow::new("22:00", "06:00"))
            .build()
            .unwrap();
        let mut engine = enabled(config).await;

        motion(&mut engine, true).await;
        assert!(!engine.metrics().triggered);

        engine.clock.set(local(23, 0));
        engine.trigger_sensor().await;
        assert!(engine.metrics().triggered);
    }

    #[tokio::test]
    async fn should_arm_release_when_sensors_go_quiet() {
        let mut engine = enabled(base_config().timeout(60).build().unwrap()).await;
        motion(&mut engine, true).await;
        engine.registry.clear_commands();

        motion(&mut engine, false).await;

        let (_, delay) = engine.scheduler.release.unwrap();
        assert_eq!(delay, Duration::from_secs(60));
        assert_eq!(engine.metrics().icon, Status::Timeout);
        assert!(engine.metrics().triggered);
        let deadline = local(12, 1).with_timezone(&Utc);
        assert_eq!(engine.metrics().timeout, Some(deadline));
        assert_eq!(stored(&engine).timeout, Some(deadline));
        assert_eq!(engine.release_state().deadline(), Some(deadline));
        assert!(engine.registry.commands().is_empty());
    }

    #[tokio::test]
    async fn should_release_lights_when_timer_fires() {
        let mut engine = enabled(base_config().timeout(60).build().unwrap()).await;
        motion(&mut engine, true).await;
        motion(&mut engine, false).await;
        let token = release_token(&engine);
        engine.registry.clear_commands();

        engine.release_due(token).await;

        assert!(!engine.metrics().triggered);
        assert_eq!(engine.metrics().icon, Status::On);
        assert!(engine.metrics().timeout.is_none());
        assert_eq!(engine.release_state(), ReleaseState::Idle);
        assert_eq!(
            engine.registry.commands(),
            vec![
                (DeviceId::new("hall"), DeviceCommand::Off),
                (DeviceId::new("dimmer"), DeviceCommand::Off),
            ]
        );
        assert!(!engine.registry.is_auto("hall"));
        assert!(!stored(&engine).triggered);
    }

    #[tokio::test]
    async fn should_release_immediately_without_timeout() {
        let mut engine = enabled(base_config().build().unwrap()).await;
        motion(&mut engine, true).await;

        motion(&mut engine, false).await;

        assert!(!engine.metrics().triggered);
        assert_eq!(engine.scheduler.releases_scheduled, 0);
        assert_eq!(engine.registry.level("hall"), Level::off());
    }

    #[tokio::test]
    async fn should_cancel_release_when_sensor_trips_again() {
        let mut engine = enabled(base_config().timeout(60).build().unwrap()).await;
        motion(&mut engine, true).await;
        motion(&mut engine, false).await;
        let stale = release_token(&engine);
        engine.registry.clear_commands();

        motion(&mut engine, true).await;

        assert!(engine.scheduler.release.is_none());
        assert!(engine.metrics().timeout.is_none());
        assert!(engine.metrics().triggered);
        assert_eq!(engine.metrics().icon, Status::Triggered);
        assert!(engine.registry.commands().is_empty());

        // the cancelled timer may still deliver its firing
        engine.release_due(stale).await;
        assert!(engine.metrics().triggered);
        assert_eq!(engine.registry.level("hall"), Level::on());
    }

    #[tokio::test]
    async fn should_keep_a_single_release_timer() {
        let mut engine = enabled(base_config().timeout(60).build().unwrap()).await;
        motion(&mut engine, true).await;

        for _ in 0..3 {
            motion(&mut engine, false).await;
            motion(&mut engine, true).await;
        }
        motion(&mut engine, false).await;

        assert_eq!(engine.scheduler.releases_scheduled, 4);
        let token = release_token(&engine);
        assert_eq!(token, TimerToken::new(4));
        assert!(engine.release_state().is_armed_with(token));
    }

    #[tokio::test]
    async fn should_release_when_recheck_finds_failed_precondition() {
        let config = base_config()
            .precondition(Precondition::new("lux", Operator::Lt, Level::from(50.0)))
            .recheck_preconditions(true)
            .build()
            .unwrap();
        let mut engine = enabled(config).await;
        motion(&mut engine, true).await;

        let (token, period) = engine.scheduler.recheck.unwrap();
        assert_eq!(period, RECHECK_INTERVAL);

        engine.recheck_due(token).await;
        assert!(engine.metrics().triggered);

        engine.registry.set_level("lux", Level::from(80.0));
        engine.recheck_due(token).await;

        assert!(!engine.metrics().triggered);
        assert!(!engine.is_rechecking());
        assert_eq!(engine.registry.level("hall"), Level::off());
    }

    #[tokio::test]
    async fn should_stop_recheck_while_releasing() {
        let config = base_config()
            .precondition(Precondition::new("lux", Operator::Lt, Level::from(50.0)))
            .recheck_preconditions(true)
            .timeout(60)
            .build()
            .unwrap();
        let mut engine = enabled(config).await;
        motion(&mut engine, true).await;
        let (token, _) = engine.scheduler.recheck.unwrap();

        motion(&mut engine, false).await;
        assert!(engine.scheduler.recheck.is_none());

        // a late firing of the stopped interval changes nothing
        engine.registry.set_level("lux", Level::from(80.0));
        engine.recheck_due(token).await;
        assert_eq!(engine.metrics().icon, Status::Timeout);
        assert_eq!(engine.scheduler.releases_scheduled, 1);
    }

    #[tokio::test]
    async fn should_keep_rechecking_after_retrigger_with_failed_precondition() {
        let config = base_config()
            .precondition(Precondition::new("lux", Operator::Lt, Level::from(50.0)))
            .recheck_preconditions(true)
            .build()
            .unwrap();
        let mut engine = enabled(config).await;
        motion(&mut engine, true).await;

        engine.registry.set_level("lux", Level::from(80.0));
        engine.trigger_sensor().await;

        assert!(engine.metrics().triggered);
        let (token, _) = engine.scheduler.recheck.unwrap();

        engine.recheck_due(token).await;
        assert!(!engine.metrics().triggered);
    }

    #[tokio::test]
    async fn should_keep_recheck_period_across_sensor_events() {
        let config = base_config()
            .precondition(Precondition::new("lux", Operator::Lt, Level::from(50.0)))
            .recheck_preconditions(true)
            .build()
            .unwrap();
        let mut engine = enabled(config).await;
        motion(&mut engine, true).await;
        let (token, _) = engine.scheduler.recheck.unwrap();

        engine.registry.set_level("lux", Level::from(80.0));
        for _ in 0..5 {
            motion(&mut engine, true).await;
            assert_eq!(engine.scheduler.recheck.map(|(armed, _)| armed), Some(token));
        }

        engine.recheck_due(token).await;
        assert!(!engine.metrics().triggered);
        assert!(engine.scheduler.recheck.is_none());
    }

    #[tokio::test]
    async fn should_release_lights_when_disabled() {
        let mut engine = enabled(base_config().timeout(60).build().unwrap()).await;
        motion(&mut engine, true).await;
        motion(&mut engine, false).await;

        engine.handle_command("off").await;

        assert!(!engine.metrics().is_enabled());
        assert!(!engine.metrics().triggered);
        assert_eq!(engine.metrics().icon, Status::Off);
        assert!(engine.scheduler.release.is_none());
        assert!(engine.metrics().timeout.is_none());
        assert_eq!(engine.registry.level("hall"), Level::off());
        assert_eq!(stored(&engine).level, SwitchLevel::Off);
    }

    #[tokio::test]
    async fn should_apply_dimmer_formula() {
        let config = base_config()
            .dimmer_level(DimmerLevel::Formula(Formula::new(
                "min(level(\"lux\") * 2, 60)",
            )))
            .build()
            .unwrap();
        let mut engine = enabled(config).await;

        motion(&mut engine, true).await;

        assert_eq!(engine.registry.level("dimmer"), Level::from(20.0));
    }

    #[tokio::test]
    async fn should_fall_back_to_full_level_on_broken_formula() {
        let config = base_config()
            .dimmer_level(DimmerLevel::Formula(Formula::new("hour +")))
            .build()
            .unwrap();
        let mut engine = enabled(config).await;

        motion(&mut engine, true).await;

        assert_eq!(engine.registry.level("dimmer"), Level::from(99.0));
        assert!(engine.metrics().triggered);
    }

    #[tokio::test]
    async fn should_turn_dimmer_off_for_zero_level() {
        let config = base_config()
            .dimmer_level(DimmerLevel::Fixed(0))
            .build()
            .unwrap();
        let mut engine = enabled(config).await;

        motion(&mut engine, true).await;

        assert!(
            engine
                .registry
                .commands()
                .contains(&(DeviceId::new("dimmer"), DeviceCommand::Off))
        );
    }

    #[tokio::test]
    async fn should_resume_pending_release_after_restart() {
        let config = base_config().timeout(60).build().unwrap();
        let mut engine = enabled(config.clone()).await;
        motion(&mut engine, true).await;
        motion(&mut engine, false).await;
        engine.stop().await;
        let mut persisted = stored(&engine);
        persisted.timeout = Some(local(12, 1).with_timezone(&Utc));
        persisted.icon = Status::Timeout;

        let mut restarted = engine_with(config);
        restarted.store.seed(persisted);
        restarted.clock.set(local(12, 0));
        restarted.clock.advance(Duration::from_secs(20));
        restarted.load().await.unwrap();
        restarted.recover().await;

        let (token, remaining) = restarted.scheduler.release.unwrap();
        assert_eq!(remaining, Duration::from_secs(40));
        assert!(restarted.release_state().is_armed_with(token));

        restarted.release_due(token).await;
        assert!(!restarted.metrics().triggered);
    }

    #[tokio::test]
    async fn should_release_at_once_when_deadline_passed_while_stopped() {
        let config = base_config().timeout(60).build().unwrap();
        let mut metrics = Metrics::new(DeviceId::new("MotionTrigger_7"), "Motion trigger 7");
        metrics.level = SwitchLevel::On;
        metrics.triggered = true;
        metrics.icon = Status::Timeout;
        metrics.timeout = Some(local(11, 0).with_timezone(&Utc));

        let mut engine = engine_with(config);
        engine.store.seed(metrics);
        engine.registry.set_level("hall", Level::on());
        engine.load().await.unwrap();
        engine.recover().await;

        assert!(engine.scheduler.release.is_none());
        assert!(!engine.metrics().triggered);
        assert!(stored(&engine).timeout.is_none());
        assert_eq!(engine.registry.level("hall"), Level::off());
    }

    #[tokio::test]
    async fn should_resync_triggered_state_after_restart() {
        let config = base_config().timeout(60).build().unwrap();
        let mut metrics = Metrics::new(DeviceId::new("MotionTrigger_7"), "Motion trigger 7");
        metrics.level = SwitchLevel::On;
        metrics.triggered = true;
        metrics.icon = Status::Triggered;

        let mut engine = engine_with(config);
        engine.store.seed(metrics);
        engine.load().await.unwrap();
        engine.recover().await;

        // sensors are quiet now, so the release starts
        assert!(engine.scheduler.release.is_some());
        assert_eq!(engine.metrics().icon, Status::Timeout);
    }

    #[tokio::test]
    async fn should_keep_triggered_flag_on_stop() {
        let mut engine = enabled(base_config().timeout(60).build().unwrap()).await;
        motion(&mut engine, true).await;
        motion(&mut engine, false).await;

        engine.stop().await;

        assert!(engine.scheduler.release.is_none());
        let metrics = stored(&engine);
        assert!(metrics.triggered);
        assert!(metrics.timeout.is_none());
        assert_eq!(metrics.icon, Status::Triggered);
    }

    #[tokio::test]
    async fn should_skip_saving_unchanged_metrics() {
        let mut engine = enabled(base_config().build().unwrap()).await;
        let saves = engine.store.saves();

        motion(&mut engine, false).await;
        motion(&mut engine, false).await;

        assert_eq!(engine.store.saves(), saves);
    }
}
