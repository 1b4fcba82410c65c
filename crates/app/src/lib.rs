//! # motiontrigger-app
//!
//! Application layer: the trigger state machine and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DeviceRegistry`: read device snapshots, send commands
//!   - `MetricsStore`: persist the virtual switch metrics
//!   - `EventPublisher`: publish device level changes
//!   - `Scheduler`: arm and cancel the release timer and the recheck interval
//!   - `Clock`: wall-clock time for windows, formulas and deadlines
//! - Evaluate sensors, preconditions and time windows (`evaluator`)
//! - Run the trigger/untrigger state machine (`engine`)
//! - Serialise every event of one instance through an actor task (`runtime`)
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `motiontrigger-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod engine;
pub mod evaluator;
pub mod event_bus;
pub mod ports;
pub mod runtime;

#[cfg(test)]
pub(crate) mod fakes;
