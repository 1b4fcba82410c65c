//! # motiontrigger-domain
//!
//! Pure domain model for the motiontrigger automation.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Describe **Devices** as seen through the registry (type, level, commands)
//! - Define **Preconditions** (device level comparisons) and their operators
//! - Define **Time windows** (`HH:MM` ranges, including overnight ones)
//! - Define the **Dimmer level** and its constrained formula language
//! - Define the per-instance **Configuration** schema
//! - Define the virtual switch **Metrics** and the release-timer state
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod config;
pub mod device;
pub mod dimmer;
pub mod event;
pub mod metrics;
pub mod precondition;
pub mod timer;
pub mod window;
