//! # motiontrigger-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `MetricsStore` port defined in `motiontrigger-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between [`Metrics`](motiontrigger_domain::metrics::Metrics) and database rows
//!
//! ## Dependency rule
//! Depends on `motiontrigger-app` (for port traits) and `motiontrigger-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod metrics_store;
pub mod pool;

pub use metrics_store::SqliteMetricsStore;
