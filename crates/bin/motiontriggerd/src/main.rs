//! # motiontriggerd: motion trigger daemon
//!
//! Composition root that wires all adapters together and runs the configured
//! motion triggers.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Install the `tracing` subscriber
//! - Initialize the `SQLite` connection pool and run migrations
//! - Build the virtual device registry on the in-process event bus
//! - Spawn one runtime task per configured instance
//! - Drive the virtual devices from a stdin console
//! - Stop every instance on Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;
mod console;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use motiontrigger_adapter_storage_sqlite_sqlx::pool::Config as DatabaseConfig;
use motiontrigger_adapter_virtual::VirtualRegistry;
use motiontrigger_app::event_bus::InProcessEventBus;
use motiontrigger_app::ports::SystemClock;
use motiontrigger_app::runtime::{self, RuntimeOptions};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading motiontrigger.toml")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Database
    let db = DatabaseConfig::new(config.database_url())
        .build()
        .await
        .context("opening the metrics database")?;
    let store = Arc::new(db.metrics_store());

    // Devices
    let bus = InProcessEventBus::new(256);
    let registry = Arc::new(VirtualRegistry::with_devices(
        bus.clone(),
        config.devices.iter().cloned(),
    ));

    // Instances
    let options = RuntimeOptions {
        settle_delay: config.settle_delay(),
    };
    let handles: Vec<_> = config
        .instances
        .into_iter()
        .map(|instance| {
            runtime::spawn(
                instance.id,
                instance.trigger,
                Arc::clone(&registry),
                Arc::clone(&store),
                SystemClock,
                &bus,
                options,
            )
        })
        .collect();
    tracing::info!(instances = handles.len(), "motiontriggerd started");

    let console = async {
        match console::run(Arc::clone(&registry), &handles).await {
            Ok(()) => tracing::info!("console closed, waiting for Ctrl-C"),
            Err(err) => tracing::warn!(error = %err, "console failed, waiting for Ctrl-C"),
        }
        std::future::pending::<()>().await;
    };
    tokio::select! {
        () = console => {}
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::error!(error = %err, "cannot listen for Ctrl-C");
            }
        }
    }

    tracing::info!("shutting down");
    for handle in handles {
        handle.shutdown().await;
    }
    db.close().await;
    Ok(())
}
