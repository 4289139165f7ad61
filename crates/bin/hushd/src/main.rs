//! # hushd: hush daemon
//!
//! Composition root that wires the adapters into the engine and runs it.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialise logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Build the simulated device and the engine on top of it
//! - Run the event dispatcher, post the boot signal, tick the periodic sweep
//! - Drain in-flight work on Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use hush_adapter_storage_sqlite_sqlx::SqliteRuleStore;
use hush_adapter_virtual::VirtualDevice;
use hush_app::dispatcher::{self, EventDispatcher};
use hush_app::engine::Engine;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::Config;

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_new(&config.logging.filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {:?}: {err}", config.logging.filter);
        EnvFilter::new("info")
    });
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_logging(&config);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "hushd starting");

    // Database
    let db = hush_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
        busy_timeout: config.database_busy_timeout(),
    }
    .build()
    .await?;
    let store = Arc::new(SqliteRuleStore::new(db.pool().clone()));

    // Device and engine
    let (handle, inbox) = dispatcher::channel();
    let device = VirtualDevice::new(handle.clone(), config.device_settings());
    let engine = Arc::new(Engine::new(device.ports(store)));
    let worker = tokio::spawn(EventDispatcher::new(Arc::clone(&engine)).run(inbox));

    handle.on_boot();

    let mut sweep = tokio::time::interval(config.sweep_interval());
    // the first tick completes immediately; boot already reconciled
    sweep.tick().await;

    loop {
        tokio::select! {
            _ = sweep.tick() => {
                handle.sweep();
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                tracing::info!("shutting down");
                break;
            }
        }
    }

    handle.shutdown();
    worker.await?;
    Ok(())
}
