//! # ringvc-server
//!
//! Voice channel ring service.
//!
//! This binary provides:
//! - **Join fan-out**: tells everyone signed up for a voice channel that
//!   somebody joined, once per group and without repeats
//! - **Rings**: explicit and automatic rings of a user's default recipients
//! - **Settings commands**: filters, visibility modes, signups
//! - **Debounced persistence** of all settings to a single data file
//! - **REST API** (axum) the platform adapter posts events and commands to

mod api;
mod commands;
mod config;
mod delivery;
mod engine;
mod error;
mod ring;

use std::sync::Arc;

use ringvc_shared::constants::APP_NAME;
use ringvc_store::{DebouncedStore, StorePaths};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::delivery::{Delivery, LogDelivery, WebhookDelivery};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ringvc_server=debug,ringvc_store=debug")),
        )
        .init();

    info!("Starting {} v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env()?;
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Load settings and start the engine
    // -----------------------------------------------------------------------
    let paths = StorePaths::in_dir(&config.data_dir);
    let (store, state) = DebouncedStore::open(paths, config.save_cooldown).await?;

    let delivery: Arc<dyn Delivery> = match &config.delivery_url {
        Some(url) => Arc::new(WebhookDelivery::new(url.clone())),
        None => {
            warn!("DELIVERY_URL is not set, ring messages will only be logged");
            Arc::new(LogDelivery)
        }
    };

    let (engine, engine_task) = engine::spawn_engine(state, store, delivery);

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server until it fails or we are told to stop
    // -----------------------------------------------------------------------
    let result = tokio::select! {
        result = api::serve(AppState::new(engine.clone()), config.http_addr) => result,
        _ = shutdown_signal() => Ok(()),
    };

    // -----------------------------------------------------------------------
    // 5. Flush pending changes before exiting
    // -----------------------------------------------------------------------
    if engine.shutdown().await.is_ok() {
        if let Err(e) = engine_task.await {
            error!(error = %e, "Engine task panicked");
        }
    } else {
        warn!("Engine already stopped, nothing to flush");
    }

    if let Err(e) = &result {
        error!(error = %e, "HTTP server failed");
    }
    info!("Shut down");
    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
