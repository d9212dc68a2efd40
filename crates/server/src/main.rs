//! Charges server - HTTP front end for the insurance charges model
//!
//! Serves predictions from the artifacts written by `charges train`.

use anyhow::Result;
use charges_server::{api, config::ServerConfig};
use predictor_lib::{ArtifactPaths, ArtifactStore, StructuredLogger};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting charges-server");

    let config = ServerConfig::load()?;
    info!(
        artifact_dir = %config.artifact_dir.display(),
        preload = config.preload,
        "Server configured"
    );

    let store = Arc::new(ArtifactStore::new(ArtifactPaths::in_dir(&config.artifact_dir)));
    if config.preload {
        // Missing artifacts are not fatal: /readyz reports 503 until a training run lands
        if let Err(e) = store.get() {
            warn!(error = %e, "Artifacts not loaded at startup");
        }
    }

    let logger = StructuredLogger::new("charges-server");
    let addr = config.addr();
    logger.log_startup(SERVER_VERSION, &addr);

    let app_state = Arc::new(api::AppState::new(store));
    api::serve(&addr, app_state, shutdown_signal()).await?;

    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
