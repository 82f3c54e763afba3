//! # Stereo API Server
//!
//! Main entry point for the stereo sports-video segmentation service.
//! Hosts the REST API for uploads, first-frame analysis and full-video
//! segmentation jobs, and owns the pipeline the jobs run on.

mod config;
mod error;
mod handlers;
mod routes;
mod state;

use crate::config::ApiConfig;
use crate::routes::create_router;
use crate::state::AppState;

use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    init_logging();

    info!("Starting Stereo Segmentation Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = ApiConfig::from_env();
    info!("Configuration loaded");
    info!("   API Port: {}", config.api_port);
    info!("   Uploads: {}", config.uploads_dir.display());
    info!("   Outputs: {}", config.outputs_dir.display());
    info!("   Simulation mode: {}", config.simulation_mode);

    // Initialize application state
    let state = match AppState::new(config.clone()) {
        Ok(state) => {
            info!("Application state initialized");
            state
        }
        Err(e) => {
            error!("Failed to initialize application state: {}", e);
            return Err(e);
        }
    };
    if !state.models_available() {
        info!("Running in degraded mode (no segmentation models)");
    }

    // Create router
    let app = create_router(state.clone());
    info!("Routes configured");

    // Start API server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    info!("API server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Wind down running jobs so their status records land.
    state.pipeline.shutdown();
    info!("Server shutdown complete");
    Ok(())
}

/// Initialize logging with tracing
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,stereo_api=debug,stereo_pipeline=debug,stereo_cv=debug")
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(filter)
        .init();
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        }
    }
}
