// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Presence Tracker API Server
//!
//! Connects a Spotify account and serves "now playing" status to the
//! presence dashboard.

use presence_tracker::{
    config::Config,
    services::SpotifyService,
    store::{CredentialStore, JsonFileStorage, StorageCredentialStore},
    time_utils::SystemClock,
    AppState,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Presence Tracker API");

    // Open credential storage
    let storage = JsonFileStorage::open(&config.credential_store_path)?;
    let credentials = Arc::new(StorageCredentialStore::new(storage, Arc::new(SystemClock)));
    tracing::info!(
        connected = credentials.is_connected(),
        "Credential store initialized"
    );

    let spotify = SpotifyService::from_config(&config, credentials)?;

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), spotify));

    // Tear down sessions whose display stopped reading them
    let reaper_token = CancellationToken::new();
    let reaper = state.sessions.spawn_reaper(reaper_token.clone());

    // Build router
    let app = presence_tracker::routes::create_router(state.clone());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop every poll and progress timer before exiting
    reaper_token.cancel();
    if let Err(e) = reaper.await {
        tracing::error!(error = %e, "Session reaper panicked");
    }
    state.sessions.close_all().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("presence_tracker=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
