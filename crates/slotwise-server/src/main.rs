//! Slotwise Server: application entry point.

use anyhow::Context;
use slotwise_db::{DbManager, run_migrations};
use slotwise_server::{AppState, ServerConfig, router};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("slotwise=info,tower_http=info"))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .init();

    let config = ServerConfig::from_env().context("failed to load configuration")?;
    tracing::info!(bind_addr = %config.bind_addr, "Starting Slotwise server");

    let db = DbManager::connect(&config.db)
        .await
        .context("failed to connect to SurrealDB")?;
    run_migrations(db.client())
        .await
        .context("failed to run migrations")?;

    let state = AppState::new(db.client().clone(), config.auth, config.booking);
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Slotwise server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
