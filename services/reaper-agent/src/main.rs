//! # Reaper Agent
//!
//! Enforcement-side sidecar: resolves mandates issued by `reaper-platform`
//! and runs the pure policy engine's authorize phase against a shared
//! runtime-state backend (§2, §4.9).

mod config;
mod error;
mod handlers;
mod state;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use reaper_core::{endpoints, BUILD_INFO};
use tokio::net::TcpListener;
use tracing::{error, info};

use config::ServiceConfig;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    info!("Starting Reaper Agent {}", BUILD_INFO);

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("configuration error: {err}");
            std::process::exit(1);
        }
    };
    let bind_port = config.bind_port;
    let state = match AppState::new(config).await {
        Ok(state) => Arc::new(state),
        Err(err) => {
            error!("failed to initialize state backend: {err}");
            std::process::exit(1);
        }
    };

    let app = Router::new()
        .route(endpoints::HEALTH, get(handlers::health_check))
        .route(endpoints::METRICS, get(handlers::metrics))
        .route(endpoints::API_V1_MESSAGES, post(handlers::send_message))
        .with_state(state);

    let listener = TcpListener::bind(("0.0.0.0", bind_port)).await?;
    info!("Reaper Agent listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
