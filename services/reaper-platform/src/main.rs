//! # Reaper Platform
//!
//! Issuance-side service: agent registry, versioned policy/rule stores,
//! mandate issuance, kill registry, and the audit log (§2, §4.9).

mod auth;
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

    info!("Starting Reaper Platform {}", BUILD_INFO);

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("configuration error: {err}");
            std::process::exit(1);
        }
    };
    let bind_port = config.bind_port;
    let state = Arc::new(AppState::new(config));

    let app = Router::new()
        .route(endpoints::HEALTH, get(handlers::health_check))
        .route(endpoints::METRICS, get(handlers::metrics))
        .route(endpoints::API_V1_AGENTS, post(handlers::create_agent).get(handlers::list_agents))
        .route(
            "/agents/{id}",
            get(handlers::get_agent).put(handlers::update_agent).delete(handlers::delete_agent),
        )
        .route("/agents/{id}/kill", post(handlers::kill_agent))
        .route("/agents/{id}/kill-status", get(handlers::kill_status))
        .route("/agents/{id}/resurrect", post(handlers::resurrect_agent))
        .route(endpoints::API_V1_POLICIES, post(handlers::create_policy).get(handlers::list_policies))
        .route(
            "/policies/{id}",
            get(handlers::get_policy).put(handlers::update_policy).delete(handlers::delete_policy),
        )
        .route(endpoints::API_V1_RULES, post(handlers::create_rule).get(handlers::list_rules))
        .route("/rules/{id}", get(handlers::get_rule).put(handlers::update_rule).delete(handlers::delete_rule))
        .route("/mandates/issue", post(handlers::issue_mandate))
        .route("/mandates/{id}", get(handlers::get_mandate))
        .route(endpoints::API_V1_AUDIT, post(handlers::submit_audit).get(handlers::query_audit))
        .route("/audit/bulk", post(handlers::submit_audit_bulk))
        .with_state(state);

    let listener = TcpListener::bind(("0.0.0.0", bind_port)).await?;
    info!("Reaper Platform listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
