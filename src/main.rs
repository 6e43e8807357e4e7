// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc, time::Duration};
use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::session_runner::spawn_session;
use crate::infrastructure::config::load_dashboard_config;
use crate::infrastructure::graphql_source::GraphqlReadingSource;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    begin_zoom, commit_zoom, extend_zoom, get_dashboard, get_history, get_latest, get_status,
    get_window, health_check, list_devices, refresh, reset_zoom, select_device, select_range,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("telemetry_dashboard=info,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = load_dashboard_config()?;

    // Create reading source (infrastructure layer)
    let source = Arc::new(GraphqlReadingSource::new(
        config.source.endpoint.clone(),
        config.source.token.clone(),
        Duration::from_secs(config.source.request_timeout_secs),
    )?);

    // Start the session (application layer) on the default device
    let session = spawn_session(source, config.session.to_settings());
    session.select_device(&config.session.default_device).await?;

    let state = Arc::new(AppState {
        session,
        devices: config.session.devices.clone(),
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/devices", get(list_devices))
        .route("/dashboard", get(get_dashboard))
        .route("/dashboard/latest", get(get_latest))
        .route("/dashboard/history", get(get_history))
        .route("/dashboard/window", get(get_window))
        .route("/dashboard/status", get(get_status))
        .route("/dashboard/device", put(select_device))
        .route("/dashboard/range", put(select_range))
        .route("/dashboard/refresh", post(refresh))
        .route("/dashboard/zoom/begin", post(begin_zoom))
        .route("/dashboard/zoom/extend", post(extend_zoom))
        .route("/dashboard/zoom/commit", post(commit_zoom))
        .route("/dashboard/zoom/reset", post(reset_zoom))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting telemetry-dashboard on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
