// HTTP request handlers
use crate::application::session::{DashboardView, SessionStatus};
use crate::domain::error::DashboardError;
use crate::domain::range::RangeKind;
use crate::domain::reading::Reading;
use crate::domain::window::Window;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct DeviceRequest {
    pub device: String,
}

#[derive(Debug, Deserialize)]
pub struct ZoomPoint {
    pub x: i64,
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let status = match &self {
            DashboardError::InvalidRange(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DashboardError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DashboardError::SourceUnavailable(_) => StatusCode::BAD_GATEWAY,
            DashboardError::SessionClosed => StatusCode::SERVICE_UNAVAILABLE,
        };
        (status, self.to_string()).into_response()
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_devices(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.devices.clone())
}

/// Current view of the dashboard, windowed history included
pub async fn get_dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardView> {
    Json(state.session.view())
}

pub async fn get_latest(State(state): State<Arc<AppState>>) -> Json<Option<Reading>> {
    Json(state.session.current_latest())
}

/// History restricted to the active window
pub async fn get_history(State(state): State<Arc<AppState>>) -> Json<Vec<Reading>> {
    Json(state.session.current_history())
}

pub async fn get_window(State(state): State<Arc<AppState>>) -> Json<Window> {
    Json(state.session.current_window())
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<SessionStatus> {
    Json(state.session.status())
}

pub async fn select_device(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DeviceRequest>,
) -> Response {
    if !state.devices.iter().any(|d| d == &request.device) {
        tracing::warn!("Rejected unknown device {}", request.device);
        return (
            StatusCode::NOT_FOUND,
            format!("unknown device {}", request.device),
        )
            .into_response();
    }

    match state.session.select_device(&request.device).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn select_range(
    State(state): State<Arc<AppState>>,
    Json(kind): Json<RangeKind>,
) -> Result<StatusCode, DashboardError> {
    state.session.select_range(kind).await?;
    Ok(StatusCode::ACCEPTED)
}

/// Trigger a latest-reading poll now
pub async fn refresh(State(state): State<Arc<AppState>>) -> Result<StatusCode, DashboardError> {
    state.session.refresh().await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn begin_zoom(
    State(state): State<Arc<AppState>>,
    Json(point): Json<ZoomPoint>,
) -> Result<StatusCode, DashboardError> {
    state.session.begin_zoom(point.x).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn extend_zoom(
    State(state): State<Arc<AppState>>,
    Json(point): Json<ZoomPoint>,
) -> Result<StatusCode, DashboardError> {
    state.session.extend_zoom(point.x).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn commit_zoom(State(state): State<Arc<AppState>>) -> Result<StatusCode, DashboardError> {
    state.session.commit_zoom().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reset_zoom(State(state): State<Arc<AppState>>) -> Result<StatusCode, DashboardError> {
    state.session.reset_zoom().await?;
    Ok(StatusCode::NO_CONTENT)
}
