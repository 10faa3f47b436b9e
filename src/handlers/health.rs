use axum::{extract::State, Json};
use tracing::debug;

use crate::models::HealthResponse;
use crate::routes::AppState;

/// Health check endpoint
pub async fn health_check(State(app_state): State<AppState>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        service: app_state.service_name.clone(),
        message: "Relay is running".to_string(),
    })
}

/// Readiness check endpoint
pub async fn ready_check(State(app_state): State<AppState>) -> Json<HealthResponse> {
    debug!("Readiness check requested");
    let message = match app_state.relay.master_id().await {
        Some(master_id) => format!("Relay is ready; master is peer {}", master_id),
        None => "Relay is ready; no peers connected".to_string(),
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        service: app_state.service_name.clone(),
        message,
    })
}
