use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::info;

use crate::models::DiagnosticsResponse;
use crate::relay::RelayState;

/// Relay diagnostics
pub async fn diagnostics(State(relay): State<Arc<RelayState>>) -> (StatusCode, Json<DiagnosticsResponse>) {
    let diagnostics = relay.diagnostics().await;
    info!(
        "Diagnostics: Peers: {}, Master: {:?}, Routed: {}, Dropped: {}",
        diagnostics.n_peers, diagnostics.master_id, diagnostics.frames_routed, diagnostics.frames_dropped
    );
    (StatusCode::OK, Json(diagnostics))
}
