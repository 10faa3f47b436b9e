pub mod api;

use axum::{extract::FromRef, routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::docs::ApiDoc;
use crate::relay::{websocket_handler, RelayState};

pub use api::create_api_routes;

/// Shared state of the relay's HTTP surface
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<RelayState>,
    pub service_name: String,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self {
            relay: Arc::new(RelayState::new()),
            service_name: config.service_name.clone(),
        }
    }
}

impl FromRef<AppState> for Arc<RelayState> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.relay.clone()
    }
}

/// The full relay application: websocket endpoint, API and Swagger UI
pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        // Mount API routes
        .nest("/api", create_api_routes())
        .with_state(app_state)
        // Mount Swagger UI
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        // Add tracing layer
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::models::{DiagnosticsResponse, HealthResponse};

    async fn get_json<T: serde::de::DeserializeOwned>(app: Router, uri: &str) -> (StatusCode, T) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_service_name() {
        let app = create_app(AppState::new(&Config::default()));
        let (status, health): (_, HealthResponse) = get_json(app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health.status, "ok");
        assert_eq!(health.service, "anchor-relay");
    }

    #[tokio::test]
    async fn diagnostics_reflect_connected_peers() {
        let app_state = AppState::new(&Config::default());
        app_state.relay.join().await.unwrap();
        app_state.relay.join().await.unwrap();

        let (status, diagnostics): (_, DiagnosticsResponse) =
            get_json(create_app(app_state), "/api/v1/diagnostics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(diagnostics.n_peers, 2);
        assert_eq!(diagnostics.master_id, Some(1));
        assert_eq!(diagnostics.peer_ids, vec![1, 2]);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = create_app(AppState::new(&Config::default()));
        let (status, doc): (_, serde_json::Value) = get_json(app, "/api-docs/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(doc["paths"]["/api/v1/diagnostics"].is_object());
    }
}
