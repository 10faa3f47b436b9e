use network_anchors::config::Config;
use network_anchors::routes::{create_app, AppState};
use std::panic;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Load configuration
    let config = Config::load();

    // Initialize tracing
    let default_filter = match &config {
        Ok(config) => format!("network_anchors={},anchor_relay={},tower_http=debug,info", config.log_level, config.log_level),
        Err(_) => "network_anchors=debug,anchor_relay=debug,tower_http=debug,info".to_string(),
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .init();

    info!("Starting relay...");

    let config = config.unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });
    if config.is_development() {
        info!("Running in development mode");
    }

    let app_routes = create_app(AppState::new(&config));

    let listener = match tokio::net::TcpListener::bind(config.server_address()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", config.server_address(), e);
            std::process::exit(1);
        }
    };

    info!("🚀 Relay running on http://{}", config.server_address());
    info!("📡 Peers connect at ws://{}/ws", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());

    if let Err(e) = axum::serve(listener, app_routes).await {
        error!("Relay stopped: {}", e);
        std::process::exit(1);
    }
}
