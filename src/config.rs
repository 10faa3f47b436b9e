use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use crate::error::AnchorError;
use crate::service::AckPolicy;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Relay host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Relay port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Deadline for every pending peer request, in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Deadline applied by coordinate provider adapters, in milliseconds
    #[serde(default = "default_coordinate_timeout_ms")]
    pub coordinate_timeout_ms: u64,

    /// Deadline for borrowing a remote peer's coordinates on standalone clients
    #[serde(default = "default_standalone_timeout_ms")]
    pub standalone_timeout_ms: u64,

    /// Feeds the debug notification stream; no protocol effect
    #[serde(default = "default_verbose_logging")]
    pub verbose_logging: bool,

    /// How many create acknowledgements count as success
    #[serde(default)]
    pub create_ack_policy: AckPolicy,

    /// Relay websocket URL used by clients
    pub relay_url: Option<String>,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, AnchorError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                Err(AnchorError::Config(e))
            }
        }
    }

    /// Get the full relay address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Websocket URL clients dial, defaulting to this relay on localhost
    pub fn relay_endpoint(&self) -> String {
        match &self.relay_url {
            Some(url) => url.clone(),
            None => format!("ws://127.0.0.1:{}/ws", self.port),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn coordinate_timeout(&self) -> Duration {
        Duration::from_millis(self.coordinate_timeout_ms)
    }

    pub fn standalone_timeout(&self) -> Duration {
        Duration::from_millis(self.standalone_timeout_ms)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            service_name: default_service_name(),
            request_timeout_ms: default_request_timeout_ms(),
            coordinate_timeout_ms: default_coordinate_timeout_ms(),
            standalone_timeout_ms: default_standalone_timeout_ms(),
            verbose_logging: default_verbose_logging(),
            create_ack_policy: AckPolicy::default(),
            relay_url: None,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "anchor-relay".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_request_timeout_ms() -> u64 {
    3000
}

fn default_coordinate_timeout_ms() -> u64 {
    20_000
}

fn default_standalone_timeout_ms() -> u64 {
    2000
}

fn default_verbose_logging() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_protocol_constants() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_millis(3000));
        assert_eq!(config.coordinate_timeout(), Duration::from_secs(20));
        assert_eq!(config.standalone_timeout(), Duration::from_secs(2));
        assert!(config.verbose_logging);
        assert_eq!(config.create_ack_policy, AckPolicy::FirstResponse);
        assert_eq!(config.server_address(), "0.0.0.0:3000");
        assert_eq!(config.relay_endpoint(), "ws://127.0.0.1:3000/ws");
    }

    #[test]
    fn reads_overrides_from_environment_pairs() {
        let vars = vec![
            ("REQUEST_TIMEOUT_MS".to_string(), "500".to_string()),
            ("VERBOSE_LOGGING".to_string(), "false".to_string()),
            ("CREATE_ACK_POLICY".to_string(), "first-success".to_string()),
            ("PORT".to_string(), "8081".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.request_timeout_ms, 500);
        assert!(!config.verbose_logging);
        assert_eq!(config.create_ack_policy, AckPolicy::FirstSuccess);
        assert_eq!(config.port, 8081);
        assert_eq!(config.coordinate_timeout_ms, 20_000);
    }
}
