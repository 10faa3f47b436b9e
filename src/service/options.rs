use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;

/// Which acknowledgement settles a create request.
///
/// The protocol currently trusts whichever peer answers first. `FirstSuccess`
/// ignores failed acknowledgements and keeps waiting for a successful one
/// until the deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AckPolicy {
    #[default]
    FirstResponse,
    FirstSuccess,
}

/// Knobs of a [`NetworkAnchorService`](super::NetworkAnchorService).
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub request_timeout: Duration,
    pub verbose_logging: bool,
    pub create_ack_policy: AckPolicy,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(3000),
            verbose_logging: true,
            create_ack_policy: AckPolicy::FirstResponse,
        }
    }
}

impl From<&Config> for ServiceOptions {
    fn from(config: &Config) -> Self {
        Self {
            request_timeout: config.request_timeout(),
            verbose_logging: config.verbose_logging,
            create_ack_policy: config.create_ack_policy,
        }
    }
}
