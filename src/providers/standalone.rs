use std::time::Duration;
use tracing::error;

use super::{CoordinateProvider, CoordinatesFuture};
use crate::service::WeakNetworkAnchorService;

/// Coordinates for clients without tracking hardware.
///
/// Borrows the coordinate set of the first remote peer that has one and uses
/// it as its own, which places a desktop client at that peer's frame.
pub struct StandaloneCoordinateProvider {
    service: WeakNetworkAnchorService,
    timeout: Duration,
}

impl StandaloneCoordinateProvider {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

    pub fn new(service: WeakNetworkAnchorService) -> Self {
        Self { service, timeout: Self::DEFAULT_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl CoordinateProvider for StandaloneCoordinateProvider {
    // Nothing to start or stop on a desktop.
    fn initialize(&self) {}

    fn disable(&self) {}

    fn request_coordinate_references(&self, _refresh: bool) -> CoordinatesFuture<'_> {
        Box::pin(async move {
            let Some(service) = self.service.upgrade() else {
                error!("Anchor service is gone; cannot borrow coordinates");
                return Vec::new();
            };

            match tokio::time::timeout(self.timeout, service.request_remote_coordinates()).await {
                Ok(response) if !response.coordinates.is_empty() => response.coordinates,
                Ok(response) => {
                    error!("Could not borrow coordinates from a remote peer: {}", response.result_code);
                    Vec::new()
                }
                Err(_) => {
                    error!("Could not get coordinates within {:?}", self.timeout);
                    Vec::new()
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::NetworkAnchorService;

    #[tokio::test]
    async fn dropped_service_yields_nothing() {
        let service = NetworkAnchorService::default();
        let provider = StandaloneCoordinateProvider::new(service.downgrade());
        drop(service);
        assert!(provider.request_coordinate_references(true).await.is_empty());
    }

    #[tokio::test]
    async fn no_remote_peers_yields_nothing() {
        let service = NetworkAnchorService::default();
        let provider = StandaloneCoordinateProvider::new(service.downgrade());
        assert!(provider.request_coordinate_references(true).await.is_empty());
    }
}
