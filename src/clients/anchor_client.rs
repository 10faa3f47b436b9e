use std::rc::Rc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AnchorError, AnchorResult};
use crate::models::{PeerId, ResultCode};
use crate::providers::{
    CoordinateProvider, DeadlineCoordinateProvider, FallbackCoordinateProvider, StandaloneCoordinateProvider,
};
use crate::service::{AnchorLocalizer, NetworkAnchorService, ServiceOptions};
use crate::transport::WebSocketTransport;

/// A service joined to a relay session.
///
/// Wires the relay transport and the provider chain the way a client
/// application needs them: the tracker when there is one, borrowed
/// coordinates otherwise, all bounded by the coordinate deadline.
pub struct AnchorClient {
    service: NetworkAnchorService,
    transport: Rc<WebSocketTransport>,
    localizer: AnchorLocalizer,
}

impl AnchorClient {
    /// Dials the configured relay and joins the session. Must run inside a
    /// [`tokio::task::LocalSet`].
    pub async fn connect(config: &Config, tracker: Option<Rc<dyn CoordinateProvider>>) -> AnchorResult<Self> {
        let service = NetworkAnchorService::new(ServiceOptions::from(config));
        let transport = WebSocketTransport::connect(&config.relay_endpoint(), &service).await?;

        let standalone =
            Rc::new(StandaloneCoordinateProvider::new(service.downgrade()).with_timeout(config.standalone_timeout()));
        let fallback = Rc::new(FallbackCoordinateProvider::new(tracker, standalone));
        let provider = Rc::new(DeadlineCoordinateProvider::new(fallback, config.coordinate_timeout()));

        match service.connect(transport.peer_id(), provider).await {
            ResultCode::Success => info!("Joined the anchor session as peer {}", transport.peer_id()),
            code => {
                warn!("Could not join the anchor session: {}", code);
                transport.close();
                return Err(AnchorError::Transport(format!("master did not admit peer {}: {}", transport.peer_id(), code)));
            }
        }

        let localizer = AnchorLocalizer::new(service.clone());
        Ok(Self { service, transport, localizer })
    }

    pub fn peer_id(&self) -> PeerId {
        self.transport.peer_id()
    }

    pub fn service(&self) -> &NetworkAnchorService {
        &self.service
    }

    pub fn localizer(&self) -> &AnchorLocalizer {
        &self.localizer
    }

    /// Leaves the session and closes the socket.
    pub fn disconnect(&self) {
        self.service.disconnect(None);
        self.transport.close();
    }
}
