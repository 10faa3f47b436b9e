#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use network_anchors::geometry::{Quat, Vec3};
use network_anchors::models::{Coordinate, CreateNetworkAnchorRequest, NetworkAnchor, NetworkEvent, PeerId};
use network_anchors::providers::FixedCoordinateProvider;
use network_anchors::service::{NetworkAnchorService, ServiceOptions};
use network_anchors::transport::{LoopbackHub, LoopbackTransport};

/// Sender id for events injected by tests; never joins a hub.
pub const OUTSIDER: PeerId = 99;

pub fn coordinate(id: &str, x: f32, y: f32, z: f32) -> Coordinate {
    Coordinate::new(id, Vec3::new(x, y, z), Quat::IDENTITY)
}

pub struct TestPeer {
    pub id: PeerId,
    pub service: NetworkAnchorService,
    pub provider: Rc<FixedCoordinateProvider>,
    pub transport: Rc<LoopbackTransport>,
    pub anchor_changes: Rc<Cell<u32>>,
    pub connection_changes: Rc<RefCell<Vec<bool>>>,
    pub sent_codes: Rc<RefCell<Vec<u8>>>,
}

impl TestPeer {
    pub fn join(hub: &Rc<LoopbackHub>, id: PeerId, coordinates: Vec<Coordinate>) -> Self {
        Self::join_with(hub, id, coordinates, ServiceOptions::default())
    }

    pub fn join_with(hub: &Rc<LoopbackHub>, id: PeerId, coordinates: Vec<Coordinate>, options: ServiceOptions) -> Self {
        let service = NetworkAnchorService::new(options);
        let transport = hub.join(id, &service);

        let anchor_changes = Rc::new(Cell::new(0));
        let counter = anchor_changes.clone();
        service.on_network_anchor_changed(move |_| counter.set(counter.get() + 1));

        let connection_changes = Rc::new(RefCell::new(Vec::new()));
        let changes = connection_changes.clone();
        service.on_connection_changed(move |connected| changes.borrow_mut().push(connected));

        let sent_codes = Rc::new(RefCell::new(Vec::new()));
        let codes = sent_codes.clone();
        service.on_broadcast_network_event(move |code, _, _| codes.borrow_mut().push(code));

        Self {
            id,
            service,
            provider: Rc::new(FixedCoordinateProvider::new(coordinates)),
            transport,
            anchor_changes,
            connection_changes,
            sent_codes,
        }
    }

    /// Joins the session and caches coordinates so the peer can answer others.
    pub async fn connect(&self) {
        let code = self.service.connect(self.id, self.provider.clone()).await;
        assert!(code.is_success(), "peer {} failed to connect: {}", self.id, code);
        self.service.refresh_coordinates(true).await;
    }

    pub fn sent(&self, code: u8) -> usize {
        self.sent_codes.borrow().iter().filter(|sent| **sent == code).count()
    }

    pub fn anchor_world_position(&self) -> Option<Vec3> {
        self.service.local_network_anchor().map(|anchor| anchor.world_position(None))
    }
}

pub async fn connect_all(peers: &[&TestPeer]) {
    for peer in peers {
        peer.connect().await;
    }
    settle().await;
}

/// Lets queued deliveries run. Paused clocks auto-advance through the sleep.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// Hands `service` an anchor authored by an outside peer at `world_position`
/// against `coordinate`, the way a create broadcast would.
pub fn inject_anchor(service: &NetworkAnchorService, anchor_id: &str, coordinate: &Coordinate, world_position: Vec3) {
    let anchor = NetworkAnchor::new_local(anchor_id, OUTSIDER, coordinate, world_position, Quat::IDENTITY);
    let event = NetworkEvent::CreateNetworkAnchorRequest(CreateNetworkAnchorRequest {
        sender_id: OUTSIDER,
        generic_coordinates: vec![coordinate.clone()],
        network_anchor: Some(anchor),
    });
    let json = event.to_json().unwrap();
    service.process_network_event(event.code().as_u8(), &json);
}
