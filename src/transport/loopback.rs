use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};

use super::{resolve_recipients, Transport};
use crate::models::PeerId;
use crate::service::{NetworkAnchorService, WeakNetworkAnchorService};

/// In-process relay connecting services on one thread.
///
/// Routes like the websocket relay (lowest joined id is master). Each delivery
/// is its own local task, so a send never re-enters the receiving service and
/// everything has to run inside a [`tokio::task::LocalSet`].
#[derive(Default)]
pub struct LoopbackHub {
    peers: RefCell<Vec<Member>>,
    muted: RefCell<HashSet<PeerId>>,
    delivered: Cell<u64>,
    dropped: Cell<u64>,
}

struct Member {
    peer_id: PeerId,
    service: WeakNetworkAnchorService,
    transport: Rc<LoopbackTransport>,
}

impl LoopbackHub {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Registers `service` as `peer_id` and routes its outbound events here.
    ///
    /// A service that already joined keeps its transport and is only moved
    /// to `peer_id`; it is never attached twice.
    pub fn join(self: &Rc<Self>, peer_id: PeerId, service: &NetworkAnchorService) -> Rc<LoopbackTransport> {
        let mut peers = self.peers.borrow_mut();
        let existing = peers
            .iter()
            .find(|member| member.service.refers_to(service))
            .map(|member| member.transport.clone());
        peers.retain(|member| member.peer_id != peer_id && !member.service.refers_to(service));

        let transport = match existing {
            Some(transport) => {
                debug!("Peer {} rejoined loopback hub as {}", transport.peer_id(), peer_id);
                transport.peer_id.set(peer_id);
                transport
            }
            None => {
                let transport = Rc::new(LoopbackTransport { hub: Rc::downgrade(self), peer_id: Cell::new(peer_id) });
                service.attach_transport(transport.clone());
                debug!("Peer {} joined loopback hub", peer_id);
                transport
            }
        };
        peers.push(Member { peer_id, service: service.downgrade(), transport: transport.clone() });
        transport
    }

    pub fn leave(&self, peer_id: PeerId) {
        self.peers.borrow_mut().retain(|member| member.peer_id != peer_id);
    }

    /// Drops every event addressed to `peer_id`, as if it stopped responding.
    pub fn mute(&self, peer_id: PeerId) {
        self.muted.borrow_mut().insert(peer_id);
    }

    pub fn unmute(&self, peer_id: PeerId) {
        self.muted.borrow_mut().remove(&peer_id);
    }

    pub fn master_id(&self) -> Option<PeerId> {
        self.peers.borrow().iter().map(|member| member.peer_id).min()
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.borrow().iter().map(|member| member.peer_id).collect()
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.get()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.get()
    }

    fn route(&self, sender: PeerId, code: u8, json: &str, targets: &[i32]) {
        let recipients = resolve_recipients(targets, sender, self.master_id(), &self.peer_ids());
        for recipient in recipients {
            if self.muted.borrow().contains(&recipient) {
                trace!("Dropping event {} to muted peer {}", code, recipient);
                self.dropped.set(self.dropped.get() + 1);
                continue;
            }
            let service = self
                .peers
                .borrow()
                .iter()
                .find(|member| member.peer_id == recipient)
                .and_then(|member| member.service.upgrade());
            let Some(service) = service else {
                self.dropped.set(self.dropped.get() + 1);
                continue;
            };

            self.delivered.set(self.delivered.get() + 1);
            let json = json.to_string();
            tokio::task::spawn_local(async move {
                service.process_network_event(code, &json);
            });
        }
    }
}

pub struct LoopbackTransport {
    hub: Weak<LoopbackHub>,
    peer_id: Cell<PeerId>,
}

impl LoopbackTransport {
    pub fn peer_id(&self) -> PeerId {
        self.peer_id.get()
    }
}

impl Transport for LoopbackTransport {
    fn send(&self, code: u8, json: &str, targets: &[i32]) {
        match self.hub.upgrade() {
            Some(hub) => hub.route(self.peer_id(), code, json, targets),
            None => debug!("Loopback hub is gone; dropping event {}", code),
        }
    }
}
