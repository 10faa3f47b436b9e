//! Websocket relay that carries network events between peers.
//!
//! The relay assigns every socket a peer id and routes event frames by the
//! target sentinels. It knows nothing about anchors; the lowest connected id
//! is the master that runs directory management.

pub mod socket;

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::models::{
    DiagnosticsResponse, DisconnectFromServiceRequest, EventCode, EventMessage, MasterChangedMessage, NetworkEvent,
    PeerId, SendMessage, Target,
};
use crate::transport::resolve_recipients;

pub use socket::websocket_handler;

const FRAME_CAPACITY: usize = 256;

/// A serialized frame and the peers it goes to.
#[derive(Debug, Clone)]
pub struct RoutedFrame {
    pub recipients: Vec<PeerId>,
    pub content: String,
}

pub struct RelayState {
    peers: RwLock<BTreeSet<PeerId>>,
    next_peer_id: AtomicI32,
    frames: broadcast::Sender<RoutedFrame>,
    frames_routed: AtomicU64,
    frames_dropped: AtomicU64,
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayState {
    pub fn new() -> Self {
        Self::with_capacity(FRAME_CAPACITY)
    }

    /// `capacity` bounds how far a socket may fall behind before it is closed.
    pub fn with_capacity(capacity: usize) -> Self {
        let (frames, _rx) = broadcast::channel::<RoutedFrame>(capacity);
        Self {
            peers: RwLock::new(BTreeSet::new()),
            next_peer_id: AtomicI32::new(1),
            frames,
            frames_routed: AtomicU64::new(0),
            frames_dropped: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoutedFrame> {
        self.frames.subscribe()
    }

    /// Admits a new socket. Returns its peer id and the current master, or
    /// `None` once the positive id space is used up. Ids never wrap into the
    /// negative routing sentinels.
    pub async fn join(&self) -> Option<(PeerId, PeerId)> {
        let peer_id = match self
            .next_peer_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| id.checked_add(1))
        {
            Ok(peer_id) => peer_id,
            Err(_) => {
                warn!("Relay ran out of peer ids");
                return None;
            }
        };
        let mut peers = self.peers.write().await;
        peers.insert(peer_id);
        let master_id = peers.first().copied().unwrap_or(peer_id);
        info!("Peer {} joined the relay; {} connected, master {}", peer_id, peers.len(), master_id);
        Some((peer_id, master_id))
    }

    /// Removes a socket's peer and tells the master it is gone.
    pub async fn leave(&self, peer_id: PeerId) {
        let (was_master, master_id) = {
            let mut peers = self.peers.write().await;
            let was_master = peers.first() == Some(&peer_id);
            if !peers.remove(&peer_id) {
                return;
            }
            (was_master, peers.first().copied())
        };
        info!("Peer {} left the relay", peer_id);

        let Some(master_id) = master_id else {
            debug!("Relay is empty");
            return;
        };
        if was_master {
            info!("Peer {} is the new master", master_id);
            let peer_ids: Vec<PeerId> = self.peers.read().await.iter().copied().collect();
            self.publish(peer_ids, &SendMessage::MasterChanged(MasterChangedMessage { master_id }));
        }

        let event = NetworkEvent::DisconnectFromServiceRequest(DisconnectFromServiceRequest { sender_id: peer_id });
        match event.to_json() {
            Ok(payload) => {
                let message = EventMessage {
                    code: EventCode::DisconnectFromServiceRequest.as_u8(),
                    payload,
                    targets: vec![Target::MASTER_ID],
                    sender: peer_id,
                };
                self.publish(vec![master_id], &SendMessage::Event(message));
            }
            Err(e) => warn!("Failed to encode disconnect of peer {}: {}", peer_id, e),
        }
    }

    /// Routes an event a client sent. The sender field is always overwritten
    /// with the socket's peer id.
    pub async fn route(&self, sender: PeerId, mut event: EventMessage) {
        event.sender = sender;
        let recipients = {
            let peers = self.peers.read().await;
            let peer_ids: Vec<PeerId> = peers.iter().copied().collect();
            resolve_recipients(&event.targets, sender, peers.first().copied(), &peer_ids)
        };
        if recipients.is_empty() {
            debug!("Event {} from peer {} has no recipients", event.code, sender);
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.publish(recipients, &SendMessage::Event(event));
    }

    fn publish(&self, recipients: Vec<PeerId>, message: &SendMessage) {
        let content = match serde_json::to_string(message) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to serialize relay frame: {}", e);
                self.frames_dropped.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };
        let n_recipients = recipients.len() as u64;
        // Sending fails only when no socket is subscribed.
        if self.frames.send(RoutedFrame { recipients, content }).is_ok() {
            self.frames_routed.fetch_add(n_recipients, Ordering::Relaxed);
        } else {
            self.frames_dropped.fetch_add(n_recipients, Ordering::Relaxed);
        }
    }

    pub fn record_dropped(&self, n_frames: u64) {
        self.frames_dropped.fetch_add(n_frames, Ordering::Relaxed);
    }

    pub async fn master_id(&self) -> Option<PeerId> {
        self.peers.read().await.first().copied()
    }

    pub async fn diagnostics(&self) -> DiagnosticsResponse {
        let peers = self.peers.read().await;
        DiagnosticsResponse {
            n_peers: peers.len() as u32,
            master_id: peers.first().copied(),
            peer_ids: peers.iter().copied().collect(),
            frames_routed: self.frames_routed.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
        }
    }
}
