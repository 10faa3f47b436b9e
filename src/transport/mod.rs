//! Carriers of network events between peers.

pub mod loopback;
pub mod websocket;

use crate::models::{PeerId, Target};

pub use loopback::{LoopbackHub, LoopbackTransport};
pub use websocket::WebSocketTransport;

/// Outbound half of a transport. The inbound half calls
/// [`NetworkAnchorService::process_network_event`](crate::service::NetworkAnchorService::process_network_event)
/// on the service thread.
pub trait Transport {
    fn send(&self, code: u8, json: &str, targets: &[i32]);
}

/// Expands routing targets into concrete recipients.
///
/// `peers` is the set of connected peers in join order. An empty target list
/// means everyone. Recipients are deduplicated and keep join order.
pub fn resolve_recipients(targets: &[i32], sender: PeerId, master: Option<PeerId>, peers: &[PeerId]) -> Vec<PeerId> {
    if targets.is_empty() {
        return peers.to_vec();
    }

    let mut recipients = Vec::new();
    for target in targets {
        let matched: Vec<PeerId> = match Target::from_id(*target) {
            Some(Target::Master) => master.into_iter().collect(),
            Some(Target::Others) => peers.iter().copied().filter(|id| *id != sender).collect(),
            Some(Target::All) => peers.to_vec(),
            Some(Target::Peer(peer_id)) if peers.contains(&peer_id) => vec![peer_id],
            Some(Target::Peer(_)) | None => Vec::new(),
        };
        for peer_id in matched {
            if !recipients.contains(&peer_id) {
                recipients.push(peer_id);
            }
        }
    }
    recipients.sort_by_key(|id| peers.iter().position(|peer| peer == id));
    recipients
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEERS: [PeerId; 3] = [1, 2, 3];

    #[test]
    fn sentinels_route_as_documented() {
        assert_eq!(resolve_recipients(&[Target::MASTER_ID], 2, Some(1), &PEERS), vec![1]);
        assert_eq!(resolve_recipients(&[Target::OTHERS_ID], 2, Some(1), &PEERS), vec![1, 3]);
        assert_eq!(resolve_recipients(&[Target::ALL_ID], 2, Some(1), &PEERS), vec![1, 2, 3]);
        assert_eq!(resolve_recipients(&[], 2, Some(1), &PEERS), vec![1, 2, 3]);
    }

    #[test]
    fn explicit_peers_are_filtered_and_deduplicated() {
        assert_eq!(resolve_recipients(&[3, 9, 3, -7], 1, Some(1), &PEERS), vec![3]);
        assert_eq!(resolve_recipients(&[3, Target::MASTER_ID], 2, Some(1), &PEERS), vec![1, 3]);
        assert!(resolve_recipients(&[Target::MASTER_ID], 2, None, &PEERS).is_empty());
    }
}
