use crate::models::PeerId;

/// Connected peers in the order the master admitted them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerDirectory {
    peers: Vec<PeerId>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `peer_id` if absent. Returns whether the directory changed.
    pub fn insert(&mut self, peer_id: PeerId) -> bool {
        if self.contains(peer_id) {
            return false;
        }
        self.peers.push(peer_id);
        true
    }

    /// Removes `peer_id` if present. Returns whether the directory changed.
    pub fn remove(&mut self, peer_id: PeerId) -> bool {
        let before = self.peers.len();
        self.peers.retain(|id| *id != peer_id);
        self.peers.len() != before
    }

    /// Replaces the contents with the master's authoritative list.
    pub fn replace(&mut self, peers: &[PeerId]) {
        self.peers.clear();
        for peer_id in peers {
            self.insert(*peer_id);
        }
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }

    pub fn contains(&self, peer_id: PeerId) -> bool {
        self.peers.contains(&peer_id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn to_vec(&self) -> Vec<PeerId> {
        self.peers.clone()
    }

    /// Every peer except `local`, in admission order.
    pub fn remote_peers(&self, local: PeerId) -> Vec<PeerId> {
        self.peers.iter().copied().filter(|id| *id != local).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_tracks_connects_minus_disconnects() {
        let mut directory = PeerDirectory::new();
        for id in 1..=5 {
            assert!(directory.insert(id));
        }
        assert!(!directory.insert(3));
        assert!(directory.remove(2));
        assert!(directory.remove(5));
        assert!(!directory.remove(9));
        assert_eq!(directory.len(), 3);
        assert_eq!(directory.to_vec(), vec![1, 3, 4]);
    }

    #[test]
    fn remote_peers_skip_local_and_keep_order() {
        let mut directory = PeerDirectory::new();
        directory.replace(&[4, 1, 4, 7]);
        assert_eq!(directory.to_vec(), vec![4, 1, 7]);
        assert_eq!(directory.remote_peers(1), vec![4, 7]);
    }
}
