//! Single-shot request slots.
//!
//! Each request kind owns one [`PendingSlot`]. Installing a new request
//! resolves the previous one with `None`, so at most one awaiter per kind is
//! ever live and no awaiter is resolved twice.

use std::time::Duration;
use tokio::sync::oneshot;

use crate::models::PeerId;

pub struct PendingSlot<R> {
    sender: Option<oneshot::Sender<Option<R>>>,
    expected_sender: Option<PeerId>,
    generation: u64,
}

impl<R> Default for PendingSlot<R> {
    fn default() -> Self {
        Self { sender: None, expected_sender: None, generation: 0 }
    }
}

impl<R> PendingSlot<R> {
    /// Installs a fresh request, cancelling whatever was pending.
    ///
    /// With `expected_sender` set, responses from other peers do not resolve it.
    pub fn install(&mut self, expected_sender: Option<PeerId>) -> PendingRequest<R> {
        self.cancel();
        let (sender, receiver) = oneshot::channel();
        self.generation += 1;
        self.sender = Some(sender);
        self.expected_sender = expected_sender;
        PendingRequest { receiver, generation: self.generation }
    }

    /// Hands `value` to the live awaiter. Returns `false` when nothing took it.
    pub fn resolve(&mut self, from: PeerId, value: R) -> bool {
        if self.expected_sender.is_some_and(|expected| expected != from) {
            return false;
        }
        match self.sender.take() {
            Some(sender) => sender.send(Some(value)).is_ok(),
            None => false,
        }
    }

    /// Resolves the live awaiter, if any, with the `None` sentinel.
    pub fn cancel(&mut self) -> bool {
        self.expected_sender = None;
        match self.sender.take() {
            Some(sender) => sender.send(None).is_ok(),
            None => false,
        }
    }

    /// Clears the slot after a deadline, unless a newer request replaced it.
    pub fn expire(&mut self, generation: u64) {
        if self.generation == generation {
            self.cancel();
        }
    }

    /// True while an awaiter is still listening.
    pub fn is_pending(&self) -> bool {
        self.sender.as_ref().is_some_and(|sender| !sender.is_closed())
    }
}

/// The awaiting half of a [`PendingSlot`].
pub struct PendingRequest<R> {
    receiver: oneshot::Receiver<Option<R>>,
    generation: u64,
}

impl<R> PendingRequest<R> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Waits for the response or the deadline. Timeouts and cancellations
    /// both come back as `None`.
    pub async fn wait(self, deadline: Duration) -> Option<R> {
        match tokio::time::timeout(deadline, self.receiver).await {
            Ok(Ok(value)) => value,
            Ok(Err(_)) | Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_exactly_once() {
        let mut slot = PendingSlot::<u32>::default();
        let request = slot.install(None);
        assert!(slot.is_pending());
        assert!(slot.resolve(1, 7));
        assert!(!slot.resolve(1, 8));
        assert_eq!(request.wait(Duration::from_millis(10)).await, Some(7));
    }

    #[tokio::test]
    async fn new_install_cancels_previous_with_sentinel() {
        let mut slot = PendingSlot::<u32>::default();
        let first = slot.install(None);
        let second = slot.install(None);
        assert!(slot.resolve(1, 5));
        assert_eq!(first.wait(Duration::from_millis(10)).await, None);
        assert_eq!(second.wait(Duration::from_millis(10)).await, Some(5));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_yields_sentinel_and_expire_clears_slot() {
        let mut slot = PendingSlot::<u32>::default();
        let request = slot.install(None);
        let generation = request.generation();
        assert_eq!(request.wait(Duration::from_millis(3000)).await, None);
        slot.expire(generation);
        assert!(!slot.is_pending());
        assert!(!slot.resolve(1, 9));
    }

    #[tokio::test]
    async fn expire_ignores_newer_generation() {
        let mut slot = PendingSlot::<u32>::default();
        let old = slot.install(None);
        let old_generation = old.generation();
        let _new = slot.install(None);
        slot.expire(old_generation);
        assert!(slot.is_pending());
    }

    #[tokio::test]
    async fn expected_sender_filters_responses() {
        let mut slot = PendingSlot::<u32>::default();
        let request = slot.install(Some(3));
        assert!(!slot.resolve(2, 1));
        assert!(slot.resolve(3, 2));
        assert_eq!(request.wait(Duration::from_millis(10)).await, Some(2));
    }
}
