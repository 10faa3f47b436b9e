use std::cell::{Cell, RefCell};
use std::time::Duration;
use tracing::debug;

use super::{CoordinateProvider, CoordinatesFuture};
use crate::models::Coordinate;

/// Serves a scripted coordinate set.
///
/// Useful for desktop clients placed at a known pose, for replaying recorded
/// sessions, and in tests. Optionally delays each answer to mimic a tracker
/// that needs time to localize.
#[derive(Debug, Default)]
pub struct FixedCoordinateProvider {
    coordinates: RefCell<Vec<Coordinate>>,
    latency: Cell<Option<Duration>>,
    enabled: Cell<bool>,
    initialize_calls: Cell<u32>,
    disable_calls: Cell<u32>,
    request_calls: Cell<u32>,
}

impl FixedCoordinateProvider {
    pub fn new(coordinates: Vec<Coordinate>) -> Self {
        Self {
            coordinates: RefCell::new(coordinates),
            ..Self::default()
        }
    }

    pub fn with_latency(self, latency: Duration) -> Self {
        self.latency.set(Some(latency));
        self
    }

    /// Replaces the set served to subsequent requests.
    pub fn set_coordinates(&self, coordinates: Vec<Coordinate>) {
        *self.coordinates.borrow_mut() = coordinates;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn initialize_calls(&self) -> u32 {
        self.initialize_calls.get()
    }

    pub fn disable_calls(&self) -> u32 {
        self.disable_calls.get()
    }

    pub fn request_calls(&self) -> u32 {
        self.request_calls.get()
    }
}

impl CoordinateProvider for FixedCoordinateProvider {
    fn initialize(&self) {
        self.initialize_calls.set(self.initialize_calls.get() + 1);
        self.enabled.set(true);
    }

    fn disable(&self) {
        self.disable_calls.set(self.disable_calls.get() + 1);
        self.enabled.set(false);
    }

    fn request_coordinate_references(&self, refresh: bool) -> CoordinatesFuture<'_> {
        self.request_calls.set(self.request_calls.get() + 1);
        Box::pin(async move {
            if let Some(latency) = self.latency.get() {
                tokio::time::sleep(latency).await;
            }
            let coordinates = self.coordinates.borrow().clone();
            debug!("Serving {} fixed coordinates (refresh={})", coordinates.len(), refresh);
            coordinates
        })
    }
}
