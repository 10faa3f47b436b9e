use std::rc::Rc;
use std::time::Duration;
use tracing::error;

use super::{CoordinateProvider, CoordinatesFuture};

/// Bounds a provider's coordinate requests by a deadline.
///
/// Tracking stacks can take a long time to localize; on expiry the request
/// resolves to an empty list, which the service reports as unavailable input.
pub struct DeadlineCoordinateProvider {
    inner: Rc<dyn CoordinateProvider>,
    deadline: Duration,
}

impl DeadlineCoordinateProvider {
    pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(20);

    pub fn new(inner: Rc<dyn CoordinateProvider>, deadline: Duration) -> Self {
        Self { inner, deadline }
    }
}

impl CoordinateProvider for DeadlineCoordinateProvider {
    fn initialize(&self) {
        self.inner.initialize();
    }

    fn disable(&self) {
        self.inner.disable();
    }

    fn request_coordinate_references(&self, refresh: bool) -> CoordinatesFuture<'_> {
        Box::pin(async move {
            match tokio::time::timeout(self.deadline, self.inner.request_coordinate_references(refresh)).await {
                Ok(coordinates) => coordinates,
                Err(_) => {
                    error!("Could not get coordinates within {:?}", self.deadline);
                    Vec::new()
                }
            }
        })
    }
}
