use std::cell::Cell;
use std::rc::Rc;
use tracing::{debug, info};

use super::{CoordinateProvider, CoordinatesFuture};

/// Picks between a tracking provider and a standalone one.
///
/// Without a primary, or when forced standalone (no tracking runtime came
/// up), every call goes to the standalone provider. Otherwise only the
/// primary is asked; an empty answer means tracking is lost and is passed
/// through unchanged.
pub struct FallbackCoordinateProvider {
    primary: Option<Rc<dyn CoordinateProvider>>,
    standalone: Rc<dyn CoordinateProvider>,
    force_standalone: Cell<bool>,
}

impl FallbackCoordinateProvider {
    pub fn new(primary: Option<Rc<dyn CoordinateProvider>>, standalone: Rc<dyn CoordinateProvider>) -> Self {
        Self {
            primary,
            standalone,
            force_standalone: Cell::new(false),
        }
    }

    pub fn set_force_standalone(&self, force: bool) {
        if force != self.force_standalone.get() {
            info!("Standalone coordinates forced: {}", force);
        }
        self.force_standalone.set(force);
    }

    fn active_primary(&self) -> Option<&Rc<dyn CoordinateProvider>> {
        if self.force_standalone.get() {
            None
        } else {
            self.primary.as_ref()
        }
    }
}

impl CoordinateProvider for FallbackCoordinateProvider {
    fn initialize(&self) {
        match self.active_primary() {
            Some(primary) => primary.initialize(),
            None => self.standalone.initialize(),
        }
    }

    fn disable(&self) {
        match self.active_primary() {
            Some(primary) => primary.disable(),
            None => self.standalone.disable(),
        }
    }

    fn request_coordinate_references(&self, refresh: bool) -> CoordinatesFuture<'_> {
        Box::pin(async move {
            match self.active_primary() {
                Some(primary) => {
                    let coordinates = primary.request_coordinate_references(refresh).await;
                    if coordinates.is_empty() {
                        debug!("Primary provider returned no coordinates");
                    }
                    coordinates
                }
                None => self.standalone.request_coordinate_references(refresh).await,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Quat, Vec3};
    use crate::models::Coordinate;
    use crate::providers::FixedCoordinateProvider;

    fn provider(id: &str) -> Rc<FixedCoordinateProvider> {
        let coordinates = if id.is_empty() {
            Vec::new()
        } else {
            vec![Coordinate::new(id, Vec3::ZERO, Quat::IDENTITY)]
        };
        Rc::new(FixedCoordinateProvider::new(coordinates))
    }

    #[tokio::test]
    async fn empty_primary_is_not_covered_by_standalone() {
        let primary = provider("pcf");
        let standalone = provider("borrowed");
        let fallback = FallbackCoordinateProvider::new(Some(primary.clone() as Rc<dyn CoordinateProvider>), standalone.clone());

        assert_eq!(fallback.request_coordinate_references(true).await[0].id, "pcf");

        primary.set_coordinates(Vec::new());
        assert!(fallback.request_coordinate_references(true).await.is_empty());
        assert_eq!(standalone.request_calls(), 0);
    }

    #[tokio::test]
    async fn forced_standalone_bypasses_primary() {
        let primary = provider("pcf");
        let standalone = provider("borrowed");
        let fallback = FallbackCoordinateProvider::new(Some(primary.clone() as Rc<dyn CoordinateProvider>), standalone.clone());
        fallback.set_force_standalone(true);

        fallback.initialize();
        assert_eq!(primary.initialize_calls(), 0);
        assert_eq!(standalone.initialize_calls(), 1);
        assert_eq!(fallback.request_coordinate_references(false).await[0].id, "borrowed");
        assert_eq!(primary.request_calls(), 0);
    }

    #[tokio::test]
    async fn no_primary_means_standalone() {
        let fallback = FallbackCoordinateProvider::new(None, provider(""));
        assert!(fallback.request_coordinate_references(true).await.is_empty());
    }
}
