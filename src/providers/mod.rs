//! Sources of local coordinates.
//!
//! The service only ever talks to a [`CoordinateProvider`]; tracking stacks
//! plug in behind it.

pub mod deadline;
pub mod fallback;
pub mod fixed;
pub mod standalone;

use std::future::Future;
use std::pin::Pin;

use crate::models::Coordinate;

pub use deadline::DeadlineCoordinateProvider;
pub use fallback::FallbackCoordinateProvider;
pub use fixed::FixedCoordinateProvider;
pub use standalone::StandaloneCoordinateProvider;

/// Future returned by [`CoordinateProvider::request_coordinate_references`].
pub type CoordinatesFuture<'a> = Pin<Box<dyn Future<Output = Vec<Coordinate>> + 'a>>;

/// Supplies the coordinate frames a peer currently observes.
///
/// All operations are idempotent. Requests never fail; an empty list means
/// tracking is unavailable.
pub trait CoordinateProvider {
    /// Allocates whatever tracking resources the provider needs.
    fn initialize(&self);

    /// Releases tracking resources. Safe to call repeatedly.
    fn disable(&self);

    /// Current coordinates, most reliable first.
    fn request_coordinate_references(&self, refresh: bool) -> CoordinatesFuture<'_>;
}
