//! Shared spatial anchors for co-located multi-user AR sessions.
//!
//! Peers observe persistent coordinate frames of the physical world. An anchor
//! is stored relative to one such frame, so any peer observing the same frame
//! can place it in its own world space.

pub mod clients;
pub mod config;
pub mod docs;
pub mod error;
pub mod geometry;
pub mod handlers;
pub mod models;
pub mod providers;
pub mod relay;
pub mod routes;
pub mod service;
pub mod transport;
pub mod utils;

pub use error::{AnchorError, AnchorResult};
pub use service::{AnchorLocalizer, NetworkAnchorResponse, NetworkAnchorService, RemoteCoordinatesResponse};
