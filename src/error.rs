use thiserror::Error;

use crate::models::PeerId;

pub type AnchorResult<T> = std::result::Result<T, AnchorError>;

/// Failure taxonomy of the localization core.
///
/// Protocol operations on the service never return these; they fold them into
/// a [`ResultCode`](crate::models::ResultCode). The enum is surfaced by event
/// decoding, the localizer, transports and configuration loading.
#[derive(Error, Debug)]
pub enum AnchorError {
    /// The coordinate provider returned no coordinates.
    #[error("no coordinates available from the provider")]
    InputUnavailable,

    /// A peer did not answer before the request deadline.
    #[error("peer {peer_id} did not respond in time")]
    PeerUnreachable { peer_id: PeerId },

    /// A peer answered but shares no coordinate with us.
    #[error("no coordinate frame shared with any peer")]
    NoSharedFrame,

    /// An inbound payload could not be decoded.
    #[error("malformed payload for event {code}: {source}")]
    Malformed {
        code: u8,
        #[source]
        source: serde_json::Error,
    },

    /// Another workflow is already running.
    #[error("another localization request is in progress")]
    ProtocolBusy,

    #[error("internal invariant violated: {0}")]
    Internal(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),
}
