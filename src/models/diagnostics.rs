use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response for relay diagnostics
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    pub n_peers: u32,
    pub master_id: Option<i32>,
    pub peer_ids: Vec<i32>,
    pub frames_routed: u64,
    pub frames_dropped: u64,
}
