//! Inbound event dispatch.

use tracing::{debug, info, warn};

use super::{AckPolicy, NetworkAnchorService};
use crate::models::{
    is_valid, try_colocalize, ConnectToServiceRequest, ConnectToServiceResponse, CreateNetworkAnchorRequest,
    CreateNetworkAnchorResponse, DisconnectFromServiceRequest, GetNetworkAnchorRequest, GetNetworkAnchorResponse,
    GetRemoteCoordinatesRequest, GetRemoteCoordinatesResponse, NetworkEvent, PeerId, ResultCode, Target,
};

impl NetworkAnchorService {
    /// Feeds one inbound event into the service.
    ///
    /// Unknown codes and malformed payloads are dropped with a debug line.
    pub fn process_network_event(&self, code: u8, json: &str) {
        let event = match NetworkEvent::decode(code, json) {
            Ok(Some(event)) => event,
            Ok(None) => {
                debug!("Ignoring unknown event code {}", code);
                return;
            }
            Err(e) => {
                debug!("Dropping event: {}", e);
                return;
            }
        };
        self.debug_log(&format!("Received {}", event.code()), i32::from(code));

        match event {
            NetworkEvent::GetNetworkAnchorRequest(request) => self.handle_get_anchor_request(request),
            NetworkEvent::GetNetworkAnchorResponse(response) => self.handle_get_anchor_response(response),
            NetworkEvent::CreateNetworkAnchorRequest(request) => self.handle_create_anchor_request(request),
            NetworkEvent::CreateNetworkAnchorResponse(response) => self.handle_create_anchor_response(response),
            NetworkEvent::ConnectToServiceRequest(request) => self.handle_connect_request(request),
            NetworkEvent::DisconnectFromServiceRequest(request) => self.handle_disconnect_request(request),
            NetworkEvent::ConnectToServiceResponse(response) => self.handle_connect_response(response),
            NetworkEvent::GetRemoteCoordinatesRequest(request) => self.handle_remote_coordinates_request(request),
            NetworkEvent::GetRemoteCoordinatesResponse(response) => self.handle_remote_coordinates_response(response),
        }
    }

    fn handle_get_anchor_request(&self, request: GetNetworkAnchorRequest) {
        let (local_peer_id, coordinates, anchor) = {
            let state = self.state();
            (state.local_peer_id, state.local_coordinates.clone(), state.local_network_anchor.clone())
        };

        // Both an anchor and coordinates are needed for the sender to co-localize.
        let response = if !is_valid(anchor.as_ref()) || coordinates.is_empty() {
            GetNetworkAnchorResponse {
                sender_id: local_peer_id,
                result_code: ResultCode::Failed,
                generic_coordinates: Vec::new(),
                network_anchor: None,
            }
        } else {
            GetNetworkAnchorResponse {
                sender_id: local_peer_id,
                result_code: ResultCode::Success,
                generic_coordinates: coordinates,
                network_anchor: anchor,
            }
        };
        self.send_event(NetworkEvent::GetNetworkAnchorResponse(response), &[Target::Peer(request.sender_id)]);
    }

    fn handle_get_anchor_response(&self, response: GetNetworkAnchorResponse) {
        self.record_peer_coordinates(response.sender_id, &response.generic_coordinates);
        let sender_id = response.sender_id;
        if !self.state_mut().get_anchor_slot.resolve(sender_id, response) {
            debug!("Dropping unsolicited anchor response from peer {}", sender_id);
        }
    }

    fn handle_create_anchor_request(&self, request: CreateNetworkAnchorRequest) {
        self.record_peer_coordinates(request.sender_id, &request.generic_coordinates);
        let (local_peer_id, coordinates) = {
            let state = self.state();
            (state.local_peer_id, state.local_coordinates.clone())
        };

        let anchor = try_colocalize(&coordinates, &request.generic_coordinates, request.network_anchor.as_ref());
        let result_code = match anchor {
            Some(anchor) => {
                info!("Adopted anchor '{}' from peer {}", anchor.anchor_id(), request.sender_id);
                self.set_local_network_anchor(Some(anchor));
                ResultCode::Success
            }
            None => {
                debug!("Cannot co-localize anchor from peer {}", request.sender_id);
                ResultCode::Failed
            }
        };

        let response = CreateNetworkAnchorResponse {
            sender_id: local_peer_id,
            result_code,
            network_anchor: self.local_network_anchor(),
        };
        self.send_event(NetworkEvent::CreateNetworkAnchorResponse(response), &[Target::Peer(request.sender_id)]);
    }

    fn handle_create_anchor_response(&self, response: CreateNetworkAnchorResponse) {
        if self.inner.options.create_ack_policy == AckPolicy::FirstSuccess && !response.result_code.is_success() {
            debug!("Peer {} failed to adopt the anchor; waiting for another ack", response.sender_id);
            return;
        }
        let sender_id = response.sender_id;
        if !self.state_mut().create_anchor_slot.resolve(sender_id, response) {
            debug!("Dropping unsolicited create ack from peer {}", sender_id);
        }
    }

    /// Master side: admits the sender and publishes the directory.
    fn handle_connect_request(&self, request: ConnectToServiceRequest) {
        let directory = {
            let mut state = self.state_mut();
            if state.directory.insert(request.sender_id) {
                info!("Peer {} joined; {} connected", request.sender_id, state.directory.len());
            }
            state.directory.to_vec()
        };
        self.publish_directory(directory);
    }

    /// Master side: drops the sender and publishes the directory.
    fn handle_disconnect_request(&self, request: DisconnectFromServiceRequest) {
        let directory = {
            let mut state = self.state_mut();
            if !state.directory.remove(request.sender_id) {
                debug!("Peer {} was not in the directory", request.sender_id);
            }
            state.directory.to_vec()
        };
        info!("Peer {} left; {} connected", request.sender_id, directory.len());
        self.publish_directory(directory);
    }

    fn publish_directory(&self, directory: Vec<PeerId>) {
        let response = ConnectToServiceResponse {
            sender_id: self.local_peer_id(),
            result_code: ResultCode::Success,
            connected_player_ids: directory,
        };
        self.send_event(NetworkEvent::ConnectToServiceResponse(response), &[Target::All]);
    }

    fn handle_connect_response(&self, response: ConnectToServiceResponse) {
        let mut state = self.state_mut();
        if !state.connected && !state.connect_slot.is_pending() {
            debug!("Ignoring directory from peer {}; not in a session", response.sender_id);
            return;
        }
        state.directory.replace(&response.connected_player_ids);
        if !response.connected_player_ids.contains(&state.local_peer_id) && response.result_code.is_success() {
            // Someone else's admission; not our answer.
            return;
        }
        let sender_id = response.sender_id;
        state.connect_slot.resolve(sender_id, response);
    }

    fn handle_remote_coordinates_request(&self, request: GetRemoteCoordinatesRequest) {
        let (local_peer_id, coordinates) = {
            let state = self.state();
            (state.local_peer_id, state.local_coordinates.clone())
        };
        let result_code = if coordinates.is_empty() {
            warn!("Peer {} asked for coordinates but none were acquired yet", request.sender_id);
            ResultCode::Failed
        } else {
            ResultCode::Success
        };
        let response = GetRemoteCoordinatesResponse {
            sender_id: local_peer_id,
            result_code,
            generic_coordinates: coordinates,
        };
        self.send_event(NetworkEvent::GetRemoteCoordinatesResponse(response), &[Target::Peer(request.sender_id)]);
    }

    fn handle_remote_coordinates_response(&self, response: GetRemoteCoordinatesResponse) {
        self.record_peer_coordinates(response.sender_id, &response.generic_coordinates);
        let sender_id = response.sender_id;
        if !self.state_mut().remote_coordinates_slot.resolve(sender_id, response) {
            debug!("Dropping unsolicited coordinates from peer {}", sender_id);
        }
    }
}
