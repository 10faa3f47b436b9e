use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AnchorError, AnchorResult};
use crate::models::{Coordinate, NetworkAnchor, PeerId, ResultCode};

/// Numeric event codes. These byte values are part of the wire contract.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EventCode {
    GetNetworkAnchorRequest = 101,
    GetNetworkAnchorResponse = 102,
    CreateNetworkAnchorRequest = 103,
    CreateNetworkAnchorResponse = 104,
    ConnectToServiceRequest = 105,
    DisconnectFromServiceRequest = 106,
    ConnectToServiceResponse = 107,
    GetRemoteCoordinatesRequest = 108,
    GetRemoteCoordinatesResponse = 109,
}

impl EventCode {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            101 => Some(EventCode::GetNetworkAnchorRequest),
            102 => Some(EventCode::GetNetworkAnchorResponse),
            103 => Some(EventCode::CreateNetworkAnchorRequest),
            104 => Some(EventCode::CreateNetworkAnchorResponse),
            105 => Some(EventCode::ConnectToServiceRequest),
            106 => Some(EventCode::DisconnectFromServiceRequest),
            107 => Some(EventCode::ConnectToServiceResponse),
            108 => Some(EventCode::GetRemoteCoordinatesRequest),
            109 => Some(EventCode::GetRemoteCoordinatesResponse),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.as_u8())
    }
}

/// Routing target of an outbound event.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// The master client only (`-1`).
    Master,
    /// Everyone except the sender (`-2`).
    Others,
    /// Everyone, sender included (`-3`).
    All,
    Peer(PeerId),
}

impl Target {
    pub const MASTER_ID: i32 = -1;
    pub const OTHERS_ID: i32 = -2;
    pub const ALL_ID: i32 = -3;

    pub fn id(self) -> i32 {
        match self {
            Target::Master => Self::MASTER_ID,
            Target::Others => Self::OTHERS_ID,
            Target::All => Self::ALL_ID,
            Target::Peer(peer_id) => peer_id,
        }
    }

    /// Unknown negative ids have no meaning and yield `None`.
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            Self::MASTER_ID => Some(Target::Master),
            Self::OTHERS_ID => Some(Target::Others),
            Self::ALL_ID => Some(Target::All),
            id if id >= 0 => Some(Target::Peer(id)),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct GetNetworkAnchorRequest {
    pub sender_id: PeerId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct GetNetworkAnchorResponse {
    pub sender_id: PeerId,
    #[serde(default)]
    pub result_code: ResultCode,
    #[serde(default)]
    pub generic_coordinates: Vec<Coordinate>,
    #[serde(default)]
    pub network_anchor: Option<NetworkAnchor>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateNetworkAnchorRequest {
    pub sender_id: PeerId,
    #[serde(default)]
    pub generic_coordinates: Vec<Coordinate>,
    #[serde(default)]
    pub network_anchor: Option<NetworkAnchor>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateNetworkAnchorResponse {
    pub sender_id: PeerId,
    #[serde(default)]
    pub result_code: ResultCode,
    #[serde(default)]
    pub network_anchor: Option<NetworkAnchor>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectToServiceRequest {
    pub sender_id: PeerId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct DisconnectFromServiceRequest {
    pub sender_id: PeerId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectToServiceResponse {
    pub sender_id: PeerId,
    #[serde(default)]
    pub result_code: ResultCode,
    #[serde(default)]
    pub connected_player_ids: Vec<PeerId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct GetRemoteCoordinatesRequest {
    pub sender_id: PeerId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct GetRemoteCoordinatesResponse {
    pub sender_id: PeerId,
    #[serde(default)]
    pub result_code: ResultCode,
    #[serde(default)]
    pub generic_coordinates: Vec<Coordinate>,
}

/// A decoded inbound or outbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkEvent {
    GetNetworkAnchorRequest(GetNetworkAnchorRequest),
    GetNetworkAnchorResponse(GetNetworkAnchorResponse),
    CreateNetworkAnchorRequest(CreateNetworkAnchorRequest),
    CreateNetworkAnchorResponse(CreateNetworkAnchorResponse),
    ConnectToServiceRequest(ConnectToServiceRequest),
    DisconnectFromServiceRequest(DisconnectFromServiceRequest),
    ConnectToServiceResponse(ConnectToServiceResponse),
    GetRemoteCoordinatesRequest(GetRemoteCoordinatesRequest),
    GetRemoteCoordinatesResponse(GetRemoteCoordinatesResponse),
}

impl NetworkEvent {
    /// Decodes `json` according to `code`.
    ///
    /// Unknown codes decode to `Ok(None)`; a known code with an unparseable
    /// payload is [`AnchorError::Malformed`].
    pub fn decode(code: u8, json: &str) -> AnchorResult<Option<Self>> {
        let Some(event_code) = EventCode::from_u8(code) else {
            return Ok(None);
        };
        let malformed = |source| AnchorError::Malformed { code, source };
        let event = match event_code {
            EventCode::GetNetworkAnchorRequest => {
                NetworkEvent::GetNetworkAnchorRequest(serde_json::from_str(json).map_err(malformed)?)
            }
            EventCode::GetNetworkAnchorResponse => {
                NetworkEvent::GetNetworkAnchorResponse(serde_json::from_str(json).map_err(malformed)?)
            }
            EventCode::CreateNetworkAnchorRequest => {
                NetworkEvent::CreateNetworkAnchorRequest(serde_json::from_str(json).map_err(malformed)?)
            }
            EventCode::CreateNetworkAnchorResponse => {
                NetworkEvent::CreateNetworkAnchorResponse(serde_json::from_str(json).map_err(malformed)?)
            }
            EventCode::ConnectToServiceRequest => {
                NetworkEvent::ConnectToServiceRequest(serde_json::from_str(json).map_err(malformed)?)
            }
            EventCode::DisconnectFromServiceRequest => {
                NetworkEvent::DisconnectFromServiceRequest(serde_json::from_str(json).map_err(malformed)?)
            }
            EventCode::ConnectToServiceResponse => {
                NetworkEvent::ConnectToServiceResponse(serde_json::from_str(json).map_err(malformed)?)
            }
            EventCode::GetRemoteCoordinatesRequest => {
                NetworkEvent::GetRemoteCoordinatesRequest(serde_json::from_str(json).map_err(malformed)?)
            }
            EventCode::GetRemoteCoordinatesResponse => {
                NetworkEvent::GetRemoteCoordinatesResponse(serde_json::from_str(json).map_err(malformed)?)
            }
        };
        Ok(Some(event))
    }

    pub fn code(&self) -> EventCode {
        match self {
            NetworkEvent::GetNetworkAnchorRequest(_) => EventCode::GetNetworkAnchorRequest,
            NetworkEvent::GetNetworkAnchorResponse(_) => EventCode::GetNetworkAnchorResponse,
            NetworkEvent::CreateNetworkAnchorRequest(_) => EventCode::CreateNetworkAnchorRequest,
            NetworkEvent::CreateNetworkAnchorResponse(_) => EventCode::CreateNetworkAnchorResponse,
            NetworkEvent::ConnectToServiceRequest(_) => EventCode::ConnectToServiceRequest,
            NetworkEvent::DisconnectFromServiceRequest(_) => EventCode::DisconnectFromServiceRequest,
            NetworkEvent::ConnectToServiceResponse(_) => EventCode::ConnectToServiceResponse,
            NetworkEvent::GetRemoteCoordinatesRequest(_) => EventCode::GetRemoteCoordinatesRequest,
            NetworkEvent::GetRemoteCoordinatesResponse(_) => EventCode::GetRemoteCoordinatesResponse,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            NetworkEvent::GetNetworkAnchorRequest(msg) => serde_json::to_string(msg),
            NetworkEvent::GetNetworkAnchorResponse(msg) => serde_json::to_string(msg),
            NetworkEvent::CreateNetworkAnchorRequest(msg) => serde_json::to_string(msg),
            NetworkEvent::CreateNetworkAnchorResponse(msg) => serde_json::to_string(msg),
            NetworkEvent::ConnectToServiceRequest(msg) => serde_json::to_string(msg),
            NetworkEvent::DisconnectFromServiceRequest(msg) => serde_json::to_string(msg),
            NetworkEvent::ConnectToServiceResponse(msg) => serde_json::to_string(msg),
            NetworkEvent::GetRemoteCoordinatesRequest(msg) => serde_json::to_string(msg),
            NetworkEvent::GetRemoteCoordinatesResponse(msg) => serde_json::to_string(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Quat, Vec3};

    #[test]
    fn codes_do_not_drift() {
        let expected = [
            (EventCode::GetNetworkAnchorRequest, 101),
            (EventCode::GetNetworkAnchorResponse, 102),
            (EventCode::CreateNetworkAnchorRequest, 103),
            (EventCode::CreateNetworkAnchorResponse, 104),
            (EventCode::ConnectToServiceRequest, 105),
            (EventCode::DisconnectFromServiceRequest, 106),
            (EventCode::ConnectToServiceResponse, 107),
            (EventCode::GetRemoteCoordinatesRequest, 108),
            (EventCode::GetRemoteCoordinatesResponse, 109),
        ];
        for (code, value) in expected {
            assert_eq!(code.as_u8(), value);
            assert_eq!(EventCode::from_u8(value), Some(code));
        }
        assert_eq!(EventCode::from_u8(100), None);
        assert_eq!(EventCode::from_u8(110), None);
    }

    #[test]
    fn target_sentinels() {
        assert_eq!(Target::Master.id(), -1);
        assert_eq!(Target::Others.id(), -2);
        assert_eq!(Target::All.id(), -3);
        assert_eq!(Target::from_id(7), Some(Target::Peer(7)));
        assert_eq!(Target::from_id(-9), None);
    }

    #[test]
    fn response_uses_wire_field_names() {
        let coord = Coordinate::new("X", Vec3::new(10.0, 0.0, 0.0), Quat::IDENTITY);
        let anchor = NetworkAnchor::new_local("origin", 2, &coord, Vec3::new(11.0, 0.0, 0.0), Quat::IDENTITY);
        let event = NetworkEvent::GetNetworkAnchorResponse(GetNetworkAnchorResponse {
            sender_id: 2,
            result_code: ResultCode::Success,
            generic_coordinates: vec![coord],
            network_anchor: Some(anchor),
        });

        let json = event.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["SenderId"], 2);
        assert_eq!(value["ResultCode"], 1);
        assert_eq!(value["GenericCoordinates"][0]["CoordinateId"], "X");
        assert_eq!(value["NetworkAnchor"]["AnchorId"], "origin");
        assert_eq!(value["NetworkAnchor"]["RelativePosition"]["x"], 1.0);

        let decoded = NetworkEvent::decode(102, &json).unwrap();
        assert_eq!(decoded, Some(event));
    }

    #[test]
    fn connect_response_lists_player_ids() {
        let json = r#"{"SenderId":1,"ResultCode":1,"ConnectedPlayerIds":[1,2,3]}"#;
        match NetworkEvent::decode(107, json).unwrap() {
            Some(NetworkEvent::ConnectToServiceResponse(response)) => {
                assert_eq!(response.connected_player_ids, vec![1, 2, 3]);
                assert!(response.result_code.is_success());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_code_is_ignored_and_garbage_is_malformed() {
        assert!(NetworkEvent::decode(42, "{}").unwrap().is_none());
        assert!(matches!(
            NetworkEvent::decode(101, "not json"),
            Err(AnchorError::Malformed { code: 101, .. })
        ));
        assert!(matches!(NetworkEvent::decode(105, "{}"), Err(AnchorError::Malformed { .. })));
    }
}
