use serde::{Deserialize, Serialize};

use crate::models::PeerId;

/// Sent by the relay to a socket right after it connects.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMessage {
    pub peer_id: PeerId,
    pub master_id: PeerId,
}

/// One network event travelling through the relay.
///
/// `sender` is filled in by the relay; whatever a client puts there is
/// overwritten.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    pub code: u8,
    pub payload: String,
    #[serde(default)]
    pub targets: Vec<i32>,
    #[serde(default)]
    pub sender: PeerId,
}

/// Announces a new master after the previous one left.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MasterChangedMessage {
    pub master_id: PeerId,
}

/// Frames a client sends to the relay.
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "event")]
    Event(EventMessage),
}

/// Frames the relay sends to a client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMessage),
    #[serde(rename = "event")]
    Event(EventMessage),
    #[serde(rename = "masterChanged")]
    MasterChanged(MasterChangedMessage),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_are_tagged() {
        let frame = SendMessage::Welcome(WelcomeMessage { peer_id: 3, master_id: 1 });
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"type":"welcome","peerId":3,"masterId":1}"#);

        let inbound: ReceivedMessage =
            serde_json::from_str(r#"{"type":"event","code":101,"payload":"{}","targets":[-1]}"#).unwrap();
        let ReceivedMessage::Event(event) = inbound;
        assert_eq!(event.code, 101);
        assert_eq!(event.targets, vec![-1]);
        assert_eq!(event.sender, 0);
    }
}
