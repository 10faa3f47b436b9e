use serde::{Deserialize, Serialize};

use crate::geometry::{Pose, Quat, Vec3};

/// Integer peer identifier. Negative values are routing sentinels, see
/// [`Target`](crate::models::Target).
pub type PeerId = i32;

/// A physically anchored frame observed by one peer.
///
/// The `id` is shared by every peer that observes the same physical frame; the
/// pose is that peer's own world-space observation of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawCoordinate")]
pub struct Coordinate {
    #[serde(rename = "CoordinateId")]
    pub id: String,
    #[serde(rename = "Position")]
    pub position: Vec3,
    #[serde(rename = "Rotation")]
    pub rotation: Quat,
}

impl Coordinate {
    pub fn new(id: impl Into<String>, position: Vec3, rotation: Quat) -> Self {
        Self {
            id: id.into(),
            position,
            rotation: rotation.normalize(),
        }
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }

    pub fn is_valid(&self) -> bool {
        !self.id.is_empty()
    }
}

// Wire shape; rotations are normalized on the way in.
#[derive(Deserialize)]
struct RawCoordinate {
    #[serde(rename = "CoordinateId", default)]
    id: String,
    #[serde(rename = "Position", default)]
    position: Vec3,
    #[serde(rename = "Rotation", default)]
    rotation: Quat,
}

impl From<RawCoordinate> for Coordinate {
    fn from(raw: RawCoordinate) -> Self {
        Coordinate::new(raw.id, raw.position, raw.rotation)
    }
}

/// A peer's last reported coordinate set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeerCoordinates {
    #[serde(rename = "PlayerId")]
    pub peer_id: PeerId,
    #[serde(rename = "CoordinateReferences", default)]
    pub coordinates: Vec<Coordinate>,
}

impl PeerCoordinates {
    pub fn new(peer_id: PeerId, coordinates: Vec<Coordinate>) -> Self {
        Self { peer_id, coordinates }
    }

    pub fn find(&self, coordinate_id: &str) -> Option<&Coordinate> {
        self.coordinates.iter().find(|c| c.id == coordinate_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialized_rotation_is_normalized() {
        let json = r#"{"CoordinateId":"pcf-1","Position":{"x":1.0,"y":2.0,"z":3.0},"Rotation":{"x":0.0,"y":0.0,"z":0.0,"w":2.0}}"#;
        let coord: Coordinate = serde_json::from_str(json).unwrap();
        assert_eq!(coord.id, "pcf-1");
        assert_eq!(coord.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(coord.rotation, Quat::IDENTITY);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let coord = Coordinate::new("pcf-1", Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY);
        let value = serde_json::to_value(&coord).unwrap();
        assert_eq!(value["CoordinateId"], "pcf-1");
        assert_eq!(value["Position"]["x"], 1.0);
        assert_eq!(value["Rotation"]["w"], 1.0);
    }

    #[test]
    fn empty_id_is_invalid() {
        assert!(!Coordinate::new("", Vec3::ZERO, Quat::IDENTITY).is_valid());
    }
}
