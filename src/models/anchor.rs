use serde::{Deserialize, Serialize};

use crate::geometry::{self, Pose, Quat, Vec3};
use crate::models::{Coordinate, PeerId};

/// A labeled pose stored relative to one coordinate frame.
///
/// The relative pose is the same for every peer that observes the linked
/// coordinate, which is what lets it travel between peers. It is always
/// computed by one of the constructors, never taken from raw world values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkAnchor {
    #[serde(rename = "AnchorId", default)]
    anchor_id: String,
    #[serde(rename = "OwnerId", default)]
    owner_id: PeerId,
    #[serde(rename = "LinkedCoordinate", default)]
    linked_coordinate: Option<Coordinate>,
    #[serde(rename = "RelativePosition", default)]
    relative_position: Vec3,
    #[serde(rename = "RelativeRotation", default)]
    relative_rotation: Quat,
}

impl NetworkAnchor {
    /// Author-side creation from a world pose and one observed coordinate.
    pub fn new_local(
        anchor_id: impl Into<String>,
        owner_id: PeerId,
        coordinate: &Coordinate,
        world_position: Vec3,
        world_rotation: Quat,
    ) -> Self {
        let relative = geometry::relative_of(&coordinate.pose(), &Pose::new(world_position, world_rotation));
        Self::with_relative(anchor_id.into(), owner_id, coordinate.clone(), relative)
    }

    /// Co-localization of a remote peer's anchor.
    ///
    /// The relative pose is computed against `remote_coordinate` (the remote
    /// peer's observation) and stored against `local_coordinate`, our own
    /// observation of the same frame.
    pub fn new_from_remote(
        anchor_id: impl Into<String>,
        owner_id: PeerId,
        local_coordinate: &Coordinate,
        remote_coordinate: &Coordinate,
        remote_world_position: Vec3,
        remote_world_rotation: Quat,
    ) -> Self {
        debug_assert_eq!(local_coordinate.id, remote_coordinate.id, "co-localization needs the same frame");
        let relative = geometry::relative_of(
            &remote_coordinate.pose(),
            &Pose::new(remote_world_position, remote_world_rotation),
        );
        Self::with_relative(anchor_id.into(), owner_id, local_coordinate.clone(), relative)
    }

    fn with_relative(anchor_id: String, owner_id: PeerId, linked: Coordinate, relative: Pose) -> Self {
        let relative_rotation = relative.rotation.renormalized();
        debug_assert!(relative_rotation.is_normalized(), "relative rotation drifted");
        Self {
            anchor_id,
            owner_id,
            linked_coordinate: Some(linked),
            relative_position: relative.position,
            relative_rotation,
        }
    }

    pub fn anchor_id(&self) -> &str {
        &self.anchor_id
    }

    pub fn owner_id(&self) -> PeerId {
        self.owner_id
    }

    pub fn linked_coordinate(&self) -> Option<&Coordinate> {
        self.linked_coordinate.as_ref()
    }

    pub fn relative_position(&self) -> Vec3 {
        self.relative_position
    }

    pub fn relative_rotation(&self) -> Quat {
        self.relative_rotation
    }

    pub fn relative_pose(&self) -> Pose {
        Pose::new(self.relative_position, self.relative_rotation)
    }

    /// World pose of the anchor as seen through `reference`.
    ///
    /// With `None` the linked coordinate is used. That pose is cached from
    /// construction time and goes stale if the frame has been re-observed
    /// since, so prefer passing a freshly acquired coordinate.
    pub fn world_pose(&self, reference: Option<&Coordinate>) -> Pose {
        match reference.or(self.linked_coordinate.as_ref()) {
            Some(coord) => geometry::world_of(&coord.pose(), &self.relative_pose()),
            None => self.relative_pose(),
        }
    }

    pub fn world_position(&self, reference: Option<&Coordinate>) -> Vec3 {
        self.world_pose(reference).position
    }

    pub fn world_rotation(&self, reference: Option<&Coordinate>) -> Quat {
        self.world_pose(reference).rotation
    }

    /// True iff the anchor has an id and a linked coordinate with an id.
    pub fn is_valid(&self) -> bool {
        !self.anchor_id.is_empty() && self.linked_coordinate.as_ref().is_some_and(Coordinate::is_valid)
    }
}

/// Null-tolerant form of [`NetworkAnchor::is_valid`].
pub fn is_valid(anchor: Option<&NetworkAnchor>) -> bool {
    anchor.is_some_and(NetworkAnchor::is_valid)
}

/// Rewrites a remote peer's anchor into our world if we share a frame.
///
/// The first local coordinate (in local order) whose id appears in
/// `remote_coordinates` is used. Returns `None` when nothing is shared or the
/// remote anchor is invalid.
pub fn try_colocalize(
    local_coordinates: &[Coordinate],
    remote_coordinates: &[Coordinate],
    remote_anchor: Option<&NetworkAnchor>,
) -> Option<NetworkAnchor> {
    let remote_anchor = remote_anchor.filter(|anchor| anchor.is_valid())?;

    let (local_shared, remote_shared) = local_coordinates.iter().find_map(|local| {
        remote_coordinates
            .iter()
            .find(|remote| remote.id == local.id)
            .map(|remote| (local, remote))
    })?;

    let remote_world = remote_anchor.world_pose(None);
    Some(NetworkAnchor::new_from_remote(
        remote_anchor.anchor_id(),
        remote_anchor.owner_id(),
        local_shared,
        remote_shared,
        remote_world.position,
        remote_world.rotation,
    ))
}
