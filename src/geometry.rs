//! Rigid-body math used to move poses between coordinate frames.
//!
//! All frames are right-handed. A frame `F` with position `t` and rotation `R`
//! maps a local point `p` to the world as `M·p = R·p + t`, and its inverse is
//! `M⁻¹·p = R⁻¹·(p − t)`. Positions are always transformed as points.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Neg, Sub};

/// Tolerance on `|q| − 1` above which a composed quaternion is renormalized.
pub const NORMALIZATION_TOLERANCE: f32 = 1e-4;

/// A 3D vector in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Vec3) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Vec3) -> Vec3 {
        Vec3 {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Vec3) -> f32 {
        (self - other).length()
    }

    pub fn approx_eq(self, other: Vec3, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.z - other.z).abs() <= epsilon
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// A rotation quaternion serialized as `{x, y, z, w}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Quat::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Quat = Quat { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians around `axis` (need not be unit length).
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let len = axis.length();
        if len == 0.0 {
            return Quat::IDENTITY;
        }
        let half = angle * 0.5;
        let s = half.sin() / len;
        Quat::new(axis.x * s, axis.y * s, axis.z * s, half.cos())
    }

    pub fn norm(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    pub fn is_normalized(self) -> bool {
        (self.norm() - 1.0).abs() <= NORMALIZATION_TOLERANCE
    }

    /// Unit quaternion pointing the same way. A zero quaternion becomes identity.
    pub fn normalize(self) -> Quat {
        let n = self.norm();
        if n == 0.0 || !n.is_finite() {
            return Quat::IDENTITY;
        }
        Quat::new(self.x / n, self.y / n, self.z / n, self.w / n)
    }

    /// Renormalizes only when drift exceeds [`NORMALIZATION_TOLERANCE`].
    pub fn renormalized(self) -> Quat {
        if self.is_normalized() {
            self
        } else {
            self.normalize()
        }
    }

    pub fn conjugate(self) -> Quat {
        Quat::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Inverse of a unit quaternion.
    pub fn inverse(self) -> Quat {
        self.conjugate()
    }

    /// Rotates `v` by this quaternion.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        // v' = v + 2w(u × v) + 2u × (u × v)
        let u = Vec3::new(self.x, self.y, self.z);
        let t = u.cross(v) * 2.0;
        v + t * self.w + u.cross(t)
    }

    /// Equal as rotations, treating `q` and `-q` as the same.
    pub fn approx_eq(self, other: Quat, epsilon: f32) -> bool {
        let dot = self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w;
        (dot.abs() - 1.0).abs() <= epsilon
    }
}

impl Mul for Quat {
    type Output = Quat;

    /// Hamilton product; `a * b` applies `b` first, then `a`.
    fn mul(self, rhs: Quat) -> Quat {
        Quat::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }
}

impl Mul<Vec3> for Quat {
    type Output = Vec3;

    fn mul(self, rhs: Vec3) -> Vec3 {
        self.rotate(rhs)
    }
}

/// Position and orientation, either in world space or in a frame's local space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose { position: Vec3::ZERO, rotation: Quat::IDENTITY };

    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Maps a point from this frame's local space into world space.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.rotation.rotate(local) + self.position
    }

    /// Maps a world point into this frame's local space.
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse().rotate(world - self.position)
    }

    /// `self · other`: `other` expressed in this frame, lifted to world space.
    pub fn compose(&self, other: &Pose) -> Pose {
        world_of(self, other)
    }

    pub fn inverse(&self) -> Pose {
        let rotation = self.rotation.inverse();
        Pose::new(rotation.rotate(-self.position), rotation)
    }

    pub fn approx_eq(&self, other: &Pose, epsilon: f32) -> bool {
        self.position.approx_eq(other.position, epsilon) && self.rotation.approx_eq(other.rotation, epsilon)
    }
}

/// Pose of `world_pose` expressed in the oriented frame `coord`.
pub fn relative_of(coord: &Pose, world_pose: &Pose) -> Pose {
    Pose {
        position: coord.inverse_transform_point(world_pose.position),
        rotation: (coord.rotation.inverse() * world_pose.rotation).renormalized(),
    }
}

/// Lifts `local_pose`, expressed in `coord`, back into world space.
pub fn world_of(coord: &Pose, local_pose: &Pose) -> Pose {
    Pose {
        position: coord.transform_point(local_pose.position),
        rotation: (coord.rotation * local_pose.rotation).renormalized(),
    }
}

/// Re-expresses a remote peer's world pose in the local world.
///
/// `local_coord` and `remote_coord` are two observations of the same physical
/// frame, one per peer.
pub fn co_localize(local_coord: &Pose, remote_coord: &Pose, remote_world_pose: &Pose) -> Pose {
    let remote_relative = relative_of(remote_coord, remote_world_pose);
    world_of(local_coord, &remote_relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPS: f32 = 1e-5;

    fn yaw(angle: f32) -> Quat {
        Quat::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), angle)
    }

    #[test]
    fn relative_position_uses_the_oriented_frame() {
        // Frame at (10,0,0) turned 90 degrees around +Y: its local +Z points to world +X.
        let coord = Pose::new(Vec3::new(10.0, 0.0, 0.0), yaw(FRAC_PI_2));
        let world = Pose::new(Vec3::new(11.0, 0.0, 0.0), Quat::IDENTITY);

        let local = relative_of(&coord, &world);
        assert!(local.position.approx_eq(Vec3::new(0.0, 0.0, 1.0), EPS), "{:?}", local.position);

        // Plain subtraction would have given (1,0,0).
        assert!(!local.position.approx_eq(world.position - coord.position, 0.1));
    }

    #[test]
    fn world_of_inverts_relative_of() {
        let coord = Pose::new(Vec3::new(1.5, -2.0, 0.25), Quat::new(0.1, 0.7, -0.2, 0.6).normalize());
        let world = Pose::new(Vec3::new(-3.0, 4.0, 9.0), Quat::new(-0.3, 0.2, 0.5, 0.8).normalize());

        let round_trip = world_of(&coord, &relative_of(&coord, &world));
        assert!(round_trip.approx_eq(&world, 1e-4), "{:?} != {:?}", round_trip, world);
    }

    #[test]
    fn co_localize_matches_rigid_transform_between_observations() {
        let remote_coord = Pose::new(Vec3::new(10.0, 0.0, 0.0), yaw(0.3));
        let local_coord = Pose::new(Vec3::new(-2.0, 1.0, 5.0), yaw(-1.1));
        let remote_world = Pose::new(Vec3::new(11.0, 0.5, -1.0), yaw(0.9));

        let local_world = co_localize(&local_coord, &remote_coord, &remote_world);

        // Image of the remote pose under C_local · C_remote⁻¹.
        let expected = local_coord.compose(&remote_coord.inverse()).compose(&remote_world);
        assert!(local_world.approx_eq(&expected, 1e-4), "{:?} != {:?}", local_world, expected);
    }

    #[test]
    fn co_localize_with_identical_frames_is_identity() {
        let coord = Pose::new(Vec3::new(3.0, 2.0, 1.0), yaw(2.0));
        let world = Pose::new(Vec3::new(0.0, 7.0, -4.0), yaw(-0.4));

        let result = co_localize(&coord, &coord, &world);
        assert!(result.approx_eq(&world, EPS));
    }

    #[test]
    fn renormalized_only_touches_drifted_quaternions() {
        let nearly = Quat::new(0.0, 0.0, 0.0, 1.00005);
        assert_eq!(nearly.renormalized(), nearly);

        let drifted = Quat::new(0.0, 0.0, 0.0, 1.01);
        assert!((drifted.renormalized().norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn inverse_of_unit_rotation_is_conjugate() {
        let q = Quat::new(0.2, -0.4, 0.1, 0.9).normalize();
        let product = q * q.inverse();
        assert!(product.approx_eq(Quat::IDENTITY, EPS));
    }

    #[test]
    fn zero_quaternion_normalizes_to_identity() {
        assert_eq!(Quat::new(0.0, 0.0, 0.0, 0.0).normalize(), Quat::IDENTITY);
    }
}
