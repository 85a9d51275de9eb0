//! Pose type for spatial positioning.
//!
//! Tracks run along +Z in local space: a segment's forward axis is its
//! rotation applied to `Vec3::Z`. Sockets and anchors are poses, so gluing a
//! segment to the chain is pose composition, never a physics query.

use glam::{Quat, Vec3};

/// A position and orientation pair. Scale is not modelled; track pieces and
/// pooled actors are placed rigid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    /// The origin pose: zero position, identity rotation.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Create a pose at the given position with identity rotation.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Create a pose from a position and a yaw angle (radians, around +Y).
    pub fn from_position_yaw(position: Vec3, yaw: f32) -> Self {
        Self {
            position,
            rotation: Quat::from_rotation_y(yaw),
        }
    }

    /// Forward direction (+Z rotated by this pose).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Right direction (+X rotated by this pose).
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Up direction (+Y rotated by this pose).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Map a point from this pose's local space into world space.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Compose a local pose (e.g. a socket offset) with this pose, yielding
    /// the local pose expressed in world space.
    pub fn transform_pose(&self, local: Pose) -> Pose {
        Pose {
            position: self.transform_point(local.position),
            rotation: self.rotation * local.rotation,
        }
    }

    /// Translate the pose by a delta, leaving orientation untouched.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Positional distance to another pose.
    pub fn distance(&self, other: &Pose) -> f32 {
        self.position.distance(other.position)
    }

    /// True when position and rotation match within `eps`.
    pub fn approx_eq(&self, other: &Pose, eps: f32) -> bool {
        self.position.distance(other.position) <= eps
            && self.rotation.angle_between(other.rotation) <= eps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn identity_forward_is_plus_z() {
        assert_eq!(Pose::IDENTITY.forward(), Vec3::Z);
    }

    #[test]
    fn yaw_quarter_turn_faces_plus_x() {
        // Positive yaw turns right: +90° takes +Z to +X.
        let p = Pose::from_position_yaw(Vec3::ZERO, FRAC_PI_2);
        assert!(p.forward().distance(Vec3::X) < 1e-5);
    }

    #[test]
    fn transform_pose_composes_offsets() {
        let base = Pose::from_position_yaw(Vec3::new(0.0, 0.0, 10.0), FRAC_PI_2);
        let socket = Pose::from_position(Vec3::new(0.0, 0.0, 5.0));
        let world = base.transform_pose(socket);
        // Socket 5 ahead of a base facing +X lands at x = 5.
        assert!(world.position.distance(Vec3::new(5.0, 0.0, 10.0)) < 1e-4);
        assert!(world.forward().distance(Vec3::X) < 1e-5);
    }

    #[test]
    fn transform_point_roundtrip_with_inverse() {
        let p = Pose::from_position_yaw(Vec3::new(3.0, 0.0, -2.0), 0.7);
        let local = Vec3::new(1.5, 0.0, 4.0);
        let world = p.transform_point(local);
        let back = p.rotation.inverse() * (world - p.position);
        assert!(back.distance(local) < 1e-5);
    }
}
