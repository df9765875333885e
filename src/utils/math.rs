use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::{Isometry, Point, Real, Vector};
use std::fmt;

/// Position and orientation of an object in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_translation(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Local Z axis expressed in world space
    pub fn forward(&self) -> Vec3 {
        (self.rotation * Vec3::Z).normalize_or_zero()
    }

    /// Local Y axis expressed in world space
    pub fn up(&self) -> Vec3 {
        (self.rotation * Vec3::Y).normalize_or_zero()
    }

    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    /// Express a world-space point in this pose's local frame
    pub fn inverse_transform_point(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * (world - self.position)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::from_translation(Vec3::ZERO)
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pos={} rot={}", self.position, self.rotation)
    }
}

/// Conversions between the application's glam types and the engine's nalgebra types
pub fn to_vector(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

pub fn to_point(v: Vec3) -> Point<Real> {
    Point::new(v.x, v.y, v.z)
}

pub fn from_vector(v: &Vector<Real>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

pub fn from_point(p: &Point<Real>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

pub fn to_isometry(pose: &Pose) -> Isometry<Real> {
    let q = pose.rotation;
    Isometry::from_parts(
        Translation3::new(pose.position.x, pose.position.y, pose.position.z),
        UnitQuaternion::new_normalize(Quaternion::new(q.w, q.x, q.y, q.z)),
    )
}

pub fn from_isometry(iso: &Isometry<Real>) -> Pose {
    let t = iso.translation.vector;
    let r = iso.rotation;
    Pose::new(Vec3::new(t.x, t.y, t.z), Quat::from_xyzw(r.i, r.j, r.k, r.w))
}

/// Parse a settings triple into a vector
pub fn vec3_from(values: [f32; 3]) -> Vec3 {
    Vec3::from_array(values)
}
