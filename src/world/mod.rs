//! Physics world and the components that live in it
//!
//! The world is always passed explicitly: the character rig, the follow
//! camera and the picker take a `&mut PhysicsWorld` per call and never keep
//! a reference to it between frames.

pub mod physics;
pub mod shapes;
pub mod character;
pub mod follow_camera;
pub mod picking;
pub mod snapshot;

pub use physics::{
    ActivationPolicy, BodyKind, BodyRecord, PhysicsWorld, RayHit, TeardownReport,
    TeardownStage, WorldAction,
};
pub use shapes::{ShapeId, ShapeRegistry};
pub use character::CharacterRig;
pub use follow_camera::FollowCamera;
pub use picking::{PickConstraint, PickKind, Picker};

use glam::Vec3;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("Shape is not registered in this world: {id:?}")]
    UnknownShape { id: ShapeId },

    #[error("Body position {position} lies outside the broadphase volume (half extent {half_extent})")]
    OutOfBounds { position: Vec3, half_extent: f32 },

    #[error("Invalid body mass: {mass}")]
    InvalidMass { mass: f32 },

    #[error("Convex hull from {vertices} vertices is degenerate")]
    DegenerateHull { vertices: usize },

    #[error("World snapshot exceeds the {limit}-byte buffer")]
    SnapshotOverflow { limit: usize },

    #[error("World snapshot encode failed: {reason}")]
    SnapshotEncode { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WorldResult<T> = Result<T, WorldError>;
