//! Frame loop of the physics sandbox

pub mod clock;
pub mod driver;
pub mod scene;

pub use clock::FrameClock;
pub use driver::{FrameOutcome, Sandbox};
pub use scene::{build_scene, populate_level, Scene};
