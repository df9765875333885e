// physbox: interactive rigid-body sandbox with a kinematic character

pub mod app;
pub mod config;
pub mod input;
pub mod level;
pub mod rendering;
pub mod sandbox;
pub mod utils;
pub mod world;

// Re-export commonly used types for convenience
pub use config::SandboxSettings;
pub use sandbox::{FrameOutcome, Sandbox};
pub use world::{PhysicsWorld, WorldError, WorldResult};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
