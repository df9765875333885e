pub mod settings;

// Re-export commonly used types
pub use settings::{
    SandboxSettings, WorldSettings, CharacterSettings, CameraSettings,
    PickingSettings, ShootingSettings, LevelSettings, SnapshotSettings,
    save_settings, load_settings,
};
