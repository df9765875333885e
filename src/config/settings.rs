use std::fs;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use serde::{Serialize, Deserialize};

const CONFIG_FILE: &str = "sandbox.toml";

// =============================================================================
// Sandbox Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    pub gravity: [f32; 3],
    /// Half extent of the cube every body must start inside
    pub broadphase_half_extent: f32,
    pub fixed_time_step: f32,
    /// Upper bound on internal sub-steps per frame; 0 steps once by the raw frame delta
    pub max_sub_steps: u32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            gravity: [0.0, -10.0, 0.0],
            broadphase_half_extent: 1000.0,
            fixed_time_step: 1.0 / 60.0,
            max_sub_steps: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterSettings {
    pub capsule_radius: f32,
    /// Length of the capsule's cylindrical section
    pub capsule_height: f32,
    pub step_height: f32,
    pub max_slope_degrees: f32,
    pub gravity: f32,
    pub fall_speed: f32,
    pub start_position: [f32; 3],
    /// Where the rig is warped when the scene is reset. It sits slightly
    /// below and behind the start position, on the floor of the demo level.
    pub reset_position: [f32; 3],
    /// Walk displacement per second of frame time
    pub walk_speed: f32,
    /// Radians per second
    pub turn_speed: f32,
}

impl Default for CharacterSettings {
    fn default() -> Self {
        Self {
            capsule_radius: 1.75,
            capsule_height: 1.75,
            step_height: 0.35,
            max_slope_degrees: 50.0,
            gravity: 29.4,
            fall_speed: 55.0,
            start_position: [10.210098, -1.6433364, 16.453260],
            reset_position: [10.210001, -2.0306311, 16.576973],
            walk_speed: 44.0,
            turn_speed: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub initial_eye: [f32; 3],
    pub initial_target: [f32; 3],
    pub back_distance: f32,
    pub height: f32,
    /// Radius of the sphere swept between the rig and the camera
    pub probe_radius: f32,
    /// Vertical field of view in radians
    pub field_of_view: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            initial_eye: [10.0, 0.0, 10.0],
            initial_target: [0.0, 0.0, 0.0],
            back_distance: 12.0,
            height: 5.0,
            probe_radius: 0.2,
            field_of_view: std::f32::consts::FRAC_PI_4,
        }
    }
}

/// Tuning for the free-pivot pick constraint. These are feel values, not
/// correctness constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickingSettings {
    pub pivot_stiffness: f32,
    pub pivot_damping: f32,
    pub pivot_max_force: f32,
    /// Rigid-lock picks also hold the body's orientation; when off they only
    /// pin the grab point
    pub lock_orientation: bool,
}

impl Default for PickingSettings {
    fn default() -> Self {
        Self {
            pivot_stiffness: 200.0,
            pivot_damping: 30.0,
            pivot_max_force: 1800.0,
            lock_orientation: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShootingSettings {
    pub box_half_extent: f32,
    pub mass: f32,
    pub speed: f32,
    pub ccd_enabled: bool,
}

impl Default for ShootingSettings {
    fn default() -> Self {
        Self {
            box_half_extent: 1.0,
            mass: 1.0,
            speed: 40.0,
            ccd_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelSettings {
    pub path: PathBuf,
    /// Applied to brush plane distances while converting the BSP
    pub bsp_scaling: f32,
    pub vertex_scale: f32,
    /// Scale applied to the level's up axis after the axis swap
    pub vertical_squash: f32,
    pub offset: [f32; 3],
}

impl Default for LevelSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/BspDemo.bsp"),
            bsp_scaling: 0.1,
            vertex_scale: 0.5,
            vertical_squash: 0.75,
            offset: [0.0, -10.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotSettings {
    pub path: PathBuf,
    /// Hard upper bound on the serialized world size
    pub max_bytes: usize,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("world.snapshot"),
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    pub world: WorldSettings,
    pub character: CharacterSettings,
    pub camera: CameraSettings,
    pub picking: PickingSettings,
    pub shooting: ShootingSettings,
    pub level: LevelSettings,
    pub snapshot: SnapshotSettings,
}

impl SandboxSettings {
    pub fn from_toml_str(data: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(data)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn load_from(path: &Path) -> std::io::Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_toml_str(&data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

fn config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "physbox", "physbox")
        .map(|proj| proj.config_dir().join(CONFIG_FILE))
}

pub fn save_settings(settings: &SandboxSettings) -> std::io::Result<()> {
    if let Some(path) = config_path() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = settings.to_toml_string()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, toml)?;
    }
    Ok(())
}

pub fn load_settings() -> Option<SandboxSettings> {
    let path = config_path()?;
    match SandboxSettings::load_from(&path) {
        Ok(settings) => Some(settings),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!("Ignoring unreadable settings at {}: {}", path.display(), e);
            None
        }
    }
}
