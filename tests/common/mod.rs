#![allow(dead_code)]

use glam::Vec3;
use physbox::config::SandboxSettings;
use physbox::level::RegionList;

/// Height of the floor's top face in world space
pub const FLOOR_TOP: f32 = -10.0;

/// Corners of an axis-aligned box in level space
pub fn level_box(min: Vec3, max: Vec3) -> Vec<Vec3> {
    let mut corners = Vec::with_capacity(8);
    for &x in &[min.x, max.x] {
        for &y in &[min.y, max.y] {
            for &z in &[min.z, max.z] {
                corners.push(Vec3::new(x, y, z));
            }
        }
    }
    corners
}

/// A 100x100 floor whose top face sits at `FLOOR_TOP` with default level settings
pub fn floor_level() -> RegionList {
    RegionList::new().with_region(level_box(
        Vec3::new(-100.0, -100.0, -4.0),
        Vec3::new(100.0, 100.0, 0.0),
    ))
}

/// Settings for a scene built on `floor_level`, with the character above the floor
pub fn floor_settings() -> SandboxSettings {
    let mut settings = SandboxSettings::default();
    settings.character.start_position = [0.0, -5.0, 0.0];
    settings.character.reset_position = [5.0, -7.0, 5.0];
    settings
}
