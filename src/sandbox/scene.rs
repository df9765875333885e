//! Scene construction: level geometry first, then the character

use crate::config::{LevelSettings, SandboxSettings};
use crate::level::{LevelSource, RegionList};
use crate::utils::math::{self, Pose};
use crate::world::{CharacterRig, PhysicsWorld, WorldError, WorldResult};
use glam::Vec3;
use rapier3d::prelude::*;
use tracing::{error, info, warn};

pub struct Scene {
    pub world: PhysicsWorld,
    pub character: CharacterRig,
    pub level_bodies: usize,
}

/// Build a fresh world and populate it.
///
/// A level that fails to load leaves the world without level geometry; the
/// character is created either way.
pub fn build_scene(settings: &SandboxSettings, level: &dyn LevelSource) -> WorldResult<Scene> {
    let mut world = PhysicsWorld::build(&settings.world);
    let level_bodies = populate_level(&mut world, &settings.level, level);
    let character = CharacterRig::spawn(&mut world, &settings.character)?;
    world.refresh_queries();

    info!(
        "Scene ready: {} bodies, {} shapes",
        world.body_count(), world.shape_count()
    );
    Ok(Scene { world, character, level_bodies })
}

/// Load every region of `level` and add it as a static convex hull.
/// Returns the number of bodies created.
pub fn populate_level(world: &mut PhysicsWorld, settings: &LevelSettings, level: &dyn LevelSource) -> usize {
    // Regions are buffered so a parse error part-way through adds nothing
    let mut buffer = RegionList::new();
    if let Err(e) = level.load(&mut buffer) {
        error!("Failed to load level {}: {}", level.describe(), e);
        return 0;
    }

    let mut created = 0;
    for region in &buffer.regions {
        match add_static_hull(world, settings, &region.vertices) {
            Ok(Some(_)) => created += 1,
            Ok(None) => {}
            Err(e) => warn!("Skipping level region: {}", e),
        }
    }
    info!("Level {}: {} of {} regions became bodies", level.describe(), created, buffer.regions.len());
    created
}

/// Map a level-space vertex into the world frame (level Z is up)
pub fn level_to_world(vertex: Vec3, settings: &LevelSettings) -> Vec3 {
    let v = vertex * settings.vertex_scale;
    Vec3::new(v.x, v.z * settings.vertical_squash, -v.y)
}

pub fn add_static_hull(
    world: &mut PhysicsWorld,
    settings: &LevelSettings,
    vertices: &[Vec3],
) -> WorldResult<Option<RigidBodyHandle>> {
    if vertices.is_empty() {
        return Ok(None);
    }
    let points: Vec<Point<Real>> = vertices
        .iter()
        .map(|v| math::to_point(level_to_world(*v, settings)))
        .collect();
    let hull = SharedShape::convex_hull(&points)
        .ok_or(WorldError::DegenerateHull { vertices: vertices.len() })?;

    let shape = world.register_shape(hull);
    let pose = Pose::from_translation(math::vec3_from(settings.offset));
    world.create_rigid_body(0.0, pose, shape).map(Some)
}
