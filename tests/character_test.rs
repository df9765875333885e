mod common;

use glam::Vec3;
use physbox::sandbox::build_scene;
use physbox::utils::Pose;
use physbox::world::{CharacterRig, PhysicsWorld};

const DT: f32 = 1.0 / 60.0;

fn step(world: &mut PhysicsWorld, rig: &mut CharacterRig, frames: usize) {
    for _ in 0..frames {
        world.step_simulation(DT, &mut [&mut *rig]);
    }
}

/// Capsule half-height plus radius with the default settings
fn standing_height() -> f32 {
    1.75 * 0.5 + 1.75
}

#[test]
fn test_falls_onto_floor() {
    let settings = common::floor_settings();
    let mut scene = build_scene(&settings, &common::floor_level()).unwrap();
    assert!(!scene.character.on_ground());

    step(&mut scene.world, &mut scene.character, 180);

    let pose = scene.character.pose(&scene.world).unwrap();
    assert!(scene.character.on_ground());
    assert!((pose.position.y - (common::FLOOR_TOP + standing_height())).abs() < 0.2);
    assert!(pose.position.x.abs() < 1e-3 && pose.position.z.abs() < 1e-3);
}

#[test]
fn test_reset_and_warp_hold_position() {
    let settings = common::floor_settings();
    let mut scene = build_scene(&settings, &common::floor_level()).unwrap();
    scene.character.set_walk_direction(Vec3::new(0.2, 0.0, 0.0));
    step(&mut scene.world, &mut scene.character, 60);

    let warp = Vec3::new(3.0, common::FLOOR_TOP + standing_height() + 0.05, -4.0);
    scene.character.reset(&mut scene.world);
    scene.character.warp(&mut scene.world, Pose::from_translation(warp));
    assert_eq!(scene.character.walk_direction(), Vec3::ZERO);
    assert_eq!(scene.character.pose(&scene.world).unwrap().position, warp);

    step(&mut scene.world, &mut scene.character, 30);
    let position = scene.character.pose(&scene.world).unwrap().position;
    assert!((position.x - warp.x).abs() < 1e-3);
    assert!((position.z - warp.z).abs() < 1e-3);
    // Only gravity settling is allowed
    assert!(position.y <= warp.y + 1e-3);
    assert!(warp.y - position.y < 0.2);

    // The ghost volume moved with the body, not offset by the old position
    let ghost = scene.world.collider_pose(scene.character.collider()).unwrap().position;
    assert!(ghost.abs_diff_eq(position, 1e-4));
}

#[test]
fn test_walks_along_forward() {
    let settings = common::floor_settings();
    let mut scene = build_scene(&settings, &common::floor_level()).unwrap();
    step(&mut scene.world, &mut scene.character, 120);
    let start = scene.character.pose(&scene.world).unwrap().position;

    let forward = scene.character.forward(&scene.world);
    scene.character.set_walk_direction(forward * 0.1);
    step(&mut scene.world, &mut scene.character, 30);

    let end = scene.character.pose(&scene.world).unwrap().position;
    let travelled = end - start;
    assert!((travelled.dot(forward) - 3.0).abs() < 0.1);
    assert!(travelled.y.abs() < 0.05);
}
