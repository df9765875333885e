mod common;

use glam::Vec3;
use physbox::config::{CameraSettings, WorldSettings};
use physbox::rendering::CameraState;
use physbox::sandbox::build_scene;
use physbox::utils::Pose;
use physbox::world::{FollowCamera, PhysicsWorld};
use rapier3d::prelude::SharedShape;

fn world_with_wall(mass: f32) -> PhysicsWorld {
    let mut world = PhysicsWorld::build(&WorldSettings::default());
    let wall = world.register_shape(SharedShape::cuboid(20.0, 20.0, 0.25));
    world
        .create_rigid_body(mass, Pose::from_translation(Vec3::new(0.0, 0.0, -6.0)), wall)
        .unwrap();
    world.refresh_queries();
    world
}

#[test]
fn test_clear_line_of_sight() {
    let world = PhysicsWorld::build(&WorldSettings::default());
    let camera = FollowCamera::new(&CameraSettings::default());
    let desired = Vec3::new(0.0, 0.0, -12.0);
    assert_eq!(camera.resolve(&world, Vec3::ZERO, desired), desired);
}

#[test]
fn test_static_wall_pulls_camera_in() {
    let world = world_with_wall(0.0);
    let camera = FollowCamera::new(&CameraSettings::default());
    let desired = Vec3::new(0.0, 0.0, -12.0);

    let eye = camera.resolve(&world, Vec3::ZERO, desired);
    // Sphere of radius 0.2 touches the wall face at z = -5.75
    assert!(eye.x.abs() < 1e-4 && eye.y.abs() < 1e-4);
    assert!((eye.z - (-5.55)).abs() < 0.05);
}

#[test]
fn test_dynamic_bodies_do_not_block() {
    let world = world_with_wall(1.0);
    let camera = FollowCamera::new(&CameraSettings::default());
    let desired = Vec3::new(0.0, 0.0, -12.0);
    assert_eq!(camera.resolve(&world, Vec3::ZERO, desired), desired);
}

#[test]
fn test_follows_character() {
    let settings = common::floor_settings();
    let scene = build_scene(&settings, &common::floor_level()).unwrap();
    let follow = FollowCamera::new(&settings.camera);
    let mut camera = CameraState::default();

    follow.update(&scene.world, &scene.character, &mut camera);

    let pose = scene.character.pose(&scene.world).unwrap();
    assert_eq!(camera.target, pose.position);
    // Behind the character along -Z and above it
    let expected = pose.position + Vec3::new(0.0, 5.0, -12.0);
    assert!(camera.eye.abs_diff_eq(expected, 1e-4));
}
