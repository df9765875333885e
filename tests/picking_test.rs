use glam::Vec3;
use physbox::config::{PickingSettings, WorldSettings};
use physbox::utils::Pose;
use physbox::world::{ActivationPolicy, PhysicsWorld, PickKind, Picker};
use rapier3d::prelude::{GenericJoint, JointAxesMask, RigidBodyHandle, SharedShape};

const EYE: Vec3 = Vec3::new(0.0, 5.0, 0.0);
const DOWN: Vec3 = Vec3::new(0.0, -100.0, 0.0);

/// Static floor with its top at y = 0 and a unit box resting on it
fn box_on_floor() -> (PhysicsWorld, RigidBodyHandle) {
    let mut world = PhysicsWorld::build(&WorldSettings::default());
    let floor = world.register_shape(SharedShape::cuboid(20.0, 0.5, 20.0));
    world.create_rigid_body(0.0, Pose::from_translation(Vec3::new(0.0, -0.5, 0.0)), floor).unwrap();
    let cube = world.register_shape(SharedShape::cuboid(0.5, 0.5, 0.5));
    let body = world.create_rigid_body(1.0, Pose::from_translation(Vec3::new(0.0, 0.5, 0.0)), cube).unwrap();
    world.refresh_queries();
    (world, body)
}

/// Anchor of the joint in the picked body's frame
fn anchor_on_body(joint: &GenericJoint) -> Vec3 {
    let anchor = joint.local_anchor2();
    Vec3::new(anchor.x, anchor.y, anchor.z)
}

#[test]
fn test_acquire_anchors_hit_point() {
    let (mut world, body) = box_on_floor();
    let bodies = world.body_count();
    let mut picker = Picker::new(&PickingSettings::default());

    assert!(picker.acquire(&mut world, EYE, DOWN, PickKind::FreePivot));
    let pick = picker.active().unwrap();
    assert_eq!(pick.body(), body);
    assert_eq!(pick.kind(), PickKind::FreePivot);
    assert!(pick.local_point().abs_diff_eq(Vec3::new(0.0, 0.5, 0.0), 1e-4));
    assert!((pick.distance() - 4.0).abs() < 1e-4);
    assert_eq!(world.activation_policy(body), Some(ActivationPolicy::AlwaysActive));
    assert_eq!(world.constraint_count(), 1);
    assert_eq!(world.body_count(), bodies + 1);

    let joint = world.constraint(pick.joint()).unwrap();
    assert!(anchor_on_body(joint).abs_diff_eq(Vec3::new(0.0, 0.5, 0.0), 1e-4));
}

#[test]
fn test_rigid_lock_anchors_hit_point() {
    let (mut world, _) = box_on_floor();
    let mut picker = Picker::new(&PickingSettings::default());

    assert!(picker.acquire(&mut world, EYE, DOWN, PickKind::RigidLock));
    let pick = picker.active().unwrap();
    let joint = world.constraint(pick.joint()).unwrap();
    assert!(anchor_on_body(joint).abs_diff_eq(pick.local_point(), 1e-6));
    assert!(anchor_on_body(joint).abs_diff_eq(Vec3::new(0.0, 0.5, 0.0), 1e-4));
    assert_eq!(joint.locked_axes, JointAxesMask::LOCKED_FIXED_AXES);
}

#[test]
fn test_rigid_lock_without_orientation_lock() {
    let (mut world, _) = box_on_floor();
    let settings = PickingSettings { lock_orientation: false, ..PickingSettings::default() };
    let mut picker = Picker::new(&settings);

    assert!(picker.acquire(&mut world, EYE, DOWN, PickKind::RigidLock));
    let joint = world.constraint(picker.active().unwrap().joint()).unwrap();
    assert_eq!(joint.locked_axes, JointAxesMask::LOCKED_SPHERICAL_AXES);
    assert!(anchor_on_body(joint).abs_diff_eq(Vec3::new(0.0, 0.5, 0.0), 1e-4));
}

#[test]
fn test_single_pick_at_a_time() {
    let (mut world, _) = box_on_floor();
    let mut picker = Picker::new(&PickingSettings::default());

    assert!(picker.acquire(&mut world, EYE, DOWN, PickKind::FreePivot));
    assert!(!picker.acquire(&mut world, EYE, DOWN, PickKind::RigidLock));
    assert_eq!(world.constraint_count(), 1);
    assert_eq!(picker.active().unwrap().kind(), PickKind::FreePivot);
}

#[test]
fn test_track_keeps_pick_distance() {
    let (mut world, _) = box_on_floor();
    let mut picker = Picker::new(&PickingSettings::default());
    assert!(picker.acquire(&mut world, EYE, DOWN, PickKind::RigidLock));

    let ray_to = Vec3::new(100.0, 5.0, 0.0);
    picker.track(&mut world, EYE, ray_to);

    let pick = picker.active().unwrap();
    assert!(pick.target().abs_diff_eq(EYE + Vec3::X * 4.0, 1e-4));
    assert!(((pick.target() - EYE).length() - pick.distance()).abs() < 1e-4);

    let joint = world.constraint(pick.joint()).unwrap();
    let anchor = joint.local_anchor1();
    assert!(Vec3::new(anchor.x, anchor.y, anchor.z).abs_diff_eq(pick.target(), 1e-4));
}

#[test]
fn test_dragging_moves_body() {
    let (mut world, body) = box_on_floor();
    let mut picker = Picker::new(&PickingSettings::default());
    assert!(picker.acquire(&mut world, EYE, DOWN, PickKind::FreePivot));

    // Grab point moves up and to the side along the new ray
    picker.track(&mut world, EYE, EYE + Vec3::new(1.0, -1.0, 0.0));
    for _ in 0..120 {
        world.step_simulation(1.0 / 60.0, &mut []);
    }
    assert!(world.body_pose(body).unwrap().position.y > 1.0);
}

#[test]
fn test_held_body_never_sleeps() {
    let (mut world, body) = box_on_floor();
    let mut picker = Picker::new(&PickingSettings::default());
    assert!(picker.acquire(&mut world, EYE, DOWN, PickKind::RigidLock));

    for _ in 0..300 {
        world.step_simulation(1.0 / 60.0, &mut []);
    }
    assert!(!world.is_sleeping(body));
}

#[test]
fn test_release_restores_activation() {
    let (mut world, body) = box_on_floor();
    let bodies = world.body_count();
    let mut picker = Picker::new(&PickingSettings::default());
    assert!(picker.acquire(&mut world, EYE, DOWN, PickKind::FreePivot));
    for _ in 0..30 {
        world.step_simulation(1.0 / 60.0, &mut []);
    }

    assert!(picker.release(&mut world));
    assert!(!picker.is_picking());
    assert_eq!(world.constraint_count(), 0);
    assert_eq!(world.body_count(), bodies);
    assert_eq!(world.activation_policy(body), Some(ActivationPolicy::Normal));
    assert_eq!(world.idle_time(body), Some(0.0));
    assert!(!world.is_sleeping(body));
}
