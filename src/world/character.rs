//! Player character: a ghost capsule moved by a kinematic controller

use crate::config::CharacterSettings;
use crate::utils::math::{self, Pose};
use super::physics::{PhysicsWorld, WorldAction};
use super::WorldResult;
use glam::{Quat, Vec3};
use rapier3d::control::{CharacterAutostep, CharacterLength, KinematicCharacterController};
use rapier3d::prelude::*;
use tracing::{debug, info};

pub struct CharacterRig {
    body: RigidBodyHandle,
    collider: ColliderHandle,
    controller: KinematicCharacterController,

    walk_direction: Vec3,
    vertical_velocity: f32,
    vertical_offset: f32,
    on_ground: bool,

    gravity: f32,
    fall_speed: f32,
}

impl CharacterRig {
    /// Create the ghost volume at the configured start position
    pub fn spawn(world: &mut PhysicsWorld, settings: &CharacterSettings) -> WorldResult<Self> {
        let capsule = world.register_shape(SharedShape::capsule_y(
            settings.capsule_height * 0.5,
            settings.capsule_radius,
        ));
        let start = Pose::from_translation(math::vec3_from(settings.start_position));
        let (body, collider) = world.create_ghost(start, capsule)?;

        let step = CharacterLength::Absolute(settings.step_height);
        let controller = KinematicCharacterController {
            up: Vector::y_axis(),
            autostep: Some(CharacterAutostep {
                max_height: step,
                min_width: CharacterLength::Absolute(settings.capsule_radius * 0.5),
                include_dynamic_bodies: false,
            }),
            snap_to_ground: Some(step),
            max_slope_climb_angle: settings.max_slope_degrees.to_radians(),
            ..KinematicCharacterController::default()
        };

        info!("Character rig spawned at {}", start);
        Ok(Self {
            body,
            collider,
            controller,
            walk_direction: Vec3::ZERO,
            vertical_velocity: 0.0,
            vertical_offset: 0.0,
            on_ground: false,
            gravity: settings.gravity,
            fall_speed: settings.fall_speed,
        })
    }

    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    pub fn collider(&self) -> ColliderHandle {
        self.collider
    }

    /// Displacement applied on every following simulation step
    pub fn set_walk_direction(&mut self, displacement: Vec3) {
        self.walk_direction = displacement;
    }

    pub fn walk_direction(&self) -> Vec3 {
        self.walk_direction
    }

    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    pub fn vertical_offset(&self) -> f32 {
        self.vertical_offset
    }

    pub fn on_ground(&self) -> bool {
        self.on_ground
    }

    /// Drop the ghost's cached overlaps and bring the controller to rest.
    ///
    /// Rest means no walk, no vertical motion and not grounded: the grounded
    /// flag is recomputed by the next step, so a rig reset in mid-air falls.
    pub fn reset(&mut self, world: &mut PhysicsWorld) {
        if let Some(collider) = world.refresh_collider(self.collider) {
            self.collider = collider;
        }
        self.walk_direction = Vec3::ZERO;
        self.vertical_velocity = 0.0;
        self.vertical_offset = 0.0;
        self.on_ground = false;
        debug!("Character rig reset");
    }

    /// Teleport without collision response
    pub fn warp(&mut self, world: &mut PhysicsWorld, pose: Pose) {
        world.set_body_pose(self.body, pose);
        debug!("Character rig warped to {}", pose);
    }

    /// Rotate the ghost about the world up axis
    pub fn turn(&mut self, world: &mut PhysicsWorld, angle: f32) {
        if let Some(mut pose) = world.body_pose(self.body) {
            pose.rotation = (Quat::from_axis_angle(Vec3::Y, angle) * pose.rotation).normalize();
            world.set_body_pose(self.body, pose);
        }
    }

    pub fn pose(&self, world: &PhysicsWorld) -> Option<Pose> {
        world.body_pose(self.body)
    }

    pub fn forward(&self, world: &PhysicsWorld) -> Vec3 {
        self.pose(world).map_or(Vec3::Z, |pose| pose.forward())
    }

    pub fn up(&self, world: &PhysicsWorld) -> Vec3 {
        self.pose(world).map_or(Vec3::Y, |pose| pose.up())
    }
}

impl WorldAction for CharacterRig {
    fn update_action(&mut self, world: &mut PhysicsWorld, dt: f32) {
        let Some(pose) = world.body_pose(self.body) else {
            return;
        };

        self.vertical_velocity = (self.vertical_velocity - self.gravity * dt).max(-self.fall_speed);
        let desired = self.walk_direction + Vec3::Y * (self.vertical_velocity * dt);

        let Some(movement) = world.move_character(&self.controller, dt, self.body, self.collider, desired) else {
            return;
        };
        let translation = math::from_vector(&movement.translation);

        self.vertical_offset = translation.y;
        self.on_ground = movement.grounded;
        if movement.grounded && self.vertical_velocity < 0.0 {
            self.vertical_velocity = 0.0;
        }

        world.set_next_kinematic_pose(self.body, Pose::new(pose.position + translation, pose.rotation));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldSettings;

    fn setup() -> (PhysicsWorld, CharacterRig) {
        let mut world = PhysicsWorld::build(&WorldSettings::default());
        let settings = CharacterSettings {
            start_position: [0.0, 10.0, 0.0],
            ..CharacterSettings::default()
        };
        let rig = CharacterRig::spawn(&mut world, &settings).unwrap();
        (world, rig)
    }

    #[test]
    fn test_spawn_registers_ghost() {
        let (world, rig) = setup();
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.shape_count(), 1);
        assert!(!world.is_dynamic(rig.body()));
        assert!(world.body(rig.body()).unwrap().is_kinematic());
    }

    #[test]
    fn test_walk_direction_waits_for_step() {
        let (mut world, mut rig) = setup();
        rig.set_walk_direction(Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(rig.pose(&world).unwrap().position, Vec3::new(0.0, 10.0, 0.0));

        world.refresh_queries();
        world.step_simulation(1.0 / 60.0, &mut [&mut rig]);
        assert!(rig.pose(&world).unwrap().position.x > 0.0);
    }

    #[test]
    fn test_turn_rotates_forward() {
        let (mut world, mut rig) = setup();
        assert!(rig.forward(&world).abs_diff_eq(Vec3::Z, 1e-6));
        rig.turn(&mut world, std::f32::consts::FRAC_PI_2);
        assert!(rig.forward(&world).abs_diff_eq(Vec3::X, 1e-5));
        assert!(rig.up(&world).abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn test_reset_clears_motion_state() {
        let (mut world, mut rig) = setup();
        world.refresh_queries();
        rig.set_walk_direction(Vec3::X);
        for _ in 0..10 {
            world.step_simulation(1.0 / 60.0, &mut [&mut rig]);
        }
        assert!(rig.vertical_velocity() < 0.0);

        let old_collider = rig.collider();
        rig.reset(&mut world);
        assert_eq!(rig.walk_direction(), Vec3::ZERO);
        assert_eq!(rig.vertical_velocity(), 0.0);
        assert!(!rig.on_ground());
        assert_ne!(rig.collider(), old_collider);
        assert_eq!(world.record(rig.body()).unwrap().collider, Some(rig.collider()));
    }

    #[test]
    fn test_reset_keeps_ghost_on_body() {
        let (mut world, mut rig) = setup();
        world.refresh_queries();
        for _ in 0..5 {
            world.step_simulation(1.0 / 60.0, &mut [&mut rig]);
        }

        rig.reset(&mut world);
        rig.warp(&mut world, Pose::from_translation(Vec3::new(5.0, 3.0, -2.0)));
        world.step_simulation(1.0 / 60.0, &mut [&mut rig]);

        let body = rig.pose(&world).unwrap().position;
        let ghost = world.collider_pose(rig.collider()).unwrap().position;
        assert!(ghost.abs_diff_eq(body, 1e-4), "ghost {} body {}", ghost, body);
    }
}
