//! Third-person camera that keeps a clear line of sight to the character

use crate::config::CameraSettings;
use crate::rendering::camera::CameraState;
use super::character::CharacterRig;
use super::physics::PhysicsWorld;
use glam::Vec3;

#[derive(Debug, Clone, Copy)]
pub struct FollowCamera {
    pub back_distance: f32,
    pub height: f32,
    pub probe_radius: f32,
}

impl FollowCamera {
    pub fn new(settings: &CameraSettings) -> Self {
        Self {
            back_distance: settings.back_distance,
            height: settings.height,
            probe_radius: settings.probe_radius,
        }
    }

    /// Where the camera would sit with nothing in the way
    pub fn desired_eye(&self, position: Vec3, forward: Vec3, up: Vec3) -> Vec3 {
        position - forward * self.back_distance + up * self.height
    }

    /// Pull `desired` toward `rig` when static geometry blocks the view
    pub fn resolve(&self, world: &PhysicsWorld, rig: Vec3, desired: Vec3) -> Vec3 {
        resolve_with_fraction(rig, desired, world.sweep_sphere_static(self.probe_radius, rig, desired))
    }

    /// Aim the camera at the rig from behind and above
    pub fn update(&self, world: &PhysicsWorld, character: &CharacterRig, camera: &mut CameraState) {
        let Some(pose) = character.pose(world) else {
            return;
        };
        let desired = self.desired_eye(pose.position, pose.forward(), pose.up());
        let eye = self.resolve(world, pose.position, desired);
        camera.set_eye_target(eye, pose.position);
    }
}

/// Camera position for a sweep result: the desired point when unobstructed,
/// otherwise the point `fraction` of the way from the rig toward it.
pub fn resolve_with_fraction(rig: Vec3, desired: Vec3, fraction: Option<f32>) -> Vec3 {
    match fraction {
        Some(t) => rig.lerp(desired, t.clamp(0.0, 1.0)),
        None => desired,
    }
}
