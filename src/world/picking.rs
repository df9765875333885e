//! Mouse picking: grab a dynamic body under the cursor and drag it around
//!
//! A pick binds a point on the body to a collider-less static anchor body.
//! The anchor side of the joint follows the cursor ray at the distance the
//! body was grabbed at.

use crate::config::PickingSettings;
use crate::utils::math::{self, Pose};
use super::physics::{ActivationPolicy, PhysicsWorld};
use glam::Vec3;
use rapier3d::prelude::*;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickKind {
    /// Grab point held rigidly at the cursor, orientation too unless disabled
    /// in the settings
    RigidLock,
    /// Single pivot point, free to swing
    FreePivot,
}

#[derive(Debug, Clone)]
pub struct PickConstraint {
    kind: PickKind,
    joint: ImpulseJointHandle,
    anchor: RigidBodyHandle,
    body: RigidBodyHandle,
    local_point: Vec3,
    distance: f32,
    target: Vec3,
}

impl PickConstraint {
    pub fn kind(&self) -> PickKind {
        self.kind
    }

    pub fn joint(&self) -> ImpulseJointHandle {
        self.joint
    }

    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    /// Grab point in the picked body's frame
    pub fn local_point(&self) -> Vec3 {
        self.local_point
    }

    /// Eye-to-grab-point distance recorded when the pick started
    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    fn update_anchor(&mut self, world: &mut PhysicsWorld, target: Vec3) {
        self.target = target;
        if let Some(joint) = world.constraint_mut(self.joint) {
            joint.set_local_anchor1(math::to_point(target));
        }
        world.wake_body(self.body);
    }
}

pub struct Picker {
    settings: PickingSettings,
    active: Option<PickConstraint>,
}

impl Picker {
    pub fn new(settings: &PickingSettings) -> Self {
        Self {
            settings: settings.clone(),
            active: None,
        }
    }

    pub fn is_picking(&self) -> bool {
        self.active.is_some()
    }

    pub fn active(&self) -> Option<&PickConstraint> {
        self.active.as_ref()
    }

    /// Cast from `eye` toward `ray_to` and grab the first body hit if it is dynamic.
    /// Returns whether a pick was created.
    pub fn acquire(&mut self, world: &mut PhysicsWorld, eye: Vec3, ray_to: Vec3, kind: PickKind) -> bool {
        if self.active.is_some() {
            return false;
        }
        let Some(hit) = world.cast_ray(eye, ray_to) else {
            return false;
        };
        let Some(body) = hit.body.filter(|body| world.is_dynamic(*body)) else {
            debug!("Pick ray hit a non-dynamic object, ignoring");
            return false;
        };
        let Some(pose) = world.body_pose(body) else {
            return false;
        };

        let local_point = pose.inverse_transform_point(hit.point);
        world.set_activation_policy(body, ActivationPolicy::AlwaysActive);

        let joint: GenericJoint = match kind {
            PickKind::RigidLock if self.settings.lock_orientation => FixedJointBuilder::new()
                .local_frame1(math::to_isometry(&Pose::new(hit.point, pose.rotation)))
                .local_frame2(math::to_isometry(&Pose::from_translation(local_point)))
                .build()
                .into(),
            PickKind::RigidLock => SphericalJointBuilder::new()
                .local_anchor1(math::to_point(hit.point))
                .local_anchor2(math::to_point(local_point))
                .build()
                .into(),
            PickKind::FreePivot => self.pivot_joint(hit.point, local_point),
        };
        let anchor = world.create_anchor_body();
        let handle = world.add_constraint(anchor, body, joint);

        let distance = (hit.point - eye).length();
        debug!("Picked {:?} ({:?}) at distance {:.2}", body, kind, distance);
        self.active = Some(PickConstraint {
            kind,
            joint: handle,
            anchor,
            body,
            local_point,
            distance,
            target: hit.point,
        });
        true
    }

    fn pivot_joint(&self, target: Vec3, local_point: Vec3) -> GenericJoint {
        let PickingSettings { pivot_stiffness, pivot_damping, pivot_max_force, .. } = self.settings;
        let mut builder = GenericJointBuilder::new(JointAxesMask::empty())
            .local_anchor1(math::to_point(target))
            .local_anchor2(math::to_point(local_point));
        for axis in [JointAxis::LinX, JointAxis::LinY, JointAxis::LinZ] {
            builder = builder
                .motor_position(axis, 0.0, pivot_stiffness, pivot_damping)
                .motor_max_force(axis, pivot_max_force);
        }
        builder.build()
    }

    /// Move the anchor along the new cursor ray, keeping the pick distance
    pub fn track(&mut self, world: &mut PhysicsWorld, eye: Vec3, ray_to: Vec3) {
        if let Some(active) = self.active.as_mut() {
            let direction = (ray_to - eye).normalize_or_zero();
            active.update_anchor(world, eye + direction * active.distance);
        }
    }

    /// Drop the pick and let the body sleep again
    pub fn release(&mut self, world: &mut PhysicsWorld) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        world.remove_constraint(active.joint);
        world.remove_body(active.anchor);
        world.set_activation_policy(active.body, ActivationPolicy::Normal);
        debug!("Released {:?}", active.body);
        true
    }
}
