//! Build, step, query and tear down the simulated world

use crate::config::WorldSettings;
use crate::utils::math::{self, Pose};
use super::shapes::{ShapeId, ShapeRegistry};
use super::{WorldError, WorldResult};
use glam::Vec3;
use rapier3d::control::{EffectiveCharacterMovement, KinematicCharacterController};
use rapier3d::parry::query::ShapeCastOptions;
use rapier3d::parry::shape::Ball;
use rapier3d::pipeline::{DebugRenderBackend, DebugRenderMode, DebugRenderPipeline, DebugRenderStyle};
use rapier3d::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Collision groups used by the sandbox
pub mod groups {
    use rapier3d::prelude::Group;

    pub const DEFAULT: Group = Group::GROUP_1;
    pub const STATIC: Group = Group::GROUP_2;
    pub const CHARACTER: Group = Group::GROUP_6;
}

/// Logic that runs once per internal simulation sub-step, before the solver
pub trait WorldAction {
    fn update_action(&mut self, world: &mut PhysicsWorld, dt: f32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Static,
    Dynamic,
    Kinematic,
}

/// Whether a body may fall asleep when it stops moving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationPolicy {
    Normal,
    AlwaysActive,
}

#[derive(Debug, Clone)]
pub struct BodyRecord {
    pub kind: BodyKind,
    pub mass: f32,
    pub local_inertia: Vec3,
    pub activation: ActivationPolicy,
    pub collider: Option<ColliderHandle>,
    pub shape: Option<ShapeId>,
}

#[derive(Debug, Clone, Copy)]
struct ConstraintRecord {
    handle: ImpulseJointHandle,
    body1: RigidBodyHandle,
    body2: RigidBodyHandle,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub collider: ColliderHandle,
    pub body: Option<RigidBodyHandle>,
    pub point: Vec3,
    pub fraction: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStage {
    Constraints,
    CollisionObjects,
    Shapes,
    Pipeline,
    World,
}

/// What a teardown destroyed, in the order it destroyed it
#[derive(Debug, Clone, Default)]
pub struct TeardownReport {
    stages: Vec<(TeardownStage, usize)>,
    dangling: usize,
}

impl TeardownReport {
    pub fn stages(&self) -> &[(TeardownStage, usize)] {
        &self.stages
    }

    pub fn count(&self, stage: TeardownStage) -> usize {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    /// Destroy calls that found a dependency already gone, or a dependent still alive
    pub fn dangling_references(&self) -> usize {
        self.dangling
    }

    fn push(&mut self, stage: TeardownStage, count: usize) {
        self.stages.push((stage, count));
    }
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    half_extent: f32,
    fixed_time_step: f32,
    max_sub_steps: u32,
    time_accumulator: f32,

    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,

    shapes: ShapeRegistry,
    records: HashMap<RigidBodyHandle, BodyRecord>,
    body_order: Vec<RigidBodyHandle>,
    constraints: Vec<ConstraintRecord>,
    live: bool,
}

impl PhysicsWorld {
    /// Construct an empty world
    pub fn build(settings: &WorldSettings) -> Self {
        let gravity = math::to_vector(math::vec3_from(settings.gravity));
        info!(
            "Building physics world (gravity {:?}, half extent {}, step {:.4}s x{})",
            settings.gravity, settings.broadphase_half_extent,
            settings.fixed_time_step, settings.max_sub_steps
        );
        Self {
            gravity,
            half_extent: settings.broadphase_half_extent,
            fixed_time_step: settings.fixed_time_step.max(f32::EPSILON),
            max_sub_steps: settings.max_sub_steps,
            time_accumulator: 0.0,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            shapes: ShapeRegistry::new(),
            records: HashMap::new(),
            body_order: Vec::new(),
            constraints: Vec::new(),
            live: true,
        }
    }

    pub fn gravity(&self) -> Vec3 {
        math::from_vector(&self.gravity)
    }

    pub fn half_extent(&self) -> f32 {
        self.half_extent
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    // -------------------------------------------------------------------------
    // Shapes
    // -------------------------------------------------------------------------

    pub fn register_shape(&mut self, shape: SharedShape) -> ShapeId {
        self.shapes.register(shape)
    }

    pub fn shapes(&self) -> &ShapeRegistry {
        &self.shapes
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    // -------------------------------------------------------------------------
    // Bodies
    // -------------------------------------------------------------------------

    /// Create a body from a registered shape.
    ///
    /// A mass of zero makes the body static; any positive mass makes it dynamic
    /// with its inertia derived from the shape.
    pub fn create_rigid_body(&mut self, mass: f32, pose: Pose, shape: ShapeId) -> WorldResult<RigidBodyHandle> {
        if !mass.is_finite() || mass < 0.0 {
            return Err(WorldError::InvalidMass { mass });
        }
        let shared = self.shapes.get(shape).cloned().ok_or(WorldError::UnknownShape { id: shape })?;
        self.check_bounds(pose.position)?;

        let is_dynamic = mass != 0.0;
        let local_inertia = if is_dynamic {
            let unit = shared.mass_properties(1.0);
            if unit.mass() > 0.0 {
                math::from_vector(&unit.principal_inertia()) * (mass / unit.mass())
            } else {
                Vec3::ZERO
            }
        } else {
            Vec3::ZERO
        };

        let builder = if is_dynamic { RigidBodyBuilder::dynamic() } else { RigidBodyBuilder::fixed() };
        let handle = self.bodies.insert(builder.position(math::to_isometry(&pose)).build());

        let membership = if is_dynamic { groups::DEFAULT } else { groups::STATIC };
        let collider = ColliderBuilder::new(shared)
            .collision_groups(InteractionGroups::new(membership, Group::ALL));
        let collider = if is_dynamic { collider.mass(mass) } else { collider.density(0.0) };
        let collider = self.colliders.insert_with_parent(collider.build(), handle, &mut self.bodies);

        self.register_body(handle, BodyRecord {
            kind: if is_dynamic { BodyKind::Dynamic } else { BodyKind::Static },
            mass,
            local_inertia,
            activation: ActivationPolicy::Normal,
            collider: Some(collider),
            shape: Some(shape),
        });
        Ok(handle)
    }

    /// Create a kinematic collision volume that reports overlaps but is never
    /// moved by the solver. It only interacts with static and default bodies.
    pub fn create_ghost(&mut self, pose: Pose, shape: ShapeId) -> WorldResult<(RigidBodyHandle, ColliderHandle)> {
        let shared = self.shapes.get(shape).cloned().ok_or(WorldError::UnknownShape { id: shape })?;
        self.check_bounds(pose.position)?;

        let body = RigidBodyBuilder::kinematic_position_based()
            .position(math::to_isometry(&pose))
            .build();
        let handle = self.bodies.insert(body);
        let collider = ColliderBuilder::new(shared)
            .sensor(true)
            .active_collision_types(ActiveCollisionTypes::all())
            .collision_groups(InteractionGroups::new(groups::CHARACTER, groups::STATIC | groups::DEFAULT))
            .build();
        let collider = self.colliders.insert_with_parent(collider, handle, &mut self.bodies);

        self.register_body(handle, BodyRecord {
            kind: BodyKind::Kinematic,
            mass: 0.0,
            local_inertia: Vec3::ZERO,
            activation: ActivationPolicy::Normal,
            collider: Some(collider),
            shape: Some(shape),
        });
        Ok((handle, collider))
    }

    /// Create a collider-less static body at the origin, used as the world side
    /// of world-to-body constraints.
    pub fn create_anchor_body(&mut self) -> RigidBodyHandle {
        let handle = self.bodies.insert(RigidBodyBuilder::fixed().build());
        self.register_body(handle, BodyRecord {
            kind: BodyKind::Static,
            mass: 0.0,
            local_inertia: Vec3::ZERO,
            activation: ActivationPolicy::Normal,
            collider: None,
            shape: None,
        });
        handle
    }

    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        let attached = self.constraints
            .iter()
            .filter(|c| c.body1 == handle || c.body2 == handle)
            .count();
        if attached > 0 {
            warn!("Removing body {:?} that still has {} constraint(s) attached", handle, attached);
            self.constraints.retain(|c| c.body1 != handle && c.body2 != handle);
        }
        self.body_order.retain(|h| *h != handle);
        self.records.remove(&handle);
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    fn register_body(&mut self, handle: RigidBodyHandle, record: BodyRecord) {
        self.body_order.push(handle);
        self.records.insert(handle, record);
    }

    fn check_bounds(&self, position: Vec3) -> WorldResult<()> {
        if position.abs().max_element() > self.half_extent || !position.is_finite() {
            return Err(WorldError::OutOfBounds { position, half_extent: self.half_extent });
        }
        Ok(())
    }

    /// World pose of a collider, as last synchronised with its body
    pub fn collider_pose(&self, handle: ColliderHandle) -> Option<Pose> {
        self.colliders.get(handle).map(|co| math::from_isometry(co.position()))
    }

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn record(&self, handle: RigidBodyHandle) -> Option<&BodyRecord> {
        self.records.get(&handle)
    }

    pub fn body_count(&self) -> usize {
        self.body_order.len()
    }

    /// Body handles in registration order
    pub fn body_handles(&self) -> &[RigidBodyHandle] {
        &self.body_order
    }

    pub fn body_pose(&self, handle: RigidBodyHandle) -> Option<Pose> {
        self.bodies.get(handle).map(|rb| math::from_isometry(rb.position()))
    }

    /// Teleport a body, bypassing collision response
    pub fn set_body_pose(&mut self, handle: RigidBodyHandle, pose: Pose) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.set_position(math::to_isometry(&pose), true);
        }
    }

    /// Pose a kinematic body will reach at the end of the next step
    pub fn set_next_kinematic_pose(&mut self, handle: RigidBodyHandle, pose: Pose) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.set_next_kinematic_position(math::to_isometry(&pose));
        }
    }

    pub fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.set_linvel(math::to_vector(velocity), true);
        }
    }

    pub fn enable_ccd(&mut self, handle: RigidBodyHandle, enabled: bool) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.enable_ccd(enabled);
        }
    }

    pub fn linear_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|rb| math::from_vector(rb.linvel()))
    }

    /// Dynamic and not kinematic: the only kind of body that may be picked
    pub fn is_dynamic(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some_and(|rb| rb.is_dynamic())
    }

    // -------------------------------------------------------------------------
    // Activation
    // -------------------------------------------------------------------------

    pub fn set_activation_policy(&mut self, handle: RigidBodyHandle, policy: ActivationPolicy) -> bool {
        let (Some(record), Some(rb)) = (self.records.get_mut(&handle), self.bodies.get_mut(handle)) else {
            return false;
        };
        match policy {
            ActivationPolicy::AlwaysActive => {
                let activation = rb.activation_mut();
                activation.normalized_linear_threshold = -1.0;
                activation.angular_threshold = -1.0;
            }
            ActivationPolicy::Normal => {
                // Fresh activation state: default thresholds and a zeroed idle timer
                *rb.activation_mut() = RigidBodyActivation::active();
            }
        }
        rb.wake_up(true);
        record.activation = policy;
        true
    }

    pub fn activation_policy(&self, handle: RigidBodyHandle) -> Option<ActivationPolicy> {
        self.records.get(&handle).map(|r| r.activation)
    }

    /// Seconds the body has been eligible for sleep
    pub fn idle_time(&self, handle: RigidBodyHandle) -> Option<f32> {
        self.bodies.get(handle).map(|rb| rb.activation().time_since_can_sleep)
    }

    pub fn is_sleeping(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some_and(|rb| rb.is_sleeping())
    }

    pub fn wake_body(&mut self, handle: RigidBodyHandle) {
        if let Some(rb) = self.bodies.get_mut(handle) {
            rb.wake_up(true);
        }
    }

    // -------------------------------------------------------------------------
    // Constraints
    // -------------------------------------------------------------------------

    pub fn add_constraint(
        &mut self,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
        joint: impl Into<GenericJoint>,
    ) -> ImpulseJointHandle {
        let handle = self.impulse_joints.insert(body1, body2, joint, true);
        self.constraints.push(ConstraintRecord { handle, body1, body2 });
        handle
    }

    pub fn remove_constraint(&mut self, handle: ImpulseJointHandle) -> bool {
        self.constraints.retain(|c| c.handle != handle);
        self.impulse_joints.remove(handle, true).is_some()
    }

    pub fn constraint(&self, handle: ImpulseJointHandle) -> Option<&GenericJoint> {
        self.impulse_joints.get(handle).map(|joint| &joint.data)
    }

    pub fn constraint_mut(&mut self, handle: ImpulseJointHandle) -> Option<&mut GenericJoint> {
        self.impulse_joints.get_mut(handle).map(|joint| &mut joint.data)
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    // -------------------------------------------------------------------------
    // Broadphase and queries
    // -------------------------------------------------------------------------

    /// Drop every cached overlap pair involving the collider.
    ///
    /// The collider is detached and re-attached to its body, which gives it a
    /// fresh broadphase proxy. Returns the collider's new handle.
    pub fn refresh_collider(&mut self, collider: ColliderHandle) -> Option<ColliderHandle> {
        let parent = self.colliders.get(collider)?.parent()?;
        let mut detached = self.colliders.remove(collider, &mut self.islands, &mut self.bodies, false)?;
        // Re-insertion reads the collider position as its offset from the parent
        let local = detached.position_wrt_parent().copied().unwrap_or_else(Isometry::identity);
        detached.set_position(local);
        let handle = self.colliders.insert_with_parent(detached, parent, &mut self.bodies);
        if let Some(record) = self.records.get_mut(&parent) {
            record.collider = Some(handle);
        }
        self.refresh_queries();
        Some(handle)
    }

    /// Bring scene queries up to date with colliders added since the last step
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    /// Closest hit along the segment `from -> to`
    pub fn cast_ray(&self, from: Vec3, to: Vec3) -> Option<RayHit> {
        let ray = Ray::new(math::to_point(from), math::to_vector(to - from));
        let (collider, fraction) = self.query_pipeline.cast_ray(
            &self.bodies,
            &self.colliders,
            &ray,
            1.0,
            true,
            QueryFilter::default(),
        )?;
        Some(RayHit {
            collider,
            body: self.colliders.get(collider).and_then(|c| c.parent()),
            point: from + (to - from) * fraction,
            fraction,
        })
    }

    /// Sweep a sphere from `from` to `to` against static geometry only.
    /// Returns the fraction of the path travelled before the first contact.
    pub fn sweep_sphere_static(&self, radius: f32, from: Vec3, to: Vec3) -> Option<f32> {
        let ball = Ball::new(radius);
        let start = Isometry::translation(from.x, from.y, from.z);
        let velocity = math::to_vector(to - from);
        self.query_pipeline
            .cast_shape(
                &self.bodies,
                &self.colliders,
                &start,
                &velocity,
                &ball,
                ShapeCastOptions::with_max_time_of_impact(1.0),
                QueryFilter::only_fixed(),
            )
            .map(|(_, hit)| hit.time_of_impact.clamp(0.0, 1.0))
    }

    /// Resolve a desired character displacement against the world
    pub fn move_character(
        &self,
        controller: &KinematicCharacterController,
        dt: f32,
        body: RigidBodyHandle,
        collider: ColliderHandle,
        desired: Vec3,
    ) -> Option<EffectiveCharacterMovement> {
        let rb = self.bodies.get(body)?;
        let co = self.colliders.get(collider)?;
        let filter = QueryFilter::default()
            .exclude_rigid_body(body)
            .groups(InteractionGroups::new(groups::CHARACTER, groups::STATIC | groups::DEFAULT));
        Some(controller.move_shape(
            dt,
            &self.bodies,
            &self.colliders,
            &self.query_pipeline,
            co.shape(),
            rb.position(),
            math::to_vector(desired),
            filter,
            |_| {},
        ))
    }

    // -------------------------------------------------------------------------
    // Stepping
    // -------------------------------------------------------------------------

    /// Advance the simulation by `elapsed` seconds of frame time.
    ///
    /// Time is consumed in fixed sub-steps, at most `max_sub_steps` per call;
    /// leftover time beyond that is dropped. Actions run before every sub-step.
    /// Returns the number of sub-steps taken.
    pub fn step_simulation(&mut self, elapsed: f32, actions: &mut [&mut dyn WorldAction]) -> u32 {
        let (steps, dt) = if self.max_sub_steps == 0 {
            if elapsed <= 0.0 {
                return 0;
            }
            (1, elapsed)
        } else {
            self.time_accumulator += elapsed.max(0.0);
            let available = ((self.time_accumulator + 1e-6) / self.fixed_time_step).floor() as u32;
            self.time_accumulator = (self.time_accumulator - available as f32 * self.fixed_time_step).max(0.0);
            (available.min(self.max_sub_steps), self.fixed_time_step)
        };

        for _ in 0..steps {
            for action in actions.iter_mut() {
                action.update_action(self, dt);
            }
            self.single_step(dt);
        }
        steps
    }

    fn single_step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    // -------------------------------------------------------------------------
    // Debug drawing and snapshots
    // -------------------------------------------------------------------------

    pub fn debug_draw(&self, mode: DebugRenderMode, backend: &mut impl DebugRenderBackend) {
        let mut pipeline = DebugRenderPipeline::new(DebugRenderStyle::default(), mode);
        pipeline.render(
            backend,
            &self.bodies,
            &self.colliders,
            &self.impulse_joints,
            &self.multibody_joints,
            &self.narrow_phase,
        );
    }

    pub(crate) fn object_graph(&self) -> (&Vector<Real>, &RigidBodySet, &ColliderSet, &ImpulseJointSet) {
        (&self.gravity, &self.bodies, &self.colliders, &self.impulse_joints)
    }

    // -------------------------------------------------------------------------
    // Teardown
    // -------------------------------------------------------------------------

    /// Destroy the world and everything registered in it.
    ///
    /// Order: constraints, collision objects, shapes, broadphase and solver
    /// state, then the world containers themselves. Each stage runs newest
    /// first.
    ///
    /// The world is left empty and dead; a second call reports nothing.
    pub fn teardown(&mut self) -> TeardownReport {
        if !self.live {
            return TeardownReport::default();
        }
        self.release_all()
    }

    fn release_all(&mut self) -> TeardownReport {
        let mut report = TeardownReport::default();

        let mut destroyed = 0;
        while let Some(constraint) = self.constraints.pop() {
            if !self.bodies.contains(constraint.body1) || !self.bodies.contains(constraint.body2) {
                report.dangling += 1;
            }
            if self.impulse_joints.remove(constraint.handle, false).is_some() {
                destroyed += 1;
            }
        }
        report.push(TeardownStage::Constraints, destroyed);

        let mut destroyed = 0;
        while let Some(handle) = self.body_order.pop() {
            let record = self.records.remove(&handle);
            if self.impulse_joints.len() > 0 {
                report.dangling += 1;
            }
            if let Some(shape) = record.and_then(|r| r.shape) {
                if self.shapes.get(shape).is_none() {
                    report.dangling += 1;
                }
            }
            let removed = self.bodies.remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
            if removed.is_some() {
                destroyed += 1;
            }
        }
        report.push(TeardownStage::CollisionObjects, destroyed);

        let (destroyed, referenced) = self.shapes.clear();
        report.dangling += referenced;
        report.push(TeardownStage::Shapes, destroyed);

        report.dangling += self.colliders.len();
        self.query_pipeline = QueryPipeline::new();
        self.ccd_solver = CCDSolver::new();
        self.narrow_phase = NarrowPhase::new();
        self.broad_phase = DefaultBroadPhase::new();
        self.islands = IslandManager::new();
        self.pipeline = PhysicsPipeline::new();
        report.push(TeardownStage::Pipeline, 1);

        self.bodies = RigidBodySet::new();
        self.colliders = ColliderSet::new();
        self.impulse_joints = ImpulseJointSet::new();
        self.multibody_joints = MultibodyJointSet::new();
        self.time_accumulator = 0.0;
        self.live = false;
        report.push(TeardownStage::World, 1);

        info!(
            "Physics world torn down: {} constraint(s), {} object(s), {} shape(s)",
            report.count(TeardownStage::Constraints),
            report.count(TeardownStage::CollisionObjects),
            report.count(TeardownStage::Shapes),
        );
        if report.dangling > 0 {
            warn!("Teardown found {} dangling reference(s)", report.dangling);
        }
        report
    }
}

impl Drop for PhysicsWorld {
    fn drop(&mut self) {
        if self.live {
            debug!("Physics world dropped without explicit teardown");
            self.release_all();
        }
    }
}
