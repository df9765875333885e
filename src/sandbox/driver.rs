use super::clock::FrameClock;
use super::scene::{build_scene, Scene};
use crate::config::SandboxSettings;
use crate::input::{InputState, Key, MouseButtons};
use crate::level::LevelSource;
use crate::rendering::{CameraState, DebugDrawModes, Renderer, Viewport};
use crate::utils::math::{self, Pose};
use crate::world::{
    snapshot, CharacterRig, FollowCamera, PhysicsWorld, PickKind, Picker, ShapeId,
    TeardownReport, WorldResult,
};
use glam::Vec3;
use rapier3d::prelude::{RigidBodyHandle, SharedShape};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Continue,
    Quit,
}

/// Owns the scene and runs one frame at a time
pub struct Sandbox {
    settings: SandboxSettings,
    level: Box<dyn LevelSource>,

    world: PhysicsWorld,
    character: CharacterRig,
    follow_camera: FollowCamera,
    camera: CameraState,
    picker: Picker,
    shoot_shape: Option<ShapeId>,

    input: InputState,
    clock: FrameClock,
    debug_enabled: bool,
    debug_modes: DebugDrawModes,
    reset_requested: bool,
}

impl Sandbox {
    pub fn new(settings: SandboxSettings, level: Box<dyn LevelSource>) -> WorldResult<Self> {
        let Scene { world, character, .. } = build_scene(&settings, level.as_ref())?;
        let camera = CameraState::new(
            math::vec3_from(settings.camera.initial_eye),
            math::vec3_from(settings.camera.initial_target),
        );
        Ok(Self {
            follow_camera: FollowCamera::new(&settings.camera),
            picker: Picker::new(&settings.picking),
            settings,
            level,
            world,
            character,
            camera,
            shoot_shape: None,
            input: InputState::new(),
            clock: FrameClock::new(),
            debug_enabled: false,
            debug_modes: DebugDrawModes::default(),
            reset_requested: false,
        })
    }

    pub fn settings(&self) -> &SandboxSettings {
        &self.settings
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn character(&self) -> &CharacterRig {
        &self.character
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn picker(&self) -> &Picker {
        &self.picker
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn fps(&self) -> f32 {
        self.clock.fps()
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug_enabled
    }

    pub fn set_debug_modes(&mut self, modes: DebugDrawModes) {
        self.debug_modes = modes;
    }

    pub fn request_reset(&mut self) {
        self.reset_requested = true;
    }

    /// Run one frame using wall-clock time
    pub fn frame(&mut self, renderer: &mut dyn Renderer) -> FrameOutcome {
        let dt = self.clock.tick();
        self.advance(dt, renderer)
    }

    /// Run one frame that covers `dt` seconds
    pub fn advance(&mut self, dt: f32, renderer: &mut dyn Renderer) -> FrameOutcome {
        self.world.step_simulation(dt, &mut [&mut self.character]);

        let outcome = self.handle_input(dt, renderer.viewport(), renderer.field_of_view());
        self.input.clear_key_cache();
        if outcome == FrameOutcome::Quit {
            return outcome;
        }

        if self.reset_requested {
            self.reset_requested = false;
            if let Err(e) = self.reset_scene() {
                error!("Scene reset failed: {}", e);
            }
        }

        let debug = self.debug_enabled.then_some(self.debug_modes);
        renderer.render(&self.camera, &self.world, debug);
        FrameOutcome::Continue
    }

    fn handle_input(&mut self, dt: f32, viewport: Viewport, field_of_view: f32) -> FrameOutcome {
        self.drive_character(dt);
        self.follow_camera.update(&self.world, &self.character, &mut self.camera);

        if let Some(key) = self.input.first_pressed() {
            match key {
                Key::Escape | Key::Q => return FrameOutcome::Quit,
                Key::F3 => {
                    self.debug_enabled = !self.debug_enabled;
                    info!("Debug drawing {}", if self.debug_enabled { "on" } else { "off" });
                }
                Key::F if self.input.is_down(Key::Control) => {
                    if let Err(e) = self.write_snapshot() {
                        error!("World snapshot failed: {}", e);
                    }
                }
                Key::Space => {
                    let to = self.camera.ray_to(self.input.mouse_point(), viewport, field_of_view);
                    if let Err(e) = self.shoot_box(self.camera.eye, to) {
                        error!("Could not shoot box: {}", e);
                    }
                }
                Key::Return => self.request_reset(),
                _ => {}
            }
        }

        self.handle_picking(viewport, field_of_view);
        FrameOutcome::Continue
    }

    fn drive_character(&mut self, dt: f32) {
        let turn = self.settings.character.turn_speed * dt;
        if self.input.is_down(Key::Left) {
            self.character.turn(&mut self.world, turn);
        }
        if self.input.is_down(Key::Right) {
            self.character.turn(&mut self.world, -turn);
        }

        let forward = self.character.forward(&self.world);
        let mut walk = Vec3::ZERO;
        if self.input.is_down(Key::Up) {
            walk += forward;
        }
        if self.input.is_down(Key::Down) {
            walk -= forward;
        }
        self.character.set_walk_direction(walk * self.settings.character.walk_speed * dt);
    }

    fn handle_picking(&mut self, viewport: Viewport, field_of_view: f32) {
        let eye = self.camera.eye;
        let ray_to = self.camera.ray_to(self.input.mouse_point(), viewport, field_of_view);

        if !self.input.mouse_pressed().is_empty() {
            if self.input.mouse_pressed().contains(MouseButtons::RIGHT) {
                let kind = if self.input.is_down(Key::Shift) {
                    PickKind::RigidLock
                } else {
                    PickKind::FreePivot
                };
                self.picker.acquire(&mut self.world, eye, ray_to, kind);
            }
        } else if self.input.mouse_released().contains(MouseButtons::RIGHT) {
            self.picker.release(&mut self.world);
        }

        if self.input.mouse_down().contains(MouseButtons::RIGHT) {
            self.picker.track(&mut self.world, eye, ray_to);
        }
    }

    /// Launch a box from `from` toward `to`
    pub fn shoot_box(&mut self, from: Vec3, to: Vec3) -> WorldResult<RigidBodyHandle> {
        let shooting = &self.settings.shooting;
        let shape = match self.shoot_shape.filter(|id| self.world.shapes().get(*id).is_some()) {
            Some(id) => id,
            None => {
                let h = shooting.box_half_extent;
                let id = self.world.register_shape(SharedShape::cuboid(h, h, h));
                self.shoot_shape = Some(id);
                id
            }
        };

        let body = self.world.create_rigid_body(shooting.mass, Pose::from_translation(from), shape)?;
        self.world.set_linear_velocity(body, (to - from).normalize_or_zero() * shooting.speed);
        if shooting.ccd_enabled {
            self.world.enable_ccd(body, true);
        }
        Ok(body)
    }

    pub fn write_snapshot(&self) -> WorldResult<usize> {
        let snapshot = &self.settings.snapshot;
        snapshot::write_snapshot(&self.world, &snapshot.path, snapshot.max_bytes)
    }

    /// Tear the world down and build the scene again from scratch
    pub fn rebuild(&mut self) -> WorldResult<TeardownReport> {
        self.picker.release(&mut self.world);
        self.shoot_shape = None;

        let report = self.world.teardown();
        let Scene { world, character, .. } = build_scene(&self.settings, self.level.as_ref())?;
        self.world = world;
        self.character = character;
        Ok(report)
    }

    /// Rebuild, then bring the character to rest at the reset position
    pub fn reset_scene(&mut self) -> WorldResult<()> {
        self.rebuild()?;
        self.character.reset(&mut self.world);
        let warp = Pose::from_translation(math::vec3_from(self.settings.character.reset_position));
        self.character.warp(&mut self.world, warp);
        info!("Scene reset");
        Ok(())
    }

    /// Release any pick and destroy the world
    pub fn shutdown(&mut self) -> TeardownReport {
        self.picker.release(&mut self.world);
        self.world.teardown()
    }
}
