//! Hand-off between the frame driver and whatever draws the scene

pub mod camera;
pub mod debug_draw;

pub use camera::{CameraState, Viewport};
pub use debug_draw::{DebugDrawModes, DebugLine, LineCollector};

use crate::world::PhysicsWorld;

pub trait Renderer {
    fn viewport(&self) -> Viewport;
    /// Vertical field of view in radians
    fn field_of_view(&self) -> f32;
    fn resize(&mut self, viewport: Viewport);
    /// Draw one frame. `debug` is `None` when debug drawing is off.
    fn render(&mut self, camera: &CameraState, world: &PhysicsWorld, debug: Option<DebugDrawModes>);
}

/// Renderer that draws nothing but keeps the camera and debug geometry of the
/// last frame, for tests and for running without a GPU.
#[derive(Debug)]
pub struct HeadlessRenderer {
    viewport: Viewport,
    field_of_view: f32,
    frames: u64,
    camera: Option<CameraState>,
    debug_lines: LineCollector,
}

impl HeadlessRenderer {
    pub fn new(viewport: Viewport, field_of_view: f32) -> Self {
        Self {
            viewport,
            field_of_view,
            frames: 0,
            camera: None,
            debug_lines: LineCollector::new(),
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_camera(&self) -> Option<&CameraState> {
        self.camera.as_ref()
    }

    pub fn debug_lines(&self) -> &[DebugLine] {
        &self.debug_lines.lines
    }
}

impl Renderer for HeadlessRenderer {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn field_of_view(&self) -> f32 {
        self.field_of_view
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    fn render(&mut self, camera: &CameraState, world: &PhysicsWorld, debug: Option<DebugDrawModes>) {
        self.frames += 1;
        self.camera = Some(*camera);
        self.debug_lines.clear();
        if let Some(modes) = debug {
            world.debug_draw(modes.to_render_mode(), &mut self.debug_lines);
        }
    }
}
