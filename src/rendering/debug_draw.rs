use crate::utils::math;
use glam::Vec3;
use rapier3d::pipeline::{DebugRenderBackend, DebugRenderMode, DebugRenderObject};
use rapier3d::prelude::{Point, Real};

bitflags::bitflags! {
    /// What the debug overlay shows
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DebugDrawModes: u32 {
        const WIREFRAME = 0x01;
        const AABB = 0x02;
        const CONTACT_POINTS = 0x04;
        const CONSTRAINTS = 0x08;
        const BODY_AXES = 0x10;
    }
}

impl Default for DebugDrawModes {
    fn default() -> Self {
        Self::WIREFRAME | Self::CONSTRAINTS
    }
}

impl DebugDrawModes {
    pub fn to_render_mode(self) -> DebugRenderMode {
        let mut mode = DebugRenderMode::empty();
        if self.contains(Self::WIREFRAME) {
            mode |= DebugRenderMode::COLLIDER_SHAPES;
        }
        if self.contains(Self::AABB) {
            mode |= DebugRenderMode::COLLIDER_AABBS;
        }
        if self.contains(Self::CONTACT_POINTS) {
            mode |= DebugRenderMode::CONTACTS;
        }
        if self.contains(Self::CONSTRAINTS) {
            mode |= DebugRenderMode::IMPULSE_JOINTS;
        }
        if self.contains(Self::BODY_AXES) {
            mode |= DebugRenderMode::RIGID_BODY_AXES;
        }
        mode
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebugLine {
    pub from: Vec3,
    pub to: Vec3,
    /// HSLA, as produced by the engine's debug pipeline
    pub color: [f32; 4],
}

/// Collects debug geometry for a renderer to draw later
#[derive(Debug, Default)]
pub struct LineCollector {
    pub lines: Vec<DebugLine>,
}

impl LineCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl DebugRenderBackend for LineCollector {
    fn draw_line(&mut self, _object: DebugRenderObject<'_>, a: Point<Real>, b: Point<Real>, color: [f32; 4]) {
        self.lines.push(DebugLine {
            from: math::from_point(&a),
            to: math::from_point(&b),
            color,
        });
    }
}
