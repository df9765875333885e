use glam::{Vec2, Vec3};

/// Distance to the far end of a cursor ray
pub const FAR_PLANE: f32 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width: width.max(1), height: height.max(1) }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1024, 768)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

impl CameraState {
    pub fn new(eye: Vec3, target: Vec3) -> Self {
        Self { eye, target, up: Vec3::Y }
    }

    pub fn set_eye_target(&mut self, eye: Vec3, target: Vec3) {
        self.eye = eye;
        self.target = target;
    }

    /// World-space point on the far plane under the cursor.
    ///
    /// `cursor` is in window pixels with the origin at the top-left corner.
    pub fn ray_to(&self, cursor: Vec2, viewport: Viewport, field_of_view: f32) -> Vec3 {
        let ray_forward = (self.target - self.eye).normalize_or_zero() * FAR_PLANE;

        let mut horizontal = ray_forward.cross(self.up).normalize_or_zero();
        let mut vertical = horizontal.cross(ray_forward).normalize_or_zero();

        let tan_fov = (field_of_view * 0.5).tan();
        horizontal *= 2.0 * FAR_PLANE * tan_fov;
        vertical *= 2.0 * FAR_PLANE * tan_fov;

        let (width, height) = (viewport.width as f32, viewport.height as f32);
        if width > height {
            horizontal *= width / height;
        } else {
            vertical *= height / width;
        }

        let d_hor = horizontal / width;
        let d_vert = vertical / height;

        let top_left = self.eye + ray_forward - 0.5 * horizontal + 0.5 * vertical;
        top_left + cursor.x * d_hor - cursor.y * d_vert
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(Vec3::new(10.0, 0.0, 10.0), Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_ray_follows_view_direction() {
        let camera = CameraState::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let viewport = Viewport::new(800, 600);
        let to = camera.ray_to(Vec2::new(400.0, 300.0), viewport, std::f32::consts::FRAC_PI_4);
        assert!(to.abs_diff_eq(Vec3::new(0.0, 0.0, -FAR_PLANE), 1e-1));
    }

    #[test]
    fn test_corner_rays_point_outward() {
        let camera = CameraState::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let viewport = Viewport::new(800, 600);
        let fov = std::f32::consts::FRAC_PI_4;

        let top_left = camera.ray_to(Vec2::ZERO, viewport, fov);
        assert!(top_left.x < 0.0 && top_left.y > 0.0);

        let bottom_right = camera.ray_to(Vec2::new(800.0, 600.0), viewport, fov);
        assert!(bottom_right.x > 0.0 && bottom_right.y < 0.0);

        // Vertical extent matches the field of view on a landscape viewport
        let expected = FAR_PLANE * (fov * 0.5).tan();
        assert!((top_left.y - expected).abs() < 1.0);
    }
}
