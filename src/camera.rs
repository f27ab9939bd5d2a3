use glam::{Mat4, Vec3};

/// A perspective camera looking out from inside the panorama sphere.
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub fov: f32, // radians, vertical
    pub near: f32,
    pub far: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(-1.0, 0.0, 0.0),
            forward: Vec3::X,
            up: Vec3::Y,
            fov: 70f32.to_radians(),
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, position: impl Into<Vec3>) -> Self {
        self.position = position.into();
        self
    }

    pub fn looking_at(mut self, target: impl Into<Vec3>) -> Self {
        self.forward = (target.into() - self.position).normalize_or(Vec3::X);
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees.to_radians();
        self
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov.to_degrees()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov, aspect, self.near, self.far)
    }

    /// Combined projection and view, world space to clip space.
    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Compute the right vector from forward and up.
    pub fn right(&self) -> Vec3 {
        self.forward.cross(self.up).normalize_or_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_looks_down_positive_x() {
        let camera = Camera::default();
        let clip = camera.view_proj(1.0) * Vec3::new(45.0, 0.0, 0.0).extend(1.0);
        assert!(clip.w > 0.0);
        assert!((clip.x / clip.w).abs() < 1e-4);
        assert!((camera.fov_degrees() - 70.0).abs() < 1e-4);
    }

    #[test]
    fn right_is_positive_z_when_facing_x() {
        let camera = Camera::default();
        assert!(camera.right().abs_diff_eq(Vec3::Z, 1e-6));
    }

    #[test]
    fn looking_at_normalizes() {
        let camera = Camera::new().at(Vec3::ZERO).looking_at(Vec3::new(0.0, 0.0, -10.0));
        assert!(camera.forward.abs_diff_eq(Vec3::NEG_Z, 1e-6));
    }
}
