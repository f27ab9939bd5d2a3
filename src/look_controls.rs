use std::f32::consts::FRAC_PI_2;

use glam::Vec3;
use winit::event::MouseButton;

use crate::camera::Camera;
use crate::input::Input;

/// Look-around settings.
#[derive(Clone, Copy, Debug)]
pub struct LookConfig {
    /// Baseline vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Multiplier on drag rotation. Negative drags the panorama with the pointer.
    pub rotate_speed: f32,
    /// Radians of rotation per pixel of drag, before `rotate_speed`.
    pub sensitivity: f32,
}

impl Default for LookConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 70.0,
            rotate_speed: -0.4,
            sensitivity: 0.005,
        }
    }
}

impl LookConfig {
    pub fn fov_degrees(mut self, fov: f32) -> Self {
        self.fov_degrees = fov;
        self
    }

    pub fn rotate_speed(mut self, speed: f32) -> Self {
        self.rotate_speed = speed;
        self
    }

    pub fn sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }
}

/// Drag-to-look controls orbiting a point just in front of the camera.
///
/// The camera sits one unit from the sphere centre and looks through it, so
/// dragging turns the view without moving noticeably. There is no zoom; the
/// field of view belongs to the transition.
#[derive(Clone, Debug)]
pub struct LookControls {
    pub target: Vec3,
    pub distance: f32,
    /// Horizontal angle in radians.
    pub azimuth: f32,
    /// Vertical angle in radians, clamped short of the poles.
    pub elevation: f32,
    pub rotate_speed: f32,
    pub sensitivity: f32,
}

impl Default for LookControls {
    fn default() -> Self {
        Self::new(&LookConfig::default())
    }
}

impl LookControls {
    pub fn new(config: &LookConfig) -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 1.0,
            azimuth: -FRAC_PI_2,
            elevation: 0.0,
            rotate_speed: config.rotate_speed,
            sensitivity: config.sensitivity,
        }
    }

    /// Rotate while the left button is held.
    pub fn update(&mut self, input: &Input) {
        if input.mouse_down(MouseButton::Left) {
            let delta = input.mouse_delta();
            self.rotate(delta.x, delta.y);
        }
    }

    /// Rotate by a pointer movement of `dx`, `dy` pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let scale = self.sensitivity * self.rotate_speed;
        self.azimuth -= dx * scale;
        self.elevation = (self.elevation + dy * scale).clamp(-FRAC_PI_2 + 0.01, FRAC_PI_2 - 0.01);
    }

    pub fn position(&self) -> Vec3 {
        let offset = Vec3::new(
            self.distance * self.elevation.cos() * self.azimuth.sin(),
            self.distance * self.elevation.sin(),
            self.distance * self.elevation.cos() * self.azimuth.cos(),
        );
        self.target + offset
    }

    /// Place and orient `camera`, leaving its field of view alone.
    pub fn apply(&self, camera: &mut Camera) {
        camera.position = self.position();
        camera.forward = (self.target - camera.position).normalize_or(Vec3::X);
        camera.up = Vec3::Y;
    }
}
