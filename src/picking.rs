//! Pointer rays for hotspot picking.
//!
//! A click is turned into a [`Ray`] from the camera through the pointer
//! position, which is then tested against the hotspot markers of the current
//! scene.

use glam::{Mat4, Vec2, Vec3, Vec4};

/// A ray in 3D space, used for picking hotspot markers.
///
/// # Example
///
/// ```
/// use panotour::{Ray, Vec3};
///
/// let ray = Ray::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0));
/// assert_eq!(ray.point_at(10.0), Vec3::new(10.0, 0.0, 0.0));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    /// The starting point of the ray.
    pub origin: Vec3,
    /// The normalized direction of the ray.
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray. The direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Create a ray through a point given in normalized device coordinates
    /// (`x` and `y` in -1..1, `y` pointing up).
    pub fn from_ndc(ndc: Vec2, view_proj: Mat4) -> Self {
        let inv_view_proj = view_proj.inverse();

        let near_world = inv_view_proj * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let far_world = inv_view_proj * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);

        // Perspective divide
        let near_point = near_world.truncate() / near_world.w;
        let far_point = far_world.truncate() / far_world.w;

        Self::new(near_point, far_point - near_point)
    }

    /// Create a ray from a pointer position in pixels, relative to the top-left
    /// corner of a `size`-sized surface.
    pub fn from_screen(position: Vec2, size: Vec2, view_proj: Mat4) -> Self {
        Self::from_ndc(screen_to_ndc(position, size), view_proj)
    }

    /// Get a point along the ray at the given distance from the origin.
    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Test intersection with a sphere.
    ///
    /// Returns the distance to the nearest intersection in front of the origin.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let a = self.direction.dot(self.direction);
        if a == 0.0 {
            return None;
        }
        let b = 2.0 * oc.dot(self.direction);
        let c = oc.dot(oc) - radius * radius;
        let discriminant = b * b - 4.0 * a * c;

        if discriminant < 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        let t1 = (-b - sqrt_disc) / (2.0 * a);
        let t2 = (-b + sqrt_disc) / (2.0 * a);

        if t1 > 0.0 {
            Some(t1)
        } else if t2 > 0.0 {
            Some(t2)
        } else {
            None
        }
    }
}

/// Convert a pixel position (origin top-left) to normalized device coordinates.
pub fn screen_to_ndc(position: Vec2, size: Vec2) -> Vec2 {
    Vec2::new(
        (position.x / size.x) * 2.0 - 1.0,
        -(position.y / size.y) * 2.0 + 1.0,
    )
}
