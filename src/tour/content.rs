//! What the engine puts on screen each frame.
//!
//! Scene content is anything that can attach draw commands to a
//! [`RenderRoot`]. The panorama sphere and the hotspot markers are two
//! independent implementations; the renderer only ever sees the root.

use glam::Vec3;

use super::cache::TextureHandle;
use super::hotspots::HotspotLayer;

/// Radius of the panorama sphere around the camera.
pub const SPHERE_RADIUS: f32 = 50.0;
/// Width and height segments of the panorama sphere.
pub const SPHERE_SEGMENTS: u32 = 32;

/// The inside-out sphere carrying the current panorama.
#[derive(Debug)]
pub struct PanoramaDraw<T> {
    /// `None` until the start texture has arrived, or if it never did.
    pub texture: Option<TextureHandle<T>>,
    pub opacity: f32,
    pub radius: f32,
    pub segments: u32,
}

/// A camera-facing hotspot marker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerDraw {
    pub position: Vec3,
    pub size: f32,
}

/// Per-frame draw list consumed by the renderer.
#[derive(Debug)]
pub struct RenderRoot<T> {
    pub panorama: Option<PanoramaDraw<T>>,
    pub markers: Vec<MarkerDraw>,
}

impl<T> Default for RenderRoot<T> {
    fn default() -> Self {
        Self {
            panorama: None,
            markers: Vec::new(),
        }
    }
}

impl<T> RenderRoot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `content` and return the root for chaining.
    pub fn with(mut self, content: &impl SceneContent<T>) -> Self {
        content.attach_to(&mut self);
        self
    }
}

/// Something that contributes draw commands to a [`RenderRoot`].
pub trait SceneContent<T> {
    fn attach_to(&self, root: &mut RenderRoot<T>);
}

/// The panorama sphere at a given opacity.
pub struct PanoramaSphereContent<'a, T> {
    texture: Option<&'a TextureHandle<T>>,
    opacity: f32,
}

impl<'a, T> PanoramaSphereContent<'a, T> {
    pub fn new(texture: Option<&'a TextureHandle<T>>, opacity: f32) -> Self {
        Self {
            texture,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }
}

impl<T> SceneContent<T> for PanoramaSphereContent<'_, T> {
    fn attach_to(&self, root: &mut RenderRoot<T>) {
        root.panorama = Some(PanoramaDraw {
            texture: self.texture.cloned(),
            opacity: self.opacity,
            radius: SPHERE_RADIUS,
            segments: SPHERE_SEGMENTS,
        });
    }
}

/// The visible markers of a hotspot layer.
pub struct HotspotMarkerContent<'a> {
    layer: &'a HotspotLayer,
}

impl<'a> HotspotMarkerContent<'a> {
    pub fn new(layer: &'a HotspotLayer) -> Self {
        Self { layer }
    }
}

impl<T> SceneContent<T> for HotspotMarkerContent<'_> {
    fn attach_to(&self, root: &mut RenderRoot<T>) {
        let size = self.layer.config().marker_size;
        root.markers.extend(
            self.layer
                .markers()
                .iter()
                .filter(|marker| marker.visible)
                .map(|marker| MarkerDraw {
                    position: marker.position,
                    size,
                }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tour::hotspots::HotspotConfig;
    use crate::tour::testing::{FakeTexture, two_rooms};
    use glam::Mat4;

    #[test]
    fn panorama_content_clamps_opacity() {
        let root: RenderRoot<FakeTexture> =
            RenderRoot::new().with(&PanoramaSphereContent::new(None, -0.02));

        let panorama = root.panorama.unwrap();
        assert_eq!(panorama.opacity, 0.0);
        assert_eq!(panorama.radius, SPHERE_RADIUS);
        assert!(panorama.texture.is_none());
    }

    #[test]
    fn marker_content_skips_hidden_markers() {
        let graph = two_rooms();
        let mut layer = HotspotLayer::new(HotspotConfig::default().marker_size(3.0));
        layer.rebuild(graph.node(&"pano_1".into()).unwrap());

        let root: RenderRoot<FakeTexture> =
            RenderRoot::new().with(&HotspotMarkerContent::new(&layer));
        assert_eq!(
            root.markers,
            vec![MarkerDraw {
                position: Vec3::new(45.0, 3.0, 0.0),
                size: 3.0
            }]
        );

        // Looking away from the marker.
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::NEG_X, Vec3::Y);
        let proj = Mat4::perspective_rh(70f32.to_radians(), 1.0, 0.1, 1000.0);
        layer.update_visibility(proj * view);

        let root: RenderRoot<FakeTexture> =
            RenderRoot::new().with(&HotspotMarkerContent::new(&layer));
        assert!(root.markers.is_empty());
    }

    #[test]
    fn contents_compose_independently() {
        let layer = HotspotLayer::default();
        let root: RenderRoot<FakeTexture> = RenderRoot::new()
            .with(&HotspotMarkerContent::new(&layer))
            .with(&PanoramaSphereContent::new(None, 1.0));

        assert!(root.panorama.is_some());
        assert!(root.markers.is_empty());
    }
}
