//! Hotspot markers for the scene currently on screen.

use glam::{Mat4, Vec3};

use super::graph::{SceneId, SceneNode};
use crate::picking::Ray;

/// How hotspot markers are sized and when they are shown.
#[derive(Clone, Copy, Debug)]
pub struct HotspotConfig {
    /// Edge length of the square marker billboard, in world units.
    pub marker_size: f32,
    /// Half-width of the central horizontal band (in NDC) in which markers are shown.
    pub visibility_band: f32,
    /// Hide markers whose projection falls outside the band.
    pub hide_outside_band: bool,
    /// Skip hidden markers when hit-testing.
    pub exclude_hidden_from_hit_test: bool,
}

impl Default for HotspotConfig {
    fn default() -> Self {
        Self {
            marker_size: 5.0,
            visibility_band: 0.7,
            hide_outside_band: true,
            exclude_hidden_from_hit_test: false,
        }
    }
}

impl HotspotConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker_size(mut self, size: f32) -> Self {
        self.marker_size = size;
        self
    }

    pub fn visibility_band(mut self, half_width: f32) -> Self {
        self.visibility_band = half_width;
        self
    }

    pub fn hide_outside_band(mut self, hide: bool) -> Self {
        self.hide_outside_band = hide;
        self
    }

    pub fn exclude_hidden_from_hit_test(mut self, exclude: bool) -> Self {
        self.exclude_hidden_from_hit_test = exclude;
        self
    }
}

/// A renderable, clickable hotspot marker.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub position: Vec3,
    pub target: SceneId,
    pub visible: bool,
}

/// The markers of the scene currently displayed, in declaration order.
#[derive(Debug, Default)]
pub struct HotspotLayer {
    markers: Vec<Marker>,
    config: HotspotConfig,
}

impl HotspotLayer {
    pub fn new(config: HotspotConfig) -> Self {
        Self {
            markers: Vec::new(),
            config,
        }
    }

    /// Replace all markers with one per hotspot of `node`.
    pub fn rebuild(&mut self, node: &SceneNode) {
        self.markers = node
            .hotspots
            .iter()
            .map(|hotspot| Marker {
                position: hotspot.position,
                target: hotspot.target.clone(),
                visible: true,
            })
            .collect();
        log::debug!(
            "Built {} hotspot markers for '{}'",
            self.markers.len(),
            node.id
        );
    }

    /// Remove every marker.
    pub fn clear(&mut self) {
        self.markers.clear();
    }

    /// Target of the first marker, in declaration order, hit by `ray`.
    pub fn hit_test(&self, ray: &Ray) -> Option<SceneId> {
        let radius = self.config.marker_size * 0.5;
        self.markers
            .iter()
            .filter(|m| m.visible || !self.config.exclude_hidden_from_hit_test)
            .find(|m| ray.intersect_sphere(m.position, radius).is_some())
            .map(|m| m.target.clone())
    }

    /// Flag markers outside the central screen band, or behind the camera, as hidden.
    pub fn update_visibility(&mut self, view_proj: Mat4) {
        let band = self.config.visibility_band;
        let hide = self.config.hide_outside_band;

        for marker in &mut self.markers {
            let clip = view_proj * marker.position.extend(1.0);
            marker.visible = if clip.w <= 0.0 {
                false
            } else {
                let x = clip.x / clip.w;
                !hide || (x > -band && x < band)
            };
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn config(&self) -> &HotspotConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tour::graph::Hotspot;

    fn node(hotspots: &[([f32; 3], &str)]) -> SceneNode {
        SceneNode {
            id: SceneId::new("here"),
            display_name: "Here".to_string(),
            hotspots: hotspots
                .iter()
                .map(|(p, t)| Hotspot {
                    position: Vec3::from_array(*p),
                    target: SceneId::new(*t),
                })
                .collect(),
        }
    }

    fn looking_along_x() -> Mat4 {
        let view = Mat4::look_at_rh(Vec3::ZERO, Vec3::X, Vec3::Y);
        let proj = Mat4::perspective_rh(70f32.to_radians(), 1.0, 0.1, 1000.0);
        proj * view
    }

    #[test]
    fn rebuild_replaces_markers_in_order() {
        let mut layer = HotspotLayer::default();
        layer.rebuild(&node(&[([1.0, 0.0, 0.0], "a"), ([2.0, 0.0, 0.0], "b")]));
        layer.rebuild(&node(&[([3.0, 0.0, 0.0], "c")]));

        assert_eq!(layer.len(), 1);
        assert_eq!(layer.markers()[0].target, SceneId::new("c"));
        assert_eq!(layer.markers()[0].position, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn overlapping_markers_resolve_to_first_declared() {
        let mut layer = HotspotLayer::default();
        // The second marker is closer to the ray origin but declared later.
        layer.rebuild(&node(&[([30.0, 0.0, 0.0], "far"), ([20.0, 0.0, 0.0], "near")]));

        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        for _ in 0..10 {
            assert_eq!(layer.hit_test(&ray), Some(SceneId::new("far")));
        }
    }

    #[test]
    fn miss_returns_none() {
        let mut layer = HotspotLayer::default();
        layer.rebuild(&node(&[([30.0, 0.0, 0.0], "a")]));

        assert_eq!(layer.hit_test(&Ray::new(Vec3::ZERO, Vec3::NEG_X)), None);
        assert_eq!(layer.hit_test(&Ray::new(Vec3::ZERO, Vec3::Z)), None);

        layer.clear();
        assert_eq!(layer.hit_test(&Ray::new(Vec3::ZERO, Vec3::X)), None);
    }

    #[test]
    fn markers_outside_band_are_hidden() {
        let mut layer = HotspotLayer::default();
        layer.rebuild(&node(&[
            ([30.0, 0.0, 0.0], "ahead"),
            ([30.0, 0.0, 25.0], "edge"),
            ([-30.0, 0.0, 0.0], "behind"),
        ]));
        layer.update_visibility(looking_along_x());

        let visible: Vec<bool> = layer.markers().iter().map(|m| m.visible).collect();
        assert_eq!(visible, vec![true, false, false]);
    }

    #[test]
    fn band_is_cosmetic_unless_configured() {
        let edge = node(&[([30.0, 0.0, 25.0], "edge")]);
        let ray = Ray::new(Vec3::ZERO, Vec3::new(30.0, 0.0, 25.0));

        let mut layer = HotspotLayer::default();
        layer.rebuild(&edge);
        layer.update_visibility(looking_along_x());
        assert!(!layer.markers()[0].visible);
        assert_eq!(layer.hit_test(&ray), Some(SceneId::new("edge")));

        let mut layer = HotspotLayer::new(HotspotConfig::new().exclude_hidden_from_hit_test(true));
        layer.rebuild(&edge);
        layer.update_visibility(looking_along_x());
        assert_eq!(layer.hit_test(&ray), None);
    }

    #[test]
    fn band_can_be_disabled() {
        let mut layer = HotspotLayer::new(HotspotConfig::new().hide_outside_band(false));
        layer.rebuild(&node(&[([30.0, 0.0, 25.0], "edge")]));
        layer.update_visibility(looking_along_x());
        assert!(layer.markers()[0].visible);
    }
}
