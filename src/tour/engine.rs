//! The navigation engine: pointer input in, transitions and draw lists out.

use std::fmt;
use std::rc::Rc;

use glam::Vec2;

use super::cache::TextureSource;
use super::content::{HotspotMarkerContent, PanoramaSphereContent, RenderRoot};
use super::graph::{SceneId, TourGraph};
use super::transition::{TourEvent, TransitionController};
use crate::camera::Camera;
use crate::config::TourConfig;
use crate::input::Input;
use crate::look_controls::LookControls;
use crate::picking::Ray;

/// Names the render surface the engine draws into.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContainerId(pub String);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Ties the tour together for one viewer.
///
/// Each engine owns its own graph handle, cache, camera and transition state;
/// several engines can run side by side.
pub struct NavigationEngine<S: TextureSource> {
    controller: TransitionController<S>,
    camera: Camera,
    look: LookControls,
    base_fov_degrees: f32,
    running: bool,
    container: Option<ContainerId>,
    container_request: Option<ContainerId>,
}

impl<S: TextureSource> NavigationEngine<S> {
    /// Create an engine for `graph`, fetching panoramas through `source`.
    ///
    /// The start scene and its neighbors are requested immediately. The engine
    /// does not advance until [`start`](Self::start) is called.
    pub fn new(graph: TourGraph, source: S, config: &TourConfig) -> Self {
        log::info!(
            "Starting tour at '{}' ({} scenes)",
            graph.start(),
            graph.len()
        );
        let controller =
            TransitionController::new(Rc::new(graph), source, config.fade, config.hotspots);
        let look = LookControls::new(&config.look);
        let mut camera = Camera::default().with_fov(config.look.fov_degrees);
        look.apply(&mut camera);

        Self {
            controller,
            camera,
            look,
            base_fov_degrees: config.look.fov_degrees,
            running: false,
            container: None,
            container_request: None,
        }
    }

    /// Begin advancing on [`frame`](Self::frame) and accepting clicks.
    pub fn start(&mut self) {
        if !self.running {
            log::debug!("Engine started");
        }
        self.running = true;
    }

    /// Stop advancing. A running fade is frozen where it is.
    pub fn stop(&mut self) {
        if self.running {
            log::debug!("Engine stopped");
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Move rendering to another surface. The viewer picks the request up
    /// with [`take_container_request`](Self::take_container_request).
    pub fn set_container(&mut self, container: impl Into<ContainerId>) {
        let container = container.into();
        log::info!("Render container set to '{}'", container);
        self.container = Some(container.clone());
        self.container_request = Some(container);
    }

    pub fn container(&self) -> Option<&ContainerId> {
        self.container.as_ref()
    }

    pub fn take_container_request(&mut self) -> Option<ContainerId> {
        self.container_request.take()
    }

    /// Navigate along the hotspot hit by `ray`, if any.
    ///
    /// Returns whether a transition was started. While one is already running
    /// the click is dropped before anything is touched.
    pub fn handle_click(&mut self, ray: &Ray) -> bool {
        if !self.running {
            return false;
        }
        if self.controller.in_progress() {
            log::debug!("Click ignored: transition in progress");
            return false;
        }

        match self.controller.hotspots().hit_test(ray) {
            Some(target) => self.controller.switch_scene(&target),
            None => false,
        }
    }

    /// [`handle_click`](Self::handle_click) for a pointer at `ndc`.
    pub fn handle_click_at(&mut self, ndc: Vec2, aspect: f32) -> bool {
        let ray = Ray::from_ndc(ndc, self.camera.view_proj(aspect));
        self.handle_click(&ray)
    }

    /// Request a transition directly, as a click on a hotspot would.
    pub fn switch_scene(&mut self, target: &SceneId) -> bool {
        self.running && self.controller.switch_scene(target)
    }

    /// Apply drag-to-look from this frame's input.
    pub fn update_look(&mut self, input: &Input) {
        if self.running {
            self.look.update(input);
        }
    }

    /// Advance the transition by `dt` seconds and update the camera and
    /// marker visibility for a viewport of the given aspect ratio.
    pub fn frame(&mut self, dt: f32, aspect: f32) {
        if !self.running {
            return;
        }

        self.controller.advance(dt);

        self.look.apply(&mut self.camera);
        self.camera.fov = (self.base_fov_degrees + self.controller.fov_offset_degrees())
            .max(1.0)
            .to_radians();

        let view_proj = self.camera.view_proj(aspect);
        self.controller.hotspots_mut().update_visibility(view_proj);
    }

    /// What to draw this frame.
    pub fn render_root(&self) -> RenderRoot<S::Texture> {
        RenderRoot::new()
            .with(&PanoramaSphereContent::new(
                self.controller.panorama(),
                self.controller.opacity(),
            ))
            .with(&HotspotMarkerContent::new(self.controller.hotspots()))
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn look(&self) -> &LookControls {
        &self.look
    }

    /// Display name of the scene being shown, or being moved to.
    pub fn current_display_name(&self) -> Option<&str> {
        let id = self
            .controller
            .target_scene()
            .unwrap_or_else(|| self.controller.current_scene());
        self.controller
            .graph()
            .node(id)
            .map(|node| node.display_name.as_str())
    }

    pub fn controller(&self) -> &TransitionController<S> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut TransitionController<S> {
        &mut self.controller
    }

    /// Take the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<TourEvent> {
        self.controller.drain_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tour::TransitionState;
    use crate::tour::testing::{FakeSource, FakeTexture, hub_tour, two_rooms};
    use glam::Vec3;
    use std::collections::HashSet;

    const TICK: f32 = 0.016;
    const ASPECT: f32 = 16.0 / 9.0;

    fn running(graph: TourGraph) -> NavigationEngine<FakeSource> {
        let mut engine = NavigationEngine::new(graph, FakeSource::new(), &TourConfig::default());
        engine.start();
        engine.frame(TICK, ASPECT);
        engine.frame(TICK, ASPECT);
        engine
    }

    fn ndc_of(engine: &NavigationEngine<FakeSource>, point: Vec3) -> Vec2 {
        let clip = engine.camera().view_proj(ASPECT) * point.extend(1.0);
        Vec2::new(clip.x / clip.w, clip.y / clip.w)
    }

    fn run_until_idle(engine: &mut NavigationEngine<FakeSource>) -> Vec<TransitionState> {
        let mut states = Vec::new();
        for _ in 0..1000 {
            engine.frame(TICK, ASPECT);
            let state = engine.controller().state();
            if states.last() != Some(&state) {
                states.push(state);
            }
            if state == TransitionState::Idle {
                return states;
            }
        }
        panic!("transition never finished");
    }

    #[test]
    fn click_on_marker_walks_through_the_whole_transition() {
        let mut engine = running(two_rooms());
        engine.drain_events();
        let ndc = ndc_of(&engine, Vec3::new(45.0, 3.0, 0.0));

        assert!(engine.handle_click_at(ndc, ASPECT));
        assert_eq!(engine.controller().state(), TransitionState::FadingOut);
        assert_eq!(engine.current_display_name(), Some("Hallway"));

        let states = run_until_idle(&mut engine);
        assert_eq!(
            states,
            vec![
                TransitionState::FadingOut,
                TransitionState::FadingIn,
                TransitionState::Idle
            ]
        );

        let events = engine.drain_events();
        assert!(matches!(
            &events[..],
            [
                TourEvent::TransitionStarted { .. },
                TourEvent::SceneSwapped(swapped),
                TourEvent::TransitionFinished(finished),
            ] if swapped.as_str() == "pano_2" && finished.as_str() == "pano_2"
        ));

        let root = engine.render_root();
        let panorama = root.panorama.unwrap();
        assert_eq!(
            panorama.texture.unwrap().texture(),
            &FakeTexture("pano_2".into())
        );
        assert_eq!(panorama.opacity, 1.0);

        let cached: HashSet<_> = engine.controller().cache().key_set();
        assert_eq!(cached, ["pano_2", "pano_1"].map(SceneId::new).into());

        let markers = engine.controller().hotspots().markers();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].target, SceneId::new("pano_1"));
        assert_eq!(engine.camera().fov_degrees().round(), 70.0);
    }

    #[test]
    fn click_into_empty_space_does_nothing() {
        let mut engine = running(two_rooms());
        let ndc = ndc_of(&engine, Vec3::new(45.0, 30.0, 20.0));

        assert!(!engine.handle_click_at(ndc, ASPECT));
        assert_eq!(engine.controller().state(), TransitionState::Idle);
    }

    #[test]
    fn clicks_during_a_transition_are_dropped() {
        let mut engine = running(hub_tour());
        let to_a = ndc_of(&engine, Vec3::new(20.0, 0.0, 0.0));

        assert!(engine.handle_click_at(to_a, ASPECT));
        engine.frame(TICK, ASPECT);
        assert!(!engine.handle_click_at(to_a, ASPECT));
        assert!(!engine.switch_scene(&"b".into()));

        run_until_idle(&mut engine);
        assert_eq!(engine.controller().current_scene(), &SceneId::new("a"));
    }

    #[test]
    fn stopped_engine_ignores_frames_and_clicks() {
        let mut engine =
            NavigationEngine::new(two_rooms(), FakeSource::new(), &TourConfig::default());
        assert!(!engine.is_running());

        engine.frame(TICK, ASPECT);
        assert!(engine.controller().is_loading());

        engine.start();
        engine.frame(TICK, ASPECT);
        assert!(!engine.controller().is_loading());

        engine.stop();
        let ndc = ndc_of(&engine, Vec3::new(45.0, 3.0, 0.0));
        assert!(!engine.handle_click_at(ndc, ASPECT));
    }

    #[test]
    fn fov_narrows_during_fade() {
        let mut engine = running(two_rooms());
        engine.switch_scene(&"pano_2".into());
        for _ in 0..5 {
            engine.frame(TICK, ASPECT);
        }
        assert!(engine.camera().fov_degrees() < 69.0);
    }

    #[test]
    fn markers_outside_the_band_are_not_drawn() {
        let mut engine = running(hub_tour());
        // hub markers sit ahead, to the side and behind.
        let root = engine.render_root();
        assert_eq!(root.markers.len(), 1);
        assert_eq!(root.markers[0].position, Vec3::new(20.0, 0.0, 0.0));

        engine.frame(TICK, ASPECT);
        assert_eq!(engine.controller().hotspots().len(), 3);
    }

    #[test]
    fn set_container_is_recorded_once() {
        let mut engine =
            NavigationEngine::new(two_rooms(), FakeSource::new(), &TourConfig::default());
        engine.set_container("gallery");

        assert_eq!(engine.container(), Some(&ContainerId::from("gallery")));
        assert_eq!(engine.take_container_request(), Some("gallery".into()));
        assert_eq!(engine.take_container_request(), None);
    }
}
