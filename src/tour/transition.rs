//! The fade transition state machine.
//!
//! A transition fades the panorama sphere out while narrowing the field of
//! view, swaps in the target scene's texture once fully transparent, then
//! fades back in. The controller is advanced once per frame with the elapsed
//! time; nothing here reschedules itself.
//!
//! ```text
//! Idle --switch_scene--> FadingOut --opacity <= 0, swap--> FadingIn --opacity >= 1,
//!                                                          neighbors settled--> Idle
//! ```
//!
//! A transition only completes once every neighbor of the new scene has been
//! fetched or has failed, so the cache holds exactly the new neighborhood
//! when the next switch is accepted. Only one transition runs at a time. Requests arriving while one is in
//! flight are dropped, not queued.

use std::collections::HashSet;
use std::rc::Rc;

use super::cache::{CacheEvent, TextureCache, TextureHandle, TextureSource};
use super::graph::{SceneId, TourGraph};
use super::hotspots::{HotspotConfig, HotspotLayer};
use crate::error::TextureLoadError;

/// Phase of the fade animation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransitionState {
    #[default]
    Idle,
    FadingOut,
    FadingIn,
}

/// Smallest opacity step accepted; a fade takes at most a thousand ticks.
const MIN_OPACITY_STEP: f32 = 0.001;
/// Shortest nominal tick accepted, in seconds.
const MIN_NOMINAL_TICK: f32 = 0.001;

/// Step sizes of the fade, expressed per nominal tick.
///
/// The controller scales both steps by `dt / nominal_tick`, so the animation
/// takes the same wall-clock time regardless of frame rate. Out-of-range
/// values are brought back by [`sanitized`](Self::sanitized).
#[derive(Clone, Copy, Debug)]
pub struct FadeConfig {
    /// Opacity change per nominal tick.
    pub opacity_step: f32,
    /// Field-of-view change per nominal tick, in degrees.
    pub fov_step_degrees: f32,
    /// Length of a nominal tick in seconds.
    pub nominal_tick: f32,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            opacity_step: 0.06,
            fov_step_degrees: 0.4,
            nominal_tick: 0.016,
        }
    }
}

impl FadeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamped to `0.001..=1.0`.
    pub fn opacity_step(mut self, step: f32) -> Self {
        self.opacity_step = step;
        self.sanitized()
    }

    /// Negative steps are treated as zero.
    pub fn fov_step_degrees(mut self, step: f32) -> Self {
        self.fov_step_degrees = step;
        self.sanitized()
    }

    /// At least one millisecond.
    pub fn nominal_tick(mut self, seconds: f32) -> Self {
        self.nominal_tick = seconds;
        self.sanitized()
    }

    /// A copy whose fades are guaranteed to finish.
    ///
    /// Non-finite values fall back to the defaults; the rest are clamped.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let finite_or = |value: f32, fallback: f32| {
            if value.is_finite() { value } else { fallback }
        };

        Self {
            opacity_step: finite_or(self.opacity_step, defaults.opacity_step)
                .clamp(MIN_OPACITY_STEP, 1.0),
            fov_step_degrees: finite_or(self.fov_step_degrees, defaults.fov_step_degrees)
                .max(0.0),
            nominal_tick: finite_or(self.nominal_tick, defaults.nominal_tick)
                .max(MIN_NOMINAL_TICK),
        }
    }

    /// Number of nominal ticks a fade in one direction takes.
    pub fn ticks_per_fade(&self) -> u32 {
        (1.0 / self.opacity_step).ceil() as u32
    }
}

/// Notifications produced while the engine runs.
#[derive(Debug)]
pub enum TourEvent {
    /// The start scene is on screen and clicks are accepted.
    Ready(SceneId),
    /// A switch was accepted and the fade-out has begun.
    TransitionStarted { from: SceneId, to: SceneId },
    /// The panorama now shows this scene; the fade-in has begun.
    SceneSwapped(SceneId),
    /// The fade-in finished and the hotspots of this scene are clickable.
    TransitionFinished(SceneId),
    /// A panorama could not be loaded.
    TextureLoadFailed(TextureLoadError),
}

/// Internal state of the controller. Tests set it directly to start from
/// arbitrary points of a fade.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct TransitionRecord {
    pub state: TransitionState,
    /// Set from acceptance of a switch until the target's hotspots are built.
    pub in_progress: bool,
    /// Waiting for the start scene's texture.
    pub loading: bool,
    pub opacity: f32,
    /// Field-of-view offset from the baseline, in degrees. Never positive.
    pub fov_offset: f32,
    /// Scene whose texture is (or will be, at start-up) on the sphere.
    pub current: SceneId,
    /// Destination of the running transition.
    pub target: Option<SceneId>,
    /// The target's texture failed to load; the transition reverts.
    pub target_failed: bool,
}

impl TransitionRecord {
    fn idle_at(current: SceneId) -> Self {
        Self {
            state: TransitionState::Idle,
            in_progress: false,
            loading: false,
            opacity: 1.0,
            fov_offset: 0.0,
            current,
            target: None,
            target_failed: false,
        }
    }
}

/// Runs scene transitions: owns the texture cache, the hotspot layer and the
/// texture currently mapped onto the panorama sphere.
pub struct TransitionController<S: TextureSource> {
    graph: Rc<TourGraph>,
    cache: TextureCache<S>,
    hotspots: HotspotLayer,
    panorama: Option<TextureHandle<S::Texture>>,
    fade: FadeConfig,
    record: TransitionRecord,
    events: Vec<TourEvent>,
}

impl<S: TextureSource> TransitionController<S> {
    /// Create a controller positioned at the tour's start scene.
    ///
    /// The start scene and its neighbors are requested right away; the
    /// controller accepts switches once the start texture has arrived.
    pub fn new(
        graph: Rc<TourGraph>,
        source: S,
        fade: FadeConfig,
        hotspots: HotspotConfig,
    ) -> Self {
        let start = graph.start().clone();
        let mut cache = TextureCache::new(source);
        cache.rescope_to(&graph.neighborhood(&start));

        let mut record = TransitionRecord::idle_at(start);
        record.in_progress = true;
        record.loading = true;

        Self {
            graph,
            cache,
            hotspots: HotspotLayer::new(hotspots),
            panorama: None,
            fade: fade.sanitized(),
            record,
            events: Vec::new(),
        }
    }

    /// Request a transition to `target`.
    ///
    /// Returns whether the request was accepted. Requests made while a
    /// transition is in flight, or naming an unknown scene, are dropped.
    pub fn switch_scene(&mut self, target: &SceneId) -> bool {
        if self.record.in_progress {
            log::debug!("Ignoring switch to '{}': transition in progress", target);
            return false;
        }
        if !self.graph.contains(target) {
            log::warn!("Ignoring switch to unknown scene '{}'", target);
            return false;
        }

        log::info!("Switching '{}' -> '{}'", self.record.current, target);
        self.record.in_progress = true;
        self.record.state = TransitionState::FadingOut;
        self.record.target = Some(target.clone());
        self.record.target_failed = false;
        self.hotspots.clear();

        // Normally already warm; otherwise fetch during the fade-out.
        self.cache.admit(target);

        self.events.push(TourEvent::TransitionStarted {
            from: self.record.current.clone(),
            to: target.clone(),
        });
        true
    }

    /// Advance by `dt` seconds: collect finished fetches, then step the fade.
    pub fn advance(&mut self, dt: f32) {
        for event in self.cache.poll() {
            self.handle_cache_event(event);
        }

        if self.record.loading {
            self.finish_loading();
            return;
        }

        if dt <= 0.0 {
            return;
        }
        let ticks = dt / self.fade.nominal_tick;

        match self.record.state {
            TransitionState::Idle => {}
            TransitionState::FadingOut => {
                if self.record.opacity > 0.0 {
                    self.record.opacity -= self.fade.opacity_step * ticks;
                    self.record.fov_offset -= self.fade.fov_step_degrees * ticks;
                    if self.record.opacity > 0.0 {
                        return;
                    }
                    self.record.opacity = 0.0;
                }
                self.swap();
            }
            TransitionState::FadingIn => {
                if self.record.opacity < 1.0 {
                    self.record.opacity += self.fade.opacity_step * ticks;
                    self.record.fov_offset += self.fade.fov_step_degrees * ticks;
                    if self.record.opacity < 1.0 {
                        return;
                    }
                    self.record.opacity = 1.0;
                    self.record.fov_offset = 0.0;
                }
                if self.neighbors_settled() {
                    self.finish();
                }
            }
        }
    }

    fn handle_cache_event(&mut self, event: CacheEvent) {
        let CacheEvent::Failed(err) = event else {
            return;
        };

        let awaited = match self.record.state {
            TransitionState::FadingOut => self.record.target.as_ref(),
            _ if self.record.loading => Some(&self.record.current),
            _ => None,
        };
        if awaited == Some(&err.scene) {
            self.record.target_failed = true;
        }
        self.events.push(TourEvent::TextureLoadFailed(err));
    }

    fn finish_loading(&mut self) {
        let start = self.record.current.clone();

        if let Some(handle) = self.cache.get(&start) {
            self.panorama = Some(handle);
        } else if self.record.target_failed {
            log::error!("Start panorama '{}' unavailable, showing an empty sphere", start);
        } else {
            return;
        }

        if let Some(node) = self.graph.node(&start) {
            self.hotspots.rebuild(node);
        }
        self.record = TransitionRecord::idle_at(start.clone());
        log::info!("Tour ready at '{}'", start);
        self.events.push(TourEvent::Ready(start));
    }

    /// Fully faded out: put the target's texture on the sphere, or revert.
    fn swap(&mut self) {
        let Some(target) = self.record.target.clone() else {
            self.record.state = TransitionState::FadingIn;
            return;
        };

        if let Some(handle) = self.cache.get(&target) {
            self.panorama = Some(handle);
            self.cache.rescope_to(&self.graph.neighborhood(&target));
            self.record.current = target.clone();
            self.record.state = TransitionState::FadingIn;
            self.events.push(TourEvent::SceneSwapped(target));
        } else if self.record.target_failed {
            log::warn!(
                "Panorama '{}' failed to load, staying at '{}'",
                target,
                self.record.current
            );
            // The failed scene is not warmed again for this transition.
            let cold = HashSet::from([target]);
            self.cache
                .rescope_to_skipping(&self.graph.neighborhood(&self.record.current), &cold);
            self.record.target = None;
            self.record.state = TransitionState::FadingIn;
        } else if !self.cache.is_pending(&target) {
            // Neither cached nor in flight; fetch it and hold until it resolves.
            self.cache.preload(&target);
        }
    }

    /// No fetch is in flight for the current scene's neighborhood.
    fn neighbors_settled(&self) -> bool {
        let neighborhood = self.graph.neighborhood(&self.record.current);
        !self.cache.any_pending(&neighborhood)
    }

    fn finish(&mut self) {
        let current = self.record.current.clone();
        if let Some(node) = self.graph.node(&current) {
            self.hotspots.rebuild(node);
        }
        self.record = TransitionRecord::idle_at(current.clone());
        log::debug!("Transition into '{}' finished", current);
        self.events.push(TourEvent::TransitionFinished(current));
    }

    pub fn state(&self) -> TransitionState {
        self.record.state
    }

    /// Whether a switch request would currently be rejected.
    pub fn in_progress(&self) -> bool {
        self.record.in_progress
    }

    /// Whether the start scene's texture is still being fetched.
    pub fn is_loading(&self) -> bool {
        self.record.loading
    }

    /// Opacity of the panorama sphere, clamped to 0..=1.
    pub fn opacity(&self) -> f32 {
        self.record.opacity.clamp(0.0, 1.0)
    }

    /// Current field-of-view offset from the camera's baseline, in degrees.
    pub fn fov_offset_degrees(&self) -> f32 {
        self.record.fov_offset
    }

    /// Scene currently mapped onto the panorama sphere.
    pub fn current_scene(&self) -> &SceneId {
        &self.record.current
    }

    /// Destination of the running transition, if any.
    pub fn target_scene(&self) -> Option<&SceneId> {
        self.record.target.as_ref()
    }

    pub fn panorama(&self) -> Option<&TextureHandle<S::Texture>> {
        self.panorama.as_ref()
    }

    pub fn hotspots(&self) -> &HotspotLayer {
        &self.hotspots
    }

    pub fn hotspots_mut(&mut self) -> &mut HotspotLayer {
        &mut self.hotspots
    }

    pub fn cache(&self) -> &TextureCache<S> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut TextureCache<S> {
        &mut self.cache
    }

    pub fn graph(&self) -> &TourGraph {
        &self.graph
    }

    pub fn fade(&self) -> &FadeConfig {
        &self.fade
    }

    /// Take the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<TourEvent> {
        std::mem::take(&mut self.events)
    }

    #[cfg(test)]
    pub(crate) fn record(&self) -> &TransitionRecord {
        &self.record
    }

    #[cfg(test)]
    pub(crate) fn set_record(&mut self, record: TransitionRecord) {
        self.record = record;
    }
}
