//! The scene-transition engine.
//!
//! A tour is a small graph of panoramic scenes linked by hotspots. Moving
//! along a hotspot fades the current panorama out, swaps in the target's
//! texture and fades back in. Textures are kept warm for the scenes one click
//! away, and nothing else.
//!
//! - [`graph`]: the validated, read-only [`TourGraph`]
//! - [`cache`]: the neighbor-scoped [`TextureCache`] and the [`TextureSource`] seam
//! - [`hotspots`]: markers of the current scene and ray hit-testing
//! - [`transition`]: the fade state machine and its single-flight guard
//! - [`content`]: the per-frame draw list
//! - [`engine`]: [`NavigationEngine`], which wires pointer input to all of the above

pub mod cache;
pub mod content;
pub mod engine;
pub mod graph;
pub mod hotspots;
pub mod transition;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheEvent, Preload, TextureCache, TextureHandle, TextureSource};
pub use content::{
    HotspotMarkerContent, MarkerDraw, PanoramaDraw, PanoramaSphereContent, RenderRoot,
    SceneContent,
};
pub use engine::{ContainerId, NavigationEngine};
pub use graph::{Hotspot, SceneId, SceneNode, TourGraph};
pub use hotspots::{HotspotConfig, HotspotLayer, Marker};
pub use transition::{FadeConfig, TourEvent, TransitionController, TransitionState};
