//! # Panotour
//!
//! **Walk through a graph of 360° panoramas.**
//!
//! A tour is a JSON file mapping scene names to a display name and a list of
//! hotspots. Clicking a hotspot fades the current panorama out while the view
//! narrows, swaps in the next scene and fades back in. Only the current scene
//! and the scenes one click away are kept on the GPU.
//!
//! ## Quick Start
//!
//! ```no_run
//! fn main() -> Result<(), panotour::ViewerError> {
//!     panotour::run("tour/tour.json")
//! }
//! ```
//!
//! ## Tour format
//!
//! ```json
//! {
//!   "startLocation": "pano_1",
//!   "imageDirectory": "images",
//!   "pano_1": ["Lobby", { "position": [45, 3, 0], "ref": "pano_2" }],
//!   "pano_2": ["Hallway", { "position": [-10, 2, -25], "ref": "pano_1" }]
//! }
//! ```
//!
//! Scene `s` is textured with `<imageDirectory>/<s>.jpg`.
//!
//! ## Without a window
//!
//! The engine in [`tour`] is generic over a [`TextureSource`], so it can be
//! driven by any loader: feed it clicks and frame times, read back a
//! [`RenderRoot`] each frame.

mod camera;
mod config;
mod error;
mod fetch;
mod gpu;
mod input;
mod look_controls;
mod panorama_pass;
mod picking;
mod sphere;
mod texture;
pub mod tour;
mod viewer;

pub use camera::Camera;
pub use config::TourConfig;
pub use error::{
    AuxiliaryResourceError, GpuError, MalformedGraphError, TextureLoadError, TextureLoadReason,
    ViewerError,
};
pub use fetch::{GpuTextureSource, ImageFetcher, decode_image};
pub use gpu::GpuContext;
pub use input::Input;
pub use look_controls::{LookConfig, LookControls};
pub use panorama_pass::PanoramaPass;
pub use picking::{Ray, screen_to_ndc};
pub use sphere::{SphereGeometry, SphereVertex};
pub use texture::{Sampling, Texture};
pub use tour::{
    ContainerId, FadeConfig, Hotspot, HotspotConfig, HotspotLayer, NavigationEngine, RenderRoot,
    SceneContent, SceneId, SceneNode, TextureCache, TextureHandle, TextureSource, TourEvent,
    TourGraph, TransitionController, TransitionState,
};
pub use viewer::{run, run_with_config};

// Re-export glam math types for convenience
pub use glam::{Mat4, Vec2, Vec3};
