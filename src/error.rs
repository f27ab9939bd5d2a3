//! Error types for tour loading, texture fetching and the viewer.

use std::path::PathBuf;

use crate::tour::SceneId;

/// The tour description could not be turned into a valid [`TourGraph`](crate::TourGraph).
///
/// Loading is all-or-nothing: any of these aborts start-up.
#[derive(Debug, thiserror::Error)]
pub enum MalformedGraphError {
    /// The tour file could not be read.
    #[error("failed to read tour description {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The tour file is not valid JSON, or an entry has the wrong shape.
    #[error("failed to parse tour description: {0}")]
    Parse(#[from] serde_json::Error),

    /// The top-level JSON value is not an object.
    #[error("tour description must be a JSON object")]
    NotAnObject,

    /// `startLocation` is missing or not a string.
    #[error("tour description has no startLocation")]
    MissingStartLocation,

    /// `startLocation` names a scene that does not exist.
    #[error("startLocation '{0}' is not a scene in the tour")]
    UnknownStartLocation(SceneId),

    /// A scene entry is not of the form `[displayName, hotspot, ...]`.
    #[error("scene '{scene}' is malformed: {message}")]
    InvalidScene { scene: String, message: String },

    /// A hotspot points at a scene that does not exist.
    #[error("hotspot {index} of scene '{scene}' targets unknown scene '{target}'")]
    DanglingHotspot {
        scene: SceneId,
        index: usize,
        target: SceneId,
    },
}

/// Why a single panorama fetch failed.
#[derive(Debug, thiserror::Error)]
pub enum TextureLoadReason {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode error: {0}")]
    Decode(#[from] image::ImageError),

    /// The image decoded to zero pixels.
    #[error("image is empty")]
    Empty,

    /// The background fetch worker went away before reporting a result.
    #[error("fetch worker disconnected")]
    WorkerGone,
}

/// A panorama image for one scene could not be fetched.
///
/// Fatal only to the transition step that needed it; the engine keeps running.
#[derive(Debug, thiserror::Error)]
#[error("failed to load panorama for '{scene}' from {}: {reason}", path.display())]
pub struct TextureLoadError {
    pub scene: SceneId,
    pub path: PathBuf,
    #[source]
    pub reason: TextureLoadReason,
}

/// A cosmetic resource (marker image and the like) failed to load.
///
/// Logged and otherwise ignored; presentation falls back to built-in resources.
#[derive(Debug, thiserror::Error)]
#[error("failed to load auxiliary resource {}: {reason}", resource.display())]
pub struct AuxiliaryResourceError {
    pub resource: PathBuf,
    pub reason: String,
}

/// The GPU could not be set up for the window.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),

    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    IncompatibleSurface,

    /// A new window's surface wants a different format than the pipelines were built for.
    #[error("surface format changed from {old:?} to {new:?}")]
    FormatChanged {
        old: wgpu::TextureFormat,
        new: wgpu::TextureFormat,
    },
}

/// The viewer could not start or stopped abnormally.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Graph(#[from] MalformedGraphError),

    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}
