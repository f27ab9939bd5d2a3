//! The windowed tour viewer.
//!
//! Opens a window, loads panoramas in the background and drives a
//! [`NavigationEngine`] from winit's event loop: click a marker to move, drag
//! to look around, F11 for fullscreen.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::KeyCode;
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::config::TourConfig;
use crate::error::{AuxiliaryResourceError, ViewerError};
use crate::fetch::GpuTextureSource;
use crate::gpu::GpuContext;
use crate::input::Input;
use crate::panorama_pass::PanoramaPass;
use crate::picking::screen_to_ndc;
use crate::texture::{Sampling, Texture};
use crate::tour::{NavigationEngine, TourEvent, TourGraph};

/// Side length of the procedural marker sprite.
const MARKER_TEXTURE_SIZE: u32 = 64;

/// Run the tour described by the JSON file at `tour_path` with default settings.
///
/// Blocks until the window is closed.
pub fn run(tour_path: impl AsRef<Path>) -> Result<(), ViewerError> {
    run_with_config(tour_path, TourConfig::default())
}

/// Run the tour described by the JSON file at `tour_path`.
///
/// The tour is loaded and validated before any window opens; a malformed
/// tour is returned as an error.
pub fn run_with_config(tour_path: impl AsRef<Path>, config: TourConfig) -> Result<(), ViewerError> {
    let mut graph = TourGraph::load(tour_path)?;
    if let Some(directory) = &config.image_directory {
        graph = graph.with_image_directory(directory.clone());
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = TourApp::Pending {
        graph: Some(graph),
        config,
    };
    event_loop.run_app(&mut app)?;

    match app {
        TourApp::Failed(err) => Err(err),
        _ => Ok(()),
    }
}

struct Running {
    window: Arc<Window>,
    gpu: GpuContext,
    pass: PanoramaPass,
    engine: NavigationEngine<GpuTextureSource>,
    input: Input,
    title: String,
    last_frame: Instant,
}

enum TourApp {
    Pending {
        graph: Option<TourGraph>,
        config: TourConfig,
    },
    Running(Box<Running>),
    Failed(ViewerError),
}

impl TourApp {
    fn start(
        event_loop: &ActiveEventLoop,
        graph: TourGraph,
        config: &TourConfig,
    ) -> Result<Running, ViewerError> {
        let window_attrs = WindowAttributes::default()
            .with_title(&config.title)
            .with_inner_size(winit::dpi::LogicalSize::new(config.width, config.height));

        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let gpu = GpuContext::new(window.clone())?;

        let marker = load_marker(&gpu, config.marker_image.as_deref());
        let pass = PanoramaPass::new(&gpu, &marker);

        let source = GpuTextureSource::new(
            gpu.device.clone(),
            gpu.queue.clone(),
            graph.image_directory().map(Path::to_path_buf),
        );
        let mut engine = NavigationEngine::new(graph, source, config);
        engine.start();

        window.request_redraw();

        Ok(Running {
            window,
            gpu,
            pass,
            engine,
            input: Input::new(),
            title: config.title.clone(),
            last_frame: Instant::now(),
        })
    }
}

impl ApplicationHandler for TourApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let TourApp::Pending { graph, config } = self else {
            return;
        };
        let Some(graph) = graph.take() else {
            return;
        };

        match TourApp::start(event_loop, graph, config) {
            Ok(running) => *self = TourApp::Running(Box::new(running)),
            Err(err) => {
                log::error!("{}", err);
                *self = TourApp::Failed(err);
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let TourApp::Running(app) = self else {
            return;
        };

        app.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => {
                app.engine.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                app.gpu.resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                app.redraw(event_loop);
            }
            _ => {}
        }
    }
}

impl Running {
    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if self.input.key_pressed(KeyCode::F11) {
            self.toggle_fullscreen();
        }

        let aspect = self.gpu.aspect();
        if let Some(position) = self.input.left_click() {
            let size = Vec2::new(self.gpu.width() as f32, self.gpu.height() as f32);
            self.engine
                .handle_click_at(screen_to_ndc(position, size), aspect);
        }
        self.engine.update_look(&self.input);
        self.engine.frame(dt, aspect);

        for event in self.engine.drain_events() {
            report(&event);
        }
        self.update_title();

        if let Some(container) = self.engine.take_container_request() {
            self.move_to_container(event_loop, &container.to_string());
        }

        self.render();

        self.input.begin_frame();
        self.window.request_redraw();
    }

    fn render(&mut self) {
        let output = match self.gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.window.inner_size();
                self.gpu.resize(size.width, size.height);
                return;
            }
            Err(err) => {
                log::warn!("Skipping frame: {}", err);
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Panorama Encoder"),
            });

        let root = self.engine.render_root();
        self.pass
            .render(&self.gpu, &mut encoder, &view, self.engine.camera(), &root);

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }

    fn toggle_fullscreen(&self) {
        let fullscreen = match self.window.fullscreen() {
            Some(_) => None,
            None => Some(Fullscreen::Borderless(None)),
        };
        self.window.set_fullscreen(fullscreen);
    }

    fn update_title(&mut self) {
        let Some(name) = self.engine.current_display_name() else {
            return;
        };
        if name != self.title {
            self.title = name.to_string();
            self.window.set_title(&self.title);
        }
    }

    fn move_to_container(&mut self, event_loop: &ActiveEventLoop, name: &str) {
        let size = self.window.inner_size();
        let attrs = WindowAttributes::default()
            .with_title(name)
            .with_inner_size(size);

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to open container '{}': {}", name, err);
                return;
            }
        };
        match self.gpu.retarget(window.clone()) {
            Ok(()) => {
                self.window = window;
                self.title.clear();
                self.window.request_redraw();
            }
            Err(err) => log::error!("Failed to move to container '{}': {}", name, err),
        }
    }
}

fn report(event: &TourEvent) {
    match event {
        TourEvent::Ready(scene) => log::info!("Showing '{}'", scene),
        TourEvent::TransitionStarted { from, to } => log::debug!("Leaving '{}' for '{}'", from, to),
        TourEvent::SceneSwapped(scene) => log::debug!("Swapped in '{}'", scene),
        TourEvent::TransitionFinished(scene) => log::info!("Arrived at '{}'", scene),
        TourEvent::TextureLoadFailed(err) => log::error!("{}", err),
    }
}

/// The marker sprite from `path`, or the built-in dot if there is none or it fails.
fn load_marker(gpu: &GpuContext, path: Option<&Path>) -> Texture {
    if let Some(path) = path {
        match Texture::from_file(&gpu.device, &gpu.queue, path, Sampling::Clamp) {
            Ok(texture) => return texture,
            Err(err) => {
                let err = AuxiliaryResourceError {
                    resource: path.to_path_buf(),
                    reason: err.to_string(),
                };
                log::warn!("{}; using the built-in marker", err);
            }
        }
    }
    Texture::dot(&gpu.device, &gpu.queue, MARKER_TEXTURE_SIZE)
}
