//! Windowed gallery runner.
//!
//! [`run`] is the batteries-included path: it opens a window, walks a
//! [`Session`] through its whole lifecycle, pumps winit events into the
//! session, and disposes it when the window closes. Demos that need more
//! control (several sessions, custom event handling) use the session types
//! directly instead.

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::camera::{Camera, CameraSpec};
use crate::error::{FrameError, SessionError};
use crate::frame_loop::{FrameTime, TickOutcome};
use crate::host::HostContainer;
use crate::picking::RayHit;
use crate::scene::SceneGraph;
use crate::session::{Session, SessionConfig};

/// Window and session settings for [`run`].
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Window title.
    pub title: String,
    /// Initial logical window size.
    pub width: u32,
    pub height: u32,
    /// Settings for the session the runner creates.
    pub session: SessionConfig,
}

impl AppConfig {
    pub fn new(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            session: SessionConfig::new(title.clone()),
            title,
            width: 1280,
            height: 720,
        }
    }

    /// Set the initial window size (builder style).
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Replace the session settings (builder style).
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }
}

type BuildFn = Box<dyn FnOnce(&mut SceneGraph) -> CameraSpec>;
type FrameFn = Box<dyn FnMut(&mut SceneGraph, &mut Camera, FrameTime) -> Result<(), FrameError>>;
type PickFn = Box<dyn FnMut(&[RayHit], &mut SceneGraph)>;

enum AppState {
    Pending,
    Active {
        window: Arc<Window>,
        host: HostContainer,
        session: Session,
    },
}

struct GalleryApp {
    config: AppConfig,
    build: Option<BuildFn>,
    on_frame: Option<FrameFn>,
    on_pick: Option<PickFn>,
    state: AppState,
}

impl GalleryApp {
    fn activate(&mut self, event_loop: &ActiveEventLoop) -> Result<(), SessionError> {
        let attributes = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(LogicalSize::new(self.config.width, self.config.height));
        let window = event_loop
            .create_window(attributes)
            .map_err(|e| SessionError::ResourceUnavailable(format!("window creation failed: {e}")))?;
        let window = Arc::new(window);

        let host = HostContainer::windowed(window.clone());
        let mut session = Session::create(self.config.session.clone());

        // resumed can only fire with both closures still unclaimed.
        let build = self.build.take().ok_or_else(|| {
            SessionError::Config("runner activated twice".into())
        })?;
        let on_frame = self.on_frame.take().ok_or_else(|| {
            SessionError::Config("runner activated twice".into())
        })?;

        session.attach_scene(build)?;
        session.attach_surface(&host)?;
        session.start(on_frame)?;

        window.request_redraw();
        self.state = AppState::Active {
            window,
            host,
            session,
        };
        Ok(())
    }
}

impl ApplicationHandler for GalleryApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if matches!(self.state, AppState::Active { .. }) {
            return;
        }
        if let Err(err) = self.activate(event_loop) {
            log::error!("failed to start gallery session: {err}");
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let AppState::Active {
            window,
            host,
            session,
        } = &mut self.state
        else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                session.dispose();
                host.detach();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                let logical: LogicalSize<f64> = size.to_logical(host.pixel_ratio());
                host.set_size(logical.width as f32, logical.height as f32);
                session.handle_resize(size.width, size.height);
            }
            WindowEvent::RedrawRequested => {
                match session.tick() {
                    Ok(TickOutcome::Halted(err)) => {
                        log::error!("demo halted: {err}");
                        session.dispose();
                        event_loop.exit();
                    }
                    Ok(_) => {}
                    Err(err) => {
                        log::error!("render failed: {err}");
                        session.dispose();
                        event_loop.exit();
                    }
                }
                window.request_redraw();
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                session.handle_window_event(&event);
                if let Some(on_pick) = self.on_pick.as_mut() {
                    // Cursor positions and the surface are both in physical
                    // pixels, so no scale conversion is needed here.
                    let pointer = session.bridge().input().pointer_position();
                    if let Some(ndc) = session.pointer_ndc(pointer) {
                        let hits = session.pick(ndc);
                        if let Some(scene) = session.scene_mut() {
                            on_pick(&hits, scene);
                        }
                    }
                }
            }
            other => session.handle_window_event(&other),
        }
    }
}

/// Open a window, run one session until the window closes.
///
/// `build` populates the scene and returns the camera spec; `on_frame` runs
/// once per frame. Lifecycle errors during startup and frame-loop halts both
/// end the run.
pub fn run(
    config: AppConfig,
    build: impl FnOnce(&mut SceneGraph) -> CameraSpec + 'static,
    on_frame: impl FnMut(&mut SceneGraph, &mut Camera, FrameTime) -> Result<(), FrameError> + 'static,
) -> Result<(), SessionError> {
    run_inner(config, Box::new(build), Box::new(on_frame), None)
}

/// Like [`run`], with a click handler that receives picking hits.
///
/// On every left click the pointer is translated to NDC, the scene is
/// picked, and `on_pick` gets the hits nearest-first (possibly empty).
pub fn run_with_pick(
    config: AppConfig,
    build: impl FnOnce(&mut SceneGraph) -> CameraSpec + 'static,
    on_frame: impl FnMut(&mut SceneGraph, &mut Camera, FrameTime) -> Result<(), FrameError> + 'static,
    on_pick: impl FnMut(&[RayHit], &mut SceneGraph) + 'static,
) -> Result<(), SessionError> {
    run_inner(
        config,
        Box::new(build),
        Box::new(on_frame),
        Some(Box::new(on_pick)),
    )
}

fn run_inner(
    config: AppConfig,
    build: BuildFn,
    on_frame: FrameFn,
    on_pick: Option<PickFn>,
) -> Result<(), SessionError> {
    let event_loop = EventLoop::new()
        .map_err(|e| SessionError::ResourceUnavailable(format!("event loop failed: {e}")))?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = GalleryApp {
        config,
        build: Some(build),
        on_frame: Some(on_frame),
        on_pick,
        state: AppState::Pending,
    };
    event_loop
        .run_app(&mut app)
        .map_err(|e| SessionError::ResourceUnavailable(format!("event loop failed: {e}")))
}
