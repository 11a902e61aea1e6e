//! Scene session: the lifecycle state machine tying everything together.
//!
//! A [`Session`] owns one scene graph, one camera, one render surface, one
//! frame loop, and one input bridge, and walks them through a fixed
//! lifecycle:
//!
//! ```text
//! Uninitialized --attach_scene--> SceneReady --attach_surface--> SurfaceReady
//!     SurfaceReady --start--> Running
//!     any state --dispose--> Disposed (terminal)
//! ```
//!
//! Operations invoked in the wrong state fail synchronously with
//! [`SessionError::InvalidTransition`] (or [`SessionError::UseAfterDispose`]
//! once disposed); nothing is retried or deferred. Disposal is idempotent
//! and releases everything in a fixed order: the live flag flips first so
//! in-flight asset completions see a dead [`LiveToken`], then the frame loop
//! cancels, listeners unhook, the surface releases its graphics context, and
//! finally the scene and camera drop.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use glam::Vec2;

use crate::camera::{Camera, CameraSpec};
use crate::error::{FrameError, SessionError};
use crate::frame_loop::{FrameLoop, FrameTime, LoopHandle, TickOutcome};
use crate::host::{HostContainer, HostRect};
use crate::input::{InputBridge, Subscription};
use crate::picking::{pick, RayHit};
use crate::scene::SceneGraph;
use crate::surface::{RenderSurface, SurfaceOptions};

/// Where a session is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created; no scene yet.
    Uninitialized,
    /// Scene and camera built; no surface yet.
    SceneReady,
    /// Surface bound to a host; loop not started.
    SurfaceReady,
    /// Frame loop scheduled.
    Running,
    /// Everything released. Terminal.
    Disposed,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::SceneReady => "scene-ready",
            Lifecycle::SurfaceReady => "surface-ready",
            Lifecycle::Running => "running",
            Lifecycle::Disposed => "disposed",
        };
        f.write_str(s)
    }
}

/// Construction-time session settings.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Name used in log lines.
    pub label: String,
    /// RGBA clear color presented every frame.
    pub clear_color: [f64; 4],
    /// Surface creation options.
    pub surface: SurfaceOptions,
}

impl SessionConfig {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            clear_color: [0.05, 0.05, 0.08, 1.0],
            surface: SurfaceOptions::default(),
        }
    }

    /// Set the clear color (builder style).
    pub fn clear_color(mut self, color: [f64; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Set the surface options (builder style).
    pub fn surface_options(mut self, options: SurfaceOptions) -> Self {
        self.surface = options;
        self
    }
}

/// Weak liveness marker handed to async work.
///
/// The token observes the session's live flag without keeping the session
/// alive; once the session disposes (or drops), [`is_live`](Self::is_live)
/// is false forever.
#[derive(Clone)]
pub struct LiveToken {
    alive: Weak<AtomicBool>,
}

impl LiveToken {
    pub(crate) fn from_flag(alive: &Arc<AtomicBool>) -> Self {
        Self {
            alive: Arc::downgrade(alive),
        }
    }

    /// True while the session has not begun disposal.
    pub fn is_live(&self) -> bool {
        self.alive
            .upgrade()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    /// Convenience inverse of [`is_live`](Self::is_live).
    pub fn dead(&self) -> bool {
        !self.is_live()
    }
}

// Camera aspect used between attach_scene and attach_surface; the real
// surface aspect replaces it the moment a surface exists.
const PROVISIONAL_ASPECT: f32 = 16.0 / 9.0;

/// One demo page's scene, camera, surface, loop, and input, as a unit.
pub struct Session {
    config: SessionConfig,
    state: Lifecycle,
    scene: Option<SceneGraph>,
    camera: Option<Camera>,
    surface: Option<RenderSurface>,
    frame_loop: FrameLoop,
    loop_handle: Option<LoopHandle>,
    bridge: InputBridge,
    alive: Arc<AtomicBool>,
}

impl Session {
    /// Create a session in the `Uninitialized` state.
    pub fn create(config: SessionConfig) -> Self {
        log::debug!("session '{}' created", config.label);
        Self {
            config,
            state: Lifecycle::Uninitialized,
            scene: None,
            camera: None,
            surface: None,
            frame_loop: FrameLoop::new(),
            loop_handle: None,
            bridge: InputBridge::new(),
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> Lifecycle {
        self.state
    }

    fn guard(&self, valid: Lifecycle, attempted: &'static str) -> Result<(), SessionError> {
        if self.state == Lifecycle::Disposed {
            return Err(SessionError::UseAfterDispose(attempted));
        }
        if self.state != valid {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                attempted,
            });
        }
        Ok(())
    }

    /// Build the scene and camera. Valid only once, from `Uninitialized`.
    ///
    /// `build` populates the scene graph and returns the camera spec to
    /// validate and install. Attaching a second scene without an intervening
    /// dispose is a [`SessionError::Config`].
    pub fn attach_scene(
        &mut self,
        build: impl FnOnce(&mut SceneGraph) -> CameraSpec,
    ) -> Result<(), SessionError> {
        match self.state {
            Lifecycle::Disposed => return Err(SessionError::UseAfterDispose("attach_scene")),
            Lifecycle::Uninitialized => {}
            _ => {
                return Err(SessionError::Config(format!(
                    "session '{}' already has a scene attached",
                    self.config.label
                )));
            }
        }

        let mut scene = SceneGraph::new();
        let spec = build(&mut scene);
        let camera = Camera::from_spec(spec, PROVISIONAL_ASPECT)?;

        log::info!(
            "session '{}': scene ready with {} nodes",
            self.config.label,
            scene.len()
        );
        self.scene = Some(scene);
        self.camera = Some(camera);
        self.state = Lifecycle::SceneReady;
        Ok(())
    }

    /// Bind a render surface to the host. Valid from `SceneReady`.
    ///
    /// On success the camera's aspect (and any sub-view viewports) are set
    /// from the surface's actual pixel size.
    pub fn attach_surface(&mut self, host: &HostContainer) -> Result<(), SessionError> {
        self.guard(Lifecycle::SceneReady, "attach_surface")?;

        let surface = RenderSurface::new(host, self.config.surface)?;
        if let Some(camera) = self.camera.as_mut() {
            camera.set_viewport_size(surface.width(), surface.height());
        }

        log::info!(
            "session '{}': surface ready at {}x{}",
            self.config.label,
            surface.width(),
            surface.height()
        );
        self.surface = Some(surface);
        self.state = Lifecycle::SurfaceReady;
        Ok(())
    }

    /// Schedule the frame callback. Valid from `SurfaceReady`, or from
    /// `Running` to swap the callback (the old loop is canceled first; there
    /// is never a window with two callbacks scheduled).
    pub fn start(
        &mut self,
        on_frame: impl FnMut(&mut SceneGraph, &mut Camera, FrameTime) -> Result<(), FrameError>
        + 'static,
    ) -> Result<LoopHandle, SessionError> {
        match self.state {
            Lifecycle::Disposed => return Err(SessionError::UseAfterDispose("start")),
            Lifecycle::SurfaceReady | Lifecycle::Running => {}
            _ => {
                return Err(SessionError::InvalidTransition {
                    from: self.state,
                    attempted: "start",
                });
            }
        }

        self.bridge.subscribe(Subscription::Resize);
        self.bridge.subscribe(Subscription::Pointer);
        self.bridge.subscribe(Subscription::Keyboard);

        let handle = self.frame_loop.restart(Box::new(on_frame));
        self.loop_handle = Some(handle);
        self.state = Lifecycle::Running;
        log::info!("session '{}': running", self.config.label);
        Ok(handle)
    }

    /// Run one frame: callback, then present.
    ///
    /// Outside `Running` this is an idle no-op. A callback error halts the
    /// loop (fail-stop) and is reported in the outcome; the session stays
    /// alive so the shell can dispose it or start a fresh loop.
    pub fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        if self.state != Lifecycle::Running {
            return Ok(TickOutcome::Idle);
        }
        let (Some(scene), Some(camera), Some(surface)) = (
            self.scene.as_mut(),
            self.camera.as_mut(),
            self.surface.as_mut(),
        ) else {
            return Ok(TickOutcome::Idle);
        };

        let outcome = self.frame_loop.tick(scene, camera);
        match &outcome {
            TickOutcome::Ran(_) => {
                surface.render_frame(self.config.clear_color)?;
            }
            TickOutcome::Halted(_) => {
                self.loop_handle = None;
            }
            TickOutcome::Idle => {}
        }
        // Per-frame edges (pressed/released, pointer delta) clear on every
        // tick, including idle and halted ones; stale edges must not replay
        // on the next running frame.
        self.bridge.input_mut().begin_frame();
        Ok(outcome)
    }

    /// Resize the surface and camera as one step.
    ///
    /// Safe to call in any state; it does nothing until a surface exists and
    /// nothing after disposal.
    pub fn handle_resize(&mut self, width: u32, height: u32) {
        if let (Some(surface), Some(camera)) = (self.surface.as_mut(), self.camera.as_mut()) {
            InputBridge::resize(surface, camera, width, height);
        }
    }

    /// Forward a winit window event to the input bridge.
    pub fn handle_window_event(&mut self, event: &winit::event::WindowEvent) {
        self.bridge.handle_window_event(event);
    }

    /// Translate a surface-relative pointer position into NDC.
    ///
    /// Returns `None` before a surface exists or after disposal.
    pub fn pointer_ndc(&self, position: Vec2) -> Option<Vec2> {
        let surface = self.surface.as_ref()?;
        let rect = HostRect::sized(surface.width() as f32, surface.height() as f32);
        Some(InputBridge::pointer_to_ndc(position, &rect))
    }

    /// Pick scene nodes under an NDC point, nearest first.
    ///
    /// Empty before a scene exists or after disposal.
    pub fn pick(&self, ndc: Vec2) -> Vec<RayHit> {
        match (self.scene.as_ref(), self.camera.as_ref()) {
            (Some(scene), Some(camera)) => pick(ndc, camera, scene),
            _ => Vec::new(),
        }
    }

    /// A liveness token for async work targeting this session.
    pub fn live_token(&self) -> LiveToken {
        LiveToken::from_flag(&self.alive)
    }

    /// The scene graph, while one exists.
    pub fn scene(&self) -> Option<&SceneGraph> {
        self.scene.as_ref()
    }

    /// Mutable scene graph access.
    pub fn scene_mut(&mut self) -> Option<&mut SceneGraph> {
        self.scene.as_mut()
    }

    /// The camera, while one exists.
    pub fn camera(&self) -> Option<&Camera> {
        self.camera.as_ref()
    }

    /// Mutable camera access.
    pub fn camera_mut(&mut self) -> Option<&mut Camera> {
        self.camera.as_mut()
    }

    /// The render surface, while one exists.
    pub fn surface(&self) -> Option<&RenderSurface> {
        self.surface.as_ref()
    }

    /// The input bridge.
    pub fn bridge(&self) -> &InputBridge {
        &self.bridge
    }

    /// The handle of the currently scheduled loop, if any.
    pub fn loop_handle(&self) -> Option<LoopHandle> {
        self.loop_handle
    }

    /// Release everything. Valid from any state, idempotent.
    ///
    /// Order: live flag, frame loop, listeners, surface, scene and camera.
    /// After this every lifecycle operation fails with
    /// [`SessionError::UseAfterDispose`].
    pub fn dispose(&mut self) {
        if self.state == Lifecycle::Disposed {
            return;
        }
        self.alive.store(false, Ordering::SeqCst);
        self.frame_loop.cancel_current();
        self.loop_handle = None;
        self.bridge.unsubscribe_all();
        if let Some(mut surface) = self.surface.take() {
            surface.dispose();
        }
        self.scene = None;
        self.camera = None;
        self.state = Lifecycle::Disposed;
        log::info!("session '{}' disposed", self.config.label);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Holder for the single current session.
///
/// The gallery shell shows one demo at a time; installing a new session
/// disposes the old one first, so two sessions never hold graphics resources
/// simultaneously.
#[derive(Default)]
pub struct SessionSlot {
    current: Option<Session>,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Dispose whatever is installed, then install `session`.
    pub fn install(&mut self, session: Session) {
        if let Some(mut old) = self.current.take() {
            old.dispose();
        }
        self.current = Some(session);
    }

    /// Dispose and drop the current session, if any.
    pub fn dispose_current(&mut self) {
        if let Some(mut session) = self.current.take() {
            session.dispose();
        }
    }

    /// Remove the current session without disposing it.
    pub fn take(&mut self) -> Option<Session> {
        self.current.take()
    }

    /// The installed session, if any.
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Mutable access to the installed session.
    pub fn current_mut(&mut self) -> Option<&mut Session> {
        self.current.as_mut()
    }

    /// True when no session is installed.
    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::picking::Collider;
    use crate::scene::Transform;
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn gallery_spec() -> CameraSpec {
        CameraSpec::Perspective {
            fov_y: 45.0,
            aspect: None,
            near: 0.1,
            far: 100.0,
            position: Vec3::new(0.0, 0.0, 10.0),
            look_at: Vec3::ZERO,
        }
    }

    fn ready_session() -> Session {
        let mut session = Session::create(SessionConfig::new("test"));
        session
            .attach_scene(|scene| {
                let plane = scene.add_mesh("plane", Transform::new(), None);
                scene.attach_collider(plane, Collider::box_collider(Vec3::new(2.0, 2.0, 0.1)));
                gallery_spec()
            })
            .unwrap();
        session
            .attach_surface(&HostContainer::offscreen(800, 600))
            .unwrap();
        session
    }

    #[test]
    fn lifecycle_walks_forward() {
        let mut session = Session::create(SessionConfig::new("walk"));
        assert_eq!(session.state(), Lifecycle::Uninitialized);

        session.attach_scene(|_| gallery_spec()).unwrap();
        assert_eq!(session.state(), Lifecycle::SceneReady);

        session
            .attach_surface(&HostContainer::offscreen(640, 480))
            .unwrap();
        assert_eq!(session.state(), Lifecycle::SurfaceReady);

        session.start(|_, _, _| Ok(())).unwrap();
        assert_eq!(session.state(), Lifecycle::Running);
        assert!(matches!(session.tick().unwrap(), TickOutcome::Ran(_)));

        session.dispose();
        assert_eq!(session.state(), Lifecycle::Disposed);
    }

    #[test]
    fn start_before_surface_is_invalid_transition() {
        let mut session = Session::create(SessionConfig::new("early"));
        session.attach_scene(|_| gallery_spec()).unwrap();
        let err = session.start(|_, _, _| Ok(())).unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition {
                from: Lifecycle::SceneReady,
                attempted: "start"
            }
        ));
    }

    #[test]
    fn attach_scene_twice_is_config_error() {
        let mut session = Session::create(SessionConfig::new("dup"));
        session.attach_scene(|_| gallery_spec()).unwrap();
        let err = session.attach_scene(|_| gallery_spec()).unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[test]
    fn dispose_is_idempotent_from_every_state() {
        for stage in 0..4 {
            let mut session = Session::create(SessionConfig::new("stages"));
            if stage >= 1 {
                session.attach_scene(|_| gallery_spec()).unwrap();
            }
            if stage >= 2 {
                session
                    .attach_surface(&HostContainer::offscreen(320, 240))
                    .unwrap();
            }
            if stage >= 3 {
                session.start(|_, _, _| Ok(())).unwrap();
            }
            session.dispose();
            session.dispose();
            assert_eq!(session.state(), Lifecycle::Disposed);
            assert!(session.scene().is_none());
            assert!(session.surface().is_none());
            assert!(session.bridge().subscriptions().is_empty());
        }
    }

    #[test]
    fn operations_after_dispose_fail() {
        let mut session = ready_session();
        session.dispose();

        assert!(matches!(
            session.attach_scene(|_| gallery_spec()),
            Err(SessionError::UseAfterDispose("attach_scene"))
        ));
        assert!(matches!(
            session.attach_surface(&HostContainer::offscreen(100, 100)),
            Err(SessionError::UseAfterDispose("attach_surface"))
        ));
        assert!(matches!(
            session.start(|_, _, _| Ok(())),
            Err(SessionError::UseAfterDispose("start"))
        ));
        assert!(session.pick(Vec2::ZERO).is_empty());
        assert!(session.pointer_ndc(Vec2::ZERO).is_none());
    }

    #[test]
    fn resize_updates_surface_and_camera_together() {
        let mut session = ready_session();
        assert_relative_eq!(
            session.camera().unwrap().aspect(),
            800.0 / 600.0,
            epsilon = 1e-5
        );

        session.handle_resize(400, 600);
        assert_eq!(session.surface().unwrap().width(), 400);
        assert_relative_eq!(
            session.camera().unwrap().aspect(),
            400.0 / 600.0,
            epsilon = 1e-5
        );

        // Uniform scaling keeps the aspect.
        session.handle_resize(800, 1200);
        assert_relative_eq!(
            session.camera().unwrap().aspect(),
            400.0 / 600.0,
            epsilon = 1e-5
        );
    }

    #[test]
    fn center_click_picks_the_plane() {
        let session = ready_session();

        let ndc = session
            .pointer_ndc(Vec2::new(400.0, 300.0))
            .unwrap();
        let hits = session.pick(ndc);
        assert_eq!(hits.len(), 1);

        // Near the corner the ray clears the 2x2 plane.
        let hits = session.pick(Vec2::new(0.99, 0.99));
        assert!(hits.is_empty());
    }

    #[test]
    fn callback_error_halts_but_session_survives() {
        let mut session = ready_session();
        session
            .start(|_, _, _| Err(FrameError::new("broken demo")))
            .unwrap();

        assert!(matches!(session.tick().unwrap(), TickOutcome::Halted(_)));
        assert_eq!(session.state(), Lifecycle::Running);
        assert!(session.loop_handle().is_none());
        assert!(matches!(session.tick().unwrap(), TickOutcome::Idle));

        // A fresh start recovers.
        session.start(|_, _, _| Ok(())).unwrap();
        assert!(matches!(session.tick().unwrap(), TickOutcome::Ran(_)));
    }

    #[test]
    fn input_edges_clear_on_idle_and_halted_ticks() {
        use winit::dpi::PhysicalPosition;
        use winit::event::WindowEvent;

        let mut session = ready_session();
        session
            .start(|_, _, _| Err(FrameError::new("broken demo")))
            .unwrap();

        let moved = WindowEvent::CursorMoved {
            device_id: winit::event::DeviceId::dummy(),
            position: PhysicalPosition::new(10.0, 20.0),
        };
        session.handle_window_event(&moved);
        assert_ne!(session.bridge().input().pointer_delta(), Vec2::ZERO);

        // The halting tick still clears per-frame state.
        assert!(matches!(session.tick().unwrap(), TickOutcome::Halted(_)));
        assert_eq!(session.bridge().input().pointer_delta(), Vec2::ZERO);

        // So do idle ticks after the loop has stopped.
        let moved_again = WindowEvent::CursorMoved {
            device_id: winit::event::DeviceId::dummy(),
            position: PhysicalPosition::new(30.0, 40.0),
        };
        session.handle_window_event(&moved_again);
        assert_ne!(session.bridge().input().pointer_delta(), Vec2::ZERO);
        assert!(matches!(session.tick().unwrap(), TickOutcome::Idle));
        assert_eq!(session.bridge().input().pointer_delta(), Vec2::ZERO);
    }

    #[test]
    fn slot_disposes_old_session_on_install() {
        let mut slot = SessionSlot::new();
        let first = ready_session();
        let first_token = first.live_token();
        slot.install(first);
        assert!(first_token.is_live());

        slot.install(ready_session());
        assert!(first_token.dead());
        assert!(!slot.is_empty());

        slot.dispose_current();
        assert!(slot.is_empty());
    }

    #[test]
    fn live_token_dies_on_dispose() {
        let mut session = ready_session();
        let token = session.live_token();
        assert!(token.is_live());
        session.dispose();
        assert!(token.dead());
    }
}
