//! Frame loop: a cancelable, generation-counted render scheduler.
//!
//! The driver (the winit runner, or a test harness) calls
//! [`FrameLoop::tick`] once per display refresh. The loop runs its callback
//! only while a live [`LoopHandle`] exists. Handles carry a generation
//! number, so canceling a stale handle is a safe no-op and restarting the
//! loop can never leave two callbacks scheduled against one surface:
//! [`FrameLoop::restart`] is the atomic cancel-then-start.
//!
//! Failure semantics are fail-stop: a callback error is logged and the loop
//! cancels itself rather than keep scheduling against a possibly corrupt
//! scene.

use std::time::{Duration, Instant};

use crate::camera::Camera;
use crate::error::{FrameError, SessionError};
use crate::scene::SceneGraph;

/// Per-tick frame timing snapshot.
#[derive(Clone, Copy, Debug)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped (see [`FrameClock`]).
    pub dt: f32,
    /// Seconds since the loop was (re)started.
    pub elapsed: f32,
    /// Monotonic frame counter, reset on restart.
    pub frame_index: u64,
}

/// Monotonic frame clock with delta-time clamps.
///
/// The minimum clamp prevents zero-dt frames from tight loops; the maximum
/// prevents simulation jumps after a stall (debugger pause, minimized
/// window).
#[derive(Clone, Debug)]
pub struct FrameClock {
    last: Instant,
    started: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    /// Clock with default clamps (0.1 ms .. 250 ms).
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last: now,
            started: now,
            frame_index: 0,
            dt_min: Duration::from_micros(100),
            dt_max: Duration::from_millis(250),
        }
    }

    /// Reset the baseline, e.g. after resuming from suspension.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.last = now;
        self.started = now;
        self.frame_index = 0;
    }

    /// Advance the clock and produce a [`FrameTime`].
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: now.saturating_duration_since(self.started).as_secs_f32(),
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque cancellation token for a scheduled loop.
///
/// A fresh handle is issued on every (re)start; only the handle from the
/// current generation cancels the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopHandle {
    generation: u64,
}

/// Callback run once per tick against the session's scene and camera.
pub type FrameCallback =
    Box<dyn FnMut(&mut SceneGraph, &mut Camera, FrameTime) -> Result<(), FrameError>>;

/// Result of a single [`FrameLoop::tick`].
#[derive(Debug)]
pub enum TickOutcome {
    /// No live handle; nothing ran.
    Idle,
    /// The callback ran; render this frame.
    Ran(FrameTime),
    /// The callback failed; the loop canceled itself.
    Halted(FrameError),
}

/// Drives one repeating render callback, at most one at a time.
pub struct FrameLoop {
    callback: Option<FrameCallback>,
    generation: u64,
    clock: FrameClock,
}

impl FrameLoop {
    /// A loop with no scheduled callback.
    pub fn new() -> Self {
        Self {
            callback: None,
            generation: 0,
            clock: FrameClock::new(),
        }
    }

    /// Schedule `callback`, refusing to stack on a live loop.
    ///
    /// Fails with [`SessionError::Config`] if a handle from a previous
    /// `start` is still live — cancel it first, or use
    /// [`restart`](Self::restart).
    pub fn start(&mut self, callback: FrameCallback) -> Result<LoopHandle, SessionError> {
        if self.callback.is_some() {
            return Err(SessionError::Config(
                "frame loop already has a live handle; cancel it or use restart".into(),
            ));
        }
        Ok(self.schedule(callback))
    }

    /// Cancel any live callback and schedule a new one, atomically.
    ///
    /// This is the only sanctioned way to re-enter a running loop; callers
    /// never get a window in which two callbacks are scheduled.
    pub fn restart(&mut self, callback: FrameCallback) -> LoopHandle {
        self.callback = None;
        self.schedule(callback)
    }

    fn schedule(&mut self, callback: FrameCallback) -> LoopHandle {
        self.generation = self.generation.wrapping_add(1);
        self.callback = Some(callback);
        self.clock.reset();
        LoopHandle {
            generation: self.generation,
        }
    }

    /// Cancel the loop if `handle` is the live one.
    ///
    /// Idempotent: canceling twice, or canceling a stale handle from an
    /// earlier generation, is a no-op.
    pub fn cancel(&mut self, handle: LoopHandle) {
        if handle.generation == self.generation {
            self.callback = None;
        }
    }

    /// Cancel whatever is scheduled, regardless of handle. Used by disposal.
    pub fn cancel_current(&mut self) {
        self.callback = None;
    }

    /// True while a callback is scheduled.
    pub fn is_live(&self) -> bool {
        self.callback.is_some()
    }

    /// Run the scheduled callback once, if any.
    ///
    /// On callback error the loop logs at error level and cancels itself;
    /// no further ticks run until the next (re)start.
    pub fn tick(&mut self, scene: &mut SceneGraph, camera: &mut Camera) -> TickOutcome {
        let Some(callback) = self.callback.as_mut() else {
            return TickOutcome::Idle;
        };
        let ft = self.clock.tick();
        match callback(scene, camera, ft) {
            Ok(()) => TickOutcome::Ran(ft),
            Err(err) => {
                log::error!("frame callback failed, stopping loop: {err}");
                self.callback = None;
                TickOutcome::Halted(err)
            }
        }
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraSpec;
    use glam::Vec3;
    use std::cell::Cell;
    use std::rc::Rc;

    fn scene_and_camera() -> (SceneGraph, Camera) {
        let camera = Camera::from_spec(
            CameraSpec::Perspective {
                fov_y: 60.0,
                aspect: None,
                near: 0.1,
                far: 100.0,
                position: Vec3::new(0.0, 0.0, 5.0),
                look_at: Vec3::ZERO,
            },
            1.0,
        )
        .unwrap();
        (SceneGraph::new(), camera)
    }

    fn counting_callback(counter: Rc<Cell<u32>>) -> FrameCallback {
        Box::new(move |_, _, _| {
            counter.set(counter.get() + 1);
            Ok(())
        })
    }

    #[test]
    fn cancel_stops_further_invocations() {
        let (mut scene, mut camera) = scene_and_camera();
        let counter = Rc::new(Cell::new(0));
        let mut frame_loop = FrameLoop::new();

        let handle = frame_loop.start(counting_callback(counter.clone())).unwrap();
        frame_loop.tick(&mut scene, &mut camera);
        frame_loop.tick(&mut scene, &mut camera);
        assert_eq!(counter.get(), 2);

        frame_loop.cancel(handle);
        frame_loop.tick(&mut scene, &mut camera);
        frame_loop.tick(&mut scene, &mut camera);
        assert_eq!(counter.get(), 2);

        // Idempotent.
        frame_loop.cancel(handle);
        assert!(!frame_loop.is_live());
    }

    #[test]
    fn start_refuses_second_live_handle() {
        let counter = Rc::new(Cell::new(0));
        let mut frame_loop = FrameLoop::new();
        let _handle = frame_loop.start(counting_callback(counter.clone())).unwrap();
        let err = frame_loop.start(counting_callback(counter)).unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[test]
    fn restart_issues_fresh_handle_and_runs_single_loop() {
        let (mut scene, mut camera) = scene_and_camera();
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));
        let mut frame_loop = FrameLoop::new();

        let old = frame_loop.start(counting_callback(first.clone())).unwrap();
        let new = frame_loop.restart(counting_callback(second.clone()));
        assert_ne!(old, new);

        frame_loop.tick(&mut scene, &mut camera);
        assert_eq!(first.get(), 0, "replaced callback must not run");
        assert_eq!(second.get(), 1);

        // The stale handle no longer cancels anything.
        frame_loop.cancel(old);
        assert!(frame_loop.is_live());
        frame_loop.cancel(new);
        assert!(!frame_loop.is_live());
    }

    #[test]
    fn callback_error_halts_the_loop() {
        let (mut scene, mut camera) = scene_and_camera();
        let counter = Rc::new(Cell::new(0));
        let c = counter.clone();
        let mut frame_loop = FrameLoop::new();

        frame_loop
            .start(Box::new(move |_, _, _| {
                c.set(c.get() + 1);
                Err(FrameError::new("boom"))
            }))
            .unwrap();

        assert!(matches!(
            frame_loop.tick(&mut scene, &mut camera),
            TickOutcome::Halted(_)
        ));
        assert!(!frame_loop.is_live());
        assert!(matches!(
            frame_loop.tick(&mut scene, &mut camera),
            TickOutcome::Idle
        ));
        assert_eq!(counter.get(), 1);
    }

    #[test]
    fn clock_clamps_and_counts() {
        let mut clock = FrameClock::new();
        let a = clock.tick();
        let b = clock.tick();
        assert_eq!(a.frame_index, 0);
        assert_eq!(b.frame_index, 1);
        assert!(a.dt >= 0.0001);
        assert!(b.dt <= 0.25);
    }
}
