//! # vitrine
//!
//! Scene lifecycle plumbing for a gallery of 3D demo pages.
//!
//! Each demo page owns a [`Session`]: one scene graph, one camera, one
//! render surface, one frame loop, and one input bridge, walked through a
//! strict lifecycle (`attach_scene`, `attach_surface`, `start`, `dispose`).
//! The point of the crate is that switching demos never leaks: disposal
//! cancels the frame loop, unhooks input listeners, releases the graphics
//! context, and invalidates the [`LiveToken`]s held by in-flight asset
//! loads, in that order, every time.
//!
//! ## Quick start
//!
//! ```no_run
//! use vitrine::*;
//!
//! fn main() -> Result<(), SessionError> {
//!     run(
//!         AppConfig::new("spinning cube"),
//!         |scene| {
//!             let cube = scene.add_mesh("cube", Transform::new(), None);
//!             scene.attach_collider(cube, Collider::box_collider(Vec3::ONE));
//!             CameraSpec::Perspective {
//!                 fov_y: 60.0,
//!                 aspect: None,
//!                 near: 0.1,
//!                 far: 100.0,
//!                 position: Vec3::new(0.0, 2.0, 6.0),
//!                 look_at: Vec3::ZERO,
//!             }
//!         },
//!         |_scene, _camera, _frame| Ok(()),
//!     )
//! }
//! ```
//!
//! ## Headless use
//!
//! Every lifecycle path also works without a window: build a
//! [`HostContainer::offscreen`] host and drive [`Session::tick`] yourself.
//! That is how the crate's own tests exercise disposal, resize, and picking.

pub mod app;
pub mod assets;
pub mod camera;
pub mod error;
pub mod frame_loop;
pub mod gpu;
pub mod host;
pub mod input;
pub mod picking;
pub mod scene;
pub mod session;
pub mod surface;

pub use app::{run, run_with_pick, AppConfig};
pub use assets::{AssetLoader, ModelData, TextureData};
pub use camera::{Camera, CameraSpec, Projection, SubView};
pub use error::{AssetError, FrameError, SessionError};
pub use frame_loop::{FrameClock, FrameLoop, FrameTime, LoopHandle, TickOutcome};
pub use host::{HostContainer, HostRect};
pub use input::{Input, InputBridge, Subscription};
pub use picking::{pick, pick_with_ray, Collider, Ray, RayHit};
pub use scene::{Node, NodeKind, Parent, SceneGraph, Transform};
pub use session::{Lifecycle, LiveToken, Session, SessionConfig, SessionSlot};
pub use surface::{RenderSurface, SurfaceOptions};

// Math and windowing types that appear in the public API.
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
pub use hecs::Entity;
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;
