//! Camera factory and projection state.
//!
//! A [`Camera`] is built from a validated [`CameraSpec`] and owns a pose
//! (position, look-at target, up vector) plus a projection. The projection's
//! aspect must track the render surface: after every resize the session's
//! input bridge calls [`Camera::set_viewport_size`], which updates the main
//! aspect and every sub-view viewport in one step.
//!
//! # Example
//!
//! ```
//! use vitrine::{Camera, CameraSpec, Vec3};
//!
//! let camera = Camera::from_spec(
//!     CameraSpec::Perspective {
//!         fov_y: 60.0,
//!         aspect: None, // default to the surface ratio
//!         near: 0.1,
//!         far: 100.0,
//!         position: Vec3::new(0.0, 2.0, 8.0),
//!         look_at: Vec3::ZERO,
//!     },
//!     800.0 / 600.0,
//! )
//! .unwrap();
//!
//! let view_proj = camera.projection_matrix() * camera.view_matrix();
//! # let _ = view_proj;
//! ```

use glam::{Mat4, Vec3};

use crate::error::SessionError;

/// Tagged camera description accepted by the factory.
///
/// `fov_y` is in degrees. A perspective `aspect` of `None` defaults to the
/// current surface's width/height ratio.
#[derive(Clone, Copy, Debug)]
pub enum CameraSpec {
    Perspective {
        fov_y: f32,
        aspect: Option<f32>,
        near: f32,
        far: f32,
        position: Vec3,
        look_at: Vec3,
    },
    Orthographic {
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        near: f32,
        far: f32,
    },
}

/// Validated projection parameters.
#[derive(Clone, Copy, Debug)]
pub enum Projection {
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    fn from_spec(spec: CameraSpec, default_aspect: f32) -> Result<Self, SessionError> {
        let (near, far) = match spec {
            CameraSpec::Perspective { near, far, .. } => (near, far),
            CameraSpec::Orthographic { near, far, .. } => (near, far),
        };
        if near <= 0.0 {
            return Err(SessionError::InvalidCameraSpec(format!(
                "near plane must be positive (got {near})"
            )));
        }
        if near >= far {
            return Err(SessionError::InvalidCameraSpec(format!(
                "near plane must be closer than far plane (near {near}, far {far})"
            )));
        }

        Ok(match spec {
            CameraSpec::Perspective {
                fov_y,
                aspect,
                near,
                far,
                ..
            } => Projection::Perspective {
                fov_y,
                aspect: aspect.unwrap_or(default_aspect),
                near,
                far,
            },
            CameraSpec::Orthographic {
                left,
                right,
                top,
                bottom,
                near,
                far,
            } => Projection::Orthographic {
                left,
                right,
                top,
                bottom,
                near,
                far,
            },
        })
    }

    /// Projection matrix with wgpu's 0..1 depth range.
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(fov_y.to_radians(), aspect, near, far),
            Projection::Orthographic {
                left,
                right,
                top,
                bottom,
                near,
                far,
            } => Mat4::orthographic_rh(left, right, bottom, top, near, far),
        }
    }

    /// Current width/height ratio of the projection.
    pub fn aspect(&self) -> f32 {
        match *self {
            Projection::Perspective { aspect, .. } => aspect,
            Projection::Orthographic {
                left,
                right,
                top,
                bottom,
                ..
            } => {
                let h = top - bottom;
                if h != 0.0 { (right - left) / h } else { 0.0 }
            }
        }
    }

    /// Retarget the projection to a new aspect ratio.
    ///
    /// Perspective projections store it directly. Orthographic projections
    /// keep their vertical extents and recompute the horizontal ones around
    /// the current center, so the frustum stays undistorted when the surface
    /// changes shape.
    pub fn set_aspect(&mut self, new_aspect: f32) {
        match self {
            Projection::Perspective { aspect, .. } => *aspect = new_aspect,
            Projection::Orthographic {
                left,
                right,
                top,
                bottom,
                ..
            } => {
                let half_h = (*top - *bottom) * 0.5;
                let center = (*left + *right) * 0.5;
                let half_w = half_h * new_aspect;
                *left = center - half_w;
                *right = center + half_w;
            }
        }
    }
}

/// A normalized sub-region of the surface rendered with its own projection.
///
/// This is the array-camera case: one session camera that fans out over
/// several viewports (e.g. a grid of perspectives in a multi-view demo).
/// Pixel viewports are recomputed whenever the surface size changes.
#[derive(Clone, Copy, Debug)]
pub struct SubView {
    /// Region of the surface in normalized `[0, 1]` coordinates: x, y, w, h.
    pub region: [f32; 4],
    /// Pixel viewport (x, y, w, h), updated by `set_viewport_size`.
    pub viewport: (u32, u32, u32, u32),
    /// Projection used for this sub-view.
    pub projection: Projection,
}

/// Projection configuration plus pose, owned by one session.
#[derive(Clone, Debug)]
pub struct Camera {
    /// Eye position in world space.
    pub position: Vec3,
    /// Look-at target in world space.
    pub target: Vec3,
    /// Up vector (defaults to +Y).
    pub up: Vec3,
    projection: Projection,
    sub_views: Vec<SubView>,
}

impl Camera {
    /// Build a camera from a spec, validating the clip planes.
    ///
    /// Fails with [`SessionError::InvalidCameraSpec`] when `near <= 0` or
    /// `near >= far`. Orthographic cameras start at the default pose
    /// (origin-facing, ten units back on +Z).
    pub fn from_spec(spec: CameraSpec, default_aspect: f32) -> Result<Self, SessionError> {
        let projection = Projection::from_spec(spec, default_aspect)?;
        let (position, target) = match spec {
            CameraSpec::Perspective {
                position, look_at, ..
            } => (position, look_at),
            CameraSpec::Orthographic { .. } => (Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO),
        };
        Ok(Self {
            position,
            target,
            up: Vec3::Y,
            projection,
            sub_views: Vec::new(),
        })
    }

    /// Move the eye (builder style).
    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Aim at a target (builder style).
    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    /// Right-handed look-at view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Projection matrix of the main view.
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }

    /// The main projection.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Current aspect ratio of the main view.
    pub fn aspect(&self) -> f32 {
        self.projection.aspect()
    }

    /// Set the main view's aspect ratio without touching sub-views.
    ///
    /// Prefer [`set_viewport_size`](Self::set_viewport_size), which keeps
    /// sub-view viewports in step; this is the low-level half of it.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.projection.set_aspect(aspect);
    }

    /// Add a sub-view covering `region` (normalized x, y, w, h).
    ///
    /// The sub-view's pixel viewport stays zero until the next
    /// `set_viewport_size` call.
    pub fn push_sub_view(
        &mut self,
        region: [f32; 4],
        spec: CameraSpec,
    ) -> Result<(), SessionError> {
        let projection = Projection::from_spec(spec, self.projection.aspect())?;
        self.sub_views.push(SubView {
            region,
            viewport: (0, 0, 0, 0),
            projection,
        });
        Ok(())
    }

    /// Registered sub-views.
    pub fn sub_views(&self) -> &[SubView] {
        &self.sub_views
    }

    /// Retarget the camera to a new surface size.
    ///
    /// Updates the main aspect and recomputes every sub-view's pixel viewport
    /// and aspect. Callers must not resize the surface without also calling
    /// this; the input bridge does both together.
    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let (w, h) = (width as f32, height as f32);
        self.projection.set_aspect(w / h);
        for sub in &mut self.sub_views {
            let [rx, ry, rw, rh] = sub.region;
            let px = (rx * w).round().max(0.0) as u32;
            let py = (ry * h).round().max(0.0) as u32;
            let pw = (rw * w).round().max(1.0) as u32;
            let ph = (rh * h).round().max(1.0) as u32;
            sub.viewport = (px, py, pw, ph);
            sub.projection.set_aspect(pw as f32 / ph as f32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn perspective(near: f32, far: f32) -> CameraSpec {
        CameraSpec::Perspective {
            fov_y: 60.0,
            aspect: None,
            near,
            far,
            position: Vec3::new(0.0, 0.0, 5.0),
            look_at: Vec3::ZERO,
        }
    }

    #[test]
    fn rejects_non_positive_near() {
        let err = Camera::from_spec(perspective(0.0, 100.0), 1.0).unwrap_err();
        assert!(matches!(err, SessionError::InvalidCameraSpec(_)));
        let err = Camera::from_spec(perspective(-1.0, 100.0), 1.0).unwrap_err();
        assert!(matches!(err, SessionError::InvalidCameraSpec(_)));
    }

    #[test]
    fn rejects_near_not_before_far() {
        let err = Camera::from_spec(perspective(10.0, 10.0), 1.0).unwrap_err();
        assert!(matches!(err, SessionError::InvalidCameraSpec(_)));
        let err = Camera::from_spec(
            CameraSpec::Orthographic {
                left: -1.0,
                right: 1.0,
                top: 1.0,
                bottom: -1.0,
                near: 5.0,
                far: 1.0,
            },
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::InvalidCameraSpec(_)));
    }

    #[test]
    fn unspecified_aspect_defaults_to_surface_ratio() {
        let camera = Camera::from_spec(perspective(0.1, 100.0), 800.0 / 600.0).unwrap();
        assert_relative_eq!(camera.aspect(), 800.0 / 600.0);
    }

    #[test]
    fn explicit_aspect_wins_over_default() {
        let camera = Camera::from_spec(
            CameraSpec::Perspective {
                fov_y: 60.0,
                aspect: Some(2.0),
                near: 0.1,
                far: 100.0,
                position: Vec3::ZERO,
                look_at: Vec3::NEG_Z,
            },
            1.0,
        )
        .unwrap();
        assert_relative_eq!(camera.aspect(), 2.0);
    }

    #[test]
    fn orthographic_set_aspect_keeps_vertical_extents() {
        let mut camera = Camera::from_spec(
            CameraSpec::Orthographic {
                left: -2.0,
                right: 2.0,
                top: 2.0,
                bottom: -2.0,
                near: 0.1,
                far: 10.0,
            },
            1.0,
        )
        .unwrap();
        camera.set_aspect(0.5);
        assert_relative_eq!(camera.aspect(), 0.5);
        match *camera.projection() {
            Projection::Orthographic {
                left,
                right,
                top,
                bottom,
                ..
            } => {
                assert_relative_eq!(top, 2.0);
                assert_relative_eq!(bottom, -2.0);
                assert_relative_eq!(right - left, 2.0);
            }
            _ => panic!("expected orthographic projection"),
        }
    }

    #[test]
    fn viewport_size_updates_sub_views() {
        let mut camera = Camera::from_spec(perspective(0.1, 100.0), 1.0).unwrap();
        camera
            .push_sub_view([0.0, 0.0, 0.5, 1.0], perspective(0.1, 100.0))
            .unwrap();
        camera
            .push_sub_view([0.5, 0.0, 0.5, 1.0], perspective(0.1, 100.0))
            .unwrap();

        camera.set_viewport_size(800, 600);
        assert_relative_eq!(camera.aspect(), 800.0 / 600.0);

        let subs = camera.sub_views();
        assert_eq!(subs[0].viewport, (0, 0, 400, 600));
        assert_eq!(subs[1].viewport, (400, 0, 400, 600));
        assert_relative_eq!(subs[0].projection.aspect(), 400.0 / 600.0);
        assert_relative_eq!(subs[1].projection.aspect(), 400.0 / 600.0);
    }

    #[test]
    fn zero_viewport_size_is_ignored() {
        let mut camera = Camera::from_spec(perspective(0.1, 100.0), 1.5).unwrap();
        camera.set_viewport_size(0, 600);
        assert_relative_eq!(camera.aspect(), 1.5);
    }
}
