//! Render surface: the drawable target a session attaches to a host.
//!
//! A [`RenderSurface`] is created from an attached, sized [`HostContainer`].
//! Windowed hosts get a full wgpu context ([`GpuContext`]); offscreen hosts
//! get a headless target that tracks size and frame count, which keeps the
//! whole session lifecycle exercisable without a GPU. Everything above this
//! module treats the two identically.
//!
//! Disposal releases the graphics context and is idempotent; it also stays
//! safe when the host was detached first, in which case only host-side
//! cleanup is skipped.

use crate::error::SessionError;
use crate::gpu::GpuContext;
use crate::host::HostContainer;

/// Creation options for a render surface.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceOptions {
    /// Request 4x MSAA.
    pub antialias: bool,
    /// Request a compositable alpha mode so the page shows through the clear
    /// color's alpha.
    pub alpha: bool,
    /// Override the host's device pixel ratio. `None` uses the host's own.
    pub pixel_ratio: Option<f64>,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            antialias: true,
            alpha: false,
            pixel_ratio: None,
        }
    }
}

enum SurfaceTarget {
    /// Real wgpu surface bound to a window.
    Windowed(GpuContext),
    /// Headless target for tests and offscreen demos.
    Offscreen { width: u32, height: u32 },
}

/// Drawable target bound to one host container.
pub struct RenderSurface {
    target: Option<SurfaceTarget>,
    pixel_ratio: f64,
    frames_rendered: u64,
}

impl RenderSurface {
    /// Bind a surface to an attached host container.
    ///
    /// Fails with [`SessionError::ResourceUnavailable`] if the host is
    /// detached, its content box is degenerate, or (for windowed hosts) the
    /// wgpu bootstrap fails.
    pub fn new(host: &HostContainer, options: SurfaceOptions) -> Result<Self, SessionError> {
        if !host.is_attached() {
            return Err(SessionError::ResourceUnavailable(
                "host container is detached".into(),
            ));
        }
        let rect = host.rect();
        if rect.is_degenerate() {
            return Err(SessionError::ResourceUnavailable(format!(
                "host container has degenerate size {}x{}",
                rect.width, rect.height
            )));
        }

        let pixel_ratio = options.pixel_ratio.unwrap_or_else(|| host.pixel_ratio());
        let width = (rect.width as f64 * pixel_ratio).round().max(1.0) as u32;
        let height = (rect.height as f64 * pixel_ratio).round().max(1.0) as u32;

        let target = match host.window() {
            Some(window) => SurfaceTarget::Windowed(GpuContext::new(
                window.clone(),
                width,
                height,
                options.antialias,
                options.alpha,
            )?),
            None => SurfaceTarget::Offscreen { width, height },
        };

        Ok(Self {
            target: Some(target),
            pixel_ratio,
            frames_rendered: 0,
        })
    }

    /// Surface width in physical pixels. Zero once released.
    pub fn width(&self) -> u32 {
        match &self.target {
            Some(SurfaceTarget::Windowed(gpu)) => gpu.width(),
            Some(SurfaceTarget::Offscreen { width, .. }) => *width,
            None => 0,
        }
    }

    /// Surface height in physical pixels. Zero once released.
    pub fn height(&self) -> u32 {
        match &self.target {
            Some(SurfaceTarget::Windowed(gpu)) => gpu.height(),
            Some(SurfaceTarget::Offscreen { height, .. }) => *height,
            None => 0,
        }
    }

    /// Width / height ratio. One once released or zero-height.
    pub fn aspect(&self) -> f32 {
        let h = self.height();
        if h > 0 {
            self.width() as f32 / h as f32
        } else {
            1.0
        }
    }

    /// Device pixel ratio this surface was created with.
    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// Frames presented (or, offscreen, counted) so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Resize the drawable, ignoring zero-sized dimensions.
    pub fn resize(&mut self, width: u32, height: u32) {
        match &mut self.target {
            Some(SurfaceTarget::Windowed(gpu)) => gpu.resize(width, height),
            Some(SurfaceTarget::Offscreen {
                width: w,
                height: h,
            }) => {
                if width > 0 && height > 0 {
                    *w = width;
                    *h = height;
                }
            }
            None => {}
        }
    }

    /// Present one cleared frame.
    ///
    /// Windowed surfaces run a clear pass and present; offscreen surfaces
    /// just count the frame. Calling after release is a no-op.
    pub fn render_frame(&mut self, clear: [f64; 4]) -> Result<(), SessionError> {
        match &mut self.target {
            Some(SurfaceTarget::Windowed(gpu)) => {
                gpu.render_clear(wgpu::Color {
                    r: clear[0],
                    g: clear[1],
                    b: clear[2],
                    a: clear[3],
                })?;
            }
            Some(SurfaceTarget::Offscreen { .. }) => {}
            None => return Ok(()),
        }
        self.frames_rendered += 1;
        Ok(())
    }

    /// Release the graphics context. Idempotent, and safe after the host has
    /// already been detached.
    pub fn dispose(&mut self) {
        if self.target.take().is_some() {
            log::debug!("render surface released after {} frames", self.frames_rendered);
        }
    }

    /// True once [`dispose`](Self::dispose) has run.
    pub fn is_released(&self) -> bool {
        self.target.is_none()
    }
}
