//! Host container contract: the sized, attached element a surface binds to.
//!
//! The UI shell owns navigation and page mounting; a session only needs two
//! things from it: a sized, attached container before `attach_surface`, and a
//! detach notification so disposal can run before the container disappears.
//! [`HostContainer`] is that contract. A windowed host wraps a winit window;
//! an offscreen host is a plain sized box, which is what the unit tests and
//! headless demos use.

use std::sync::Arc;

use glam::Vec2;
use winit::window::Window;

/// The content box of a host container, in logical coordinates.
///
/// `left`/`top` locate the container within its page so pointer events can be
/// translated into container-relative NDC.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HostRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl HostRect {
    /// A rect anchored at the origin with the given size.
    pub fn sized(width: f32, height: f32) -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            width,
            height,
        }
    }

    /// Width / height ratio. Zero-height rects report an aspect of zero.
    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            self.width / self.height
        } else {
            0.0
        }
    }

    /// True if either dimension is zero or negative.
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// The center point of the rect in page coordinates.
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.left + self.width * 0.5, self.top + self.height * 0.5)
    }
}

/// A container element a [`RenderSurface`](crate::RenderSurface) binds to.
pub struct HostContainer {
    rect: HostRect,
    pixel_ratio: f64,
    attached: bool,
    window: Option<Arc<Window>>,
}

impl HostContainer {
    /// Wrap a mounted winit window as a host container.
    ///
    /// Size and device scale are read from the window.
    pub fn windowed(window: Arc<Window>) -> Self {
        let pixel_ratio = window.scale_factor();
        let size: winit::dpi::LogicalSize<f64> = window.inner_size().to_logical(pixel_ratio);
        Self {
            rect: HostRect::sized(size.width as f32, size.height as f32),
            pixel_ratio,
            attached: true,
            window: Some(window),
        }
    }

    /// A headless host with the given pixel size and a device scale of 1.
    pub fn offscreen(width: u32, height: u32) -> Self {
        Self {
            rect: HostRect::sized(width as f32, height as f32),
            pixel_ratio: 1.0,
            attached: true,
            window: None,
        }
    }

    /// Override the device pixel ratio (builder style).
    pub fn with_pixel_ratio(mut self, pixel_ratio: f64) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }

    /// Position the container within its page (builder style).
    pub fn with_offset(mut self, left: f32, top: f32) -> Self {
        self.rect.left = left;
        self.rect.top = top;
        self
    }

    /// The container's content box.
    pub fn rect(&self) -> HostRect {
        self.rect
    }

    /// Device pixel ratio of the host.
    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    /// True until [`detach`](Self::detach) is called.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// The backing window, if this is a windowed host.
    pub fn window(&self) -> Option<&Arc<Window>> {
        self.window.as_ref()
    }

    /// Update the content box after the host resizes.
    pub fn set_size(&mut self, width: f32, height: f32) {
        self.rect.width = width;
        self.rect.height = height;
    }

    /// Mark the container as removed from its page.
    ///
    /// Surface disposal stays safe after this; it just skips host cleanup.
    pub fn detach(&mut self) {
        self.attached = false;
        self.window = None;
    }
}
