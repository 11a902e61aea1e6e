//! Input bridge: event subscriptions, pointer translation, atomic resize.
//!
//! [`Input`] tracks raw keyboard/mouse state from winit events. The
//! [`InputBridge`] wraps it with the per-session concerns: which listener
//! kinds the session has subscribed (so disposal can verify it unhooked
//! everything), the pointer-to-NDC transform every picking demo shares, and
//! the resize handler that updates surface, camera aspect, and sub-view
//! viewports as one step — a partial update would leave aspect and surface
//! visibly mismatched for a frame.

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::camera::Camera;
use crate::host::HostRect;
use crate::surface::RenderSurface;

/// Keyboard and mouse state fed by winit window events.
#[derive(Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    keys_released: HashSet<KeyCode>,
    buttons_down: HashSet<MouseButton>,
    buttons_pressed: HashSet<MouseButton>,
    buttons_released: HashSet<MouseButton>,
    pointer_position: Vec2,
    pointer_delta: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame state. Call once at the start of each frame.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.pointer_delta = Vec2::ZERO;
    }

    /// Fold a window event into the state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            if !self.keys_down.contains(&key) {
                                self.keys_pressed.insert(key);
                            }
                            self.keys_down.insert(key);
                        }
                        ElementState::Released => {
                            self.keys_down.remove(&key);
                            self.keys_released.insert(key);
                        }
                    }
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    if !self.buttons_down.contains(button) {
                        self.buttons_pressed.insert(*button);
                    }
                    self.buttons_down.insert(*button);
                }
                ElementState::Released => {
                    self.buttons_down.remove(button);
                    self.buttons_released.insert(*button);
                }
            },
            WindowEvent::CursorMoved { position, .. } => {
                let new_pos = Vec2::new(position.x as f32, position.y as f32);
                self.pointer_delta += new_pos - self.pointer_position;
                self.pointer_position = new_pos;
            }
            _ => {}
        }
    }

    /// True while the key is held.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// True if the key went down this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// True if the key went up this frame.
    pub fn key_released(&self, key: KeyCode) -> bool {
        self.keys_released.contains(&key)
    }

    /// True while the button is held.
    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    /// True if the button went down this frame.
    pub fn button_pressed(&self, button: MouseButton) -> bool {
        self.buttons_pressed.contains(&button)
    }

    /// True if the button went up this frame.
    pub fn button_released(&self, button: MouseButton) -> bool {
        self.buttons_released.contains(&button)
    }

    /// Pointer position in host coordinates.
    pub fn pointer_position(&self) -> Vec2 {
        self.pointer_position
    }

    /// Pointer movement this frame.
    pub fn pointer_delta(&self) -> Vec2 {
        self.pointer_delta
    }
}

/// Listener kinds a session can subscribe through its bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Subscription {
    Resize,
    Pointer,
    Keyboard,
}

/// Per-session event subscription bookkeeping and input translation.
pub struct InputBridge {
    input: Input,
    subscriptions: HashSet<Subscription>,
}

impl InputBridge {
    /// A bridge with no subscriptions.
    pub fn new() -> Self {
        Self {
            input: Input::new(),
            subscriptions: HashSet::new(),
        }
    }

    /// Register a listener kind for this session.
    pub fn subscribe(&mut self, subscription: Subscription) {
        self.subscriptions.insert(subscription);
    }

    /// Drop every registered listener. Disposal calls this; afterwards
    /// [`subscriptions`](Self::subscriptions) is empty.
    pub fn unsubscribe_all(&mut self) {
        self.subscriptions.clear();
        self.input = Input::new();
    }

    /// The currently registered listener kinds.
    pub fn subscriptions(&self) -> &HashSet<Subscription> {
        &self.subscriptions
    }

    /// True if the given kind is subscribed.
    pub fn is_subscribed(&self, subscription: Subscription) -> bool {
        self.subscriptions.contains(&subscription)
    }

    /// Raw input state.
    pub fn input(&self) -> &Input {
        &self.input
    }

    /// Mutable input state (for `begin_frame`).
    pub fn input_mut(&mut self) -> &mut Input {
        &mut self.input
    }

    /// Forward a window event to the input state, honoring subscriptions.
    pub fn handle_window_event(&mut self, event: &WindowEvent) {
        let wanted = match event {
            WindowEvent::KeyboardInput { .. } => self.is_subscribed(Subscription::Keyboard),
            WindowEvent::MouseInput { .. } | WindowEvent::CursorMoved { .. } => {
                self.is_subscribed(Subscription::Pointer)
            }
            _ => false,
        };
        if wanted {
            self.input.handle_event(event);
        }
    }

    /// Map a pointer position (page coordinates) into NDC relative to the
    /// host container's content box.
    ///
    /// The top-left corner maps to `(-1, 1)`, bottom-right to `(1, -1)`,
    /// center to `(0, 0)`.
    pub fn pointer_to_ndc(position: Vec2, rect: &HostRect) -> Vec2 {
        Vec2::new(
            ((position.x - rect.left) / rect.width) * 2.0 - 1.0,
            -((position.y - rect.top) / rect.height) * 2.0 + 1.0,
        )
    }

    /// Resize the surface and retarget the camera as one atomic step.
    ///
    /// Both mutations happen before this returns; a subsequent render can
    /// never observe a surface/aspect mismatch.
    pub fn resize(surface: &mut RenderSurface, camera: &mut Camera, width: u32, height: u32) {
        surface.resize(width, height);
        camera.set_viewport_size(surface.width(), surface.height());
    }
}

impl Default for InputBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ndc_corners_and_center() {
        let rect = HostRect::sized(800.0, 600.0);

        let top_left = InputBridge::pointer_to_ndc(Vec2::new(0.0, 0.0), &rect);
        assert_relative_eq!(top_left.x, -1.0);
        assert_relative_eq!(top_left.y, 1.0);

        let bottom_right = InputBridge::pointer_to_ndc(Vec2::new(800.0, 600.0), &rect);
        assert_relative_eq!(bottom_right.x, 1.0);
        assert_relative_eq!(bottom_right.y, -1.0);

        let center = InputBridge::pointer_to_ndc(Vec2::new(400.0, 300.0), &rect);
        assert_relative_eq!(center.x, 0.0);
        assert_relative_eq!(center.y, 0.0);
    }

    #[test]
    fn ndc_respects_host_offset() {
        let rect = HostRect {
            left: 100.0,
            top: 50.0,
            width: 200.0,
            height: 100.0,
        };
        let center = InputBridge::pointer_to_ndc(Vec2::new(200.0, 100.0), &rect);
        assert_relative_eq!(center.x, 0.0);
        assert_relative_eq!(center.y, 0.0);
    }

    #[test]
    fn subscriptions_round_trip() {
        let mut bridge = InputBridge::new();
        bridge.subscribe(Subscription::Resize);
        bridge.subscribe(Subscription::Pointer);
        bridge.subscribe(Subscription::Pointer);
        assert_eq!(bridge.subscriptions().len(), 2);

        bridge.unsubscribe_all();
        assert!(bridge.subscriptions().is_empty());
    }

    #[test]
    fn unsubscribed_events_are_ignored() {
        use winit::dpi::PhysicalPosition;

        let mut bridge = InputBridge::new();
        let moved = WindowEvent::CursorMoved {
            device_id: winit::event::DeviceId::dummy(),
            position: PhysicalPosition::new(10.0, 20.0),
        };

        bridge.handle_window_event(&moved);
        assert_eq!(bridge.input().pointer_position(), Vec2::ZERO);

        bridge.subscribe(Subscription::Pointer);
        bridge.handle_window_event(&moved);
        assert_eq!(bridge.input().pointer_position(), Vec2::new(10.0, 20.0));
    }
}
