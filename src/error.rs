//! Error taxonomy for session lifecycle and resource management.
//!
//! Lifecycle and validation errors are reported synchronously to the caller
//! and are never retried automatically. [`SessionError::ResourceUnavailable`]
//! at surface-creation time is terminal for that session: the host shell
//! should show a message instead of attempting to start the frame loop.

use thiserror::Error;

use crate::session::Lifecycle;

/// Errors produced by session lifecycle operations and resource factories.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Bad or duplicate attach (e.g. attaching a scene twice without an
    /// intervening dispose, or starting a loop that already has a live handle).
    #[error("configuration error: {0}")]
    Config(String),

    /// Camera spec violated `near > 0` or `near < far`.
    #[error("invalid camera spec: {0}")]
    InvalidCameraSpec(String),

    /// An operation was invoked in a state it is not valid for.
    #[error("invalid transition: cannot {attempted} while {from}")]
    InvalidTransition {
        /// The session's current lifecycle state.
        from: Lifecycle,
        /// The operation that was attempted.
        attempted: &'static str,
    },

    /// An operation was invoked after the session was disposed.
    #[error("use after dispose: {0}")]
    UseAfterDispose(&'static str),

    /// The host container is missing/detached, or graphics context creation
    /// failed (no suitable adapter, device request rejected).
    #[error("resource unavailable: {0}")]
    ResourceUnavailable(String),
}

/// Error returned by a frame callback.
///
/// The frame loop treats any callback error as fatal for the loop: it logs
/// the message and cancels itself rather than keep scheduling against a
/// possibly corrupt scene.
#[derive(Error, Debug)]
#[error("frame callback failed: {0}")]
pub struct FrameError(pub String);

impl FrameError {
    /// Convenience constructor from anything displayable.
    pub fn new(msg: impl std::fmt::Display) -> Self {
        Self(msg.to_string())
    }
}

/// Errors produced while loading an asset off the driving thread.
#[derive(Error, Debug)]
pub enum AssetError {
    /// The file could not be read.
    #[error("asset io error: {0}")]
    Io(#[from] std::io::Error),

    /// The file contents could not be decoded.
    #[error("asset decode error: {0}")]
    Decode(String),
}
