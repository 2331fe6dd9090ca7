//! Rendering backend implementations.

pub mod recording;
pub mod trace;

use crate::display::Frame;
use crate::{BackendType, RenderResult};

/// Trait for rendering backends.
pub trait RenderBackend: Send {
    /// Get the backend type.
    fn backend_type(&self) -> BackendType;

    /// Draw a finished frame.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn submit(&mut self, frame: &Frame) -> RenderResult<()>;

    /// Resize the rendering surface.
    ///
    /// # Errors
    ///
    /// Returns an error if resizing fails.
    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()>;
}
