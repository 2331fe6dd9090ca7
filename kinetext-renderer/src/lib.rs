//! # Kinetext Renderer
//!
//! Turns the pages of a book into display lists and hands them to a backend.
//!
//! ## Rendering Backends
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │      Renderer (implements PageRenderer)     │
//! │   pages → display list → Frame              │
//! ├──────────────────────┬──────────────────────┤
//! │ Recording            │ Trace                │
//! │ (keeps frames)       │ (logs frames)        │
//! └──────────────────────┴──────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod display;
pub mod error;

pub use backend::recording::{FrameLog, RecordingBackend};
pub use backend::trace::TraceBackend;
pub use backend::RenderBackend;
pub use display::{DrawCommand, Frame};
pub use error::{RenderError, RenderResult};

use kinetext_core::{ObjectId, PageRenderer, TextResult, TextTree};
use serde::{Deserialize, Serialize};

/// Configuration for the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Backend to create.
    pub preferred_backend: BackendType,
    /// Surface width in pixels.
    pub width: u32,
    /// Surface height in pixels.
    pub height: u32,
    /// Background color (RGBA).
    pub background_color: [f32; 4],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            preferred_backend: BackendType::Trace,
            width: 800,
            height: 600,
            background_color: [1.0, 1.0, 1.0, 1.0], // White
        }
    }
}

/// Available rendering backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    /// Keeps submitted frames in memory.
    Recording,
    /// Logs submitted frames.
    Trace,
}

/// The main renderer interface.
///
/// Pages rendered through [`PageRenderer::render_page`] accumulate into the
/// current frame, which is submitted to the backend on
/// [`PageRenderer::finish_frame`].
pub struct Renderer {
    config: RendererConfig,
    backend: Box<dyn RenderBackend>,
    frame_count: u64,
    pending: Vec<DrawCommand>,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .field("backend", &self.backend.backend_type())
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Create a new renderer with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be sized to the configuration.
    pub fn new(config: RendererConfig) -> RenderResult<Self> {
        let backend: Box<dyn RenderBackend> = match config.preferred_backend {
            BackendType::Recording => Box::new(RecordingBackend::default()),
            BackendType::Trace => Box::new(TraceBackend::new(config.width, config.height)),
        };
        Self::with_backend(config, backend)
    }

    /// Create a renderer drawing to a caller-supplied backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be sized to the configuration.
    pub fn with_backend(
        config: RendererConfig,
        mut backend: Box<dyn RenderBackend>,
    ) -> RenderResult<Self> {
        backend.resize(config.width, config.height)?;
        tracing::debug!("Renderer using {:?} backend", backend.backend_type());
        Ok(Self {
            config,
            backend,
            frame_count: 0,
            pending: Vec::new(),
        })
    }

    /// Get the number of submitted frames.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the active backend type.
    #[must_use]
    pub fn active_backend(&self) -> BackendType {
        self.backend.backend_type()
    }

    /// Get the renderer configuration.
    #[must_use]
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Resize the rendering surface.
    ///
    /// # Errors
    ///
    /// Returns an error if resize fails.
    pub fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.backend.resize(width, height)?;
        self.config.width = width;
        self.config.height = height;
        Ok(())
    }

    /// Append a page to the current frame.
    ///
    /// On failure the partial frame is discarded, so the next page starts a
    /// fresh frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the page cannot be read from the tree.
    pub fn add_page(&mut self, name: &str, tree: &TextTree, page: ObjectId) -> RenderResult<()> {
        if self.pending.is_empty() {
            self.pending.push(DrawCommand::Clear {
                color: self.config.background_color,
            });
        }
        let result = display::page_commands(tree, name, page, &mut self.pending);
        if result.is_err() {
            self.pending.clear();
        }
        result
    }

    /// Submit the current frame to the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to draw the frame.
    pub fn present(&mut self) -> RenderResult<()> {
        let frame = Frame {
            number: self.frame_count,
            commands: std::mem::take(&mut self.pending),
        };
        self.backend.submit(&frame)?;
        self.frame_count += 1;
        Ok(())
    }
}

impl PageRenderer for Renderer {
    fn render_page(&mut self, name: &str, tree: &TextTree, page: ObjectId) -> TextResult<()> {
        Ok(self.add_page(name, tree, page)?)
    }

    fn finish_frame(&mut self) -> TextResult<()> {
        Ok(self.present()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_trace_backend() {
        let renderer = Renderer::new(RendererConfig::default()).expect("renderer");
        assert_eq!(renderer.active_backend(), BackendType::Trace);
        assert_eq!(renderer.frame_count(), 0);
    }

    #[test]
    fn test_config_from_json() {
        let config: RendererConfig =
            serde_json::from_str(r#"{"preferred_backend":"recording","width":320}"#)
                .expect("renderer config");
        assert_eq!(config.preferred_backend, BackendType::Recording);
        assert_eq!(config.width, 320);
        assert_eq!(config.height, 600);
    }

    #[test]
    fn test_zero_size_recording_surface_is_rejected() {
        let config = RendererConfig {
            preferred_backend: BackendType::Recording,
            width: 0,
            ..RendererConfig::default()
        };
        assert!(matches!(Renderer::new(config), Err(RenderError::Surface(_))));
    }
}
