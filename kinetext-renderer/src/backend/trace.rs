//! Headless backend that logs every frame.
//!
//! Useful when no drawing surface exists, e.g. when stepping a book on a
//! server or in tests.

use crate::display::{DrawCommand, Frame};
use crate::{BackendType, RenderResult};

use super::RenderBackend;

/// Logs frames through `tracing` instead of drawing them.
pub struct TraceBackend {
    width: u32,
    height: u32,
}

impl TraceBackend {
    /// Create a new trace backend.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Current surface size.
    #[must_use]
    pub const fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn render_command(command: &DrawCommand) {
        match command {
            DrawCommand::Clear { color } => tracing::trace!("Clear to {:?}", color),
            DrawCommand::BeginPage { name } => tracing::trace!("Page '{name}'"),
            DrawCommand::Glyph {
                object,
                text,
                outline,
                deformed,
            } => {
                let origin = outline.first().copied().unwrap_or_default();
                tracing::trace!(
                    "Glyph {object} '{text}' at ({}, {}) points={} deformed={deformed}",
                    origin[0],
                    origin[1],
                    outline.len()
                );
            }
        }
    }
}

impl Default for TraceBackend {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl RenderBackend for TraceBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Trace
    }

    fn submit(&mut self, frame: &Frame) -> RenderResult<()> {
        tracing::trace!(
            "Trace render frame {}: {} commands, viewport {}x{}",
            frame.number,
            frame.commands.len(),
            self.width,
            self.height
        );
        for command in &frame.commands {
            Self::render_command(command);
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.width = width;
        self.height = height;
        tracing::debug!("Trace backend resized to {}x{}", width, height);
        Ok(())
    }
}
