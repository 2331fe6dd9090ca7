//! Renderer error types.

use kinetext_core::TextError;
use thiserror::Error;

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Errors that can occur during rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Surface error.
    #[error("Surface error: {0}")]
    Surface(String),

    /// Rendering frame failed.
    #[error("Frame render failed: {0}")]
    Frame(String),

    /// The page could not be read from the text tree.
    #[error("Scene error: {0}")]
    Scene(#[from] TextError),
}

impl From<RenderError> for TextError {
    fn from(error: RenderError) -> Self {
        match error {
            RenderError::Scene(inner) => inner,
            other => TextError::Render(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_errors_keep_their_kind() {
        let error: TextError = RenderError::Scene(TextError::RootRemoval).into();
        assert!(matches!(error, TextError::RootRemoval));
    }

    #[test]
    fn test_backend_errors_become_render_errors() {
        let error: TextError = RenderError::Surface("gone".to_string()).into();
        assert!(matches!(error, TextError::Render(message) if message == "Surface error: gone"));
    }
}
