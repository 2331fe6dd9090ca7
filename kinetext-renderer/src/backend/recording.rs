//! Backend that keeps submitted frames for later inspection.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::display::Frame;
use crate::error::RenderError;
use crate::{BackendType, RenderResult};

use super::RenderBackend;

/// Shared view of the frames a [`RecordingBackend`] received.
#[derive(Debug, Clone, Default)]
pub struct FrameLog {
    frames: Arc<Mutex<VecDeque<Frame>>>,
}

impl FrameLog {
    /// Number of recorded frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no frame has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The most recent frame.
    #[must_use]
    pub fn last(&self) -> Option<Frame> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
    }

    /// Every recorded frame.
    #[must_use]
    pub fn frames(&self) -> Vec<Frame> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

/// Records frames, keeping at most `capacity` of the most recent.
#[derive(Debug)]
pub struct RecordingBackend {
    log: FrameLog,
    capacity: usize,
}

impl RecordingBackend {
    /// Create a backend keeping the last `capacity` frames.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            log: FrameLog::default(),
            capacity: capacity.max(1),
        }
    }

    /// A handle to the recorded frames that stays valid after the backend is
    /// moved into a renderer.
    #[must_use]
    pub fn log(&self) -> FrameLog {
        self.log.clone()
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new(16)
    }
}

impl RenderBackend for RecordingBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Recording
    }

    fn submit(&mut self, frame: &Frame) -> RenderResult<()> {
        let mut frames = self
            .log
            .frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if frames.len() == self.capacity {
            frames.pop_front();
        }
        frames.push_back(frame.clone());
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) -> RenderResult<()> {
        if width == 0 || height == 0 {
            return Err(RenderError::Surface(format!(
                "Invalid surface size {width}x{height}"
            )));
        }
        Ok(())
    }
}
