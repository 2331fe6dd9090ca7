//! Mouse and keyboard input handed from the host to the simulation.
//!
//! The host windowing toolkit may deliver events on its own callback thread.
//! Those callbacks push into an [`InputQueue`]; the simulation drains the queue
//! exactly once per step into an [`InputState`] that actions read.
//!
//! ```text
//! host callback thread          simulation thread
//! ────────────────────          ─────────────────
//! queue.push(MouseMoved) ──┐
//! queue.push(KeyTyped)   ──┼──► state.begin_frame(queue.drain())
//! queue.push(Released)   ──┘         │
//!                                    └──► actions read state.mouse()
//! ```

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::vector::Vector3;

/// A mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Middle button or wheel press.
    Middle,
    /// Secondary button.
    Right,
}

/// Phase of a keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPhase {
    /// Key went down.
    Pressed,
    /// Key went up.
    Released,
    /// A character was produced.
    Typed,
}

/// A keyboard event observed during a frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Phase of the event.
    pub phase: KeyPhase,
    /// Host key code.
    pub code: u32,
    /// Character produced, if any.
    pub character: Option<char>,
}

/// Raw input from the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum InputEvent {
    /// Pointer moved to canvas coordinates.
    MouseMoved {
        /// X position.
        x: f64,
        /// Y position.
        y: f64,
    },
    /// Mouse button went down.
    MousePressed(MouseButton),
    /// Mouse button went up.
    MouseReleased(MouseButton),
    /// Keyboard event.
    Key(KeyEvent),
}

impl InputEvent {
    /// Key pressed event.
    #[must_use]
    pub fn key_pressed(code: u32, character: Option<char>) -> Self {
        Self::Key(KeyEvent {
            phase: KeyPhase::Pressed,
            code,
            character,
        })
    }

    /// Key released event.
    #[must_use]
    pub fn key_released(code: u32, character: Option<char>) -> Self {
        Self::Key(KeyEvent {
            phase: KeyPhase::Released,
            code,
            character,
        })
    }

    /// Key typed event.
    #[must_use]
    pub fn key_typed(character: char) -> Self {
        Self::Key(KeyEvent {
            phase: KeyPhase::Typed,
            code: u32::from(character),
            character: Some(character),
        })
    }
}

/// Thread-safe producer side of the input handoff.
///
/// Clones share the same queue, so one clone can live in a host callback while
/// the book drains another.
#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    events: Arc<Mutex<VecDeque<InputEvent>>>,
}

impl InputQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event. Safe to call from any thread.
    pub fn push(&self, event: InputEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(event);
    }

    /// Take every queued event in arrival order.
    #[must_use]
    pub fn drain(&self) -> Vec<InputEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    /// Number of queued events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pointer state as of the current frame.
#[derive(Debug, Clone, Default)]
pub struct MouseState {
    position: Vector3,
    previous: Vector3,
    pressed: HashSet<MouseButton>,
    just_pressed: HashSet<MouseButton>,
    just_released: HashSet<MouseButton>,
}

impl MouseState {
    /// Pointer position this frame.
    #[must_use]
    pub const fn position(&self) -> Vector3 {
        self.position
    }

    /// Pointer position at the end of the previous frame.
    #[must_use]
    pub const fn previous(&self) -> Vector3 {
        self.previous
    }

    /// Pointer displacement since the previous frame.
    #[must_use]
    pub fn delta(&self) -> Vector3 {
        self.position - self.previous
    }

    /// Whether the button is currently held.
    #[must_use]
    pub fn is_pressed(&self, button: MouseButton) -> bool {
        self.pressed.contains(&button)
    }

    /// Whether the button went down during this frame.
    #[must_use]
    pub fn was_pressed(&self, button: MouseButton) -> bool {
        self.just_pressed.contains(&button)
    }

    /// Whether the button went up during this frame.
    #[must_use]
    pub fn was_released(&self, button: MouseButton) -> bool {
        self.just_released.contains(&button)
    }
}

/// Input snapshot read by actions during one step.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    mouse: MouseState,
    keys: Vec<KeyEvent>,
}

impl InputState {
    /// Create an empty input state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new frame and apply the events received since the last one.
    pub fn begin_frame(&mut self, events: impl IntoIterator<Item = InputEvent>) {
        self.mouse.previous = self.mouse.position;
        self.mouse.just_pressed.clear();
        self.mouse.just_released.clear();
        self.keys.clear();

        for event in events {
            match event {
                InputEvent::MouseMoved { x, y } => self.mouse.position = Vector3::xy(x, y),
                InputEvent::MousePressed(button) => {
                    self.mouse.pressed.insert(button);
                    self.mouse.just_pressed.insert(button);
                }
                InputEvent::MouseReleased(button) => {
                    self.mouse.pressed.remove(&button);
                    self.mouse.just_released.insert(button);
                }
                InputEvent::Key(key) => self.keys.push(key),
            }
        }
    }

    /// Pointer state.
    #[must_use]
    pub const fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    /// Keyboard events received this frame, in arrival order.
    #[must_use]
    pub fn key_events(&self) -> &[KeyEvent] {
        &self.keys
    }

    /// Characters typed this frame.
    pub fn typed(&self) -> impl Iterator<Item = char> + '_ {
        self.keys
            .iter()
            .filter(|key| key.phase == KeyPhase::Typed)
            .filter_map(|key| key.character)
    }
}
