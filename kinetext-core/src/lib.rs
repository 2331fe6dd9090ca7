//! # Kinetext Core
//!
//! Scene graph and behaviour engine for animated, interactive typography.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                    Book                     │
//! │   step(): behaviours → flush → frame → index│
//! ├──────────────────────┬──────────────────────┤
//! │  Behaviours          │  Text Tree           │
//! │  - Action pipelines  │  - Glyphs and groups │
//! │  - Physics           │  - Property maps     │
//! │  - Deform / reform   │  - Pages             │
//! ├──────────────────────┼──────────────────────┤
//! │  Input Queue         │  Spatial Index       │
//! │  - Host callbacks    │  - Uniform grid      │
//! └──────────────────────┴──────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod behaviour;
pub mod book;
pub mod builder;
pub mod config;
pub mod dform;
pub mod error;
pub mod input;
pub mod object;
pub mod physics;
pub mod property;
pub mod shared;
pub mod spatial;
pub mod vector;

pub use action::{Action, ActionContext, ActionResult, Multiplexer};
pub use behaviour::{Behaviour, BehaviourId, BehaviourMode};
pub use book::{Book, PageRenderer};
pub use builder::{build_text, BuiltText, GlyphOutline, GlyphSource};
pub use config::BookConfig;
pub use dform::{Pull, PullTarget, Reform, ReformStyle};
pub use error::{TextError, TextResult};
pub use input::{InputEvent, InputQueue, InputState, KeyEvent, KeyPhase, MouseButton, MouseState};
pub use object::{Glyph, ObjectId, ObjectKind, TextObject, TextTree};
pub use physics::{apply_angular_force, apply_force, Drag, Gravity, MouseInertia, Move};
pub use property::{Property, PropertyCell, PropertyKey, PropertyMap};
pub use shared::SharedBook;
pub use spatial::{Bounds, SpatialList};
pub use vector::Vector3;

/// Kinetext core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
