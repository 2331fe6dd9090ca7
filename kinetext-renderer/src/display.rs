//! Display lists: what a frame draws, independent of the backend.

use kinetext_core::{ObjectId, TextTree};
use serde::{Deserialize, Serialize};

use crate::error::RenderResult;

/// One drawing instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DrawCommand {
    /// Clear the surface.
    Clear {
        /// Background color (RGBA).
        color: [f32; 4],
    },
    /// Following glyphs belong to this page.
    BeginPage {
        /// Page name.
        name: String,
    },
    /// Fill a glyph outline.
    Glyph {
        /// The glyph object.
        object: ObjectId,
        /// Character(s) the glyph shows.
        text: String,
        /// Outline in world coordinates.
        outline: Vec<[f64; 2]>,
        /// Whether the outline is currently deformed.
        deformed: bool,
    },
}

/// Commands for a whole frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Frame number, counted by the renderer.
    pub number: u64,
    /// Commands in draw order.
    pub commands: Vec<DrawCommand>,
}

impl Frame {
    /// Glyph commands of the frame.
    pub fn glyphs(&self) -> impl Iterator<Item = &DrawCommand> {
        self.commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::Glyph { .. }))
    }
}

/// Append the commands drawing `page` to `commands`, glyphs in document
/// order.
///
/// # Errors
///
/// Returns an error if the page or one of its glyphs is malformed.
pub fn page_commands(
    tree: &TextTree,
    name: &str,
    page: ObjectId,
    commands: &mut Vec<DrawCommand>,
) -> RenderResult<()> {
    commands.push(DrawCommand::BeginPage {
        name: name.to_string(),
    });
    for id in tree.glyphs(page) {
        let object = tree.object(id)?;
        let Some(glyph) = object.glyph() else {
            continue;
        };
        let outline = tree
            .world_control_points(id)?
            .into_iter()
            .map(|point| [point.x, point.y])
            .collect();
        commands.push(DrawCommand::Glyph {
            object: id,
            text: glyph.text().to_string(),
            outline,
            deformed: glyph.is_deformed(),
        });
    }
    Ok(())
}
