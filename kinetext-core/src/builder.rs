//! Building text object trees from strings.
//!
//! A string becomes a group holding one group per word, each holding one
//! glyph per character. Glyph outlines come from a [`GlyphSource`], the
//! boundary to whatever font service the host provides.

use crate::error::TextResult;
use crate::object::{ObjectId, TextTree};
use crate::vector::Vector3;

/// Outline geometry for one character.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlyphOutline {
    /// Control points relative to the glyph origin.
    pub control_points: Vec<Vector3>,
    /// Horizontal distance to the next glyph origin.
    pub advance: f64,
}

/// Supplies glyph outlines for characters.
pub trait GlyphSource {
    /// Outline for `character`, or `None` if the font has no glyph for it.
    fn outline(&self, character: char) -> Option<GlyphOutline>;

    /// Advance used for whitespace between words.
    fn space_advance(&self) -> f64 {
        self.outline(' ').map_or(0.0, |outline| outline.advance)
    }
}

/// Objects created by one [`build_text`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltText {
    /// The group holding the whole string.
    pub text: ObjectId,
    /// One group per word, in order.
    pub words: Vec<ObjectId>,
    /// Every glyph, in order.
    pub glyphs: Vec<ObjectId>,
}

impl BuiltText {
    /// Every group created, outermost first.
    pub fn groups(&self) -> impl Iterator<Item = ObjectId> + '_ {
        std::iter::once(self.text).chain(self.words.iter().copied())
    }
}

/// Build `text` under `parent` at `position`.
///
/// Words are split on whitespace. Characters the source has no outline for
/// are skipped with a warning.
///
/// # Errors
///
/// Returns an error if `parent` is not a live group.
pub fn build_text(
    tree: &mut TextTree,
    parent: ObjectId,
    source: &dyn GlyphSource,
    text: &str,
    position: Vector3,
    word_spacing: f64,
) -> TextResult<BuiltText> {
    let text_group = tree.add_group(parent, position)?;
    let mut built = BuiltText {
        text: text_group,
        words: Vec::new(),
        glyphs: Vec::new(),
    };

    let space = source.space_advance() + word_spacing;
    let mut word_x = 0.0;
    for word in text.split_whitespace() {
        let word_group = tree.add_group(text_group, Vector3::xy(word_x, 0.0))?;
        built.words.push(word_group);

        let mut glyph_x = 0.0;
        for character in word.chars() {
            let Some(outline) = source.outline(character) else {
                tracing::warn!("No outline for {:?}, skipping", character);
                continue;
            };
            let glyph = tree.add_glyph(
                word_group,
                character.to_string(),
                Vector3::xy(glyph_x, 0.0),
                outline.control_points,
            )?;
            built.glyphs.push(glyph);
            glyph_x += outline.advance;
        }
        word_x += glyph_x + space;
    }

    tracing::debug!(
        "Built {:?}: {} words, {} glyphs",
        text,
        built.words.len(),
        built.glyphs.len()
    );
    Ok(built)
}
