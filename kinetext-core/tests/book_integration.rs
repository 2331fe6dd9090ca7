//! Book Integration Tests
//!
//! Tests complete frames through the public API:
//! - Drag, throw and integrate a glyph with mouse input
//! - Deferred removal requested by a behaviour mid-step
//! - Reforming a deformed glyph over several frames
//! - Configuration and page handling

use std::sync::{Arc, Mutex};

use kinetext_core::{
    Action, ActionContext, ActionResult, Behaviour, Book, BookConfig, Drag, GlyphOutline,
    GlyphSource, Gravity, InputEvent, MouseButton, MouseInertia, Move, Multiplexer, ObjectId,
    PropertyKey, Reform, TextResult, Vector3,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Every character is a 10x10 square advancing by 12.
struct SquareFont;

impl GlyphSource for SquareFont {
    fn outline(&self, _character: char) -> Option<GlyphOutline> {
        Some(GlyphOutline {
            control_points: vec![
                Vector3::ZERO,
                Vector3::xy(10.0, 0.0),
                Vector3::xy(10.0, 10.0),
                Vector3::xy(0.0, 10.0),
            ],
            advance: 12.0,
        })
    }
}

/// Requests removal of every object it sees on one frame.
struct RemoveOnFrame(u64);

impl Action for RemoveOnFrame {
    fn name(&self) -> &str {
        "remove-on-frame"
    }

    fn behave(&mut self, ctx: &mut ActionContext<'_>, id: ObjectId) -> TextResult<ActionResult> {
        if ctx.frame == self.0 {
            ctx.remove_object(id);
        }
        Ok(ActionResult::running())
    }
}

/// Records whether its objects are still in the tree when it runs.
struct Observe(Arc<Mutex<Vec<bool>>>);

impl Action for Observe {
    fn name(&self) -> &str {
        "observe"
    }

    fn behave(&mut self, ctx: &mut ActionContext<'_>, id: ObjectId) -> TextResult<ActionResult> {
        self.0
            .lock()
            .expect("observations")
            .push(ctx.contains(id));
        Ok(ActionResult::running())
    }
}

fn push_all(book: &Book, events: impl IntoIterator<Item = InputEvent>) {
    let queue = book.input_queue();
    for event in events {
        queue.push(event);
    }
}

#[test]
fn test_drag_and_throw_glyph() {
    init_tracing();
    let mut book = Book::new();
    let throw = Multiplexer::new()
        .with(Drag::new())
        .with(MouseInertia::new(1.0))
        .with(Move::default());
    book.add_glyph_behaviour(Behaviour::with_action("throw", throw));

    let built = book
        .add_text(&SquareFont, "a", Vector3::xy(100.0, 100.0), None)
        .expect("text");
    let glyph = built.glyphs[0];

    // Press over the glyph.
    push_all(
        &book,
        [
            InputEvent::MouseMoved { x: 105.0, y: 105.0 },
            InputEvent::MousePressed(MouseButton::Left),
        ],
    );
    book.step().expect("grab");
    let object = book.tree().object(glyph).expect("glyph");
    assert!(object.bool(&PropertyKey::Dragging).expect("dragging"));
    assert_eq!(object.position().expect("position"), Vector3::ZERO);

    // Carry it.
    push_all(&book, [InputEvent::MouseMoved { x: 115.0, y: 110.0 }]);
    book.step().expect("carry");
    assert_eq!(
        book.tree().object(glyph).expect("glyph").position().expect("position"),
        Vector3::xy(10.0, 5.0)
    );

    // Release while moving: thrown with the last displacement.
    push_all(
        &book,
        [
            InputEvent::MouseMoved { x: 119.0, y: 113.0 },
            InputEvent::MouseReleased(MouseButton::Left),
        ],
    );
    book.step().expect("throw");
    let object = book.tree().object(glyph).expect("glyph");
    assert!(!object.bool(&PropertyKey::Dragging).expect("dragging"));
    assert_eq!(
        object.vector(&PropertyKey::Velocity).expect("velocity"),
        Vector3::xy(4.0, 3.0)
    );
    let angular = object.number(&PropertyKey::AngularVelocity).expect("angular");
    assert!((angular - 5.0 * (3.0 / 5.001 / 100.0)).abs() < 1e-9);
    assert_eq!(object.position().expect("position"), Vector3::xy(14.0, 8.0));

    // Keeps flying without input.
    book.step().expect("fly");
    assert_eq!(
        book.tree().object(glyph).expect("glyph").position().expect("position"),
        Vector3::xy(18.0, 11.0)
    );
    assert_eq!(book.frame_count(), 4);

    // The spatial index followed the glyph.
    let bounds = book.spatial().bounds(glyph).expect("indexed");
    assert!(bounds.contains_point(123.0, 116.0));
}

#[test]
fn test_removal_is_deferred_until_all_behaviours_ran() {
    init_tracing();
    let mut book = Book::new();
    let observations = Arc::new(Mutex::new(Vec::new()));

    let remover = book.add_group_behaviour(Behaviour::with_action("remover", RemoveOnFrame(1)));
    let observer =
        book.add_glyph_behaviour(Behaviour::with_action("observer", Observe(observations.clone())));

    let built = book
        .add_text(&SquareFont, "hello world", Vector3::ZERO, None)
        .expect("text");
    let objects_before = book.tree().len();

    book.step().expect("frame 0");
    assert_eq!(book.tree().len(), objects_before);

    book.step().expect("frame 1");
    {
        let seen = observations.lock().expect("observations");
        assert_eq!(seen.len(), 2 * built.glyphs.len());
        assert!(seen.iter().all(|alive| *alive));
    }

    for id in built.groups().chain(built.glyphs.iter().copied()) {
        assert!(!book.tree().contains(id));
        assert!(!book.spatial().contains(id));
    }
    assert!(book.behaviour(remover).expect("remover").objects().is_empty());
    assert!(book.behaviour(observer).expect("observer").objects().is_empty());
    assert_eq!(book.tree().len(), objects_before - 1 - 2 - built.glyphs.len());
    book.tree().validate().expect("valid tree");

    // Nothing left to observe.
    book.step().expect("frame 2");
    assert_eq!(
        observations.lock().expect("observations").len(),
        2 * built.glyphs.len()
    );
}

#[test]
fn test_reform_restores_deformed_glyph() {
    init_tracing();
    let mut book = Book::new();
    book.add_glyph_behaviour(Behaviour::with_action("reform", Reform::linear(0.5)));
    let built = book
        .add_text(&SquareFont, "x", Vector3::ZERO, None)
        .expect("text");
    let glyph = built.glyphs[0];

    {
        let object = book.object_mut(glyph).expect("glyph");
        object.control_points_mut().expect("points")[0].set(Vector3::xy(4.0, 0.0));
        object.set_deformed(true).expect("deform");
    }

    let mut frames = 0;
    while book.tree().object(glyph).expect("glyph").is_deformed() {
        book.step().expect("step");
        frames += 1;
        assert!(frames <= 10, "glyph never reformed");
    }
    // 4 -> 2 -> 1 -> 0.5, then 0.5 is close enough.
    assert_eq!(frames, 4);
    let points = book
        .tree()
        .object(glyph)
        .expect("glyph")
        .control_points()
        .expect("points")
        .to_vec();
    assert_eq!(*points[0].get(), Vector3::xy(0.5, 0.0));
    assert_eq!(*points[1].get(), *points[1].original());
}

#[test]
fn test_gravity_accelerates_group() {
    init_tracing();
    let mut book = Book::new();
    let fall = Multiplexer::new()
        .with(Gravity::new(Vector3::xy(0.0, 1.0)))
        .with(Move::default());
    book.add_group_behaviour(Behaviour::with_action("fall", fall));
    let built = book
        .add_text(&SquareFont, "drop", Vector3::ZERO, None)
        .expect("text");

    for _ in 0..3 {
        book.step().expect("step");
    }
    // Velocity 1, 2, 3 accumulated into the position.
    let position = book
        .tree()
        .object(built.text)
        .expect("text")
        .position()
        .expect("position");
    assert_eq!(position, Vector3::xy(0.0, 6.0));
    assert_eq!(
        book.tree().world_position(built.glyphs[0]).expect("world"),
        Vector3::xy(0.0, 6.0)
    );
}

#[test]
fn test_config_drives_book() {
    init_tracing();
    let config = BookConfig::from_json(r#"{"default_page": "Cover", "word_spacing": 8.0}"#)
        .expect("config");
    let mut book = Book::with_config(config);
    assert!(book.page("Cover").is_some());
    assert!(book.page("Default Text Page").is_none());

    let built = book
        .add_text(&SquareFont, "a b", Vector3::ZERO, Some("Cover"))
        .expect("text");
    // One 12 wide glyph, a 12 wide space and 8 extra.
    assert_eq!(
        book.tree().object(built.words[1]).expect("word").position().expect("position"),
        Vector3::xy(32.0, 0.0)
    );
}
