//! Render Integration Tests
//!
//! Tests drawing a book through the renderer:
//! - Pages become display lists in insertion order
//! - Frames reflect removals and motion after each step
//! - Errors from the renderer surface through the book

use kinetext_core::{
    Behaviour, Book, GlyphOutline, GlyphSource, Gravity, Move, Multiplexer, PropertyKey,
    TextError, Vector3,
};
use kinetext_renderer::{
    BackendType, DrawCommand, RecordingBackend, RenderBackend, RenderError, RenderResult, Renderer,
    RendererConfig,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Every character is a single point advancing by 10.
struct DotFont;

impl GlyphSource for DotFont {
    fn outline(&self, _character: char) -> Option<GlyphOutline> {
        Some(GlyphOutline {
            control_points: vec![Vector3::ZERO],
            advance: 10.0,
        })
    }
}

/// Fails every frame.
struct BrokenBackend;

impl RenderBackend for BrokenBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Trace
    }

    fn submit(&mut self, _frame: &kinetext_renderer::Frame) -> RenderResult<()> {
        Err(RenderError::Frame("device lost".to_string()))
    }

    fn resize(&mut self, _width: u32, _height: u32) -> RenderResult<()> {
        Ok(())
    }
}

fn recording_renderer() -> (Renderer, kinetext_renderer::FrameLog) {
    let backend = RecordingBackend::new(8);
    let log = backend.log();
    let renderer =
        Renderer::with_backend(RendererConfig::default(), Box::new(backend)).expect("renderer");
    (renderer, log)
}

#[test]
fn test_pages_render_in_order() {
    init_tracing();
    let mut book = Book::new();
    book.add_page("overlay").expect("page");
    book.add_text(&DotFont, "ab", Vector3::xy(5.0, 5.0), None)
        .expect("text");
    book.add_text(&DotFont, "c", Vector3::xy(0.0, 50.0), Some("overlay"))
        .expect("text");

    let (mut renderer, log) = recording_renderer();
    book.step_and_draw(&mut renderer).expect("frame");

    let frame = log.last().expect("frame");
    assert_eq!(frame.number, 0);
    assert!(matches!(frame.commands[0], DrawCommand::Clear { .. }));
    let pages: Vec<_> = frame
        .commands
        .iter()
        .filter_map(|command| match command {
            DrawCommand::BeginPage { name } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(pages, vec!["Default Text Page", "overlay"]);

    let texts: Vec<_> = frame
        .glyphs()
        .filter_map(|command| match command {
            DrawCommand::Glyph { text, outline, .. } => Some((text.clone(), outline[0])),
            _ => None,
        })
        .collect();
    assert_eq!(
        texts,
        vec![
            ("a".to_string(), [5.0, 5.0]),
            ("b".to_string(), [15.0, 5.0]),
            ("c".to_string(), [0.0, 50.0]),
        ]
    );
    assert_eq!(renderer.frame_count(), 1);
}

#[test]
fn test_frames_follow_simulation() {
    init_tracing();
    let mut book = Book::new();
    let fall = Multiplexer::new()
        .with(Gravity::new(Vector3::xy(0.0, 2.0)))
        .with(Move::default());
    book.add_glyph_behaviour(Behaviour::with_action("fall", fall));
    let built = book
        .add_text(&DotFont, "hi", Vector3::ZERO, None)
        .expect("text");

    let (mut renderer, log) = recording_renderer();
    book.step_and_draw(&mut renderer).expect("frame 0");

    book.remove_object(built.glyphs[1]);
    book.step_and_draw(&mut renderer).expect("frame 1");

    let frames = log.frames();
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].glyphs().count(), 2);
    assert_eq!(frames[1].glyphs().count(), 1);
    let remaining = frames[1].glyphs().next();
    match remaining {
        Some(DrawCommand::Glyph { outline, .. }) => assert_eq!(outline[0], [0.0, 6.0]),
        other => panic!("expected glyph, got {other:?}"),
    }
}

#[test]
fn test_backend_failure_reaches_caller() {
    init_tracing();
    let book = Book::new();
    let mut renderer =
        Renderer::with_backend(RendererConfig::default(), Box::new(BrokenBackend)).expect("renderer");

    let result = book.draw(&mut renderer);
    assert!(matches!(result, Err(TextError::Render(message)) if message.contains("device lost")));
    assert_eq!(renderer.frame_count(), 0);
}

#[test]
fn test_failed_page_does_not_leak_into_next_frame() {
    init_tracing();
    let mut book = Book::new();
    book.add_page("second").expect("page");
    book.add_text(&DotFont, "a", Vector3::ZERO, None)
        .expect("text");
    let broken = book
        .add_text(&DotFont, "b", Vector3::ZERO, Some("second"))
        .expect("text")
        .glyphs[0];

    let points = book
        .object_mut(broken)
        .expect("glyph")
        .properties_mut()
        .remove(&PropertyKey::ControlPoints)
        .expect("control points");

    let (mut renderer, log) = recording_renderer();
    assert!(book.draw(&mut renderer).is_err());
    assert!(log.is_empty());

    book.object_mut(broken)
        .expect("glyph")
        .properties_mut()
        .insert(PropertyKey::ControlPoints, points);
    book.draw(&mut renderer).expect("frame");

    let frame = log.last().expect("frame");
    assert_eq!(frame.number, 0);
    let clears = frame
        .commands
        .iter()
        .filter(|command| matches!(command, DrawCommand::Clear { .. }))
        .count();
    assert_eq!(clears, 1);
    let pages: Vec<_> = frame
        .commands
        .iter()
        .filter_map(|command| match command {
            DrawCommand::BeginPage { name } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(pages, vec!["Default Text Page", "second"]);
    assert_eq!(frame.glyphs().count(), 2);
}
