//! Longer editing sequences
//!
//! This tests:
//! - Markdown shortcuts typed in a row
//! - Enter and Backspace around block boundaries
//! - Formatting commands with undo
//! - Change notifications

use std::sync::Arc;

use parking_lot::Mutex;
use quill_editor::{Editor, EditorError, Key, Selection};
use quill_parser::{serialize, Mark, Node};

fn markup(blocks: Vec<Node>) -> String {
    serialize(&Node::doc(blocks))
}

#[test]
fn test_markdown_shortcuts_in_sequence() {
    let mut editor = Editor::with_content("<p></p>").unwrap();
    editor.type_text("## Title\n").unwrap();
    editor.type_text("**bold** and ~~gone~~ ").unwrap();

    assert_eq!(
        editor.get_content(),
        markup(vec![
            Node::heading(2, vec![Node::text("Title")]),
            Node::paragraph(vec![
                Node::text_with_marks("bold", vec![Mark::Bold]),
                Node::text(" and "),
                Node::text_with_marks("gone", vec![Mark::Strike]),
                Node::text(" "),
            ]),
        ])
    );
}

#[test]
fn test_blockquote_and_code_block_shortcuts() {
    let mut editor = Editor::with_content("<p></p>").unwrap();
    editor.type_text("> quoted").unwrap();
    assert_eq!(
        editor.get_content(),
        markup(vec![Node::blockquote(vec![Node::paragraph_text("quoted")])])
    );

    editor.set_content("<p></p>").unwrap();
    editor.type_text("```rust fn main() {}").unwrap();
    assert_eq!(
        editor.get_content(),
        markup(vec![Node::code_block(Some("rust"), "fn main() {}")])
    );
}

#[test]
fn test_rules_stay_quiet_in_code() {
    let mut editor = Editor::with_content("<pre><code></code></pre>").unwrap();
    editor.type_text("$x$ **b**\n## h").unwrap();
    assert_eq!(
        editor.get_content(),
        markup(vec![Node::code_block(None, "$x$ **b**\n## h")])
    );
}

#[test]
fn test_enter_then_backspace_joins_back() {
    let mut editor = Editor::with_content("<p>abcd</p>").unwrap();
    editor.set_selection(Selection::cursor(3)).unwrap();

    editor.handle_key(Key::Enter).unwrap();
    assert_eq!(
        editor.get_content(),
        markup(vec![Node::paragraph_text("ab"), Node::paragraph_text("cd")])
    );
    assert_eq!(editor.selection(), Selection::cursor(5));

    editor.handle_key(Key::Backspace).unwrap();
    assert_eq!(editor.get_content(), "<p>abcd</p>");
    assert_eq!(editor.selection(), Selection::cursor(3));
}

#[test]
fn test_backspace_at_heading_start_makes_paragraph() {
    let mut editor = Editor::with_content("<h3>Title</h3>").unwrap();
    editor.handle_key(Key::Backspace).unwrap();
    assert_eq!(editor.get_content(), "<p>Title</p>");
}

#[test]
fn test_toggle_mark_over_selection_and_undo() {
    let mut editor = Editor::with_content("<p>hello world</p>").unwrap();
    editor.set_selection(Selection::new(1, 6)).unwrap();

    editor.toggle_mark(Mark::Bold).unwrap();
    assert_eq!(
        editor.get_content(),
        markup(vec![Node::paragraph(vec![
            Node::text_with_marks("hello", vec![Mark::Bold]),
            Node::text(" world"),
        ])])
    );

    editor.toggle_mark(Mark::Bold).unwrap();
    assert_eq!(editor.get_content(), "<p>hello world</p>");

    editor.undo().unwrap();
    editor.undo().unwrap();
    assert_eq!(editor.get_content(), "<p>hello world</p>");
    assert!(!editor.can_undo());
}

#[test]
fn test_stored_mark_applies_to_next_typing() {
    let mut editor = Editor::with_content("<p>a</p>").unwrap();
    editor.set_selection(Selection::cursor(2)).unwrap();
    editor.toggle_mark(Mark::Italic).unwrap();
    editor.type_text("b").unwrap();

    assert_eq!(
        editor.get_content(),
        markup(vec![Node::paragraph(vec![
            Node::text("a"),
            Node::text_with_marks("b", vec![Mark::Italic]),
        ])])
    );
}

#[test]
fn test_block_commands() {
    let mut editor = Editor::with_content("<p>Title</p>").unwrap();

    editor.set_heading(1).unwrap();
    assert_eq!(editor.get_content(), "<h1>Title</h1>");
    editor.set_heading(1).unwrap();
    assert_eq!(editor.get_content(), "<p>Title</p>");

    editor.set_callout("tip").unwrap();
    assert_eq!(
        editor.get_content(),
        markup(vec![Node::callout("tip", vec![Node::paragraph_text("Title")])])
    );
    editor.set_callout("caution").unwrap();
    assert_eq!(
        editor.get_content(),
        markup(vec![Node::callout("caution", vec![Node::paragraph_text("Title")])])
    );

    assert!(matches!(
        editor.set_callout("bogus"),
        Err(EditorError::InvalidCalloutKind(_))
    ));
    assert!(matches!(editor.set_heading(7), Err(EditorError::Schema(_))));
}

#[test]
fn test_math_commands() -> anyhow::Result<()> {
    let mut editor = Editor::with_content("<p></p>")?;
    assert!(matches!(editor.insert_inline_math("  "), Err(EditorError::EmptyMath)));

    editor.insert_inline_math("a+b")?;
    assert_eq!(
        editor.get_content(),
        markup(vec![Node::paragraph(vec![Node::inline_math("a+b")])])
    );

    // The math node sits right after the paragraph start
    editor.update_math(1, "a-b")?;
    assert_eq!(
        editor.get_content(),
        markup(vec![Node::paragraph(vec![Node::inline_math("a-b")])])
    );
    Ok(())
}

#[test]
fn test_change_events_and_versions() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let mut editor = Editor::with_content("<p></p>").unwrap();
    editor.on_change(move |event| sink.lock().push((event.version, event.content.clone())));

    editor.type_text("hi").unwrap();
    editor.undo().unwrap();

    let events = events.lock();
    assert_eq!(events.len(), 3);
    assert_eq!(events[1], (2, "<p>hi</p>".to_string()));
    assert_eq!(events[2], (3, "<p>h</p>".to_string()));
    assert_eq!(editor.version(), 3);
}

#[test]
fn test_read_only_editor() {
    let mut editor = Editor::with_content("<p>x</p>").unwrap();
    editor.set_editable(false);

    assert!(matches!(editor.handle_key(Key::Enter), Err(EditorError::ReadOnly)));
    assert!(matches!(editor.toggle_mark(Mark::Bold), Err(EditorError::ReadOnly)));
    assert!(matches!(editor.undo(), Err(EditorError::ReadOnly)));

    editor.set_editable(true);
    editor.type_text("y").unwrap();
    assert_eq!(editor.get_content(), "<p>yx</p>");
}
