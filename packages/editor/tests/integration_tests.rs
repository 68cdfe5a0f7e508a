//! End-to-end tests through the `Editor` facade: typing, rules, history,
//! mentions and uploads

use std::sync::Arc;

use quill_editor::{
    Editor, EditorConfig, EditorError, ImageFile, Key, MentionItem, Selection, SuggestionPhase, Transaction,
    UploadError,
};
use quill_parser::{parse, serialize, Mark, Node, NodeType};

fn empty_editor() -> Editor {
    Editor::with_content("<p></p>").unwrap()
}

fn markup(blocks: Vec<Node>) -> String {
    serialize(&Node::doc(blocks))
}

fn mention_editor() -> Editor {
    let config = EditorConfig {
        content: "<p></p>".to_string(),
        mentions: vec![
            MentionItem::new("jane", "Jane Doe"),
            MentionItem::new("james", "James"),
            MentionItem::new("bob", "Bob"),
        ],
        ..EditorConfig::default()
    };
    Editor::new(config).unwrap()
}

#[test]
fn test_content_round_trip() {
    let doc = Node::doc(vec![
        Node::heading(2, vec![Node::text("Plan")]),
        Node::paragraph(vec![
            Node::text("Ask "),
            Node::mention("jane", "Jane Doe", Some("https://example.com/jane")),
            Node::text(" about "),
            Node::inline_math("x^2"),
        ]),
        Node::callout("tip", vec![Node::paragraph_text("Keep it short")]),
        Node::block_math("\\sum_i i"),
    ]);
    let source = serialize(&doc);

    let editor = Editor::with_content(&source).unwrap();
    assert_eq!(editor.get_content(), source);
    assert_eq!(parse(&editor.get_content()).unwrap(), doc);
}

#[test]
fn test_typed_callout_converts_on_space() {
    let mut editor = empty_editor();
    editor.type_text("[!warning] Be careful").unwrap();

    assert_eq!(
        editor.get_content(),
        markup(vec![Node::callout("warning", vec![Node::paragraph_text("Be careful")])])
    );
}

#[test]
fn test_callout_converts_on_enter() {
    let mut editor = Editor::with_content("<p>[!warning] Be careful</p>").unwrap();
    let end = Selection::at_end(editor.doc());
    editor.set_selection(end).unwrap();
    editor.handle_key(Key::Enter).unwrap();

    assert_eq!(
        editor.get_content(),
        markup(vec![Node::callout("warning", vec![Node::paragraph_text("Be careful")])])
    );
}

#[test]
fn test_unknown_callout_kind_stays_text() {
    let mut editor = empty_editor();
    editor.type_text("[!bogus] hello").unwrap();
    assert_eq!(editor.get_content(), markup(vec![Node::paragraph_text("[!bogus] hello")]));
}

#[test]
fn test_inline_math_converts() {
    let mut editor = empty_editor();
    editor.type_text("$E=mc^2$").unwrap();

    assert_eq!(
        editor.get_content(),
        markup(vec![Node::paragraph(vec![Node::inline_math("E=mc^2")])])
    );
    assert_eq!(editor.doc().count_type(NodeType::InlineMath), 1);
}

#[test]
fn test_blank_block_math_declines() {
    let mut editor = empty_editor();
    editor.type_text("$$ $$").unwrap();
    assert_eq!(editor.get_content(), markup(vec![Node::paragraph_text("$$ $$")]));
    assert_eq!(editor.doc().count_type(NodeType::BlockMath), 0);
}

#[test]
fn test_block_math_splits_paragraph() {
    let mut editor = empty_editor();
    editor.type_text("ab$$x$$").unwrap();

    assert_eq!(
        editor.get_content(),
        markup(vec![
            Node::paragraph_text("ab"),
            Node::block_math("x"),
            Node::paragraph(vec![]),
        ])
    );
}

#[test]
fn test_block_math_across_line_break() {
    let mut editor = empty_editor();
    editor.type_text("$$a").unwrap();
    editor.insert_text("\n").unwrap();
    editor.type_text("b$$").unwrap();

    let expected = markup(vec![Node::block_math("a\nb"), Node::paragraph(vec![])]);
    assert_eq!(editor.get_content(), expected);

    // Pasted in one go
    let mut editor = empty_editor();
    editor.insert_text("$$a\nb$$").unwrap();
    assert_eq!(editor.get_content(), expected);
    assert_eq!(editor.doc().content[0].attr_str("latex"), Some("a\nb"));
}

#[test]
fn test_markdown_link_then_plain_text() {
    let mut editor = empty_editor();
    editor.type_text("[Docs](https://example.com)").unwrap();
    editor.type_text("next").unwrap();

    assert_eq!(
        editor.get_content(),
        markup(vec![Node::paragraph(vec![
            Node::text_with_marks("Docs", vec![Mark::link("https://example.com")]),
            Node::text(" next"),
        ])])
    );
}

#[test]
fn test_undo_restores_initial_markup() {
    let mut editor = empty_editor();
    let initial = editor.get_content();

    editor.type_text("$E=mc^2$").unwrap();
    // Eight keystrokes plus the rewrite
    assert_eq!(editor.history().undo_levels(), 9);

    assert!(editor.undo().unwrap());
    assert_eq!(editor.get_content(), markup(vec![Node::paragraph_text("$E=mc^2$")]));

    while editor.can_undo() {
        editor.undo().unwrap();
    }
    assert_eq!(editor.get_content(), initial);

    while editor.can_redo() {
        editor.redo().unwrap();
    }
    assert_eq!(
        editor.get_content(),
        markup(vec![Node::paragraph(vec![Node::inline_math("E=mc^2")])])
    );
}

#[test]
fn test_selection_follows_edits_before_it() {
    let mut editor = Editor::with_content("<p>abc</p>").unwrap();
    editor.set_selection(Selection::cursor(3)).unwrap();

    editor
        .dispatch(Transaction::new().insert(1, vec![Node::text("xy")]))
        .unwrap();
    assert_eq!(editor.selection(), Selection::cursor(5));

    editor.dispatch(Transaction::new().delete(1, 2)).unwrap();
    assert_eq!(editor.selection(), Selection::cursor(4));
}

#[test]
fn test_mention_filtering_and_escape() {
    let mut editor = mention_editor();
    editor.type_text("@ja").unwrap();

    let suggestion = editor.suggestion();
    assert!(suggestion.is_active());
    assert_eq!(suggestion.query(), Some("ja"));
    let ids: Vec<_> = suggestion.items().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["jane", "james"]);

    assert!(editor.handle_key(Key::Escape).unwrap());
    assert!(!editor.suggestion().is_active());
    assert_eq!(editor.suggestion().phase(), SuggestionPhase::Dismissed);
    assert_eq!(editor.get_content(), markup(vec![Node::paragraph_text("@ja")]));

    // Still the same trigger: stays closed
    editor.type_text("n").unwrap();
    assert!(!editor.suggestion().is_active());
}

#[test]
fn test_mention_commit_with_keyboard() {
    let mut editor = mention_editor();
    editor.type_text("Hi @ja").unwrap();
    editor.handle_key(Key::ArrowDown).unwrap();
    editor.handle_key(Key::ArrowUp).unwrap();
    assert_eq!(editor.suggestion().selected_index(), Some(0));

    editor.handle_key(Key::Enter).unwrap();

    assert_eq!(
        editor.get_content(),
        markup(vec![Node::paragraph(vec![
            Node::text("Hi "),
            Node::mention("jane", "Jane Doe", None),
            Node::text(" "),
        ])])
    );
    assert!(!editor.suggestion().is_active());
    // Caret sits after the trailing space
    assert_eq!(editor.selection(), Selection::cursor(6));
}

#[test]
fn test_mention_list_updates_live() {
    let mut editor = mention_editor();
    editor.mention_source().write().push(MentionItem::new("jamal", "Jamal"));
    editor.type_text("@jam").unwrap();

    let ids: Vec<_> = editor.suggestion().items().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["james", "jamal"]);

    assert!(editor.click_suggestion(1).unwrap());
    assert_eq!(editor.doc().count_type(NodeType::Mention), 1);
}

#[test]
fn test_disabled_rules_leave_text_alone() {
    let config = EditorConfig::from_json(r#"{ "content": "<p></p>", "inputRules": { "callout": false } }"#).unwrap();
    let mut editor = Editor::new(config).unwrap();
    editor.type_text("[!note] x").unwrap();
    assert_eq!(editor.get_content(), markup(vec![Node::paragraph_text("[!note] x")]));
}

#[tokio::test]
async fn test_upload_inserts_image() {
    let mut editor = Editor::with_content("<p>ab</p>").unwrap();
    editor.set_selection(Selection::cursor(3)).unwrap();
    editor.set_uploader(Arc::new(|file: ImageFile| async move {
        Ok::<_, UploadError>(format!("https://cdn.example.com/{}", file.name))
    }));

    let inserted = editor
        .upload_and_insert(ImageFile::new("cat.png", "image/png", vec![0x89, 0x50]))
        .await
        .unwrap();

    assert!(inserted);
    assert_eq!(
        editor.get_content(),
        markup(vec![Node::paragraph(vec![
            Node::text("ab"),
            Node::image("https://cdn.example.com/cat.png", Some("cat.png"), None),
        ])])
    );
    assert!(editor.pending_uploads().is_empty());
}

#[tokio::test]
async fn test_failed_upload_leaves_document_alone() {
    let mut editor = Editor::with_content("<p>ab</p>").unwrap();
    editor.set_uploader(Arc::new(|_file: ImageFile| async move {
        Err::<String, _>(UploadError::Failed("boom".to_string()))
    }));

    let inserted = editor
        .upload_and_insert(ImageFile::new("cat.png", "image/png", Vec::new()))
        .await
        .unwrap();

    assert!(!inserted);
    assert_eq!(editor.get_content(), "<p>ab</p>");
    assert!(editor.pending_uploads().is_empty());
}

#[test]
fn test_upload_anchor_follows_typing() {
    let mut editor = Editor::with_content("<p>ab</p>").unwrap();
    editor.set_selection(Selection::cursor(3)).unwrap();
    editor.set_uploader(Arc::new(|_file: ImageFile| async move {
        Ok::<_, UploadError>("unused".to_string())
    }));

    let ticket = editor
        .upload_image(ImageFile::new("cat.png", "image/png", Vec::new()))
        .unwrap();
    editor.set_selection(Selection::cursor(1)).unwrap();
    editor.type_text("xy").unwrap();
    assert_eq!(editor.pending_uploads().get(ticket.id).map(|u| u.anchor), Some(5));

    assert!(editor
        .finish_upload(ticket.id, Ok("https://cdn.example.com/cat.png".to_string()))
        .unwrap());
    assert_eq!(
        editor.get_content(),
        markup(vec![Node::paragraph(vec![
            Node::text("xyab"),
            Node::image("https://cdn.example.com/cat.png", Some("cat.png"), None),
        ])])
    );
}

#[test]
fn test_upload_refusals() {
    let mut editor = Editor::with_content("<p>ab</p>").unwrap();
    let err = editor.upload_image(ImageFile::new("a.png", "image/png", Vec::new()));
    assert!(matches!(err, Err(EditorError::Upload(UploadError::NoUploader))));

    editor.set_uploader(Arc::new(|_file: ImageFile| async move {
        Ok::<_, UploadError>("unused".to_string())
    }));
    let err = editor.upload_image(ImageFile::new("a.svg", "image/svg+xml", Vec::new()));
    assert!(matches!(
        err,
        Err(EditorError::Upload(UploadError::UnsupportedType(ref t))) if t == "image/svg+xml"
    ));
    assert!(editor.pending_uploads().is_empty());
}

#[test]
fn test_filtering_by_label_or_id() {
    let config = EditorConfig {
        content: "<p></p>".to_string(),
        mentions: vec![
            MentionItem::new("john-doe", "John Doe"),
            MentionItem::new("jane-smith", "Jane Smith"),
        ],
        ..EditorConfig::default()
    };
    let mut editor = Editor::new(config).unwrap();
    editor.type_text("@ja").unwrap();

    let ids: Vec<_> = editor.suggestion().items().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["jane-smith"]);

    // Deleting the trigger ends the session
    for _ in 0..3 {
        editor.handle_key(Key::Backspace).unwrap();
    }
    assert!(!editor.suggestion().is_active());
    assert_eq!(editor.get_content(), "<p></p>");
}
