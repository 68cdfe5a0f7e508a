/// Round-trip tests: documents built through the node constructors must come
/// back unchanged from `parse(serialize(doc))`
use crate::*;

fn assert_roundtrip(doc: &Node) {
    let serialized = serialize(doc);
    let reparsed = parse(&serialized).unwrap_or_else(|e| panic!("Failed to reparse {}: {}", serialized, e));
    assert_eq!(&reparsed, doc, "round trip changed the document via {}", serialized);
    assert_eq!(serialize(&reparsed), serialized);
}

#[test]
fn test_roundtrip_mixed_document() {
    let doc = Node::doc(vec![
        Node::heading(1, vec![Node::text("Release notes")]),
        Node::paragraph(vec![
            Node::text("See "),
            Node::text_with_marks("Docs", vec![Mark::link("https://example.com/a?b=1&c=2")]),
            Node::text(" and ask "),
            Node::mention("john-doe", "John Doe", None),
            Node::text(" or "),
            Node::mention("jane-smith", "Jane Smith", Some("https://example.com/u/jane")),
            Node::text(" "),
        ]),
        Node::callout(
            "warning",
            vec![
                Node::paragraph_text("Be careful"),
                Node::paragraph(vec![Node::inline_math("E=mc^2")]),
            ],
        ),
        Node::block_math("\\int_0^1 x^2 \\, dx < \"1\""),
        Node::paragraph(vec![]),
    ]);
    assert_roundtrip(&doc);
}

#[test]
fn test_roundtrip_every_callout_kind() {
    for kind in CALLOUT_KINDS {
        let doc = Node::doc(vec![Node::callout(kind, vec![Node::paragraph(vec![])])]);
        assert_roundtrip(&doc);
    }
}

#[test]
fn test_roundtrip_overlapping_marks() {
    let doc = Node::doc(vec![Node::paragraph(vec![
        Node::text_with_marks("a", vec![Mark::Bold]),
        Node::text_with_marks("b", vec![Mark::Bold, Mark::Italic]),
        Node::text_with_marks("c", vec![Mark::Italic]),
        Node::text_with_marks(
            "d",
            vec![
                Mark::Highlight {
                    color: Some("#ff0".to_string()),
                },
                Mark::Strike,
            ],
        ),
        Node::text_with_marks("e", vec![Mark::Code]),
        Node::text_with_marks("f", vec![Mark::Highlight { color: None }]),
    ])]);
    assert_roundtrip(&doc);
}

#[test]
fn test_roundtrip_nested_containers() {
    let doc = Node::doc(vec![Node::blockquote(vec![
        Node::paragraph_text("quoted"),
        Node::callout("tip", vec![Node::code_block(Some("python"), "if a < b:\n    pass\n")]),
    ])]);
    assert_roundtrip(&doc);
}

#[test]
fn test_roundtrip_inline_leaves() {
    let doc = Node::doc(vec![
        Node::paragraph(vec![
            Node::text("line"),
            Node::hard_break(),
            Node::text("next"),
            Node::image("/img/a.png", Some(""), Some("A \"title\"")),
        ]),
        Node::horizontal_rule(),
        Node::paragraph_text("  spaced  "),
    ]);
    assert_roundtrip(&doc);
}

#[test]
fn test_roundtrip_special_text() {
    let doc = Node::doc(vec![Node::paragraph_text("a &amp; <b> $x$ [!note] \u{a0}é")]);
    assert_roundtrip(&doc);
}

#[test]
fn test_external_markup_normalizes_once() {
    let source = "<h2>Title</h2>\n<p><b>bold</b> <i>it</i></p>\n<ul><li>item</li></ul>";
    let doc = parse(source).unwrap();
    assert_eq!(
        serialize(&doc),
        "<h2>Title</h2><p><strong>bold</strong> <em>it</em></p><p>item</p>"
    );
    assert_roundtrip(&doc);
}
