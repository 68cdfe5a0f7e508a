//! Element tree to document conversion, driven by the node-type registry.
//!
//! Elements are matched against node types in registration order before mark
//! tags are considered, so `a[data-mention-id]` becomes a mention rather than
//! a link. Anything unrecognised degrades instead of failing: block-like
//! elements become paragraphs, inline wrappers are transparent.

use tracing::{debug, warn};

use crate::ast::{AttrValue, Attrs, Mark, Node, NodeType};
use crate::dom::{DomNode, Element};
use crate::fragment::normalize;
use crate::schema::{ContentExpr, DomSpec, NodeGroup, NodeSpec, Schema, TagRule};

/// Elements treated as blocks when they are not registered node types
const HTML_BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "center", "dd", "details", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "header", "li", "main", "nav", "ol", "section",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

pub struct DomParser<'a> {
    schema: &'a Schema,
}

impl<'a> DomParser<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Build a document node; never fails, an empty input yields one empty paragraph
    pub fn parse_document(&self, nodes: &[DomNode]) -> Node {
        let mut content = self.parse_blocks(nodes);
        if content.is_empty() {
            content.push(Node::paragraph(Vec::new()));
        }
        Node::doc(content)
    }

    fn parse_blocks(&self, nodes: &[DomNode]) -> Vec<Node> {
        let mut blocks = Vec::new();
        let mut inline = Vec::new();

        for node in nodes {
            match node {
                DomNode::Text(text) => {
                    if !text.trim().is_empty() {
                        inline.push(Node::text(text.clone()));
                    }
                }
                DomNode::Element(el) => {
                    if let Some(spec) = self.match_spec(el, NodeGroup::Block) {
                        flush_inline(&mut inline, &mut blocks);
                        blocks.push(self.parse_block(spec, el));
                    } else if self.match_spec(el, NodeGroup::Inline).is_some() || mark_for(el).is_some() {
                        self.parse_inline(std::slice::from_ref(node), &[], &mut inline);
                    } else if self.contains_block(el) {
                        flush_inline(&mut inline, &mut blocks);
                        blocks.extend(self.parse_blocks(&el.children));
                    } else if HTML_BLOCK_TAGS.contains(&el.tag.as_str()) {
                        warn!(tag = %el.tag, "unregistered block element, reading it as a paragraph");
                        flush_inline(&mut inline, &mut blocks);
                        let mut content = Vec::new();
                        self.parse_inline(&el.children, &[], &mut content);
                        blocks.push(Node::paragraph(normalize(content)));
                    } else {
                        debug!(tag = %el.tag, "unregistered inline element, keeping its content");
                        self.parse_inline(&el.children, &[], &mut inline);
                    }
                }
            }
        }

        flush_inline(&mut inline, &mut blocks);
        blocks
    }

    fn parse_inline(&self, nodes: &[DomNode], marks: &[Mark], out: &mut Vec<Node>) {
        for node in nodes {
            match node {
                DomNode::Text(text) => {
                    if !text.is_empty() {
                        out.push(Node::text_with_marks(text.clone(), marks.to_vec()));
                    }
                }
                DomNode::Element(el) => {
                    if let Some(spec) = self.match_spec(el, NodeGroup::Inline) {
                        if let Some(leaf) = self.parse_leaf(spec, el) {
                            out.push(leaf);
                        }
                    } else if let Some(mark) = mark_for(el) {
                        self.parse_inline(&el.children, &mark.add_to(marks), out);
                    } else {
                        self.parse_inline(&el.children, marks, out);
                    }
                }
            }
        }
    }

    fn parse_block(&self, spec: &NodeSpec, el: &Element) -> Node {
        let mut attrs = self.read_attrs(spec, el);
        let content = match spec.content {
            ContentExpr::Empty => Vec::new(),
            ContentExpr::Inline => {
                let mut content = Vec::new();
                self.parse_inline(&el.children, &[], &mut content);
                normalize(content)
            }
            ContentExpr::Text => {
                let (text, class_language) = code_text(spec.dom.as_ref(), el);
                let language_unset = matches!(attrs.get("language"), Some(AttrValue::Null));
                if let (Some(language), true) = (class_language, language_unset) {
                    attrs.insert(
                        "language".to_string(),
                        AttrValue::str(crate::languages::canonical_language(&language)),
                    );
                }
                if text.is_empty() {
                    Vec::new()
                } else {
                    vec![Node::text(text)]
                }
            }
            ContentExpr::Blocks => {
                let blocks = self.parse_blocks(&el.children);
                if blocks.is_empty() {
                    vec![Node::paragraph(Vec::new())]
                } else {
                    blocks
                }
            }
        };

        let node = Node::new(spec.node_type, attrs, content);
        match self.schema.check(&node) {
            Ok(()) => node,
            Err(err) => {
                warn!(node = spec.node_type.name(), %err, "invalid element, reading it as a paragraph");
                Node::paragraph_text(&el.text_content())
            }
        }
    }

    fn parse_leaf(&self, spec: &NodeSpec, el: &Element) -> Option<Node> {
        let node = Node::new(spec.node_type, self.read_attrs(spec, el), Vec::new());
        match self.schema.check(&node) {
            Ok(()) => Some(node),
            Err(err) => {
                warn!(node = spec.node_type.name(), %err, "invalid inline element, keeping its text");
                let text = el.text_content();
                (!text.is_empty()).then(|| Node::text(text))
            }
        }
    }

    fn read_attrs(&self, spec: &NodeSpec, el: &Element) -> Attrs {
        let dom = spec.dom.as_ref();
        let mut attrs = Attrs::new();
        for attr in &spec.attrs {
            let leveled = match dom.map(|d| d.tag) {
                Some(TagRule::Leveled { prefix, attr: name }) if name == attr.name => {
                    el.tag.strip_prefix(prefix).map(str::to_string)
                }
                _ => None,
            };
            let raw = leveled
                .or_else(|| attr.dom_attr.and_then(|a| el.attr(a)).map(str::to_string))
                .or_else(|| {
                    attr.fallback_attr
                        .and_then(|a| el.attr(a))
                        .filter(|v| !v.is_empty() && *v != "#")
                        .map(str::to_string)
                })
                .or_else(|| {
                    dom.and_then(|d| d.label_attr)
                        .filter(|&label| label == attr.name)
                        .map(|_| el.text_content())
                        .filter(|t| !t.is_empty())
                });
            attrs.insert(attr.name.to_string(), attr.from_markup(raw.as_deref()));
        }

        // A mention without a label shows its id
        if spec.node_type == NodeType::Mention {
            let missing_label = matches!(attrs.get("label"), Some(AttrValue::Str(label)) if label.is_empty());
            if let Some(id) = attrs.get("id").cloned().filter(|_| missing_label) {
                attrs.insert("label".to_string(), id);
            }
        }
        attrs
    }

    fn match_spec(&self, el: &Element, group: NodeGroup) -> Option<&'a NodeSpec> {
        self.schema
            .specs()
            .iter()
            .filter(|spec| spec.group == group)
            .find(|spec| spec.dom.as_ref().map(|dom| dom_matches(dom, el)).unwrap_or(false))
    }

    fn contains_block(&self, el: &Element) -> bool {
        el.children.iter().any(|child| match child {
            DomNode::Element(child) => {
                self.match_spec(child, NodeGroup::Block).is_some()
                    || HTML_BLOCK_TAGS.contains(&child.tag.as_str())
                    || self.contains_block(child)
            }
            DomNode::Text(_) => false,
        })
    }
}

fn dom_matches(dom: &DomSpec, el: &Element) -> bool {
    let tag_ok = match dom.tag {
        TagRule::Fixed(tag) => el.tag == tag,
        TagRule::Leveled { prefix, .. } => el
            .tag
            .strip_prefix(prefix)
            .and_then(|level| level.parse::<u8>().ok())
            .map(|level| (1..=6).contains(&level))
            .unwrap_or(false),
    };
    if !tag_ok {
        return false;
    }
    if dom.class_matches && dom.class.is_some_and(|class| el.has_class(class)) {
        return true;
    }
    match dom.discriminator {
        Some((attr, Some(value))) => el.attr(attr) == Some(value),
        Some((attr, None)) => el.attr(attr).is_some(),
        None => true,
    }
}

fn mark_for(el: &Element) -> Option<Mark> {
    match el.tag.as_str() {
        "strong" | "b" => Some(Mark::Bold),
        "em" | "i" => Some(Mark::Italic),
        "s" | "del" | "strike" => Some(Mark::Strike),
        "code" => Some(Mark::Code),
        "mark" => Some(Mark::Highlight {
            color: el.attr("data-color").map(str::to_string),
        }),
        "a" => el.attr("href").map(Mark::link),
        _ => None,
    }
}

/// Text of a code element and the language named by a `language-*` class
fn code_text(dom: Option<&DomSpec>, el: &Element) -> (String, Option<String>) {
    let inner = dom
        .and_then(|d| d.inner)
        .and_then(|inner| el.only_child_element().filter(|child| child.tag == inner));
    match inner {
        Some(code) => {
            let language = code.attr("class").and_then(|class| {
                class
                    .split_whitespace()
                    .find_map(|c| c.strip_prefix("language-"))
                    .map(str::to_string)
            });
            (code.text_content(), language)
        }
        None => (el.text_content(), None),
    }
}

fn flush_inline(inline: &mut Vec<Node>, blocks: &mut Vec<Node>) {
    if inline.is_empty() {
        return;
    }
    let content = normalize(std::mem::take(inline));
    if !content.is_empty() {
        blocks.push(Node::paragraph(content));
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{Mark, Node, NodeType};
    use crate::parser::parse;

    #[test]
    fn test_empty_input_has_one_paragraph() {
        assert_eq!(parse("").unwrap(), Node::doc(vec![Node::paragraph(vec![])]));
        assert_eq!(parse("  \n ").unwrap(), Node::doc(vec![Node::paragraph(vec![])]));
    }

    #[test]
    fn test_loose_inline_content_is_wrapped() {
        let doc = parse("hello <strong>world</strong>").unwrap();
        assert_eq!(
            doc,
            Node::doc(vec![Node::paragraph(vec![
                Node::text("hello "),
                Node::text_with_marks("world", vec![Mark::Bold]),
            ])])
        );
    }

    #[test]
    fn test_nested_marks_are_canonical() {
        let doc = parse(r#"<p><em><a href="/x"><b>t</b></a></em></p>"#).unwrap();
        let run = &doc.content[0].content[0];
        assert_eq!(run.marks, vec![Mark::link("/x"), Mark::Bold, Mark::Italic]);
    }

    #[test]
    fn test_mention_wins_over_link() {
        let doc = parse(
            r##"<p><a class="mention" href="#" data-mention-id="john-doe" data-mention-label="John Doe">John Doe</a></p>"##,
        )
        .unwrap();
        let mention = &doc.content[0].content[0];
        assert_eq!(mention.node_type, NodeType::Mention);
        assert_eq!(mention.attr_str("id"), Some("john-doe"));
        assert_eq!(mention.attr_str("label"), Some("John Doe"));
        assert!(mention.attr("url").unwrap().is_null());
    }

    #[test]
    fn test_mention_url_falls_back_to_href() {
        let doc = parse(r#"<p><a data-mention-id="x" href="/u/x">X</a></p>"#).unwrap();
        let mention = &doc.content[0].content[0];
        assert_eq!(mention.attr_str("url"), Some("/u/x"));
        assert_eq!(mention.attr_str("label"), Some("X"));
    }

    #[test]
    fn test_callout_kind_from_discriminator() {
        let doc = parse(r#"<div data-callout="warning"><p>Be careful</p></div>"#).unwrap();
        assert_eq!(
            doc.content[0],
            Node::callout("warning", vec![Node::paragraph_text("Be careful")])
        );
    }

    #[test]
    fn test_empty_callout_gets_a_paragraph() {
        let doc = parse(r#"<div class="callout" data-callout="tip"></div>"#).unwrap();
        assert_eq!(doc.content[0], Node::callout("tip", vec![Node::paragraph(vec![])]));
    }

    #[test]
    fn test_callout_class_without_kind_is_a_note() {
        let doc = parse(r#"<div class="callout"></div>"#).unwrap();
        assert_eq!(doc.content[0], Node::callout("note", vec![Node::paragraph(vec![])]));

        let doc = parse(r#"<div class="callout wide"><p>x</p></div>"#).unwrap();
        assert_eq!(doc.content[0], Node::callout("note", vec![Node::paragraph_text("x")]));
    }

    #[test]
    fn test_unknown_callout_kind_uses_default() {
        let doc = parse(r#"<div data-callout="bogus"><p>x</p></div>"#).unwrap();
        assert_eq!(doc.content[0].attr_str("type"), Some("note"));
    }

    #[test]
    fn test_unknown_block_becomes_paragraph() {
        let doc = parse("<p>a</p><section>b <em>c</em></section><p>d</p>").unwrap();
        assert_eq!(doc.content.len(), 3);
        assert_eq!(doc.content[1].node_type, NodeType::Paragraph);
        assert_eq!(doc.content[1].text_content(), "b c");
    }

    #[test]
    fn test_list_items_become_paragraphs() {
        let doc = parse("<ul><li>one</li><li>two</li></ul>").unwrap();
        assert_eq!(
            doc,
            Node::doc(vec![Node::paragraph_text("one"), Node::paragraph_text("two")])
        );
    }

    #[test]
    fn test_unknown_wrapper_with_blocks_is_transparent() {
        let doc = parse("<article><h2>T</h2><p>x</p></article>").unwrap();
        assert_eq!(doc.content[0], Node::heading(2, vec![Node::text("T")]));
        assert_eq!(doc.content[1], Node::paragraph_text("x"));
    }

    #[test]
    fn test_code_block_language_from_class() {
        let doc = parse(r#"<pre><code class="language-js">let a = 1 &lt; 2;</code></pre>"#).unwrap();
        assert_eq!(doc.content[0], Node::code_block(Some("javascript"), "let a = 1 < 2;"));
    }

    #[test]
    fn test_math_leaves() {
        let doc = parse(
            r#"<p>a <span data-type="inline-math" data-latex="E=mc^2"></span></p><div data-type="block-math" data-latex="\sum"></div>"#,
        )
        .unwrap();
        assert_eq!(doc.content[0].content[1], Node::inline_math("E=mc^2"));
        assert_eq!(doc.content[1], Node::block_math("\\sum"));
    }

    #[test]
    fn test_block_inside_paragraph_is_flattened() {
        let doc = parse("<p>a<div>b</div></p>").unwrap();
        assert_eq!(doc.content[0].text_content(), "ab");
    }
}
