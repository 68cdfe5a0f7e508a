use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::languages::canonical_language;

/// Node type tags known to the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Doc,
    Paragraph,
    Heading,
    Blockquote,
    CodeBlock,
    CalloutNode,
    BlockMath,
    HorizontalRule,
    InlineMath,
    Mention,
    Image,
    HardBreak,
    Text,
}

impl NodeType {
    pub const ALL: [NodeType; 13] = [
        NodeType::Doc,
        NodeType::Paragraph,
        NodeType::Heading,
        NodeType::Blockquote,
        NodeType::CodeBlock,
        NodeType::CalloutNode,
        NodeType::BlockMath,
        NodeType::HorizontalRule,
        NodeType::InlineMath,
        NodeType::Mention,
        NodeType::Image,
        NodeType::HardBreak,
        NodeType::Text,
    ];

    /// Name used in JSON output and diagnostics
    pub fn name(self) -> &'static str {
        match self {
            NodeType::Doc => "doc",
            NodeType::Paragraph => "paragraph",
            NodeType::Heading => "heading",
            NodeType::Blockquote => "blockquote",
            NodeType::CodeBlock => "codeBlock",
            NodeType::CalloutNode => "calloutNode",
            NodeType::BlockMath => "blockMath",
            NodeType::HorizontalRule => "horizontalRule",
            NodeType::InlineMath => "inlineMath",
            NodeType::Mention => "mention",
            NodeType::Image => "image",
            NodeType::HardBreak => "hardBreak",
            NodeType::Text => "text",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Types that never hold children
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            NodeType::Text
                | NodeType::BlockMath
                | NodeType::HorizontalRule
                | NodeType::InlineMath
                | NodeType::Mention
                | NodeType::Image
                | NodeType::HardBreak
        )
    }

    pub fn is_inline(self) -> bool {
        matches!(
            self,
            NodeType::Text
                | NodeType::InlineMath
                | NodeType::Mention
                | NodeType::Image
                | NodeType::HardBreak
        )
    }

    pub fn is_block(self) -> bool {
        !self.is_inline() && self != NodeType::Doc
    }

    /// Blocks whose content is inline (text and inline leaves)
    pub fn is_textblock(self) -> bool {
        matches!(
            self,
            NodeType::Paragraph | NodeType::Heading | NodeType::CodeBlock
        )
    }
}

/// Attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Int(i64),
    Str(String),
}

impl AttrValue {
    pub fn str(value: impl Into<String>) -> Self {
        AttrValue::Str(value.into())
    }

    pub fn opt(value: Option<impl Into<String>>) -> Self {
        value.map(|v| AttrValue::Str(v.into())).unwrap_or(AttrValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }
}

pub type Attrs = BTreeMap<String, AttrValue>;

/// Inline style annotation carried by text runs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Link { href: String },
    Bold,
    Italic,
    Strike,
    Code,
    Highlight { color: Option<String> },
}

impl Mark {
    pub fn link(href: impl Into<String>) -> Self {
        Mark::Link { href: href.into() }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mark::Link { .. } => "link",
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Strike => "strike",
            Mark::Code => "code",
            Mark::Highlight { .. } => "highlight",
        }
    }

    /// Canonical ordering; also the nesting order in markup (lowest outermost)
    pub fn rank(&self) -> u8 {
        match self {
            Mark::Link { .. } => 0,
            Mark::Bold => 1,
            Mark::Italic => 2,
            Mark::Strike => 3,
            Mark::Code => 4,
            Mark::Highlight { .. } => 5,
        }
    }

    /// Whether text typed right after a run carrying this mark inherits it
    pub fn inclusive(&self) -> bool {
        !matches!(self, Mark::Link { .. })
    }

    pub fn same_kind(&self, other: &Mark) -> bool {
        self.rank() == other.rank()
    }

    /// Add to a mark set, replacing a mark of the same kind
    pub fn add_to(&self, set: &[Mark]) -> Vec<Mark> {
        let mut marks: Vec<Mark> = set.iter().filter(|m| !m.same_kind(self)).cloned().collect();
        marks.push(self.clone());
        marks.sort_by_key(Mark::rank);
        marks
    }

    /// Remove every mark of this kind from a set
    pub fn remove_from(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| !m.same_kind(self)).cloned().collect()
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.iter().any(|m| m.same_kind(self))
    }
}

/// Document tree node
///
/// Text runs carry `text` and `marks`; every other node carries `attrs` and,
/// for containers, `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Node {
    pub fn new(node_type: NodeType, attrs: Attrs, content: Vec<Node>) -> Self {
        Self {
            node_type,
            attrs,
            content,
            text: None,
            marks: Vec::new(),
        }
    }

    pub fn doc(content: Vec<Node>) -> Self {
        Self::new(NodeType::Doc, Attrs::new(), content)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::text_with_marks(text, Vec::new())
    }

    pub fn text_with_marks(text: impl Into<String>, mut marks: Vec<Mark>) -> Self {
        marks.sort_by_key(Mark::rank);
        Self {
            node_type: NodeType::Text,
            attrs: Attrs::new(),
            content: Vec::new(),
            text: Some(text.into()),
            marks,
        }
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Self::new(NodeType::Paragraph, Attrs::new(), content)
    }

    /// Paragraph holding one plain run (empty paragraph for "")
    pub fn paragraph_text(text: &str) -> Self {
        if text.is_empty() {
            Self::paragraph(Vec::new())
        } else {
            Self::paragraph(vec![Self::text(text)])
        }
    }

    pub fn heading(level: u8, content: Vec<Node>) -> Self {
        let mut attrs = Attrs::new();
        attrs.insert("level".into(), AttrValue::Int(i64::from(level)));
        Self::new(NodeType::Heading, attrs, content)
    }

    pub fn blockquote(content: Vec<Node>) -> Self {
        Self::new(NodeType::Blockquote, Attrs::new(), content)
    }

    pub fn code_block(language: Option<&str>, code: &str) -> Self {
        let mut attrs = Attrs::new();
        attrs.insert(
            "language".into(),
            AttrValue::opt(language.map(canonical_language)),
        );
        let content = if code.is_empty() {
            Vec::new()
        } else {
            vec![Self::text(code)]
        };
        Self::new(NodeType::CodeBlock, attrs, content)
    }

    pub fn callout(kind: &str, content: Vec<Node>) -> Self {
        let mut attrs = Attrs::new();
        attrs.insert("type".into(), AttrValue::str(kind));
        Self::new(NodeType::CalloutNode, attrs, content)
    }

    pub fn inline_math(latex: impl Into<String>) -> Self {
        Self::math(NodeType::InlineMath, latex)
    }

    pub fn block_math(latex: impl Into<String>) -> Self {
        Self::math(NodeType::BlockMath, latex)
    }

    fn math(node_type: NodeType, latex: impl Into<String>) -> Self {
        let mut attrs = Attrs::new();
        attrs.insert("latex".into(), AttrValue::str(latex));
        Self::new(node_type, attrs, Vec::new())
    }

    pub fn mention(id: &str, label: &str, url: Option<&str>) -> Self {
        let mut attrs = Attrs::new();
        attrs.insert("id".into(), AttrValue::str(id));
        attrs.insert("label".into(), AttrValue::str(label));
        attrs.insert("url".into(), AttrValue::opt(url));
        Self::new(NodeType::Mention, attrs, Vec::new())
    }

    pub fn image(src: &str, alt: Option<&str>, title: Option<&str>) -> Self {
        let mut attrs = Attrs::new();
        attrs.insert("src".into(), AttrValue::str(src));
        attrs.insert("alt".into(), AttrValue::opt(alt));
        attrs.insert("title".into(), AttrValue::opt(title));
        Self::new(NodeType::Image, attrs, Vec::new())
    }

    pub fn hard_break() -> Self {
        Self::new(NodeType::HardBreak, Attrs::new(), Vec::new())
    }

    pub fn horizontal_rule() -> Self {
        Self::new(NodeType::HorizontalRule, Attrs::new(), Vec::new())
    }

    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    pub fn is_leaf(&self) -> bool {
        self.node_type.is_leaf()
    }

    pub fn is_inline(&self) -> bool {
        self.node_type.is_inline()
    }

    pub fn is_block(&self) -> bool {
        self.node_type.is_block()
    }

    pub fn is_textblock(&self) -> bool {
        self.node_type.is_textblock()
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).and_then(AttrValue::as_str)
    }

    pub fn text_str(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// Number of positions this node occupies in its parent
    pub fn node_size(&self) -> usize {
        if self.is_text() {
            self.text_str().chars().count()
        } else if self.is_leaf() {
            1
        } else {
            self.content_size() + 2
        }
    }

    pub fn content_size(&self) -> usize {
        content_size(&self.content)
    }

    pub fn child_count(&self) -> usize {
        self.content.len()
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.content.get(index)
    }

    /// Concatenated text of all descendant runs
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.content {
            child.collect_text(out);
        }
    }

    /// Text of the inline content between two content offsets, hard breaks
    /// rendered as `\n` and other inline leaves as `leaf_char` so offsets
    /// stay aligned with chars
    pub fn text_between(&self, from: usize, to: usize, leaf_char: char) -> String {
        let mut out = String::new();
        let mut pos = 0;
        for child in &self.content {
            let size = child.node_size();
            let end = pos + size;
            if end > from && pos < to {
                if child.is_text() {
                    let start = from.saturating_sub(pos);
                    let stop = (to - pos).min(size);
                    out.extend(child.text_str().chars().skip(start).take(stop - start));
                } else if child.node_type == NodeType::HardBreak {
                    out.push('\n');
                } else if child.is_leaf() {
                    out.push(leaf_char);
                } else {
                    let inner_from = from.saturating_sub(pos + 1);
                    let inner_to = (to.saturating_sub(pos + 1)).min(child.content_size());
                    out.push_str(&child.text_between(inner_from, inner_to, leaf_char));
                }
            }
            pos = end;
        }
        out
    }

    /// Pre-order walk; `f` receives each descendant and its absolute
    /// position, returning false to skip that node's children
    pub fn descendants<F>(&self, f: &mut F)
    where
        F: FnMut(&Node, usize) -> bool,
    {
        walk(&self.content, 0, f);
    }

    /// Count descendants of a given type
    pub fn count_type(&self, node_type: NodeType) -> usize {
        let mut count = 0;
        self.descendants(&mut |node, _| {
            if node.node_type == node_type {
                count += 1;
            }
            true
        });
        count
    }

    /// Copy of this node with new content
    pub fn with_content(&self, content: Vec<Node>) -> Node {
        Node {
            node_type: self.node_type,
            attrs: self.attrs.clone(),
            content,
            text: self.text.clone(),
            marks: self.marks.clone(),
        }
    }
}

fn walk<F>(content: &[Node], start: usize, f: &mut F)
where
    F: FnMut(&Node, usize) -> bool,
{
    let mut pos = start;
    for child in content {
        if f(child, pos) && !child.is_leaf() {
            walk(&child.content, pos + 1, f);
        }
        pos += child.node_size();
    }
}

/// Total size of a run of sibling nodes
pub fn content_size(content: &[Node]) -> usize {
    content.iter().map(Node::node_size).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_sizes() {
        let para = Node::paragraph(vec![Node::text("abc"), Node::inline_math("x")]);
        assert_eq!(para.content_size(), 4);
        assert_eq!(para.node_size(), 6);

        let doc = Node::doc(vec![para, Node::paragraph(vec![])]);
        assert_eq!(doc.content_size(), 8);
    }

    #[test]
    fn test_sizes_count_chars_not_bytes() {
        let text = Node::text("héllo");
        assert_eq!(text.node_size(), 5);
    }

    #[test]
    fn test_text_between_uses_leaf_placeholder() {
        let para = Node::paragraph(vec![
            Node::text("a"),
            Node::inline_math("x"),
            Node::text("bc"),
        ]);
        assert_eq!(para.text_between(0, 4, '\u{fffc}'), "a\u{fffc}bc");
        assert_eq!(para.text_between(2, 4, '\u{fffc}'), "bc");
    }

    #[test]
    fn test_text_between_renders_hard_break_as_newline() {
        let para = Node::paragraph(vec![Node::text("a"), Node::hard_break(), Node::text("b")]);
        assert_eq!(para.text_between(0, 3, '\u{fffc}'), "a\nb");
    }

    #[test]
    fn test_mark_sets_stay_canonical() {
        let set = Mark::Italic.add_to(&[]);
        let set = Mark::link("https://a").add_to(&set);
        assert_eq!(set, vec![Mark::link("https://a"), Mark::Italic]);

        let replaced = Mark::link("https://b").add_to(&set);
        assert_eq!(replaced[0], Mark::link("https://b"));
        assert_eq!(replaced.len(), 2);

        assert_eq!(Mark::Italic.remove_from(&replaced), vec![Mark::link("https://b")]);
    }

    #[test]
    fn test_descendant_positions() {
        let doc = Node::doc(vec![
            Node::paragraph_text("ab"),
            Node::callout("note", vec![Node::paragraph_text("c")]),
        ]);
        let mut seen = Vec::new();
        doc.descendants(&mut |node, pos| {
            seen.push((node.node_type, pos));
            true
        });
        assert_eq!(
            seen,
            vec![
                (NodeType::Paragraph, 0),
                (NodeType::Text, 1),
                (NodeType::CalloutNode, 4),
                (NodeType::Paragraph, 5),
                (NodeType::Text, 6),
            ]
        );
    }

    #[test]
    fn test_node_json_shape() {
        let node = Node::text_with_marks("Docs", vec![Mark::link("https://example.com")]);
        let json = serde_json::to_string(&node).unwrap();
        assert_eq!(
            json,
            r#"{"type":"text","text":"Docs","marks":[{"type":"link","href":"https://example.com"}]}"#
        );
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back, node);
    }
}
