use crate::ast::{Mark, Node};
use crate::dom::{escape_attr, escape_text};
use crate::schema::{ContentExpr, DomSpec, NodeSpec, Schema, TagRule};

/// Serializer converts a document back to markup
///
/// Output is compact: no whitespace is added between elements unless a block
/// separator is configured, and whitespace between blocks is ignored by the
/// parser, so `parse(serialize(doc)) == doc` either way.
pub struct Serializer<'a> {
    schema: &'a Schema,
    block_separator: String,
}

impl<'a> Serializer<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            block_separator: String::new(),
        }
    }

    /// Write `separator` between sibling blocks (e.g. `"\n"` for readable output)
    pub fn with_block_separator(schema: &'a Schema, separator: &str) -> Self {
        Self {
            schema,
            block_separator: separator.to_string(),
        }
    }

    /// Serialize a document (or any node) to markup
    pub fn serialize(&self, node: &Node) -> String {
        let mut output = String::new();
        if node.node_type == crate::ast::NodeType::Doc {
            self.serialize_blocks(&node.content, &mut output);
        } else {
            self.serialize_node(node, &mut output);
        }
        output
    }

    fn serialize_blocks(&self, blocks: &[Node], output: &mut String) {
        for (i, block) in blocks.iter().enumerate() {
            if i > 0 {
                output.push_str(&self.block_separator);
            }
            self.serialize_node(block, output);
        }
    }

    /// Inline content, sharing open mark tags between adjacent runs
    fn serialize_inline(&self, content: &[Node], output: &mut String) {
        let mut open: Vec<&Mark> = Vec::new();

        for node in content {
            let marks: &[Mark] = if node.is_text() { &node.marks } else { &[] };
            let keep = open
                .iter()
                .zip(marks.iter())
                .take_while(|(a, b)| **a == *b)
                .count();
            while open.len() > keep {
                if let Some(mark) = open.pop() {
                    write_mark_close(mark, output);
                }
            }
            for mark in &marks[keep..] {
                write_mark_open(mark, output);
                open.push(mark);
            }

            if node.is_text() {
                output.push_str(&escape_text(node.text_str()));
            } else {
                self.serialize_node(node, output);
            }
        }

        while let Some(mark) = open.pop() {
            write_mark_close(mark, output);
        }
    }

    fn serialize_node(&self, node: &Node, output: &mut String) {
        if node.is_text() {
            self.serialize_inline(std::slice::from_ref(node), output);
            return;
        }

        let Some((spec, dom)) = self
            .schema
            .spec(node.node_type)
            .and_then(|spec| spec.dom.as_ref().map(|dom| (spec, dom)))
        else {
            // Node types without a markup mapping only contribute their content
            self.serialize_children(node, None, output);
            return;
        };

        let tag = tag_name(dom, node);
        output.push('<');
        output.push_str(&tag);
        self.write_attrs(spec, dom, node, output);
        output.push('>');

        if dom.void {
            return;
        }

        if let Some(inner) = dom.inner {
            output.push('<');
            output.push_str(inner);
            output.push('>');
            self.serialize_children(node, Some(spec), output);
            output.push_str("</");
            output.push_str(inner);
            output.push('>');
        } else if let Some(label) = dom.label_attr.and_then(|attr| node.attr_str(attr)) {
            output.push_str(&escape_text(label));
        } else {
            self.serialize_children(node, Some(spec), output);
        }

        output.push_str("</");
        output.push_str(&tag);
        output.push('>');
    }

    fn serialize_children(&self, node: &Node, spec: Option<&NodeSpec>, output: &mut String) {
        match spec.map(|s| s.content) {
            Some(ContentExpr::Empty) => {}
            Some(ContentExpr::Inline) | Some(ContentExpr::Text) => self.serialize_inline(&node.content, output),
            Some(ContentExpr::Blocks) | None => self.serialize_blocks(&node.content, output),
        }
    }

    fn write_attrs(&self, spec: &NodeSpec, dom: &DomSpec, node: &Node, output: &mut String) {
        if let Some(class) = dom.class {
            write_attr("class", class, output);
        }
        if let Some((attr, Some(value))) = dom.discriminator {
            write_attr(attr, value, output);
        }
        for attr in &spec.attrs {
            let Some(dom_attr) = attr.dom_attr else {
                continue;
            };
            let Some(value) = node.attr(attr.name).and_then(|v| attr.to_markup(v)) else {
                continue;
            };
            write_attr(dom_attr, &value, output);
            if let Some(fallback) = attr.fallback_attr {
                write_attr(fallback, &value, output);
            }
        }
    }
}

fn tag_name(dom: &DomSpec, node: &Node) -> String {
    match dom.tag {
        TagRule::Fixed(tag) => tag.to_string(),
        TagRule::Leveled { prefix, attr } => {
            let level = node.attr(attr).and_then(|v| v.as_int()).unwrap_or(1).clamp(1, 6);
            format!("{}{}", prefix, level)
        }
    }
}

fn write_attr(name: &str, value: &str, output: &mut String) {
    output.push(' ');
    output.push_str(name);
    output.push_str("=\"");
    output.push_str(&escape_attr(value));
    output.push('"');
}

fn write_mark_open(mark: &Mark, output: &mut String) {
    match mark {
        Mark::Link { href } => {
            output.push_str("<a");
            write_attr("href", href, output);
            output.push('>');
        }
        Mark::Highlight { color } => {
            output.push_str("<mark");
            if let Some(color) = color {
                write_attr("data-color", color, output);
            }
            output.push('>');
        }
        other => {
            output.push('<');
            output.push_str(mark_tag(other));
            output.push('>');
        }
    }
}

fn write_mark_close(mark: &Mark, output: &mut String) {
    output.push_str("</");
    output.push_str(mark_tag(mark));
    output.push('>');
}

fn mark_tag(mark: &Mark) -> &'static str {
    match mark {
        Mark::Link { .. } => "a",
        Mark::Bold => "strong",
        Mark::Italic => "em",
        Mark::Strike => "s",
        Mark::Code => "code",
        Mark::Highlight { .. } => "mark",
    }
}

impl Default for Serializer<'static> {
    fn default() -> Self {
        Self::new(Schema::builtin())
    }
}

/// Serialize a document with the built-in node types
pub fn serialize(doc: &Node) -> String {
    Serializer::default().serialize(doc)
}
