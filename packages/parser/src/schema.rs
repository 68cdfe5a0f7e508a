//! # Node-Type Registry
//!
//! Declares, per node type, its attributes (default, validation, markup
//! attribute), its content model and its markup mapping. The parser and the
//! serializer are both driven from these records, so adding a node type is a
//! matter of registering one more [`NodeSpec`].

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::ast::{AttrValue, Attrs, Node, NodeType};
use crate::error::SchemaError;
use crate::languages::canonical_language;

static BUILTIN: Lazy<Schema> = Lazy::new(Schema::new);

pub const CALLOUT_KINDS: &[&str] = &["note", "tip", "important", "warning", "caution"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeGroup {
    Top,
    Block,
    Inline,
}

/// Content expression of a node type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentExpr {
    /// No children (leaf)
    Empty,
    /// `inline*`
    Inline,
    /// `text*`, unmarked
    Text,
    /// `block+`
    Blocks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    /// Any string
    Text,
    /// String or null
    OptionalText,
    /// Heading level, integer 1..=6
    Level,
    /// One of a fixed set of lowercase names
    OneOf(&'static [&'static str]),
    /// Optional code language, canonicalised through the language table
    Language,
}

#[derive(Debug, Clone)]
pub struct AttrSpec {
    pub name: &'static str,
    pub default: AttrValue,
    pub kind: AttrKind,
    /// Markup attribute carrying the value; `None` when the tag encodes it
    pub dom_attr: Option<&'static str>,
    /// Read when `dom_attr` is absent on input, never written
    pub fallback_attr: Option<&'static str>,
}

impl AttrSpec {
    fn new(name: &'static str, default: AttrValue, kind: AttrKind, dom_attr: Option<&'static str>) -> Self {
        Self {
            name,
            default,
            kind,
            dom_attr,
            fallback_attr: None,
        }
    }

    fn fallback(mut self, attr: &'static str) -> Self {
        self.fallback_attr = Some(attr);
        self
    }

    pub fn validate(&self, value: &AttrValue) -> Result<(), String> {
        match (self.kind, value) {
            (AttrKind::Text, AttrValue::Str(_)) => Ok(()),
            (AttrKind::OptionalText | AttrKind::Language, AttrValue::Str(_) | AttrValue::Null) => Ok(()),
            (AttrKind::Level, AttrValue::Int(level)) if (1..=6).contains(level) => Ok(()),
            (AttrKind::Level, AttrValue::Int(level)) => Err(format!("level {} out of range 1..=6", level)),
            (AttrKind::OneOf(allowed), AttrValue::Str(s)) if allowed.contains(&s.as_str()) => Ok(()),
            (AttrKind::OneOf(allowed), AttrValue::Str(s)) => {
                Err(format!("'{}' is not one of {}", s, allowed.join(", ")))
            }
            (_, other) => Err(format!("unexpected value {:?}", other)),
        }
    }

    /// Read the value from a raw markup attribute, falling back to the default
    pub fn from_markup(&self, raw: Option<&str>) -> AttrValue {
        let Some(raw) = raw else {
            return self.default.clone();
        };
        match self.kind {
            AttrKind::Text | AttrKind::OptionalText => AttrValue::str(raw),
            AttrKind::Language => AttrValue::str(canonical_language(raw)),
            AttrKind::Level => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|l| (1..=6).contains(l))
                .map(AttrValue::Int)
                .unwrap_or_else(|| self.default.clone()),
            AttrKind::OneOf(allowed) => {
                let lower = raw.trim().to_ascii_lowercase();
                if allowed.contains(&lower.as_str()) {
                    AttrValue::Str(lower)
                } else {
                    self.default.clone()
                }
            }
        }
    }

    /// Render the value for markup; `None` when nothing is written
    pub fn to_markup(&self, value: &AttrValue) -> Option<String> {
        match value {
            AttrValue::Null => None,
            AttrValue::Int(i) => Some(i.to_string()),
            AttrValue::Str(s) => Some(s.clone()),
        }
    }
}

/// How an element tag maps onto a node type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagRule {
    Fixed(&'static str),
    /// `h1`..`h6`, the digit carrying an attribute
    Leveled {
        prefix: &'static str,
        attr: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct DomSpec {
    pub tag: TagRule,
    /// Class written on output; not required when parsing
    pub class: Option<&'static str>,
    /// The class alone identifies the element, without the discriminator
    pub class_matches: bool,
    /// Attribute that must be present (with this value when given) to match
    pub discriminator: Option<(&'static str, Option<&'static str>)>,
    /// Wrapper element between this element and its content (`pre > code`)
    pub inner: Option<&'static str>,
    /// Void element, written without a closing tag
    pub void: bool,
    /// Leaf rendered with a text label taken from this attribute; the
    /// element text is the fallback when the attribute is missing
    pub label_attr: Option<&'static str>,
}

impl DomSpec {
    fn tag(tag: &'static str) -> Self {
        Self {
            tag: TagRule::Fixed(tag),
            class: None,
            class_matches: false,
            discriminator: None,
            inner: None,
            void: false,
            label_attr: None,
        }
    }

    fn class(mut self, class: &'static str) -> Self {
        self.class = Some(class);
        self
    }

    fn matched_by_class(mut self) -> Self {
        self.class_matches = true;
        self
    }

    fn discriminator(mut self, attr: &'static str, value: Option<&'static str>) -> Self {
        self.discriminator = Some((attr, value));
        self
    }

    fn void(mut self) -> Self {
        self.void = true;
        self
    }
}

/// Schema record for one node type
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub node_type: NodeType,
    pub group: NodeGroup,
    pub content: ContentExpr,
    pub attrs: Vec<AttrSpec>,
    pub dom: Option<DomSpec>,
    /// Content is code: no marks, no input rules
    pub code: bool,
}

impl NodeSpec {
    fn new(node_type: NodeType, group: NodeGroup, content: ContentExpr) -> Self {
        Self {
            node_type,
            group,
            content,
            attrs: Vec::new(),
            dom: None,
            code: false,
        }
    }

    fn attr(mut self, spec: AttrSpec) -> Self {
        self.attrs.push(spec);
        self
    }

    fn dom(mut self, dom: DomSpec) -> Self {
        self.dom = Some(dom);
        self
    }

    pub fn attr_spec(&self, name: &str) -> Option<&AttrSpec> {
        self.attrs.iter().find(|a| a.name == name)
    }

    pub fn default_attrs(&self) -> Attrs {
        self.attrs
            .iter()
            .map(|a| (a.name.to_string(), a.default.clone()))
            .collect()
    }
}

/// Registry of node types, iterated in registration order
#[derive(Debug, Clone)]
pub struct Schema {
    specs: Vec<NodeSpec>,
    index: HashMap<NodeType, usize>,
}

impl Schema {
    /// Registry with every built-in node type
    pub fn new() -> Self {
        let mut schema = Self::empty();
        for spec in builtin_specs() {
            schema.register(spec);
        }
        schema
    }

    /// Shared registry of the built-in node types
    pub fn builtin() -> &'static Schema {
        &BUILTIN
    }

    pub fn empty() -> Self {
        Self {
            specs: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a node type; re-registering replaces the earlier record in place
    pub fn register(&mut self, spec: NodeSpec) {
        if let Some(&i) = self.index.get(&spec.node_type) {
            self.specs[i] = spec;
        } else {
            self.index.insert(spec.node_type, self.specs.len());
            self.specs.push(spec);
        }
    }

    pub fn spec(&self, node_type: NodeType) -> Option<&NodeSpec> {
        self.index.get(&node_type).map(|&i| &self.specs[i])
    }

    pub fn specs(&self) -> &[NodeSpec] {
        &self.specs
    }

    pub fn is_registered(&self, node_type: NodeType) -> bool {
        self.index.contains_key(&node_type)
    }

    fn require(&self, node_type: NodeType) -> Result<&NodeSpec, SchemaError> {
        self.spec(node_type)
            .ok_or_else(|| SchemaError::UnknownType(node_type.name().to_string()))
    }

    /// Build a node, filling missing attributes with defaults, and check it
    pub fn node(&self, node_type: NodeType, attrs: Attrs, content: Vec<Node>) -> Result<Node, SchemaError> {
        let spec = self.require(node_type)?;
        let mut full = spec.default_attrs();
        full.extend(attrs);
        let node = Node::new(node_type, full, content);
        self.check(&node)?;
        Ok(node)
    }

    /// Check a node's attributes against its record
    pub fn check_attrs(&self, node: &Node) -> Result<(), SchemaError> {
        let spec = self.require(node.node_type)?;
        for name in node.attrs.keys() {
            if spec.attr_spec(name).is_none() {
                return Err(SchemaError::UnknownAttr {
                    node: node.node_type.name().to_string(),
                    attr: name.clone(),
                });
            }
        }
        for attr in &spec.attrs {
            let value = node.attrs.get(attr.name).ok_or_else(|| SchemaError::InvalidAttr {
                node: node.node_type.name().to_string(),
                attr: attr.name.to_string(),
                reason: "missing".to_string(),
            })?;
            attr.validate(value).map_err(|reason| SchemaError::InvalidAttr {
                node: node.node_type.name().to_string(),
                attr: attr.name.to_string(),
                reason,
            })?;
        }
        Ok(())
    }

    /// Check that `content` satisfies the content expression of `parent`
    pub fn check_content(&self, parent: NodeType, content: &[Node]) -> Result<(), SchemaError> {
        let spec = self.require(parent)?;
        let parent_name = parent.name().to_string();
        let invalid_child = |child: &Node| SchemaError::InvalidChild {
            node: parent_name.clone(),
            child: child.node_type.name().to_string(),
        };

        match spec.content {
            ContentExpr::Empty => {
                if !content.is_empty() {
                    return Err(SchemaError::LeafWithContent(parent_name));
                }
            }
            ContentExpr::Inline => {
                for child in content {
                    let child_spec = self.require(child.node_type)?;
                    if child_spec.group != NodeGroup::Inline {
                        return Err(invalid_child(child));
                    }
                    if child.is_text() && child.text_str().is_empty() {
                        return Err(SchemaError::InvalidText(parent_name));
                    }
                }
            }
            ContentExpr::Text => {
                for child in content {
                    if !child.is_text() {
                        return Err(invalid_child(child));
                    }
                    if child.text_str().is_empty() || !child.marks.is_empty() {
                        return Err(SchemaError::InvalidText(parent_name));
                    }
                }
            }
            ContentExpr::Blocks => {
                if content.is_empty() {
                    return Err(SchemaError::EmptyContent(parent_name));
                }
                for child in content {
                    let child_spec = self.require(child.node_type)?;
                    if child_spec.group != NodeGroup::Block {
                        return Err(invalid_child(child));
                    }
                }
            }
        }
        Ok(())
    }

    /// Check a node and its whole subtree
    pub fn check(&self, node: &Node) -> Result<(), SchemaError> {
        if node.is_text() {
            if node.text_str().is_empty() {
                return Err(SchemaError::InvalidText(node.node_type.name().to_string()));
            }
            return Ok(());
        }
        if !node.marks.is_empty() {
            return Err(SchemaError::MarksOnNonText(node.node_type.name().to_string()));
        }
        self.check_attrs(node)?;
        self.check_content(node.node_type, &node.content)?;
        for child in &node.content {
            self.check(child)?;
        }
        Ok(())
    }

    /// Whether input rules may run inside this node type
    pub fn is_code(&self, node_type: NodeType) -> bool {
        self.spec(node_type).map(|s| s.code).unwrap_or(false)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_specs() -> Vec<NodeSpec> {
    use AttrKind::{Language, Level, OneOf, OptionalText};
    use NodeGroup::{Block, Top};

    let mut code_block = NodeSpec::new(NodeType::CodeBlock, Block, ContentExpr::Text)
        .attr(AttrSpec::new("language", AttrValue::Null, Language, Some("data-language")))
        .dom(DomSpec {
            inner: Some("code"),
            ..DomSpec::tag("pre")
        });
    code_block.code = true;

    vec![
        NodeSpec::new(NodeType::Doc, Top, ContentExpr::Blocks),
        NodeSpec::new(NodeType::Paragraph, Block, ContentExpr::Inline).dom(DomSpec::tag("p")),
        NodeSpec::new(NodeType::Heading, Block, ContentExpr::Inline)
            .attr(AttrSpec::new("level", AttrValue::Int(1), Level, None))
            .dom(DomSpec {
                tag: TagRule::Leveled {
                    prefix: "h",
                    attr: "level",
                },
                ..DomSpec::tag("h1")
            }),
        NodeSpec::new(NodeType::Blockquote, Block, ContentExpr::Blocks).dom(DomSpec::tag("blockquote")),
        code_block,
        NodeSpec::new(NodeType::CalloutNode, Block, ContentExpr::Blocks)
            .attr(AttrSpec::new(
                "type",
                AttrValue::str("note"),
                OneOf(CALLOUT_KINDS),
                Some("data-callout"),
            ))
            .dom(
                DomSpec::tag("div")
                    .class("callout")
                    .matched_by_class()
                    .discriminator("data-callout", None),
            ),
        NodeSpec::new(NodeType::BlockMath, Block, ContentExpr::Empty)
            .attr(AttrSpec::new("latex", AttrValue::str(""), AttrKind::Text, Some("data-latex")))
            .dom(DomSpec::tag("div").discriminator("data-type", Some("block-math"))),
        NodeSpec::new(NodeType::HorizontalRule, Block, ContentExpr::Empty).dom(DomSpec::tag("hr").void()),
        NodeSpec::new(NodeType::InlineMath, NodeGroup::Inline, ContentExpr::Empty)
            .attr(AttrSpec::new("latex", AttrValue::str(""), AttrKind::Text, Some("data-latex")))
            .dom(DomSpec::tag("span").discriminator("data-type", Some("inline-math"))),
        NodeSpec::new(NodeType::Mention, NodeGroup::Inline, ContentExpr::Empty)
            .attr(AttrSpec::new("id", AttrValue::str(""), AttrKind::Text, Some("data-mention-id")))
            .attr(AttrSpec::new(
                "label",
                AttrValue::str(""),
                AttrKind::Text,
                Some("data-mention-label"),
            ))
            .attr(
                AttrSpec::new("url", AttrValue::Null, OptionalText, Some("data-mention-url")).fallback("href"),
            )
            .dom(DomSpec {
                label_attr: Some("label"),
                ..DomSpec::tag("a").class("mention").discriminator("data-mention-id", None)
            }),
        NodeSpec::new(NodeType::Image, NodeGroup::Inline, ContentExpr::Empty)
            .attr(AttrSpec::new("src", AttrValue::str(""), AttrKind::Text, Some("src")))
            .attr(AttrSpec::new("alt", AttrValue::Null, OptionalText, Some("alt")))
            .attr(AttrSpec::new("title", AttrValue::Null, OptionalText, Some("title")))
            .dom(DomSpec::tag("img").void()),
        NodeSpec::new(NodeType::HardBreak, NodeGroup::Inline, ContentExpr::Empty).dom(DomSpec::tag("br").void()),
        NodeSpec::new(NodeType::Text, NodeGroup::Inline, ContentExpr::Empty),
    ]
}
