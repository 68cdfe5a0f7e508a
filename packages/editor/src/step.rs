//! # Steps
//!
//! Primitive, invertible document edits. A transaction is an ordered list of
//! these.
//!
//! ## Step Semantics
//!
//! ### Replace
//! - Both endpoints must resolve into the same parent container
//! - Text runs may be cut anywhere; other nodes only at their boundaries
//! - The parent's content expression must still hold afterwards
//!
//! ### SetNodeAttr
//! - Targets the non-text node starting exactly at `pos`
//! - The attribute must be declared for the node type and valid
//!
//! ### AddMark / RemoveMark
//! - Confined to the inline content of a single textblock
//! - Never change sizes, so they map positions to themselves

use quill_parser::ast::{content_size, AttrValue, Mark, Node};
use quill_parser::error::SchemaError;
use quill_parser::fragment;
use quill_parser::schema::Schema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::position::{node_at_path_mut, ResolvedPos};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum Step {
    /// Replace the content between two positions of one parent
    Replace {
        from: usize,
        to: usize,
        content: Vec<Node>,
    },

    /// Set one attribute of the node starting at `pos`
    SetNodeAttr {
        pos: usize,
        name: String,
        value: AttrValue,
    },

    AddMark { from: usize, to: usize, mark: Mark },

    RemoveMark { from: usize, to: usize, mark: Mark },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("Position {pos} is outside the document (size {size})")]
    OutOfRange { pos: usize, size: usize },

    #[error("Range {from}..{to} crosses a node boundary")]
    CrossesBoundary { from: usize, to: usize },

    #[error("No node starts at position {0}")]
    NoNodeAt(usize),

    #[error("Range {from}..{to} is not inside a textblock")]
    NotTextblock { from: usize, to: usize },

    #[error("Schema violation: {0}")]
    Schema(#[from] SchemaError),
}

/// Result of applying one step
#[derive(Debug, Clone)]
pub struct StepResult {
    pub inverse: Step,
    pub map: StepMap,
}

impl Step {
    pub fn replace(from: usize, to: usize, content: Vec<Node>) -> Self {
        Step::Replace { from, to, content }
    }

    pub fn insert(pos: usize, content: Vec<Node>) -> Self {
        Step::Replace {
            from: pos,
            to: pos,
            content,
        }
    }

    pub fn delete(from: usize, to: usize) -> Self {
        Step::Replace {
            from,
            to,
            content: Vec::new(),
        }
    }

    /// Position map of this step, without applying it
    pub fn map(&self) -> StepMap {
        match self {
            Step::Replace { from, to, content } => StepMap::new(*from, to - from, content_size(content)),
            _ => StepMap::identity(),
        }
    }

    /// Apply to `doc` in place, returning the inverse and the position map
    ///
    /// On error `doc` is left untouched.
    pub fn apply(&self, doc: &mut Node, schema: &Schema) -> Result<StepResult, StepError> {
        match self {
            Step::Replace { from, to, content } => Self::apply_replace(doc, schema, *from, *to, content),
            Step::SetNodeAttr { pos, name, value } => Self::apply_set_attr(doc, schema, *pos, name, value),
            Step::AddMark { from, to, mark } => {
                Self::apply_marks(doc, schema, *from, *to, |marks| mark.add_to(marks))
            }
            Step::RemoveMark { from, to, mark } => {
                Self::apply_marks(doc, schema, *from, *to, |marks| mark.remove_from(marks))
            }
        }
    }

    /// Resolve a range that must stay inside one parent; returns the parent
    /// path and the parent-relative offsets
    fn resolve_flat(doc: &Node, from: usize, to: usize) -> Result<(Vec<usize>, usize, usize), StepError> {
        if from > to {
            return Err(StepError::CrossesBoundary { from, to });
        }
        let rfrom = ResolvedPos::resolve(doc, from)?;
        let rto = ResolvedPos::resolve(doc, to)?;
        if !rfrom.same_parent(&rto) {
            return Err(StepError::CrossesBoundary { from, to });
        }
        Ok((rfrom.path(), rfrom.parent_offset(), rto.parent_offset()))
    }

    fn apply_replace(
        doc: &mut Node,
        schema: &Schema,
        from: usize,
        to: usize,
        content: &[Node],
    ) -> Result<StepResult, StepError> {
        let (path, start, end) = Self::resolve_flat(doc, from, to)?;
        let parent = node_at_path_mut(doc, &path).ok_or(StepError::CrossesBoundary { from, to })?;

        let removed = fragment::cut(&parent.content, start, end).ok_or(StepError::CrossesBoundary { from, to })?;
        let replaced = fragment::replace(&parent.content, start, end, content.to_vec())
            .ok_or(StepError::CrossesBoundary { from, to })?;

        schema.check_content(parent.node_type, &replaced)?;
        for node in content {
            schema.check(node)?;
        }

        parent.content = replaced;
        let inserted = content_size(content);
        Ok(StepResult {
            inverse: Step::Replace {
                from,
                to: from + inserted,
                content: removed,
            },
            map: StepMap::new(from, to - from, inserted),
        })
    }

    fn apply_set_attr(
        doc: &mut Node,
        schema: &Schema,
        pos: usize,
        name: &str,
        value: &AttrValue,
    ) -> Result<StepResult, StepError> {
        let resolved = ResolvedPos::resolve(doc, pos)?;
        if resolved.text_offset().is_some() {
            return Err(StepError::NoNodeAt(pos));
        }
        let index = resolved.index(resolved.depth());
        let mut path = resolved.path();
        path.push(index);

        let node = node_at_path_mut(doc, &path)
            .filter(|n| !n.is_text())
            .ok_or(StepError::NoNodeAt(pos))?;

        let mut updated = node.clone();
        let old = updated
            .attrs
            .insert(name.to_string(), value.clone())
            .ok_or_else(|| SchemaError::UnknownAttr {
                node: node.node_type.name().to_string(),
                attr: name.to_string(),
            })?;
        schema.check_attrs(&updated)?;
        *node = updated;

        Ok(StepResult {
            inverse: Step::SetNodeAttr {
                pos,
                name: name.to_string(),
                value: old,
            },
            map: StepMap::identity(),
        })
    }

    fn apply_marks<F>(doc: &mut Node, schema: &Schema, from: usize, to: usize, f: F) -> Result<StepResult, StepError>
    where
        F: Fn(&[Mark]) -> Vec<Mark>,
    {
        let (path, start, end) = Self::resolve_flat(doc, from, to)?;
        let parent = node_at_path_mut(doc, &path).ok_or(StepError::NotTextblock { from, to })?;
        if !parent.is_textblock() {
            return Err(StepError::NotTextblock { from, to });
        }

        let removed = fragment::cut(&parent.content, start, end).ok_or(StepError::NotTextblock { from, to })?;
        let marked = fragment::map_marks(&parent.content, start, end, f).ok_or(StepError::NotTextblock { from, to })?;
        schema.check_content(parent.node_type, &marked)?;
        parent.content = marked;

        Ok(StepResult {
            inverse: Step::Replace {
                from,
                to,
                content: removed,
            },
            map: StepMap::identity(),
        })
    }
}

/// Which side a position sticks to when content is inserted exactly there
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
}

/// Position map of a single step: `old_size` slots at `start` became `new_size`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMap {
    start: usize,
    old_size: usize,
    new_size: usize,
}

/// Outcome of mapping one position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    /// The position sat strictly inside replaced content
    pub deleted: bool,
}

impl StepMap {
    pub fn new(start: usize, old_size: usize, new_size: usize) -> Self {
        Self {
            start,
            old_size,
            new_size,
        }
    }

    pub fn identity() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn is_identity(&self) -> bool {
        self.old_size == 0 && self.new_size == 0
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        let end = self.start + self.old_size;
        if self.is_identity() || pos < self.start {
            return MapResult { pos, deleted: false };
        }
        if pos > end {
            return MapResult {
                pos: pos - self.old_size + self.new_size,
                deleted: false,
            };
        }

        // Inside or on the edge of the replaced range
        let side = if self.old_size == 0 {
            assoc
        } else if pos == self.start {
            Assoc::Left
        } else if pos == end {
            Assoc::Right
        } else {
            assoc
        };
        let mapped = match side {
            Assoc::Left => self.start,
            Assoc::Right => self.start + self.new_size,
        };
        MapResult {
            pos: mapped,
            deleted: pos > self.start && pos < end,
        }
    }
}

/// Composition of step maps, in application order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, map: StepMap) {
        if !map.is_identity() {
            self.maps.push(map);
        }
    }

    pub fn extend(&mut self, other: &Mapping) {
        self.maps.extend(other.maps.iter().copied());
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.maps.iter().fold(pos, |pos, m| m.map(pos, assoc))
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        self.maps.iter().fold(MapResult { pos, deleted: false }, |acc, m| {
            let next = m.map_result(acc.pos, assoc);
            MapResult {
                pos: next.pos,
                deleted: acc.deleted || next.deleted,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> &'static Schema {
        Schema::builtin()
    }

    #[test]
    fn test_replace_inside_textblock() {
        let mut doc = Node::doc(vec![Node::paragraph_text("a $x$ b")]);
        let step = Step::replace(3, 6, vec![Node::inline_math("x")]);
        let result = step.apply(&mut doc, schema()).unwrap();
        assert_eq!(
            doc,
            Node::doc(vec![Node::paragraph(vec![
                Node::text("a "),
                Node::inline_math("x"),
                Node::text(" b"),
            ])])
        );
        assert_eq!(
            result.inverse,
            Step::replace(3, 4, vec![Node::text("$x$")])
        );

        result.inverse.apply(&mut doc, schema()).unwrap();
        assert_eq!(doc, Node::doc(vec![Node::paragraph_text("a $x$ b")]));
    }

    #[test]
    fn test_replace_across_blocks_is_rejected() {
        let mut doc = Node::doc(vec![Node::paragraph_text("ab"), Node::paragraph_text("cd")]);
        let before = doc.clone();
        let err = Step::delete(2, 6).apply(&mut doc, schema()).unwrap_err();
        assert_eq!(err, StepError::CrossesBoundary { from: 2, to: 6 });
        assert_eq!(doc, before);
    }

    #[test]
    fn test_replace_rejects_invalid_content() {
        let mut doc = Node::doc(vec![Node::paragraph_text("ab")]);
        let err = Step::insert(1, vec![Node::paragraph_text("x")])
            .apply(&mut doc, schema())
            .unwrap_err();
        assert!(matches!(err, StepError::Schema(SchemaError::InvalidChild { .. })));
    }

    #[test]
    fn test_emptying_a_callout_is_rejected() {
        let mut doc = Node::doc(vec![Node::callout("note", vec![Node::paragraph_text("x")])]);
        let err = Step::delete(1, 4).apply(&mut doc, schema()).unwrap_err();
        assert!(matches!(err, StepError::Schema(SchemaError::EmptyContent(_))));
    }

    #[test]
    fn test_set_node_attr_and_inverse() {
        let mut doc = Node::doc(vec![Node::callout("note", vec![Node::paragraph_text("x")])]);
        let step = Step::SetNodeAttr {
            pos: 0,
            name: "type".into(),
            value: AttrValue::str("tip"),
        };
        let result = step.apply(&mut doc, schema()).unwrap();
        assert_eq!(doc.content[0].attr_str("type"), Some("tip"));
        result.inverse.apply(&mut doc, schema()).unwrap();
        assert_eq!(doc.content[0].attr_str("type"), Some("note"));
    }

    #[test]
    fn test_set_node_attr_validates() {
        let mut doc = Node::doc(vec![Node::callout("note", vec![Node::paragraph_text("x")])]);
        let bad_value = Step::SetNodeAttr {
            pos: 0,
            name: "type".into(),
            value: AttrValue::str("bogus"),
        };
        assert!(bad_value.apply(&mut doc, schema()).is_err());
        let unknown = Step::SetNodeAttr {
            pos: 0,
            name: "color".into(),
            value: AttrValue::str("red"),
        };
        assert!(matches!(
            unknown.apply(&mut doc, schema()),
            Err(StepError::Schema(SchemaError::UnknownAttr { .. }))
        ));
        assert_eq!(doc.content[0].attr_str("type"), Some("note"));
    }

    #[test]
    fn test_add_mark_inverse_restores_runs() {
        let mut doc = Node::doc(vec![Node::paragraph(vec![
            Node::text("ab"),
            Node::text_with_marks("cd", vec![Mark::Bold]),
        ])]);
        let before = doc.clone();
        let result = Step::AddMark {
            from: 2,
            to: 4,
            mark: Mark::Bold,
        }
        .apply(&mut doc, schema())
        .unwrap();
        assert_eq!(
            doc.content[0].content,
            vec![Node::text("a"), Node::text_with_marks("bcd", vec![Mark::Bold])]
        );
        result.inverse.apply(&mut doc, schema()).unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn test_marks_rejected_in_code_block() {
        let mut doc = Node::doc(vec![Node::code_block(None, "let x")]);
        let err = Step::AddMark {
            from: 1,
            to: 3,
            mark: Mark::Bold,
        }
        .apply(&mut doc, schema())
        .unwrap_err();
        assert!(matches!(err, StepError::Schema(SchemaError::InvalidText(_))));
    }

    #[test]
    fn test_step_map_shifts_positions_after() {
        let map = StepMap::new(5, 0, 3);
        assert_eq!(map.map(2, Assoc::Right), 2);
        assert_eq!(map.map(5, Assoc::Right), 8);
        assert_eq!(map.map(5, Assoc::Left), 5);
        assert_eq!(map.map(9, Assoc::Left), 12);
    }

    #[test]
    fn test_step_map_reports_deleted() {
        let map = StepMap::new(2, 4, 1);
        let inside = map.map_result(4, Assoc::Right);
        assert!(inside.deleted);
        assert_eq!(inside.pos, 3);
        let edge = map.map_result(6, Assoc::Left);
        assert!(!edge.deleted);
        assert_eq!(edge.pos, 3);
        assert_eq!(map.map(10, Assoc::Right), 7);
    }

    #[test]
    fn test_mapping_composes() {
        let mut mapping = Mapping::new();
        mapping.push(StepMap::new(0, 0, 2));
        mapping.push(StepMap::identity());
        mapping.push(StepMap::new(1, 1, 0));
        assert_eq!(mapping.map(3, Assoc::Right), 4);
    }
}
