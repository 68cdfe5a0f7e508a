use quill_parser::ast::Node;
use serde::{Deserialize, Serialize};

use crate::position::nearest_text_position;
use crate::step::{Assoc, Mapping};

/// Caret or highlighted range; `anchor` stays put while `head` moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn cursor(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    /// Caret at the first place text can go
    pub fn at_start(doc: &Node) -> Self {
        Self::cursor(nearest_text_position(doc, 0).unwrap_or(0))
    }

    /// Caret at the last place text can go
    pub fn at_end(doc: &Node) -> Self {
        let size = doc.content_size();
        Self::cursor(nearest_text_position(doc, size).unwrap_or(size))
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Map through a transaction's steps; content inserted exactly at the
    /// caret lands before it
    pub fn map(&self, mapping: &Mapping) -> Self {
        Self::new(mapping.map(self.anchor, Assoc::Right), mapping.map(self.head, Assoc::Right))
    }

    pub fn fits(&self, doc: &Node) -> bool {
        self.to() <= doc.content_size()
    }

    /// Snap both ends to positions where text can go
    pub fn snapped(&self, doc: &Node) -> Self {
        let snap = |pos: usize| nearest_text_position(doc, pos).unwrap_or(pos.min(doc.content_size()));
        Self::new(snap(self.anchor), snap(self.head))
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::cursor(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepMap;

    #[test]
    fn test_insert_before_caret_shifts_it() {
        let mut mapping = Mapping::new();
        mapping.push(StepMap::new(2, 0, 4));
        assert_eq!(Selection::cursor(5).map(&mapping), Selection::cursor(9));
    }

    #[test]
    fn test_insert_after_caret_leaves_it() {
        let mut mapping = Mapping::new();
        mapping.push(StepMap::new(7, 0, 4));
        assert_eq!(Selection::cursor(5).map(&mapping), Selection::cursor(5));
    }

    #[test]
    fn test_insert_at_caret_moves_it_past() {
        let mut mapping = Mapping::new();
        mapping.push(StepMap::new(5, 0, 1));
        assert_eq!(Selection::cursor(5).map(&mapping), Selection::cursor(6));
    }

    #[test]
    fn test_range_accessors() {
        let sel = Selection::new(8, 3);
        assert_eq!((sel.from(), sel.to()), (3, 8));
        assert!(!sel.is_empty());
    }

    #[test]
    fn test_start_and_end() {
        let doc = Node::doc(vec![
            Node::paragraph_text("ab"),
            Node::callout("tip", vec![Node::paragraph_text("cd")]),
        ]);
        assert_eq!(Selection::at_start(&doc), Selection::cursor(1));
        assert_eq!(Selection::at_end(&doc), Selection::cursor(8));
    }
}
