//! # Position Addressing
//!
//! A position is an offset into the document's content: every character of a
//! text run, every leaf, and every container boundary (open and close) takes
//! one slot. Position `0` is before the first top-level block and
//! `doc.content_size()` after the last.
//!
//! [`ResolvedPos`] turns a bare offset into the path of containers around it,
//! which is what steps and commands need to decide whether an edit stays
//! inside one parent.

use quill_parser::ast::{Mark, Node};

use crate::step::StepError;

/// One container on the path to a position
#[derive(Debug, Clone, Copy)]
struct Level<'a> {
    node: &'a Node,
    /// Absolute position where the container's content starts
    start: usize,
    /// Child index at or after the position
    index: usize,
}

/// A position with the containers enclosing it
#[derive(Debug, Clone)]
pub struct ResolvedPos<'a> {
    pub pos: usize,
    levels: Vec<Level<'a>>,
    /// Offset into the text run at `index`, when the position splits one
    text_offset: Option<usize>,
}

impl<'a> ResolvedPos<'a> {
    pub fn resolve(doc: &'a Node, pos: usize) -> Result<Self, StepError> {
        let size = doc.content_size();
        if pos > size {
            return Err(StepError::OutOfRange { pos, size });
        }

        let mut levels = Vec::new();
        let mut node = doc;
        let mut start = 0;

        loop {
            let mut child_start = start;
            let mut index = node.content.len();
            let mut text_offset = None;
            let mut descend = None;

            for (i, child) in node.content.iter().enumerate() {
                let end = child_start + child.node_size();
                if pos < end {
                    index = i;
                    if pos > child_start {
                        if child.is_text() {
                            text_offset = Some(pos - child_start);
                        } else if !child.is_leaf() {
                            descend = Some((child, child_start + 1));
                        }
                    }
                    break;
                }
                child_start = end;
            }

            levels.push(Level { node, start, index });
            match descend {
                Some((child, child_content_start)) => {
                    node = child;
                    start = child_content_start;
                }
                None => {
                    return Ok(Self {
                        pos,
                        levels,
                        text_offset,
                    });
                }
            }
        }
    }

    /// Nesting depth; 0 for positions directly inside the document
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    fn level(&self, depth: usize) -> &Level<'a> {
        &self.levels[depth.min(self.depth())]
    }

    /// The container at `depth` (0 is the document)
    pub fn node(&self, depth: usize) -> &'a Node {
        self.level(depth).node
    }

    pub fn parent(&self) -> &'a Node {
        self.node(self.depth())
    }

    /// Absolute start of the content of the container at `depth`
    pub fn start(&self, depth: usize) -> usize {
        self.level(depth).start
    }

    /// Absolute end of the content of the container at `depth`
    pub fn end(&self, depth: usize) -> usize {
        let level = self.level(depth);
        level.start + level.node.content_size()
    }

    /// Position right before the container at `depth` (depth >= 1)
    pub fn before(&self, depth: usize) -> usize {
        self.start(depth).saturating_sub(1)
    }

    /// Position right after the container at `depth` (depth >= 1)
    pub fn after(&self, depth: usize) -> usize {
        self.end(depth) + 1
    }

    /// Child index within the container at `depth` that the position sits in or before
    pub fn index(&self, depth: usize) -> usize {
        self.level(depth).index
    }

    pub fn parent_offset(&self) -> usize {
        self.pos - self.start(self.depth())
    }

    pub fn text_offset(&self) -> Option<usize> {
        self.text_offset
    }

    /// Closest depth whose container satisfies `pred`
    pub fn find_depth<F>(&self, pred: F) -> Option<usize>
    where
        F: Fn(&Node) -> bool,
    {
        (0..=self.depth()).rev().find(|&d| pred(self.node(d)))
    }

    /// Whether both positions share the same parent container
    pub fn same_parent(&self, other: &ResolvedPos<'_>) -> bool {
        self.depth() == other.depth() && self.start(self.depth()) == other.start(other.depth())
    }

    /// Node directly after the position (the run containing it, when inside text)
    pub fn node_after(&self) -> Option<&'a Node> {
        self.parent().content.get(self.index(self.depth()))
    }

    /// Node directly before the position (the run containing it, when inside text)
    pub fn node_before(&self) -> Option<&'a Node> {
        let index = self.index(self.depth());
        if self.text_offset.is_some() {
            return self.parent().content.get(index);
        }
        index.checked_sub(1).and_then(|i| self.parent().content.get(i))
    }

    /// Marks that text inserted here would carry
    ///
    /// Inside a run that is the run's marks. At a run boundary the marks of
    /// the run before apply, minus non-inclusive marks (links) that the run
    /// after does not continue.
    pub fn marks(&self) -> Vec<Mark> {
        if self.text_offset.is_some() {
            return self.node_after().map(|n| n.marks.clone()).unwrap_or_default();
        }

        let before = self.node_before().filter(|n| n.is_text());
        let after = self.node_after().filter(|n| n.is_text());
        match (before, after) {
            (Some(before), after) => before
                .marks
                .iter()
                .filter(|m| m.inclusive() || after.map(|a| a.marks.contains(m)).unwrap_or(false))
                .cloned()
                .collect(),
            (None, Some(after)) => after.marks.iter().filter(|m| m.inclusive()).cloned().collect(),
            (None, None) => Vec::new(),
        }
    }

    /// Child index path from the document to the parent container
    pub fn path(&self) -> Vec<usize> {
        self.levels[..self.depth()].iter().map(|l| l.index).collect()
    }

    /// Child index path to the container at `depth`
    pub fn path_to(&self, depth: usize) -> Vec<usize> {
        self.levels[..depth.min(self.depth())].iter().map(|l| l.index).collect()
    }
}

/// Container at a child-index path
pub fn node_at_path<'a>(doc: &'a Node, path: &[usize]) -> Option<&'a Node> {
    path.iter().try_fold(doc, |node, &i| node.content.get(i))
}

pub fn node_at_path_mut<'a>(doc: &'a mut Node, path: &[usize]) -> Option<&'a mut Node> {
    path.iter().try_fold(doc, |node, &i| node.content.get_mut(i))
}

/// Position of the first place text can go at or after `pos`, falling back
/// to the last such place before it
pub fn nearest_text_position(doc: &Node, pos: usize) -> Option<usize> {
    let mut ranges = Vec::new();
    doc.descendants(&mut |node, at| {
        if node.is_textblock() {
            ranges.push((at + 1, at + 1 + node.content_size()));
            return false;
        }
        !node.is_leaf()
    });

    if let Some(&(start, end)) = ranges.iter().find(|&&(start, end)| pos >= start && pos <= end) {
        return Some(pos.clamp(start, end));
    }
    ranges
        .iter()
        .find(|&&(start, _)| start >= pos)
        .map(|&(start, _)| start)
        .or_else(|| ranges.last().map(|&(_, end)| end))
}
