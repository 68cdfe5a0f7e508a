//! # Transaction Engine
//!
//! A [`Transaction`] is a value: an ordered list of steps plus metadata,
//! assembled with builder methods. [`apply`] runs it against a document
//! snapshot on a private copy, so a failing step leaves the caller's tree
//! untouched and nothing is partially applied.

use quill_parser::ast::{Mark, Node};
use quill_parser::schema::Schema;
use thiserror::Error;
use tracing::{instrument, warn};

use crate::selection::Selection;
use crate::step::{Mapping, Step, StepError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransactionError {
    #[error("Step {index} failed: {source}")]
    Step {
        index: usize,
        #[source]
        source: StepError,
    },

    #[error("Selection {anchor}..{head} is outside the document (size {size})")]
    SelectionOutOfRange { anchor: usize, head: usize, size: usize },
}

/// Ordered steps plus metadata, applied atomically
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    steps: Vec<Step>,
    selection: Option<Selection>,
    stored_marks: Option<Vec<Mark>>,
    add_to_history: bool,
    description: Option<String>,
}

impl Transaction {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            selection: None,
            stored_marks: None,
            add_to_history: true,
            description: None,
        }
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn replace(self, from: usize, to: usize, content: Vec<Node>) -> Self {
        self.step(Step::replace(from, to, content))
    }

    pub fn insert(self, pos: usize, content: Vec<Node>) -> Self {
        self.step(Step::insert(pos, content))
    }

    pub fn delete(self, from: usize, to: usize) -> Self {
        self.step(Step::delete(from, to))
    }

    pub fn set_node_attr(self, pos: usize, name: impl Into<String>, value: quill_parser::AttrValue) -> Self {
        self.step(Step::SetNodeAttr {
            pos,
            name: name.into(),
            value,
        })
    }

    pub fn add_mark(self, from: usize, to: usize, mark: Mark) -> Self {
        self.step(Step::AddMark { from, to, mark })
    }

    pub fn remove_mark(self, from: usize, to: usize, mark: Mark) -> Self {
        self.step(Step::RemoveMark { from, to, mark })
    }

    /// Explicit selection after the steps; otherwise the current one is mapped
    pub fn set_selection(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Marks for the next typed text; an empty list types plain text
    pub fn set_stored_marks(mut self, marks: Vec<Mark>) -> Self {
        self.stored_marks = Some(marks);
        self
    }

    /// Keep this transaction out of undo history
    pub fn without_history(mut self) -> Self {
        self.add_to_history = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn stored_marks(&self) -> Option<&[Mark]> {
        self.stored_marks.as_deref()
    }

    pub fn add_to_history(&self) -> bool {
        self.add_to_history
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Position map of all steps, without applying them
    pub fn mapping(&self) -> Mapping {
        let mut mapping = Mapping::new();
        for step in &self.steps {
            mapping.push(step.map());
        }
        mapping
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a successfully applied transaction
#[derive(Debug, Clone)]
pub struct Applied {
    pub doc: Node,
    pub selection: Selection,
    pub mapping: Mapping,
    /// Inverse steps in the order they must be applied to undo
    pub inverses: Vec<Step>,
}

/// Apply `tr` to a snapshot; the input document is never modified
#[instrument(skip_all, fields(steps = tr.steps.len()))]
pub fn apply(
    doc: &Node,
    selection: Selection,
    tr: &Transaction,
    schema: &Schema,
) -> Result<Applied, TransactionError> {
    let mut working = doc.clone();
    let mut mapping = Mapping::new();
    let mut inverses = Vec::with_capacity(tr.steps.len());

    for (index, step) in tr.steps.iter().enumerate() {
        let result = step.apply(&mut working, schema).map_err(|source| {
            warn!(index, ?step, %source, "transaction rejected");
            TransactionError::Step { index, source }
        })?;
        mapping.push(result.map);
        inverses.push(result.inverse);
    }
    inverses.reverse();

    let selection = tr.selection.unwrap_or_else(|| selection.map(&mapping));
    let size = working.content_size();
    if !selection.fits(&working) {
        warn!(anchor = selection.anchor, head = selection.head, size, "transaction selection out of range");
        return Err(TransactionError::SelectionOutOfRange {
            anchor: selection.anchor,
            head: selection.head,
            size,
        });
    }

    Ok(Applied {
        doc: working,
        selection,
        mapping,
        inverses,
    })
}
