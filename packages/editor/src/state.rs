use quill_parser::ast::{Mark, Node};
use quill_parser::schema::Schema;

use crate::position::ResolvedPos;
use crate::selection::Selection;
use crate::step::StepError;
use crate::transaction::{apply, Applied, Transaction, TransactionError};

/// Immutable snapshot of an editor: document, selection and stored marks
#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    pub doc: Node,
    pub selection: Selection,
    /// Marks the next typed text will carry, overriding the marks at the caret
    pub stored_marks: Option<Vec<Mark>>,
}

impl EditorState {
    pub fn new(doc: Node) -> Self {
        let selection = Selection::at_start(&doc);
        Self {
            doc,
            selection,
            stored_marks: None,
        }
    }

    /// Apply a transaction, producing the next state
    pub fn apply(&self, tr: &Transaction, schema: &Schema) -> Result<(EditorState, Applied), TransactionError> {
        let applied = apply(&self.doc, self.selection, tr, schema)?;

        // An explicit empty list means plain text, overriding the marks at the caret
        let stored_marks = match tr.stored_marks() {
            Some(marks) => Some(marks.to_vec()),
            None if tr.doc_changed() || applied.selection != self.selection => None,
            None => self.stored_marks.clone(),
        };

        let state = EditorState {
            doc: applied.doc.clone(),
            selection: applied.selection,
            stored_marks,
        };
        Ok((state, applied))
    }

    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos<'_>, StepError> {
        ResolvedPos::resolve(&self.doc, pos)
    }

    /// Resolved caret (the selection head)
    pub fn head(&self) -> Result<ResolvedPos<'_>, StepError> {
        self.resolve(self.selection.head)
    }

    /// Marks the next typed character would carry
    pub fn marks_at_caret(&self) -> Vec<Mark> {
        if let Some(marks) = &self.stored_marks {
            return marks.clone();
        }
        self.head().map(|pos| pos.marks()).unwrap_or_default()
    }
}
