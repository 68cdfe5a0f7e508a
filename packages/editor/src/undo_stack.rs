//! # Undo/Redo Stack
//!
//! Tracks transaction history and enables undo/redo operations.
//!
//! ## Design
//!
//! - Each applied transaction records its inverse steps
//! - Undo applies the inverses and moves the entry to the redo stack
//! - Redo reapplies the original steps
//! - New transactions clear the redo stack
//! - Supports batched operations (group several transactions as one undo step)
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! let (next, applied) = state.apply(&tr, schema)?;
//! stack.record(&tr, &applied, state.selection);
//!
//! if let Some((undone, _)) = stack.undo(&next, schema)? {
//!     // ...
//! }
//! ```

use quill_parser::schema::Schema;

use crate::selection::Selection;
use crate::state::EditorState;
use crate::step::Step;
use crate::transaction::{Applied, Transaction, TransactionError};

/// A group of steps that are undone/redone together
#[derive(Debug, Clone)]
pub struct HistoryBatch {
    /// The steps in this batch (in application order)
    pub steps: Vec<Step>,

    /// The inverse steps (in the order they undo the batch)
    pub inverses: Vec<Step>,

    /// Selection before the first step
    pub selection_before: Selection,

    /// Selection after the last step
    pub selection_after: Selection,

    /// Optional description of this batch
    pub description: Option<String>,
}

impl HistoryBatch {
    /// Batch for a single applied transaction
    pub fn from_applied(tr: &Transaction, applied: &Applied, selection_before: Selection) -> Self {
        Self {
            steps: tr.steps().to_vec(),
            inverses: applied.inverses.clone(),
            selection_before,
            selection_after: applied.selection,
            description: tr.description().map(str::to_string),
        }
    }

    /// Fold a later batch into this one
    fn absorb(&mut self, later: HistoryBatch) {
        self.steps.extend(later.steps);
        let mut inverses = later.inverses;
        inverses.append(&mut self.inverses);
        self.inverses = inverses;
        self.selection_after = later.selection_after;
        if self.description.is_none() {
            self.description = later.description;
        }
    }
}

/// Undo/redo stack for one editor
#[derive(Debug)]
pub struct UndoStack {
    /// Stack of applied batches (most recent last)
    undo_stack: Vec<HistoryBatch>,

    /// Stack of undone batches (most recent last)
    redo_stack: Vec<HistoryBatch>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Currently building a batch
    batching: bool,
    current_batch: Option<HistoryBatch>,
    batch_description: Option<String>,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    /// Create an undo stack with custom max levels
    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            batching: false,
            current_batch: None,
            batch_description: None,
        }
    }

    /// Record an applied transaction, unless it opted out of history
    pub fn record(&mut self, tr: &Transaction, applied: &Applied, selection_before: Selection) {
        if !tr.add_to_history() || !tr.doc_changed() {
            return;
        }
        let batch = HistoryBatch::from_applied(tr, applied, selection_before);

        if self.batching {
            match &mut self.current_batch {
                Some(current) => current.absorb(batch),
                None => self.current_batch = Some(batch),
            }
        } else {
            self.push_batch(batch);
        }
    }

    /// Start a batch of transactions (will be undone/redone together)
    pub fn begin_batch(&mut self) {
        self.batching = true;
        self.current_batch = None;
        self.batch_description = None;
    }

    /// End the current batch and push to undo stack
    pub fn end_batch(&mut self) {
        self.batching = false;
        if let Some(mut batch) = self.current_batch.take() {
            if let Some(description) = self.batch_description.take() {
                batch.description = Some(description);
            }
            self.push_batch(batch);
        }
    }

    /// Whether a batch is being built
    pub fn is_batching(&self) -> bool {
        self.batching
    }

    /// Set description for current batch (if batching)
    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if self.batching {
            self.batch_description = Some(description.into());
        }
    }

    /// Push a batch to the undo stack
    fn push_batch(&mut self, batch: HistoryBatch) {
        self.undo_stack.push(batch);

        // Trim if exceeded max levels
        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // Clear redo stack (new action invalidates future)
        self.redo_stack.clear();
    }

    /// Undo the most recent batch; `None` when there is nothing to undo
    pub fn undo(
        &mut self,
        state: &EditorState,
        schema: &Schema,
    ) -> Result<Option<(EditorState, Applied)>, TransactionError> {
        let Some(batch) = self.undo_stack.pop() else {
            return Ok(None);
        };

        let tr = batch
            .inverses
            .iter()
            .cloned()
            .fold(Transaction::new(), Transaction::step)
            .set_selection(batch.selection_before)
            .without_history();
        match state.apply(&tr, schema) {
            Ok(applied) => {
                self.redo_stack.push(batch);
                Ok(Some(applied))
            }
            Err(err) => {
                self.undo_stack.push(batch);
                Err(err)
            }
        }
    }

    /// Redo the most recently undone batch; `None` when there is nothing to redo
    pub fn redo(
        &mut self,
        state: &EditorState,
        schema: &Schema,
    ) -> Result<Option<(EditorState, Applied)>, TransactionError> {
        let Some(batch) = self.redo_stack.pop() else {
            return Ok(None);
        };

        let tr = batch
            .steps
            .iter()
            .cloned()
            .fold(Transaction::new(), Transaction::step)
            .set_selection(batch.selection_after)
            .without_history();
        match state.apply(&tr, schema) {
            Ok(applied) => {
                self.undo_stack.push(batch);
                Ok(Some(applied))
            }
            Err(err) => {
                self.redo_stack.push(batch);
                Err(err)
            }
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Get the number of undo levels available
    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    /// Get the number of redo levels available
    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batching = false;
        self.current_batch = None;
        self.batch_description = None;
    }

    /// Get description of the next undo operation
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }

    /// Get description of the next redo operation
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
