//! # Quill Editor
//!
//! Editing engine for quill documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: markup → document tree + schema     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: state + transactions                │
//! │  - Positions, steps and step maps           │
//! │  - Undo/redo from step inverses             │
//! │  - Input rules rewrite typed syntax         │
//! │  - Mention autocomplete and image uploads   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ host: rendering, overlays, upload transport │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **State is a value**: every transaction produces a new [`EditorState`]
//! 2. **Transactions are atomic**: a failing step leaves the state untouched
//! 3. **Positions are mapped**: anything holding a position follows edits
//!    through the transaction's [`Mapping`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quill_editor::{Editor, Key};
//!
//! let mut editor = Editor::with_content("<p></p>")?;
//! editor.type_text("[!warning] Be careful")?;
//! editor.handle_key(Key::Enter)?;
//! assert!(editor.get_content().starts_with("<div class=\"callout\""));
//!
//! editor.undo()?;
//! ```

pub mod commands;
mod config;
mod editor;
mod errors;
pub mod input_rules;
pub mod position;
mod selection;
mod state;
pub mod step;
pub mod suggestion;
mod transaction;
mod undo_stack;
pub mod upload;

pub use config::EditorConfig;
pub use editor::{ChangeEvent, ChangeListener, Editor, Key};
pub use errors::{EditorError, EditorResult};
pub use input_rules::{InputRule, RuleContext, RuleRegistry, RuleToggles, Trigger};
pub use position::ResolvedPos;
pub use selection::Selection;
pub use state::EditorState;
pub use step::{Assoc, Mapping, Step, StepError, StepMap};
pub use suggestion::{MentionItem, OverlayHost, Rect, Suggestion, SuggestionConfig, SuggestionPhase};
pub use transaction::{Applied, Transaction, TransactionError};
pub use undo_stack::{HistoryBatch, UndoStack};
pub use upload::{ImageFile, UploadError, UploadTicket, Uploader};

// Re-export document types for convenience
pub use quill_parser::{Mark, Node, NodeType, Schema};
