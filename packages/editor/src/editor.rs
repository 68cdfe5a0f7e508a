//! # Editor
//!
//! One editing surface: the current state, its history, the input rules,
//! the mention autocomplete and pending uploads, behind the command API the
//! host UI talks to.
//!
//! ## Lifecycle of a keystroke
//!
//! ```text
//! insert_text ─▶ dispatch(typing) ─▶ input rules ─▶ dispatch(rewrite)?
//!                     │                                   │
//!                     └──▶ history, uploads, suggestion ◀─┘
//!                                     │
//!                               change listeners
//! ```
//!
//! Every dispatch is synchronous. A rule rewrite is its own transaction, so
//! one undo brings the literal text back.

use std::sync::Arc;

use quill_parser::ast::{Mark, Node};
use quill_parser::schema::Schema;
use quill_parser::{parse_with_schema, Serializer};
use tracing::{debug, error, warn};

use crate::commands;
use crate::config::EditorConfig;
use crate::errors::{EditorError, EditorResult};
use crate::input_rules::{RuleRegistry, Trigger};
use crate::position::nearest_text_position;
use crate::selection::Selection;
use crate::state::EditorState;
use crate::suggestion::{mention_source, KeyOutcome, MentionItem, MentionSource, OverlayHost, Suggestion, SuggestionKey};
use crate::transaction::{Applied, Transaction};
use crate::undo_stack::UndoStack;
use crate::upload::{is_allowed_type, ImageFile, PendingUploads, UploadError, UploadTicket, Uploader};

/// Emitted after every content-changing transaction
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    /// Increments with each change
    pub version: u64,
    /// Serialized document
    pub content: String,
}

pub type ChangeListener = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Keys with editing behaviour of their own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    ArrowUp,
    ArrowDown,
    Escape,
}

pub struct Editor {
    state: EditorState,
    schema: &'static Schema,
    history: UndoStack,
    rules: RuleRegistry,
    suggestion: Suggestion,
    uploads: PendingUploads,
    uploader: Option<Arc<dyn Uploader>>,
    listeners: Vec<ChangeListener>,
    config: EditorConfig,
    editable: bool,
    focused: bool,
    version: u64,
}

impl Editor {
    /// Create an editor from its configuration, parsing the initial content
    pub fn new(config: EditorConfig) -> EditorResult<Self> {
        let schema = Schema::builtin();
        let doc = parse_with_schema(&config.content, schema)?;
        let source = mention_source(config.mentions.clone());

        Ok(Self {
            state: EditorState::new(doc),
            schema,
            history: UndoStack::with_max_levels(config.max_undo_levels),
            rules: RuleRegistry::with_toggles(config.input_rules),
            suggestion: Suggestion::new(config.suggestion.clone(), source),
            uploads: PendingUploads::new(),
            uploader: None,
            listeners: Vec::new(),
            editable: config.editable,
            focused: false,
            version: 0,
            config,
        })
    }

    /// Editor with default configuration around some markup
    pub fn with_content(content: &str) -> EditorResult<Self> {
        Self::new(EditorConfig {
            content: content.to_string(),
            ..EditorConfig::default()
        })
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn doc(&self) -> &Node {
        &self.state.doc
    }

    pub fn selection(&self) -> Selection {
        self.state.selection
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    pub fn rules_mut(&mut self) -> &mut RuleRegistry {
        &mut self.rules
    }

    pub fn suggestion(&self) -> &Suggestion {
        &self.suggestion
    }

    /// Serialized document
    pub fn get_content(&self) -> String {
        Serializer::new(self.schema).serialize(&self.state.doc)
    }

    /// Replace the whole document; undoable like any other edit
    pub fn set_content(&mut self, markup: &str) -> EditorResult<()> {
        let doc = parse_with_schema(markup, self.schema)?;
        let tr = Transaction::new()
            .replace(0, self.state.doc.content_size(), doc.content.clone())
            .set_selection(Selection::at_start(&doc))
            .with_description("set content");
        self.dispatch(tr)
    }

    pub fn focus(&mut self) {
        self.focused = true;
    }

    pub fn blur(&mut self) {
        self.focused = false;
        self.suggestion.dismiss();
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn set_editable(&mut self, editable: bool) {
        self.editable = editable;
        if !editable {
            self.suggestion.dismiss();
        }
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    fn ensure_editable(&self) -> EditorResult<()> {
        if self.editable {
            Ok(())
        } else {
            Err(EditorError::ReadOnly)
        }
    }

    /// Register a listener for content changes
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Apply a transaction and everything that follows from it
    ///
    /// A rejected transaction leaves the editor exactly as it was.
    pub fn dispatch(&mut self, tr: Transaction) -> EditorResult<()> {
        let (next, applied) = self.state.apply(&tr, self.schema)?;
        self.history.record(&tr, &applied, self.state.selection);
        self.settle(next, &applied, tr.doc_changed());
        Ok(())
    }

    /// Install a state that was produced elsewhere (history)
    fn settle(&mut self, next: EditorState, applied: &Applied, doc_changed: bool) {
        self.uploads.map(&applied.mapping);
        self.suggestion.map(&applied.mapping);
        self.state = next;

        if doc_changed {
            self.version += 1;
            debug!(version = self.version, "document changed");
            if !self.listeners.is_empty() {
                let event = ChangeEvent {
                    version: self.version,
                    content: self.get_content(),
                };
                for listener in &self.listeners {
                    listener(&event);
                }
            }
        }
        self.suggestion.update(&self.state, self.schema);
    }

    /// Run the input rules for a trigger, dispatching the winning rewrite
    fn run_rules(&mut self, trigger: Trigger) -> EditorResult<bool> {
        let Some((name, tr)) = self.rules.run(&self.state, self.schema, trigger) else {
            return Ok(false);
        };
        match self.dispatch(tr) {
            Ok(()) => Ok(true),
            Err(err) => {
                warn!(rule = name, %err, "input rule produced an invalid transaction");
                Err(err)
            }
        }
    }

    /// Type text at the caret as one keystroke, then let the input rules look at it
    pub fn insert_text(&mut self, text: &str) -> EditorResult<()> {
        self.ensure_editable()?;
        if text.is_empty() {
            return Ok(());
        }
        let tr = commands::insert_text(&self.state, self.schema, text)?;
        self.dispatch(tr)?;
        self.run_rules(Trigger::Input)?;
        Ok(())
    }

    /// Type text one character at a time, as a user would
    pub fn type_text(&mut self, text: &str) -> EditorResult<()> {
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            if ch == '\n' {
                self.handle_key(Key::Enter)?;
            } else {
                self.insert_text(ch.encode_utf8(&mut buf))?;
            }
        }
        Ok(())
    }

    /// Keyboard handling; returns whether the key did anything
    pub fn handle_key(&mut self, key: Key) -> EditorResult<bool> {
        self.ensure_editable()?;

        let suggestion_key = match key {
            Key::Enter => Some(SuggestionKey::Enter),
            Key::ArrowUp => Some(SuggestionKey::Up),
            Key::ArrowDown => Some(SuggestionKey::Down),
            Key::Escape => Some(SuggestionKey::Escape),
            Key::Backspace => None,
        };
        if let Some(suggestion_key) = suggestion_key {
            match self.suggestion.handle_key(suggestion_key, &self.state) {
                KeyOutcome::Handled => return Ok(true),
                KeyOutcome::Commit(tr) => {
                    self.dispatch(tr)?;
                    return Ok(true);
                }
                KeyOutcome::Ignored => {}
            }
        }

        match key {
            Key::Enter => {
                self.split_block()?;
                Ok(true)
            }
            Key::Backspace => {
                self.delete_backward()?;
                Ok(true)
            }
            Key::ArrowUp | Key::ArrowDown | Key::Escape => Ok(false),
        }
    }

    /// Enter: a callout line converts, anything else splits the block
    pub fn split_block(&mut self) -> EditorResult<()> {
        self.ensure_editable()?;
        if self.run_rules(Trigger::Enter)? {
            return Ok(());
        }
        let tr = commands::split_block(&self.state, self.schema)?;
        self.dispatch(tr)
    }

    pub fn delete_backward(&mut self) -> EditorResult<()> {
        self.ensure_editable()?;
        let tr = commands::delete_backward(&self.state, self.schema)?;
        self.dispatch(tr)
    }

    pub fn set_selection(&mut self, selection: Selection) -> EditorResult<()> {
        self.dispatch(Transaction::new().set_selection(selection.snapped(&self.state.doc)))
    }

    pub fn undo(&mut self) -> EditorResult<bool> {
        self.ensure_editable()?;
        match self.history.undo(&self.state, self.schema)? {
            Some((next, applied)) => {
                self.settle(next, &applied, true);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn redo(&mut self) -> EditorResult<bool> {
        self.ensure_editable()?;
        match self.history.redo(&self.state, self.schema)? {
            Some((next, applied)) => {
                self.settle(next, &applied, true);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run `edits` so that everything it changes undoes as a single step
    ///
    /// Nested calls fold into the outermost batch.
    pub fn batch<R>(
        &mut self,
        description: &str,
        edits: impl FnOnce(&mut Self) -> EditorResult<R>,
    ) -> EditorResult<R> {
        if self.history.is_batching() {
            return edits(self);
        }
        self.history.begin_batch();
        self.history.set_batch_description(description);
        let result = edits(self);
        self.history.end_batch();
        debug!(description, ok = result.is_ok(), "closed history batch");
        result
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn toggle_mark(&mut self, mark: Mark) -> EditorResult<()> {
        self.ensure_editable()?;
        let tr = commands::toggle_mark(&self.state, self.schema, mark)?;
        self.dispatch(tr)
    }

    pub fn set_heading(&mut self, level: u8) -> EditorResult<()> {
        self.ensure_editable()?;
        let tr = commands::set_heading(&self.state, self.schema, level)?;
        self.dispatch(tr)
    }

    pub fn set_callout(&mut self, kind: &str) -> EditorResult<()> {
        self.ensure_editable()?;
        let tr = commands::set_callout(&self.state, kind)?;
        self.dispatch(tr)
    }

    pub fn insert_inline_math(&mut self, latex: &str) -> EditorResult<()> {
        self.ensure_editable()?;
        let tr = commands::insert_inline_math(&self.state, latex)?;
        self.dispatch(tr)
    }

    pub fn insert_block_math(&mut self, latex: &str) -> EditorResult<()> {
        self.ensure_editable()?;
        let tr = commands::insert_block_math(&self.state, latex)?;
        self.dispatch(tr)
    }

    pub fn insert_image(&mut self, src: &str, alt: Option<&str>, title: Option<&str>) -> EditorResult<()> {
        self.ensure_editable()?;
        let tr = commands::insert_image(&self.state, src, alt, title)?;
        self.dispatch(tr)
    }

    /// Save from the math edit dialog
    pub fn update_math(&mut self, pos: usize, latex: &str) -> EditorResult<()> {
        self.ensure_editable()?;
        let tr = commands::update_math(&self.state, pos, latex)?;
        self.dispatch(tr)
    }

    /// Live handle to the mention list; writes are seen by the next keystroke
    pub fn mention_source(&self) -> MentionSource {
        self.suggestion.source().clone()
    }

    pub fn set_mentions(&mut self, items: Vec<MentionItem>) {
        *self.suggestion.source().write() = items;
        self.suggestion.update(&self.state, self.schema);
    }

    pub fn set_overlay(&mut self, overlay: Arc<dyn OverlayHost>) {
        self.suggestion.set_overlay(overlay);
    }

    /// Pointer pick in the suggestion overlay
    pub fn click_suggestion(&mut self, index: usize) -> EditorResult<bool> {
        self.ensure_editable()?;
        match self.suggestion.click(index) {
            Some(tr) => {
                self.dispatch(tr)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Host viewport scrolled or resized
    pub fn viewport_changed(&self) {
        self.suggestion.on_viewport_change(&self.state);
    }

    pub fn set_uploader(&mut self, uploader: Arc<dyn Uploader>) {
        self.uploader = Some(uploader);
    }

    /// Start uploading a dropped or pasted image
    ///
    /// The host awaits the ticket's future and reports back through
    /// [`Editor::finish_upload`]; editing carries on meanwhile.
    pub fn upload_image(&mut self, file: ImageFile) -> EditorResult<UploadTicket> {
        self.ensure_editable()?;
        let uploader = self.uploader.clone().ok_or(UploadError::NoUploader)?;
        if !is_allowed_type(&self.config.allowed_image_types, &file.mime_type) {
            warn!(mime_type = %file.mime_type, "refusing image upload");
            return Err(UploadError::UnsupportedType(file.mime_type).into());
        }

        let id = self.uploads.register(self.state.selection.head, file.name.clone());
        debug!(id, name = %file.name, "image upload started");
        Ok(UploadTicket {
            id,
            future: uploader.upload(file),
        })
    }

    /// Finish an upload: insert the image on success, log and leave the
    /// document alone on failure
    pub fn finish_upload(&mut self, id: u64, result: Result<String, UploadError>) -> EditorResult<bool> {
        let pending = self.uploads.take(id)?;
        let url = match result {
            Ok(url) => url,
            Err(err) => {
                error!(id, %err, "image upload failed");
                return Ok(false);
            }
        };

        let pos = nearest_text_position(&self.state.doc, pending.anchor).unwrap_or(pending.anchor);
        let image = Node::image(&url, Some(&pending.file_name), None);
        self.dispatch(Transaction::new().insert(pos, vec![image]).with_description("image"))?;
        Ok(true)
    }

    /// Upload and insert in one go
    pub async fn upload_and_insert(&mut self, file: ImageFile) -> EditorResult<bool> {
        let UploadTicket { id, future } = self.upload_image(file)?;
        let result = future.await;
        self.finish_upload(id, result)
    }

    pub fn pending_uploads(&self) -> &PendingUploads {
        &self.uploads
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("state", &self.state)
            .field("version", &self.version)
            .field("editable", &self.editable)
            .field("focused", &self.focused)
            .field("rules", &self.rules)
            .field("suggestion", &self.suggestion)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
