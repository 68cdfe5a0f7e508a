//! # Mention Suggestions
//!
//! Trigger-character autocomplete. Typing the trigger (by default `@`) at
//! the start of a line or after whitespace opens a session; every later
//! state change re-reads the text from the trigger to the caret as the
//! query and filters the mention source again.
//!
//! ```text
//! Idle ──trigger typed──▶ Triggered ──keystroke──▶ Filtering ──Enter/click──▶ Selecting
//!                              │                       │
//!                              └───Escape / trigger deleted / caret left──▶ Dismissed
//! ```
//!
//! The mention list is a shared handle, not a snapshot: the host may swap
//! its contents at any time and the next filtering step sees the new list.
//! Screen placement belongs to the host through [`OverlayHost`]; the session
//! only decides when to reposition and what to show.

use std::sync::Arc;

use parking_lot::RwLock;
use quill_parser::ast::Node;
use quill_parser::schema::Schema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::input_rules::{LEAF_CHAR, MAX_LOOKBACK};
use crate::state::EditorState;
use crate::step::{Assoc, Mapping};
use crate::transaction::Transaction;

/// One candidate of the mention source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionItem {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl MentionItem {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    fn matches(&self, query: &str) -> bool {
        self.label.to_lowercase().contains(query) || self.id.to_lowercase().contains(query)
    }
}

/// Live handle to the host's mention list
pub type MentionSource = Arc<RwLock<Vec<MentionItem>>>;

pub fn mention_source(items: Vec<MentionItem>) -> MentionSource {
    Arc::new(RwLock::new(items))
}

/// Screen-space rectangle, in host units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Layout collaborator that measures the caret and draws the overlay
pub trait OverlayHost: Send + Sync {
    /// Bounding rectangle of the caret at a document position
    fn caret_rect(&self, pos: usize) -> Option<Rect>;

    /// Show or move the overlay
    fn place(&self, anchor: Rect, items: &[MentionItem], selected: usize);

    fn hide(&self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SuggestionConfig {
    /// Character that opens a session
    pub char: char,
    /// Candidate cap
    pub max_items: usize,
    /// Whether the query may contain spaces
    pub allow_spaces: bool,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            char: '@',
            max_items: 10,
            allow_spaces: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionPhase {
    Idle,
    Triggered,
    Filtering,
    Selecting,
    Dismissed,
}

/// Keys a session reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKey {
    Up,
    Down,
    Enter,
    Escape,
}

/// What the editor should do with a key
#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    /// Not for the session; handle the key normally
    Ignored,
    /// Consumed by the session without touching the document
    Handled,
    /// Apply this transaction to insert the chosen mention
    Commit(Transaction),
}

#[derive(Debug, Clone)]
struct Session {
    /// Position of the trigger character
    trigger_pos: usize,
    query: String,
    items: Vec<MentionItem>,
    index: usize,
}

impl Session {
    /// End of the trigger plus query
    fn end(&self) -> usize {
        self.trigger_pos + 1 + self.query.chars().count()
    }
}

/// The mention autocomplete of one editor
pub struct Suggestion {
    config: SuggestionConfig,
    source: MentionSource,
    overlay: Option<Arc<dyn OverlayHost>>,
    session: Option<Session>,
    /// Trigger position the user escaped from; stays quiet until it goes away
    dismissed_at: Option<usize>,
    phase: SuggestionPhase,
}

impl Suggestion {
    pub fn new(config: SuggestionConfig, source: MentionSource) -> Self {
        Self {
            config,
            source,
            overlay: None,
            session: None,
            dismissed_at: None,
            phase: SuggestionPhase::Idle,
        }
    }

    pub fn set_overlay(&mut self, overlay: Arc<dyn OverlayHost>) {
        self.overlay = Some(overlay);
    }

    pub fn source(&self) -> &MentionSource {
        &self.source
    }

    pub fn phase(&self) -> SuggestionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn query(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.query.as_str())
    }

    pub fn items(&self) -> &[MentionItem] {
        self.session.as_ref().map(|s| s.items.as_slice()).unwrap_or(&[])
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.index)
    }

    /// Current candidates for a query, in source order
    pub fn filter(&self, query: &str) -> Vec<MentionItem> {
        let query = query.to_lowercase();
        self.source
            .read()
            .iter()
            .filter(|item| item.matches(&query))
            .take(self.config.max_items)
            .cloned()
            .collect()
    }

    /// Follow positions through an applied transaction
    pub fn map(&mut self, mapping: &Mapping) {
        if let Some(session) = &mut self.session {
            session.trigger_pos = mapping.map(session.trigger_pos, Assoc::Right);
        }
        if let Some(pos) = self.dismissed_at {
            self.dismissed_at = Some(mapping.map(pos, Assoc::Right));
        }
    }

    /// Re-evaluate after any state change
    pub fn update(&mut self, state: &EditorState, schema: &Schema) {
        let Some((trigger_pos, query)) = self.find_trigger(state, schema) else {
            self.dismissed_at = None;
            // An open session ends as dismissed; the next quiet update idles
            self.phase = if self.session.take().is_some() {
                debug!("suggestion closed");
                self.hide();
                SuggestionPhase::Dismissed
            } else {
                SuggestionPhase::Idle
            };
            return;
        };

        if self.dismissed_at == Some(trigger_pos) {
            self.phase = SuggestionPhase::Dismissed;
            return;
        }
        self.dismissed_at = None;

        let items = self.filter(&query);
        if let Some(session) = self.session.as_mut().filter(|s| s.trigger_pos == trigger_pos) {
            if session.items != items {
                session.index = 0;
            }
            session.items = items;
            session.query = query;
            debug!(query = %session.query, candidates = session.items.len(), "suggestion filtering");
            self.phase = SuggestionPhase::Filtering;
        } else {
            debug!(trigger_pos, %query, "suggestion triggered");
            self.session = Some(Session {
                trigger_pos,
                query,
                items,
                index: 0,
            });
            self.phase = SuggestionPhase::Triggered;
        }
        self.reposition(state);
    }

    /// Keyboard handling while a session is open
    pub fn handle_key(&mut self, key: SuggestionKey, state: &EditorState) -> KeyOutcome {
        let Some(session) = &mut self.session else {
            return KeyOutcome::Ignored;
        };
        let len = session.items.len();

        match key {
            SuggestionKey::Up if len > 0 => {
                session.index = (session.index + len - 1) % len;
                self.reposition(state);
                KeyOutcome::Handled
            }
            SuggestionKey::Down if len > 0 => {
                session.index = (session.index + 1) % len;
                self.reposition(state);
                KeyOutcome::Handled
            }
            SuggestionKey::Enter => {
                let index = session.index;
                match self.commit(index) {
                    Some(tr) => KeyOutcome::Commit(tr),
                    None => KeyOutcome::Ignored,
                }
            }
            SuggestionKey::Escape => {
                self.dismiss();
                KeyOutcome::Handled
            }
            _ => KeyOutcome::Handled,
        }
    }

    /// Pointer selection of candidate `index`
    pub fn click(&mut self, index: usize) -> Option<Transaction> {
        self.commit(index)
    }

    /// Host viewport scrolled or resized
    pub fn on_viewport_change(&self, state: &EditorState) {
        self.reposition(state);
    }

    /// Close the session without touching the document
    pub fn dismiss(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(trigger_pos = session.trigger_pos, "suggestion dismissed");
            self.dismissed_at = Some(session.trigger_pos);
            self.phase = SuggestionPhase::Dismissed;
            self.hide();
        }
    }

    /// Replace the trigger and query with a mention and a space
    fn commit(&mut self, index: usize) -> Option<Transaction> {
        let session = self.session.as_ref()?;
        let item = session.items.get(index)?;
        let tr = Transaction::new()
            .replace(
                session.trigger_pos,
                session.end(),
                vec![
                    Node::mention(&item.id, &item.label, item.url.as_deref()),
                    Node::text(" "),
                ],
            )
            .with_description("mention");
        debug!(id = %item.id, "suggestion committed");

        self.session = None;
        self.phase = SuggestionPhase::Selecting;
        self.hide();
        Some(tr)
    }

    /// Trigger position and query when the caret sits in a trigger span
    fn find_trigger(&self, state: &EditorState, schema: &Schema) -> Option<(usize, String)> {
        if !state.selection.is_empty() {
            return None;
        }
        let caret = state.head().ok()?;
        let textblock = caret.parent();
        if !textblock.is_textblock() || schema.is_code(textblock.node_type) {
            return None;
        }

        let offset = caret.parent_offset();
        let window_start = offset.saturating_sub(MAX_LOOKBACK);
        let text: Vec<char> = textblock.text_between(window_start, offset, LEAF_CHAR).chars().collect();

        let at = text.iter().rposition(|&c| c == self.config.char)?;
        let query: String = text[at + 1..].iter().collect();
        let prefix_ok = (at == 0 && window_start == 0) || (at > 0 && text[at - 1].is_whitespace());
        let query_ok = !query.contains(LEAF_CHAR)
            && !query.contains(['\n', '\r'])
            && (self.config.allow_spaces || !query.contains(char::is_whitespace));
        if !prefix_ok || !query_ok {
            return None;
        }

        Some((caret.start(caret.depth()) + window_start + at, query))
    }

    fn reposition(&self, state: &EditorState) {
        let (Some(overlay), Some(session)) = (&self.overlay, &self.session) else {
            return;
        };
        match overlay.caret_rect(state.selection.head) {
            Some(rect) => overlay.place(rect, &session.items, session.index),
            None => overlay.hide(),
        }
    }

    fn hide(&self) {
        if let Some(overlay) = &self.overlay {
            overlay.hide();
        }
    }
}

impl std::fmt::Debug for Suggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suggestion")
            .field("config", &self.config)
            .field("phase", &self.phase)
            .field("session", &self.session)
            .finish()
    }
}
