//! # Input Rules
//!
//! Recognizers that watch the text right before the caret and rewrite a
//! matched span into structure.
//!
//! ## Matching
//!
//! After a content-changing keystroke the runner takes the caret's textblock,
//! renders at most [`MAX_LOOKBACK`] characters before the caret (inline
//! leaves become U+FFFC so character offsets line up with positions) and
//! tries each registered rule in order. Patterns are anchored with `$`, so a
//! match always ends at the caret. The first rule whose handler returns a
//! transaction wins; a handler that returns `None` declines and the next
//! rule is tried.
//!
//! Handlers are pure functions of the [`RuleContext`]. They build a
//! transaction and never touch the document themselves.

mod callout;
mod link;
mod markdown;
mod math;

pub use callout::CalloutRule;
pub use link::LinkRule;
pub use markdown::{BlockquoteRule, CodeBlockRule, HeadingRule, MarkRule};
pub use math::{BlockMathRule, InlineMathRule};

use quill_parser::ast::{Mark, Node};
use quill_parser::fragment;
use quill_parser::schema::Schema;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::position::ResolvedPos;
use crate::state::EditorState;
use crate::transaction::Transaction;

/// Characters before the caret the patterns can see
pub const MAX_LOOKBACK: usize = 500;

/// Stand-in character for inline leaves in the matched text
pub const LEAF_CHAR: char = '\u{fffc}';

/// What caused the rule pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Text was typed at the caret
    Input,
    /// Enter was pressed, before the block is split
    Enter,
}

/// Trait for implementing input rules
pub trait InputRule: Send + Sync {
    /// Unique identifier for this rule
    fn name(&self) -> &'static str;

    /// Pattern tested against the text before the caret, or `None` when the
    /// rule does not fire for this trigger
    fn pattern(&self, trigger: Trigger) -> Option<&Regex>;

    /// Build the rewrite, or decline with `None`
    fn handle(&self, ctx: &RuleContext<'_>) -> Option<Transaction>;
}

/// One capture group, located in the document
#[derive(Debug, Clone)]
struct Capture {
    /// Absolute position of the first captured character
    start: usize,
    text: String,
}

/// Everything a handler may look at
#[derive(Debug)]
pub struct RuleContext<'a> {
    pub state: &'a EditorState,
    pub schema: &'a Schema,
    pub trigger: Trigger,
    /// The caret, inside a textblock
    pub caret: ResolvedPos<'a>,
    /// Absolute start of the whole match
    pub from: usize,
    /// Absolute end of the whole match (the caret)
    pub to: usize,
    captures: Vec<Option<Capture>>,
}

impl<'a> RuleContext<'a> {
    /// Text of capture group `index` (0 is the whole match)
    pub fn group(&self, index: usize) -> Option<&str> {
        self.captures
            .get(index)
            .and_then(Option::as_ref)
            .map(|c| c.text.as_str())
    }

    /// Absolute position where capture group `index` starts
    pub fn group_start(&self, index: usize) -> Option<usize> {
        self.captures.get(index).and_then(Option::as_ref).map(|c| c.start)
    }

    pub fn textblock(&self) -> &'a Node {
        self.caret.parent()
    }

    /// Depth of the caret's textblock
    pub fn depth(&self) -> usize {
        self.caret.depth()
    }

    /// Absolute start of the textblock's content
    pub fn block_start(&self) -> usize {
        self.caret.start(self.depth())
    }

    /// Offset of the match start within the textblock
    pub fn block_offset(&self) -> usize {
        self.from - self.block_start()
    }

    /// Whether the match begins at the very start of the textblock
    pub fn at_block_start(&self) -> bool {
        self.block_offset() == 0
    }

    /// Textblock content between two absolute positions
    pub fn slice(&self, from: usize, to: usize) -> Vec<Node> {
        let start = self.block_start();
        fragment::cut(
            &self.textblock().content,
            from.saturating_sub(start),
            to.saturating_sub(start),
        )
        .unwrap_or_default()
    }

    /// Textblock content after the caret
    pub fn rest_of_block(&self) -> Vec<Node> {
        self.slice(self.to, self.caret.end(self.depth()))
    }

    /// Marks inserted text at `pos` would carry
    pub fn marks_at(&self, pos: usize) -> Vec<Mark> {
        ResolvedPos::resolve(&self.state.doc, pos)
            .map(|p| p.marks())
            .unwrap_or_default()
    }
}

/// Registry of input rules, tried in registration order
pub struct RuleRegistry {
    rules: Vec<Box<dyn InputRule>>,
}

/// Which built-in rule families are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleToggles {
    pub callout: bool,
    pub math: bool,
    pub markdown_link: bool,
    pub markdown: bool,
}

impl Default for RuleToggles {
    fn default() -> Self {
        Self {
            callout: true,
            math: true,
            markdown_link: true,
            markdown: true,
        }
    }
}

impl RuleRegistry {
    /// Create a new registry with all built-in rules
    pub fn new() -> Self {
        Self::with_toggles(RuleToggles::default())
    }

    /// Built-in rules, minus the disabled families
    pub fn with_toggles(toggles: RuleToggles) -> Self {
        let mut registry = Self::empty();
        if toggles.callout {
            registry.add_rule(Box::new(CalloutRule));
        }
        if toggles.math {
            // Block first: `$$x$$` must not be read as inline math around `$x$`
            registry.add_rule(Box::new(BlockMathRule));
            registry.add_rule(Box::new(InlineMathRule));
        }
        if toggles.markdown_link {
            registry.add_rule(Box::new(LinkRule));
        }
        if toggles.markdown {
            registry.add_rule(Box::new(BlockquoteRule));
            registry.add_rule(Box::new(HeadingRule));
            registry.add_rule(Box::new(CodeBlockRule));
            for rule in MarkRule::all() {
                registry.add_rule(Box::new(rule));
            }
        }
        registry
    }

    /// Create an empty registry
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Add a custom rule to the registry
    pub fn add_rule(&mut self, rule: Box<dyn InputRule>) {
        self.rules.push(rule);
    }

    /// Get all registered rules
    pub fn rules(&self) -> &[Box<dyn InputRule>] {
        &self.rules
    }

    /// Run the rules against the text before the caret
    ///
    /// Returns the winning rule's name and its transaction.
    #[instrument(skip_all, fields(trigger = ?trigger))]
    pub fn run(&self, state: &EditorState, schema: &Schema, trigger: Trigger) -> Option<(&'static str, Transaction)> {
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
        let text = textblock.text_between(window_start, offset, LEAF_CHAR);
        let window_abs = caret.start(caret.depth()) + window_start;

        for rule in &self.rules {
            let Some(pattern) = rule.pattern(trigger) else {
                continue;
            };
            let Some(found) = pattern.captures(&text) else {
                continue;
            };

            let char_pos = |byte: usize| window_abs + text[..byte].chars().count();
            let captures: Vec<Option<Capture>> = found
                .iter()
                .map(|group| {
                    group.map(|m| Capture {
                        start: char_pos(m.start()),
                        text: m.as_str().to_string(),
                    })
                })
                .collect();
            let Some(whole) = found.get(0) else {
                continue;
            };

            let ctx = RuleContext {
                state,
                schema,
                trigger,
                caret: caret.clone(),
                from: char_pos(whole.start()),
                to: state.selection.head,
                captures,
            };
            match rule.handle(&ctx) {
                Some(tr) => {
                    debug!(rule = rule.name(), from = ctx.from, to = ctx.to, "input rule matched");
                    return Some((rule.name(), tr.with_description(rule.name())));
                }
                None => debug!(rule = rule.name(), matched = whole.as_str(), "input rule declined"),
            }
        }
        None
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::selection::Selection;

    /// State with the caret at `caret`
    pub fn state_at(doc: Node, caret: usize) -> EditorState {
        EditorState {
            selection: Selection::cursor(caret),
            ..EditorState::new(doc)
        }
    }

    /// Run the default registry and apply whatever it produced
    pub fn run_rules(state: &EditorState, trigger: Trigger) -> Option<(&'static str, EditorState)> {
        let schema = Schema::builtin();
        let (name, tr) = RuleRegistry::new().run(state, schema, trigger)?;
        let (next, _) = state.apply(&tr, schema).ok()?;
        Some((name, next))
    }

    /// Paragraph with the caret after its text
    pub fn typed(text: &str) -> EditorState {
        state_at(Node::doc(vec![Node::paragraph_text(text)]), 1 + text.chars().count())
    }
}
