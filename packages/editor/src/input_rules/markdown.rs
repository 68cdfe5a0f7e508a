//! Markdown-style shortcuts: block prefixes and inline mark delimiters

use once_cell::sync::Lazy;
use quill_parser::ast::{Mark, Node, NodeType};
use regex::Regex;

use super::{InputRule, RuleContext, Trigger, LEAF_CHAR};
use crate::selection::Selection;
use crate::transaction::Transaction;

static BLOCKQUOTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^>[ \t]$").unwrap());
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})[ \t]$").unwrap());
static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```([A-Za-z0-9_+\-]*)[ \t]$").unwrap());

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|\s)\*\*([^*]+)\*\*$").unwrap());
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|\s)\*([^*]+)\*$").unwrap());
static STRIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|\s)~~([^~]+)~~$").unwrap());
static CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|\s)`([^`]+)`$").unwrap());
static HIGHLIGHT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|\s)==([^=]+)==$").unwrap());

/// Replace the caret's paragraph with `block`, carrying the text after the
/// caret over; `inner` is the number of opening boundaries before the caret
fn convert_paragraph(ctx: &RuleContext<'_>, block: Node, inner: usize) -> Option<Transaction> {
    if !ctx.at_block_start() || ctx.textblock().node_type != NodeType::Paragraph {
        return None;
    }
    let depth = ctx.depth();
    let start = ctx.caret.before(depth);
    Some(
        Transaction::new()
            .replace(start, ctx.caret.after(depth), vec![block])
            .set_selection(Selection::cursor(start + inner)),
    )
}

/// `> ` wraps the line in a blockquote
pub struct BlockquoteRule;

impl InputRule for BlockquoteRule {
    fn name(&self) -> &'static str {
        "blockquote"
    }

    fn pattern(&self, trigger: Trigger) -> Option<&Regex> {
        (trigger == Trigger::Input).then(|| &*BLOCKQUOTE)
    }

    fn handle(&self, ctx: &RuleContext<'_>) -> Option<Transaction> {
        let paragraph = ctx.textblock().with_content(ctx.rest_of_block());
        convert_paragraph(ctx, Node::blockquote(vec![paragraph]), 2)
    }
}

/// `# ` through `###### ` turn the line into a heading
pub struct HeadingRule;

impl InputRule for HeadingRule {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn pattern(&self, trigger: Trigger) -> Option<&Regex> {
        (trigger == Trigger::Input).then(|| &*HEADING)
    }

    fn handle(&self, ctx: &RuleContext<'_>) -> Option<Transaction> {
        let level = u8::try_from(ctx.group(1)?.len()).ok()?;
        convert_paragraph(ctx, Node::heading(level, ctx.rest_of_block()), 1)
    }
}

/// ```` ```lang ```` followed by a space opens a code block
pub struct CodeBlockRule;

impl InputRule for CodeBlockRule {
    fn name(&self) -> &'static str {
        "code-block"
    }

    fn pattern(&self, trigger: Trigger) -> Option<&Regex> {
        (trigger == Trigger::Input).then(|| &*CODE_BLOCK)
    }

    fn handle(&self, ctx: &RuleContext<'_>) -> Option<Transaction> {
        let language = ctx.group(1).filter(|l| !l.is_empty());
        // Code holds plain text only
        let code = Node::paragraph(ctx.rest_of_block()).text_content();
        convert_paragraph(ctx, Node::code_block(language, &code), 1)
    }
}

/// Delimited text such as `**bold**` gets a mark, and typing after it is plain
pub struct MarkRule {
    name: &'static str,
    pattern: &'static Lazy<Regex>,
    mark: Mark,
}

impl MarkRule {
    pub fn new(name: &'static str, pattern: &'static Lazy<Regex>, mark: Mark) -> Self {
        Self { name, pattern, mark }
    }

    /// Built-in mark shortcuts, bold before italic
    pub fn all() -> Vec<MarkRule> {
        vec![
            Self::new("bold", &BOLD, Mark::Bold),
            Self::new("italic", &ITALIC, Mark::Italic),
            Self::new("strike", &STRIKE, Mark::Strike),
            Self::new("code", &CODE, Mark::Code),
            Self::new("highlight", &HIGHLIGHT, Mark::Highlight { color: None }),
        ]
    }
}

impl InputRule for MarkRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn pattern(&self, trigger: Trigger) -> Option<&Regex> {
        (trigger == Trigger::Input).then(|| &**self.pattern)
    }

    fn handle(&self, ctx: &RuleContext<'_>) -> Option<Transaction> {
        let inner = ctx.group(2)?;
        if inner.trim() != inner || inner.contains([LEAF_CHAR, '\n']) {
            return None;
        }

        let from = ctx.from + ctx.group(1).map(|g| g.chars().count()).unwrap_or(0);
        let base = ctx.marks_at(from);
        let marked = self.mark.add_to(&base);
        Some(
            Transaction::new()
                .replace(from, ctx.to, vec![Node::text_with_marks(inner, marked)])
                .set_stored_marks(base),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_blockquote_prefix() {
        let (name, next) = run_rules(&typed("> "), Trigger::Input).unwrap();
        assert_eq!(name, "blockquote");
        assert_eq!(
            next.doc,
            Node::doc(vec![Node::blockquote(vec![Node::paragraph(vec![])])])
        );
        assert_eq!(next.selection, Selection::cursor(2));
    }

    #[test]
    fn test_heading_levels() {
        let (_, next) = run_rules(&typed("### "), Trigger::Input).unwrap();
        assert_eq!(next.doc, Node::doc(vec![Node::heading(3, vec![])]));
        assert!(run_rules(&typed("####### "), Trigger::Input).is_none());
    }

    #[test]
    fn test_hard_break_is_not_a_space() {
        let para = Node::paragraph(vec![Node::text("##"), Node::hard_break()]);
        assert!(run_rules(&state_at(Node::doc(vec![para]), 4), Trigger::Input).is_none());

        let para = Node::paragraph(vec![Node::text("**a"), Node::hard_break(), Node::text("b**")]);
        assert!(run_rules(&state_at(Node::doc(vec![para]), 8), Trigger::Input).is_none());
    }

    #[test]
    fn test_code_block_with_language() {
        let (_, next) = run_rules(&typed("```rs "), Trigger::Input).unwrap();
        assert_eq!(next.doc, Node::doc(vec![Node::code_block(Some("rust"), "")]));
        assert_eq!(next.selection, Selection::cursor(1));
    }

    #[test]
    fn test_bold_shortcut_clears_stored_mark() {
        assert!(run_rules(&typed("make **this** "), Trigger::Input).is_none());
        let (name, next) = run_rules(&typed("make **this**"), Trigger::Input).unwrap();
        assert_eq!(name, "bold");
        assert_eq!(
            next.doc.content[0].content,
            vec![
                Node::text("make "),
                Node::text_with_marks("this", vec![Mark::Bold]),
            ]
        );
        assert!(next.marks_at_caret().is_empty());
    }

    #[test]
    fn test_italic_and_highlight() {
        let (name, next) = run_rules(&typed("*it*"), Trigger::Input).unwrap();
        assert_eq!(name, "italic");
        assert_eq!(next.doc.content[0].content[0].marks, vec![Mark::Italic]);

        let (name, _) = run_rules(&typed("==hi=="), Trigger::Input).unwrap();
        assert_eq!(name, "highlight");
    }

    #[test]
    fn test_padded_or_glued_delimiters_are_ignored() {
        assert!(run_rules(&typed("** x**"), Trigger::Input).is_none());
        assert!(run_rules(&typed("a*b*"), Trigger::Input).is_none());
    }
}
