use once_cell::sync::Lazy;
use quill_parser::ast::{content_size, Node};
use regex::Regex;

use super::{InputRule, RuleContext, Trigger, LEAF_CHAR};
use crate::selection::Selection;
use crate::transaction::Transaction;

/// `$latex$`, not preceded by another `$`
static INLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(^|[^$])\$([^$\n\r]+)\$$").unwrap());

static BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\$([\s\S]*?)\$\$$").unwrap());

/// Trimmed expression, `None` when blank or spanning an inline leaf
fn expression(raw: &str) -> Option<&str> {
    let latex = raw.trim();
    (!latex.is_empty() && !latex.contains(LEAF_CHAR)).then_some(latex)
}

/// `$E=mc^2$` becomes an inline math leaf
pub struct InlineMathRule;

impl InputRule for InlineMathRule {
    fn name(&self) -> &'static str {
        "inline-math"
    }

    fn pattern(&self, trigger: Trigger) -> Option<&Regex> {
        (trigger == Trigger::Input).then(|| &*INLINE)
    }

    fn handle(&self, ctx: &RuleContext<'_>) -> Option<Transaction> {
        let latex = expression(ctx.group(2)?)?;
        // The first group is the character before the opening `$`, if any
        let from = ctx.from + ctx.group(1).map(|g| g.chars().count()).unwrap_or(0);
        Some(Transaction::new().replace(from, ctx.to, vec![Node::inline_math(latex)]))
    }
}

/// `$$latex$$` becomes a block math node, splitting the textblock around it
pub struct BlockMathRule;

impl InputRule for BlockMathRule {
    fn name(&self) -> &'static str {
        "block-math"
    }

    fn pattern(&self, trigger: Trigger) -> Option<&Regex> {
        (trigger == Trigger::Input).then(|| &*BLOCK)
    }

    fn handle(&self, ctx: &RuleContext<'_>) -> Option<Transaction> {
        let latex = expression(ctx.group(1)?)?;
        let textblock = ctx.textblock();
        let depth = ctx.depth();

        let mut blocks = Vec::with_capacity(3);
        let before = ctx.slice(ctx.block_start(), ctx.from);
        if !before.is_empty() {
            blocks.push(textblock.with_content(before));
        }
        blocks.push(Node::block_math(latex));
        // Always leave a textblock after the math for the caret
        blocks.push(textblock.with_content(ctx.rest_of_block()));

        let start = ctx.caret.before(depth);
        let caret = start + content_size(&blocks[..blocks.len() - 1]) + 1;
        Some(
            Transaction::new()
                .replace(start, ctx.caret.after(depth), blocks)
                .set_selection(Selection::cursor(caret)),
        )
    }
}
