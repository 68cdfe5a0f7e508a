use once_cell::sync::Lazy;
use quill_parser::ast::{content_size, Node, NodeType};
use quill_parser::CALLOUT_KINDS;
use regex::Regex;
use tracing::debug;

use super::{InputRule, RuleContext, Trigger};
use crate::selection::Selection;
use crate::transaction::Transaction;

/// `[!kind] ` typed at the start of a line
static ON_INPUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:>[ \t]*)?\[!(\w+)\][ \t]$").unwrap());

/// `[!kind] text` when Enter is pressed after it
static ON_ENTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:>[ \t]*)?\[!(\w+)\][ \t]*(.*)$").unwrap());

/// Turns `[!kind] text` into a callout of that kind
///
/// Unknown kinds are declined and stay literal. Inside a blockquote whose
/// first child is the typed line, the whole quote becomes the callout.
pub struct CalloutRule;

impl InputRule for CalloutRule {
    fn name(&self) -> &'static str {
        "callout"
    }

    fn pattern(&self, trigger: Trigger) -> Option<&Regex> {
        match trigger {
            Trigger::Input => Some(&*ON_INPUT),
            Trigger::Enter => Some(&*ON_ENTER),
        }
    }

    fn handle(&self, ctx: &RuleContext<'_>) -> Option<Transaction> {
        let textblock = ctx.textblock();
        if !ctx.at_block_start() || textblock.node_type != NodeType::Paragraph {
            return None;
        }

        let kind = ctx.group(1)?.to_lowercase();
        if !CALLOUT_KINDS.contains(&kind.as_str()) {
            debug!(kind, "unknown callout kind");
            return None;
        }

        // Trimmed body text, kept as nodes so marks and leaves survive
        let mut content = match (ctx.group(2), ctx.group_start(2)) {
            (Some(body), Some(start)) => {
                let leading = body.chars().take_while(|c| c.is_whitespace()).count();
                let trimmed = body.trim().chars().count();
                let from = start + leading;
                ctx.slice(from, from + trimmed)
            }
            _ => Vec::new(),
        };
        let caret_in_paragraph = content_size(&content);
        content.extend(ctx.rest_of_block());
        let paragraph = textblock.with_content(quill_parser::fragment::normalize(content));

        let depth = ctx.depth();
        let quote_depth = depth.checked_sub(1).filter(|&d| {
            d > 0 && ctx.caret.node(d).node_type == NodeType::Blockquote && ctx.caret.index(d) == 0
        });

        let (from, to, children) = match quote_depth {
            Some(d) => {
                let quote = ctx.caret.node(d);
                let mut children = vec![paragraph];
                children.extend(quote.content.iter().skip(1).cloned());
                (ctx.caret.before(d), ctx.caret.after(d), children)
            }
            None => (ctx.caret.before(depth), ctx.caret.after(depth), vec![paragraph]),
        };

        // callout open + paragraph open
        let caret = from + 2 + caret_in_paragraph;
        Some(
            Transaction::new()
                .replace(from, to, vec![Node::callout(&kind, children)])
                .set_selection(Selection::cursor(caret)),
        )
    }
}
