use once_cell::sync::Lazy;
use quill_parser::ast::{Mark, Node};
use regex::Regex;

use super::{InputRule, RuleContext, Trigger, LEAF_CHAR};
use crate::transaction::Transaction;

static LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)$").unwrap());

/// `[alias](url)` becomes linked text followed by a plain space
pub struct LinkRule;

impl InputRule for LinkRule {
    fn name(&self) -> &'static str {
        "link"
    }

    fn pattern(&self, trigger: Trigger) -> Option<&Regex> {
        (trigger == Trigger::Input).then(|| &*LINK)
    }

    fn handle(&self, ctx: &RuleContext<'_>) -> Option<Transaction> {
        let alias = ctx.group(1)?.trim();
        let url = ctx.group(2)?.trim();
        if alias.is_empty() || url.is_empty() || alias.contains([LEAF_CHAR, '\n']) || url.contains([LEAF_CHAR, '\n']) {
            return None;
        }

        let base = Mark::link(url).remove_from(&ctx.marks_at(ctx.from));
        let linked = Mark::link(url).add_to(&base);
        Some(
            Transaction::new()
                .replace(
                    ctx.from,
                    ctx.to,
                    vec![Node::text_with_marks(alias, linked), Node::text_with_marks(" ", base.clone())],
                )
                .set_stored_marks(base),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::selection::Selection;

    #[test]
    fn test_link_then_plain_space() {
        let (name, next) = run_rules(&typed("See [Docs](https://example.com)"), Trigger::Input).unwrap();
        assert_eq!(name, "link");
        assert_eq!(
            next.doc,
            Node::doc(vec![Node::paragraph(vec![
                Node::text("See "),
                Node::text_with_marks("Docs", vec![Mark::link("https://example.com")]),
                Node::text(" "),
            ])])
        );
        assert_eq!(next.selection, Selection::cursor(10));
        assert!(next.marks_at_caret().is_empty());
    }

    #[test]
    fn test_link_keeps_surrounding_marks() {
        let state = state_at(
            Node::doc(vec![Node::paragraph(vec![Node::text_with_marks(
                "[a](b)",
                vec![Mark::Bold],
            )])]),
            7,
        );
        let (_, next) = run_rules(&state, Trigger::Input).unwrap();
        assert_eq!(
            next.doc.content[0].content,
            vec![
                Node::text_with_marks("a", vec![Mark::link("b"), Mark::Bold]),
                Node::text_with_marks(" ", vec![Mark::Bold]),
            ]
        );
    }

    #[test]
    fn test_blank_alias_or_url_is_declined() {
        assert!(run_rules(&typed("[ ](https://example.com)"), Trigger::Input).is_none());
        assert!(run_rules(&typed("[Docs]( )"), Trigger::Input).is_none());
    }
}
