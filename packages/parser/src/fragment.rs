//! Operations on runs of sibling nodes
//!
//! Offsets are content-relative positions (see [`Node::node_size`]). Text runs
//! can be cut anywhere; any other child can only be cut at its boundaries.

use crate::ast::Node;

/// Merge adjacent text runs with identical marks and drop empty runs
pub fn normalize(content: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(content.len());
    for node in content {
        if node.is_text() && node.text_str().is_empty() {
            continue;
        }
        if let Some(last) = out.last_mut() {
            if last.is_text() && node.is_text() && last.marks == node.marks {
                let mut text = last.text.take().unwrap_or_default();
                text.push_str(node.text_str());
                last.text = Some(text);
                continue;
            }
        }
        out.push(node);
    }
    out
}

fn split_text(node: &Node, at: usize) -> (Node, Node) {
    let text = node.text_str();
    let byte = text.char_indices().nth(at).map(|(i, _)| i).unwrap_or(text.len());
    let mut left = node.clone();
    let mut right = node.clone();
    left.text = Some(text[..byte].to_string());
    right.text = Some(text[byte..].to_string());
    (left, right)
}

/// Split siblings at `offset`; `None` when the offset lands inside a non-text child
pub fn split_at(content: &[Node], offset: usize) -> Option<(Vec<Node>, Vec<Node>)> {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut pos = 0;
    for node in content {
        let size = node.node_size();
        let end = pos + size;
        if end <= offset {
            left.push(node.clone());
        } else if pos >= offset {
            right.push(node.clone());
        } else if node.is_text() {
            let (l, r) = split_text(node, offset - pos);
            left.push(l);
            right.push(r);
        } else {
            return None;
        }
        pos = end;
    }
    if offset > pos {
        return None;
    }
    Some((normalize(left), normalize(right)))
}

/// Siblings between two offsets
pub fn cut(content: &[Node], from: usize, to: usize) -> Option<Vec<Node>> {
    let (_, tail) = split_at(content, from)?;
    let (middle, _) = split_at(&tail, to.checked_sub(from)?)?;
    Some(middle)
}

/// Replace the siblings between two offsets with `insert`
pub fn replace(content: &[Node], from: usize, to: usize, insert: Vec<Node>) -> Option<Vec<Node>> {
    if from > to {
        return None;
    }
    let (head, rest) = split_at(content, from)?;
    let (_, tail) = split_at(&rest, to - from)?;
    let mut out = head;
    out.extend(insert);
    out.extend(tail);
    Some(normalize(out))
}

/// Apply `f` to the mark set of every text run between two offsets
pub fn map_marks<F>(content: &[Node], from: usize, to: usize, f: F) -> Option<Vec<Node>>
where
    F: Fn(&[crate::ast::Mark]) -> Vec<crate::ast::Mark>,
{
    let (head, rest) = split_at(content, from)?;
    let (middle, tail) = split_at(&rest, to.checked_sub(from)?)?;
    let mut out = head;
    out.extend(middle.into_iter().map(|mut node| {
        if node.is_text() {
            node.marks = f(&node.marks);
        }
        node
    }));
    out.extend(tail);
    Some(normalize(out))
}
