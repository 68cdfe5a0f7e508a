//! # Commands
//!
//! Each command reads an [`EditorState`] and returns the [`Transaction`]
//! that performs it. Nothing here mutates state; the [`Editor`] dispatches
//! the result.
//!
//! [`Editor`]: crate::Editor

use quill_parser::ast::{content_size, AttrValue, Mark, Node, NodeType};
use quill_parser::fragment;
use quill_parser::schema::Schema;
use quill_parser::CALLOUT_KINDS;

use crate::errors::{EditorError, EditorResult};
use crate::position::ResolvedPos;
use crate::selection::Selection;
use crate::state::EditorState;
use crate::transaction::Transaction;

/// The caret's textblock, resolved at the selection head
fn textblock_at_head<'a>(state: &'a EditorState, command: &'static str) -> EditorResult<ResolvedPos<'a>> {
    let head = state.head()?;
    if head.parent().is_textblock() {
        Ok(head)
    } else {
        Err(EditorError::NotApplicable(command))
    }
}

/// Content of a textblock between two parent offsets
fn block_slice(block: &Node, from: usize, to: usize) -> Vec<Node> {
    fragment::cut(&block.content, from, to).unwrap_or_default()
}

/// Type `text` over the selection
///
/// The text carries the stored marks, or the marks before the caret. Line
/// breaks become hard breaks outside code blocks.
pub fn insert_text(state: &EditorState, schema: &Schema, text: &str) -> EditorResult<Transaction> {
    let head = textblock_at_head(state, "insert_text")?;
    let code = schema.is_code(head.parent().node_type);
    let (from, to) = (state.selection.from(), state.selection.to());

    let content = if code {
        vec![Node::text(text)]
    } else {
        let marks = if state.selection.is_empty() {
            state.marks_at_caret()
        } else {
            state.stored_marks.clone().unwrap_or_else(|| {
                ResolvedPos::resolve(&state.doc, from)
                    .map(|p| p.marks())
                    .unwrap_or_default()
            })
        };
        let mut nodes = Vec::new();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                nodes.push(Node::hard_break());
            }
            nodes.push(Node::text_with_marks(line, marks.clone()));
        }
        fragment::normalize(nodes)
    };

    Ok(Transaction::new().replace(from, to, content))
}

/// Enter: split the caret's textblock in two
///
/// A selection inside the block is removed first. Inside code blocks Enter
/// types a newline instead.
pub fn split_block(state: &EditorState, schema: &Schema) -> EditorResult<Transaction> {
    let head = textblock_at_head(state, "split_block")?;
    let block = head.parent();
    if schema.is_code(block.node_type) {
        return insert_text(state, schema, "\n");
    }

    let depth = head.depth();
    let start = head.start(depth);
    let (from, to) = (state.selection.from(), state.selection.to());
    if from < start || to > head.end(depth) {
        return Err(EditorError::NotApplicable("split_block"));
    }

    let left = block.with_content(block_slice(block, 0, from - start));
    let right_content = block_slice(block, to - start, block.content_size());
    // Splitting at the end of a heading continues with a paragraph
    let right = if right_content.is_empty() && block.node_type == NodeType::Heading {
        Node::paragraph(Vec::new())
    } else {
        block.with_content(right_content)
    };

    let before = head.before(depth);
    let caret = before + left.node_size() + 1;
    Ok(Transaction::new()
        .replace(before, head.after(depth), vec![left, right])
        .set_selection(Selection::cursor(caret))
        .with_description("split block"))
}

/// Backspace
///
/// Deletes the selection, or the character or inline leaf before the caret.
/// At the start of a textblock it turns a heading or code block back into a
/// paragraph, lifts the first block out of its container, removes a leaf
/// block before it, or joins it with the previous textblock.
pub fn delete_backward(state: &EditorState, schema: &Schema) -> EditorResult<Transaction> {
    let sel = state.selection;
    if !sel.is_empty() {
        return Ok(Transaction::new().delete(sel.from(), sel.to()));
    }

    let head = textblock_at_head(state, "delete_backward")?;
    if head.parent_offset() > 0 {
        return Ok(Transaction::new().delete(sel.head - 1, sel.head));
    }

    let depth = head.depth();
    let block = head.parent();
    let before = head.before(depth);
    let after = head.after(depth);

    if block.node_type != NodeType::Paragraph {
        let paragraph = Node::paragraph(plain_inline(block, schema));
        return Ok(Transaction::new()
            .replace(before, after, vec![paragraph])
            .set_selection(Selection::cursor(sel.head)));
    }

    let index = head.index(depth - 1);
    let container = head.node(depth - 1);

    if index == 0 {
        if depth < 2 {
            return Err(EditorError::NotApplicable("delete_backward"));
        }
        // First block of a callout or quote: move it out in front
        let mut replacement = vec![block.clone()];
        if container.child_count() > 1 {
            replacement.push(container.with_content(container.content[1..].to_vec()));
        }
        let outer = head.before(depth - 1);
        return Ok(Transaction::new()
            .replace(outer, head.after(depth - 1), replacement)
            .set_selection(Selection::cursor(outer + 1)));
    }

    let previous = &container.content[index - 1];
    let previous_start = before - previous.node_size();
    if previous.is_leaf() {
        return Ok(Transaction::new().delete(previous_start, before));
    }
    if !previous.is_textblock() {
        return Err(EditorError::NotApplicable("delete_backward"));
    }

    let mut joined = previous.content.clone();
    if schema.is_code(previous.node_type) {
        joined.push(Node::text(block.text_content()));
    } else {
        joined.extend(block.content.iter().cloned());
    }
    let merged = previous.with_content(fragment::normalize(joined));
    Ok(Transaction::new()
        .replace(previous_start, after, vec![merged])
        .set_selection(Selection::cursor(previous_start + 1 + previous.content_size()))
        .with_description("join blocks"))
}

/// Inline content of `block` that a paragraph accepts
fn plain_inline(block: &Node, schema: &Schema) -> Vec<Node> {
    if schema.is_code(block.node_type) {
        let text = block.text_content();
        let mut nodes = Vec::new();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                nodes.push(Node::hard_break());
            }
            nodes.push(Node::text(line));
        }
        fragment::normalize(nodes)
    } else {
        block.content.clone()
    }
}

/// Textblock content ranges overlapping `from..to`, skipping code
fn textblock_ranges(doc: &Node, schema: &Schema, from: usize, to: usize) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    doc.descendants(&mut |node, pos| {
        if node.is_textblock() {
            let start = pos + 1;
            let end = start + node.content_size();
            if !schema.is_code(node.node_type) && end >= from && start <= to {
                let range = (from.max(start), to.min(end));
                if range.0 < range.1 {
                    ranges.push(range);
                }
            }
            return false;
        }
        !node.is_leaf()
    });
    ranges
}

/// Whether every text character in `from..to` carries a mark of this kind
fn range_has_mark(doc: &Node, from: usize, to: usize, mark: &Mark) -> bool {
    let mut any = false;
    let mut all = true;
    doc.descendants(&mut |node, pos| {
        if node.is_text() {
            let end = pos + node.node_size();
            if end > from && pos < to {
                any = true;
                all &= mark.is_in_set(&node.marks);
            }
        }
        !node.is_leaf()
    });
    any && all
}

/// Add or remove a mark over the selection
///
/// With a bare caret this only changes the stored marks for the next
/// typed text.
pub fn toggle_mark(state: &EditorState, schema: &Schema, mark: Mark) -> EditorResult<Transaction> {
    let sel = state.selection;
    if sel.is_empty() {
        let current = state.marks_at_caret();
        let stored = if mark.is_in_set(&current) {
            mark.remove_from(&current)
        } else {
            mark.add_to(&current)
        };
        return Ok(Transaction::new().set_stored_marks(stored));
    }

    let remove = range_has_mark(&state.doc, sel.from(), sel.to(), &mark);
    let ranges = textblock_ranges(&state.doc, schema, sel.from(), sel.to());
    if ranges.is_empty() {
        return Err(EditorError::NotApplicable("toggle_mark"));
    }

    let tr = ranges.into_iter().fold(Transaction::new(), |tr, (from, to)| {
        if remove {
            tr.remove_mark(from, to, mark.clone())
        } else {
            tr.add_mark(from, to, mark.clone())
        }
    });
    Ok(tr.set_selection(sel))
}

/// Turn the caret's textblock into a heading, or back into a paragraph when
/// it already is one of that level
pub fn set_heading(state: &EditorState, schema: &Schema, level: u8) -> EditorResult<Transaction> {
    let head = textblock_at_head(state, "set_heading")?;
    let block = head.parent();
    let depth = head.depth();

    let same_level = block.node_type == NodeType::Heading
        && block.attr("level").and_then(AttrValue::as_int) == Some(i64::from(level));
    let content = plain_inline(block, schema);
    let replacement = if same_level {
        Node::paragraph(content)
    } else {
        Node::heading(level, content)
    };
    schema.check(&replacement)?;

    Ok(Transaction::new()
        .replace(head.before(depth), head.after(depth), vec![replacement])
        .set_selection(state.selection))
}

/// Wrap the caret's textblock in a callout, or change the kind of the
/// callout around it
pub fn set_callout(state: &EditorState, kind: &str) -> EditorResult<Transaction> {
    let kind = kind.to_lowercase();
    if !CALLOUT_KINDS.contains(&kind.as_str()) {
        return Err(EditorError::InvalidCalloutKind(kind));
    }

    let head = state.head()?;
    if let Some(depth) = head.find_depth(|n| n.node_type == NodeType::CalloutNode) {
        if depth > 0 {
            return Ok(Transaction::new().set_node_attr(head.before(depth), "type", AttrValue::str(kind)));
        }
    }

    if !head.parent().is_textblock() {
        return Err(EditorError::NotApplicable("set_callout"));
    }
    let depth = head.depth();
    let sel = state.selection;
    Ok(Transaction::new()
        .replace(
            head.before(depth),
            head.after(depth),
            vec![Node::callout(&kind, vec![head.parent().clone()])],
        )
        .set_selection(Selection::new(sel.anchor + 1, sel.head + 1))
        .with_description("callout"))
}

/// Replace the selection with an inline node and put the caret after it
fn insert_inline(state: &EditorState, node: Node, command: &'static str) -> EditorResult<Transaction> {
    textblock_at_head(state, command)?;
    let sel = state.selection;
    Ok(Transaction::new()
        .replace(sel.from(), sel.to(), vec![node])
        .set_selection(Selection::cursor(sel.from() + 1)))
}

pub fn insert_inline_math(state: &EditorState, latex: &str) -> EditorResult<Transaction> {
    let latex = latex.trim();
    if latex.is_empty() {
        return Err(EditorError::EmptyMath);
    }
    insert_inline(state, Node::inline_math(latex), "insert_inline_math")
}

/// Insert a block math node at the caret, splitting its textblock
pub fn insert_block_math(state: &EditorState, latex: &str) -> EditorResult<Transaction> {
    let latex = latex.trim();
    if latex.is_empty() {
        return Err(EditorError::EmptyMath);
    }

    let head = textblock_at_head(state, "insert_block_math")?;
    let block = head.parent();
    let depth = head.depth();
    let start = head.start(depth);
    let (from, to) = (state.selection.from(), state.selection.to());
    if from < start || to > head.end(depth) {
        return Err(EditorError::NotApplicable("insert_block_math"));
    }

    let mut blocks = Vec::with_capacity(3);
    let left = block_slice(block, 0, from - start);
    if !left.is_empty() {
        blocks.push(block.with_content(left));
    }
    blocks.push(Node::block_math(latex));
    blocks.push(block.with_content(block_slice(block, to - start, block.content_size())));

    let before = head.before(depth);
    let caret = before + content_size(&blocks[..blocks.len() - 1]) + 1;
    Ok(Transaction::new()
        .replace(before, head.after(depth), blocks)
        .set_selection(Selection::cursor(caret)))
}

pub fn insert_image(state: &EditorState, src: &str, alt: Option<&str>, title: Option<&str>) -> EditorResult<Transaction> {
    insert_inline(state, Node::image(src, alt, title), "insert_image")
}

/// Save from the math edit dialog: new expression for the math node at `pos`
pub fn update_math(state: &EditorState, pos: usize, latex: &str) -> EditorResult<Transaction> {
    let latex = latex.trim();
    if latex.is_empty() {
        return Err(EditorError::EmptyMath);
    }
    let resolved = state.resolve(pos)?;
    let is_math = resolved.text_offset().is_none()
        && resolved
            .node_after()
            .map(|n| matches!(n.node_type, NodeType::InlineMath | NodeType::BlockMath))
            .unwrap_or(false);
    if !is_math {
        return Err(EditorError::NotApplicable("update_math"));
    }
    Ok(Transaction::new()
        .set_node_attr(pos, "latex", AttrValue::str(latex))
        .set_selection(state.selection))
}
