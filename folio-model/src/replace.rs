//! The replace kernel: splicing a slice into a range of a document.
//!
//! The entry point is [`Node::replace`](crate::Node::replace). The splice
//! walks down the shared spine of the two endpoints, joins open nodes level
//! by level, and re-validates every rebuilt node against its content
//! expression on the way back up.

use crate::error::ReplaceError;
use crate::fragment::Fragment;
use crate::node::Node;
use crate::resolved_pos::ResolvedPos;
use crate::slice::Slice;

pub(crate) fn replace(
    rp_from: &ResolvedPos,
    rp_to: &ResolvedPos,
    slice: &Slice,
) -> Result<Node, ReplaceError> {
    if slice.open_start() > rp_from.depth() {
        return Err(ReplaceError::InsertTooDeep);
    }
    if rp_from.depth() - slice.open_start() != rp_to.depth() - slice.open_end() {
        return Err(ReplaceError::InconsistentOpenDepths);
    }
    replace_outer(rp_from, rp_to, slice, 0)
}

fn replace_outer(
    rp_from: &ResolvedPos,
    rp_to: &ResolvedPos,
    slice: &Slice,
    depth: usize,
) -> Result<Node, ReplaceError> {
    let index = rp_from.index(depth);
    let node = rp_from.node(depth);
    if index == rp_to.index(depth) && depth < rp_from.depth() - slice.open_start() {
        // Both endpoints are inside the same child, which the slice does not
        // open up: recurse into it.
        let inner = replace_outer(rp_from, rp_to, slice, depth + 1)?;
        Ok(node.copy(node.content().replace_child(index, inner)))
    } else if slice.content().size() == 0 {
        close(node, &replace_two_way(rp_from, rp_to, depth)?)
    } else if slice.open_start() == 0
        && slice.open_end() == 0
        && rp_from.depth() == depth
        && rp_to.depth() == depth
    {
        // Simple, flat case: splice closed content directly into the parent.
        let parent = rp_from.parent();
        let content = parent.content();
        close(
            parent,
            &content
                .cut(0, rp_from.parent_offset())
                .append(slice.content())
                .append(&content.cut_from(rp_to.parent_offset())),
        )
    } else {
        let (node_for_slice, start, end) = prepare_slice_for_replace(slice, rp_from);
        let rp_start = node_for_slice.resolve(start)?;
        let rp_end = node_for_slice.resolve(end)?;
        close(
            node,
            &replace_three_way(rp_from, &rp_start, &rp_end, rp_to, depth)?,
        )
    }
}

fn check_join(main: &Node, sub: &Node) -> Result<(), ReplaceError> {
    if sub.node_type().compatible_content(main.node_type()) {
        Ok(())
    } else {
        Err(ReplaceError::CannotJoin {
            sub: sub.node_type().name().to_owned(),
            main: main.node_type().name().to_owned(),
        })
    }
}

fn joinable<'a>(
    before: &'a ResolvedPos,
    after: &ResolvedPos,
    depth: usize,
) -> Result<&'a Node, ReplaceError> {
    let node = before.node(depth);
    check_join(node, after.node(depth))?;
    Ok(node)
}

fn add_node(child: Node, target: &mut Vec<Node>) {
    if let Some(last) = target.last() {
        if child.is_text() && child.same_markup(last) {
            let merged = child.with_text(format!("{}{}", last.text(), child.text()));
            *target.last_mut().expect("non-empty target") = merged;
            return;
        }
    }
    target.push(child);
}

fn add_range(
    start: Option<&ResolvedPos>,
    end: Option<&ResolvedPos>,
    depth: usize,
    target: &mut Vec<Node>,
) {
    let node = end.or(start).expect("at least one bound").node(depth);
    let mut start_index = 0;
    let end_index = end.map_or(node.child_count(), |e| e.index(depth));
    if let Some(start) = start {
        start_index = start.index(depth);
        if start.depth() > depth {
            start_index += 1;
        } else if start.text_offset() > 0 {
            add_node(start.node_after().expect("text offset implies a node"), target);
            start_index += 1;
        }
    }
    for i in start_index..end_index {
        add_node(node.child(i).clone(), target);
    }
    if let Some(end) = end {
        if end.depth() == depth && end.text_offset() > 0 {
            add_node(end.node_before().expect("text offset implies a node"), target);
        }
    }
}

fn close(node: &Node, content: &Fragment) -> Result<Node, ReplaceError> {
    if !node.node_type().valid_content(content) {
        return Err(ReplaceError::InvalidContent(
            node.node_type().name().to_owned(),
        ));
    }
    Ok(node.copy(content.clone()))
}

fn replace_three_way(
    rp_from: &ResolvedPos,
    rp_start: &ResolvedPos,
    rp_end: &ResolvedPos,
    rp_to: &ResolvedPos,
    depth: usize,
) -> Result<Fragment, ReplaceError> {
    let open_start = if rp_from.depth() > depth {
        Some(joinable(rp_from, rp_start, depth + 1)?)
    } else {
        None
    };
    let open_end = if rp_to.depth() > depth {
        Some(joinable(rp_end, rp_to, depth + 1)?)
    } else {
        None
    };

    let mut content = Vec::new();
    add_range(None, Some(rp_from), depth, &mut content);
    match (open_start, open_end) {
        (Some(os), Some(oe)) if rp_start.index(depth) == rp_end.index(depth) => {
            check_join(os, oe)?;
            let inner = replace_three_way(rp_from, rp_start, rp_end, rp_to, depth + 1)?;
            add_node(close(os, &inner)?, &mut content);
        }
        _ => {
            if let Some(os) = open_start {
                let inner = replace_two_way(rp_from, rp_start, depth + 1)?;
                add_node(close(os, &inner)?, &mut content);
            }
            add_range(Some(rp_start), Some(rp_end), depth, &mut content);
            if let Some(oe) = open_end {
                let inner = replace_two_way(rp_end, rp_to, depth + 1)?;
                add_node(close(oe, &inner)?, &mut content);
            }
        }
    }
    add_range(Some(rp_to), None, depth, &mut content);
    Ok(Fragment::from_nodes(content))
}

fn replace_two_way(
    rp_from: &ResolvedPos,
    rp_to: &ResolvedPos,
    depth: usize,
) -> Result<Fragment, ReplaceError> {
    let mut content = Vec::new();
    add_range(None, Some(rp_from), depth, &mut content);
    if rp_from.depth() > depth {
        let node = joinable(rp_from, rp_to, depth + 1)?;
        let inner = replace_two_way(rp_from, rp_to, depth + 1)?;
        add_node(close(node, &inner)?, &mut content);
    }
    add_range(Some(rp_to), None, depth, &mut content);
    Ok(Fragment::from_nodes(content))
}

fn prepare_slice_for_replace(slice: &Slice, rp_along: &ResolvedPos) -> (Node, usize, usize) {
    let extra = rp_along.depth() - slice.open_start();
    let parent = rp_along.node(extra);
    let mut node = parent.copy(slice.content().clone());
    for i in (0..extra).rev() {
        node = rp_along.node(i).copy(Fragment::from(node));
    }
    let start = slice.open_start() + extra;
    let end = node.content().size() - slice.open_end() - extra;
    (node, start, end)
}
