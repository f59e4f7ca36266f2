//! Structural queries: where can content be split, lifted, wrapped,
//! joined, inserted, or dropped.

use folio_model::{Attrs, Node, NodeRange, NodeType, Slice};

/// A node type together with optional attribute overrides, used to describe
/// wrappers and split results.
#[derive(Debug, Clone)]
pub struct TypeAndAttrs {
    /// The node type.
    pub node_type: NodeType,
    /// Attributes for the node, or `None` for the type's defaults.
    pub attrs: Option<Attrs>,
}

impl TypeAndAttrs {
    /// Pair a type with its default attributes.
    pub fn plain(node_type: NodeType) -> TypeAndAttrs {
        TypeAndAttrs {
            node_type,
            attrs: None,
        }
    }
}

fn can_cut(node: &Node, start: usize, end: usize) -> bool {
    if start == 0 || node.can_replace(start, node.child_count(), None) {
        end == node.child_count() || node.can_replace(0, end, None)
    } else {
        false
    }
}

/// Try to find a target depth to which the content in the given range can
/// be lifted. Will not go across isolating parent nodes.
pub fn lift_target(range: &NodeRange) -> Option<usize> {
    let parent = range.parent();
    let content = parent
        .content()
        .cut_by_index(range.start_index(), range.end_index());
    let mut depth = range.depth();
    loop {
        let node = range.from().node(depth);
        let index = range.from().index(depth);
        let end_index = range.to().index_after(depth);
        if depth < range.depth() && node.can_replace(index, end_index, Some(&content)) {
            return Some(depth);
        }
        if depth == 0 || node.node_type().spec().isolating || !can_cut(node, index, end_index) {
            return None;
        }
        depth -= 1;
    }
}

/// Try to find a valid way to wrap the content in the given range in a node
/// of the given type. May introduce extra nodes around and inside the
/// wrapper node, if necessary. Returns `None` if no valid wrapping could be
/// found. When `inner_range` is given, that range's content is used as the
/// content to fit into the wrapping, instead of the content of `range`.
pub fn find_wrapping(
    range: &NodeRange,
    node_type: &NodeType,
    attrs: Option<&Attrs>,
    inner_range: Option<&NodeRange>,
) -> Option<Vec<TypeAndAttrs>> {
    let inner_range = inner_range.unwrap_or(range);
    let around = find_wrapping_outside(range, node_type)?;
    let inner = find_wrapping_inside(inner_range, node_type)?;
    let mut result: Vec<TypeAndAttrs> =
        around.into_iter().map(TypeAndAttrs::plain).collect();
    result.push(TypeAndAttrs {
        node_type: node_type.clone(),
        attrs: attrs.cloned(),
    });
    result.extend(inner.into_iter().map(TypeAndAttrs::plain));
    Some(result)
}

fn find_wrapping_outside(range: &NodeRange, node_type: &NodeType) -> Option<Vec<NodeType>> {
    let parent = range.parent();
    let start_index = range.start_index();
    let end_index = range.end_index();
    let around = parent
        .content_match_at(start_index)
        .find_wrapping(node_type)?;
    let outer = around.first().unwrap_or(node_type);
    if parent.can_replace_with(start_index, end_index, outer, None) {
        Some(around)
    } else {
        None
    }
}

fn find_wrapping_inside(range: &NodeRange, node_type: &NodeType) -> Option<Vec<NodeType>> {
    let parent = range.parent();
    let start_index = range.start_index();
    let end_index = range.end_index();
    let inner_node = parent.child(start_index);
    let inside = node_type
        .content_match()
        .find_wrapping(inner_node.node_type())?;
    let last_type = inside.last().unwrap_or(node_type).clone();
    let mut inner_match = Some(last_type.content_match().clone());
    for i in start_index..end_index {
        inner_match = inner_match.and_then(|m| m.match_type(parent.child(i).node_type()));
    }
    match inner_match {
        Some(m) if m.valid_end() => Some(inside),
        _ => None,
    }
}

/// Check whether the content of the textblock at the given position can be
/// changed to the given node type.
pub fn can_change_type(doc: &Node, pos: usize, node_type: &NodeType) -> bool {
    let Ok(rp) = doc.resolve(pos) else { return false };
    let index = rp.index(rp.depth());
    rp.parent().can_replace_with(index, index + 1, node_type, None)
}

/// Check whether splitting at the given position is allowed.
pub fn can_split(
    doc: &Node,
    pos: usize,
    depth: usize,
    types_after: Option<&[Option<TypeAndAttrs>]>,
) -> bool {
    let Ok(rp) = doc.resolve(pos) else { return false };
    if rp.depth() < depth {
        return false;
    }
    let base = rp.depth() - depth;
    let inner_type: &NodeType = types_after
        .and_then(|t| t.last())
        .and_then(Option::as_ref)
        .map_or_else(|| rp.parent().node_type(), |ta| &ta.node_type);
    if rp.parent().node_type().spec().isolating
        || !rp
            .parent()
            .can_replace(rp.index(rp.depth()), rp.parent().child_count(), None)
        || !inner_type.valid_content(
            &rp.parent()
                .content()
                .cut_by_index(rp.index(rp.depth()), rp.parent().child_count()),
        )
    {
        return false;
    }
    let mut d = rp.depth() as isize - 1;
    let mut i = depth as isize - 2;
    while d > base as isize {
        let du = d as usize;
        let node = rp.node(du);
        let index = rp.index(du);
        if node.node_type().spec().isolating {
            return false;
        }
        let mut rest = node.content().cut_by_index(index, node.child_count());
        let override_child = types_after
            .and_then(|t| t.get((i + 1) as usize))
            .and_then(Option::as_ref);
        if let Some(over) = override_child {
            let Ok(created) = over.node_type.create(over.attrs.as_ref(), None, None) else {
                return false;
            };
            rest = rest.replace_child(0, created);
        }
        let after_type = types_after
            .and_then(|t| {
                if i >= 0 {
                    t.get(i as usize).and_then(Option::as_ref)
                } else {
                    None
                }
            })
            .map_or_else(|| node.node_type().clone(), |ta| ta.node_type.clone());
        if !node.can_replace(index + 1, node.child_count(), None)
            || !after_type.valid_content(&rest)
        {
            return false;
        }
        d -= 1;
        i -= 1;
    }
    let index = rp.index_after(base);
    let base_type = types_after
        .and_then(|t| t.first())
        .and_then(Option::as_ref)
        .map(|ta| ta.node_type.clone());
    let target = base_type.unwrap_or_else(|| rp.node(base + 1).node_type().clone());
    rp.node(base).can_replace_with(index, index, &target, None)
}

pub(crate) fn joinable_nodes(a: Option<&Node>, b: Option<&Node>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => !a.is_leaf() && a.can_append(b),
        _ => false,
    }
}

/// Test whether the blocks before and after a given position can be joined.
pub fn can_join(doc: &Node, pos: usize) -> bool {
    let Ok(rp) = doc.resolve(pos) else { return false };
    let index = rp.index(rp.depth());
    joinable_nodes(rp.node_before().as_ref(), rp.node_after().as_ref())
        && rp.parent().can_replace(index, index + 1, None)
}

/// Find an ancestor of the given position that can be joined to the block
/// before (or after if `dir` is positive). Returns the joinable point, if
/// any.
pub fn join_point(doc: &Node, pos: usize, dir: i32) -> Option<usize> {
    let mut pos = pos;
    let rp = doc.resolve(pos).ok()?;
    for d in (0..=rp.depth()).rev() {
        let mut index = rp.index(d);
        let (before, after): (Option<Node>, Option<Node>) = if d == rp.depth() {
            (rp.node_before(), rp.node_after())
        } else if dir > 0 {
            index += 1;
            (
                Some(rp.node(d + 1).clone()),
                rp.node(d).maybe_child(index).cloned(),
            )
        } else {
            (
                if index > 0 {
                    rp.node(d).maybe_child(index - 1).cloned()
                } else {
                    None
                },
                Some(rp.node(d + 1).clone()),
            )
        };
        if let Some(before_node) = &before {
            if !before_node.is_textblock()
                && joinable_nodes(before.as_ref(), after.as_ref())
                && rp.node(d).can_replace(index, index + 1, None)
            {
                return Some(pos);
            }
        }
        if d == 0 {
            break;
        }
        pos = if dir < 0 { rp.before(d) } else { rp.after(d) };
    }
    None
}

/// Try to find a point where a node of the given type can be inserted near
/// `pos`, by searching up the node hierarchy when `pos` itself isn't a
/// valid place but is at the start or end of a node. Returns `None` if no
/// position was found.
pub fn insert_point(doc: &Node, pos: usize, node_type: &NodeType) -> Option<usize> {
    let rp = doc.resolve(pos).ok()?;
    let index = rp.index(rp.depth());
    if rp.parent().can_replace_with(index, index, node_type, None) {
        return Some(pos);
    }
    if rp.parent_offset() == 0 {
        for d in (0..rp.depth()).rev() {
            let index = rp.index(d);
            if rp.node(d).can_replace_with(index, index, node_type, None) {
                return Some(rp.before(d + 1));
            }
            if index > 0 {
                return None;
            }
        }
    }
    if rp.parent_offset() == rp.parent().content().size() {
        for d in (0..rp.depth()).rev() {
            let index = rp.index_after(d);
            if rp.node(d).can_replace_with(index, index, node_type, None) {
                return Some(rp.after(d + 1));
            }
            if index < rp.node(d).child_count() {
                return None;
            }
        }
    }
    None
}

/// Finds a position at or around the given position where the given slice
/// can be inserted. Will look at parent nodes' nearest boundary and try
/// there, even if the original position wasn't directly at the start or end
/// of that node. Returns `None` when no position was found.
pub fn drop_point(doc: &Node, pos: usize, slice: &Slice) -> Option<usize> {
    let rp = doc.resolve(pos).ok()?;
    if slice.content().size() == 0 {
        return Some(pos);
    }
    let mut content = slice.content().clone();
    for _ in 0..slice.open_start() {
        content = content
            .first_child()
            .expect("open depth implies a child")
            .content()
            .clone();
    }
    let passes = if slice.open_start() == 0 && slice.size() > 0 {
        2
    } else {
        1
    };
    for pass in 1..=passes {
        for d in (1..=rp.depth()).rev() {
            let bias: i32 = if d == rp.depth() {
                0
            } else if rp.pos() * 2 <= rp.start(d + 1) + rp.end(d + 1) {
                -1
            } else {
                1
            };
            let insert_pos = rp.index(d) + usize::from(bias > 0);
            let parent = rp.node(d);
            let fits = if pass == 1 {
                parent.can_replace(insert_pos, insert_pos, Some(&content))
            } else {
                let first_type = content
                    .first_child()
                    .expect("non-empty content")
                    .node_type()
                    .clone();
                parent
                    .content_match_at(insert_pos)
                    .find_wrapping(&first_type)
                    .and_then(|w| w.first().cloned())
                    .is_some_and(|wrap| {
                        parent.can_replace_with(insert_pos, insert_pos, &wrap, None)
                    })
            };
            if fits {
                return Some(if bias == 0 {
                    rp.pos()
                } else if bias < 0 {
                    rp.before(d + 1)
                } else {
                    rp.after(d + 1)
                });
            }
        }
    }
    None
}
