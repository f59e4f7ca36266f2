//! Positions decomposed along the document spine.

use std::fmt;

use crate::error::PositionError;
use crate::fragment::Index;
use crate::mark::Mark;
use crate::node::Node;

#[derive(Clone)]
struct PathItem {
    node: Node,
    index: usize,
    /// Absolute position just before the child at `index`.
    before_child: usize,
}

/// You can resolve a position to get more information about it. Objects of
/// this type represent such a resolved position, providing various pieces
/// of context information, and some helper methods.
///
/// Depth parameters are explicit throughout this interface; pass
/// [`depth()`](ResolvedPos::depth) for the innermost level.
#[derive(Clone)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<PathItem>,
    parent_offset: usize,
}

impl ResolvedPos {
    pub(crate) fn resolve(doc: &Node, pos: usize) -> Result<ResolvedPos, PositionError> {
        if pos > doc.content().size() {
            return Err(PositionError::OutOfRange { pos });
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc.clone();
        loop {
            let Index { index, offset } = node
                .content()
                .find_index(parent_offset)
                .expect("position was validated against the document");
            let rem = parent_offset - offset;
            path.push(PathItem {
                node: node.clone(),
                index,
                before_child: start + offset,
            });
            if rem == 0 {
                break;
            }
            let child = node.child(index).clone();
            if child.is_text() {
                break;
            }
            parent_offset = rem - 1;
            start += offset + 1;
            node = child;
        }
        Ok(ResolvedPos {
            pos,
            path,
            parent_offset,
        })
    }

    /// The position that was resolved.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The number of levels the parent of the resolved position is from the
    /// root. If the position points directly into the root, this is 0.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// The offset this position has into its parent node.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// The parent node that the position points into.
    pub fn parent(&self) -> &Node {
        self.node(self.depth())
    }

    /// The root node in which the position was resolved.
    pub fn doc(&self) -> &Node {
        self.node(0)
    }

    /// The ancestor node at the given level. `node(0)` is the root.
    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth].node
    }

    /// The index into the ancestor at the given level. If this points at
    /// the 3rd node in the 2nd paragraph on the top level, for example,
    /// `index(0)` is 1 and `index(1)` is 2.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// The index pointing after this position into the ancestor at the
    /// given level.
    pub fn index_after(&self, depth: usize) -> usize {
        let extra = usize::from(!(depth == self.depth() && self.text_offset() == 0));
        self.index(depth) + extra
    }

    /// The (absolute) position at the start of the node at the given level.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].before_child + 1
        }
    }

    /// The (absolute) position at the end of the node at the given level.
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content().size()
    }

    /// The (absolute) position directly before the wrapping node at the
    /// given level, or, when `depth` is `depth() + 1`, the original
    /// position.
    ///
    /// # Panics
    /// Panics when `depth` is 0: there is no position before the top-level
    /// node.
    pub fn before(&self, depth: usize) -> usize {
        assert!(depth != 0, "There is no position before the top-level node");
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth - 1].before_child
        }
    }

    /// The (absolute) position directly after the wrapping node at the
    /// given level, or, when `depth` is `depth() + 1`, the original
    /// position.
    ///
    /// # Panics
    /// Panics when `depth` is 0: there is no position after the top-level
    /// node.
    pub fn after(&self, depth: usize) -> usize {
        assert!(depth != 0, "There is no position after the top-level node");
        if depth == self.depth() + 1 {
            self.pos
        } else {
            self.path[depth - 1].before_child + self.node(depth).node_size()
        }
    }

    /// When this position points into a text node, the distance between the
    /// position and the start of the text node. Will be zero for positions
    /// that point between nodes.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path.last().expect("non-empty path").before_child
    }

    /// Get the node directly after the position, if any. If the position
    /// points into a text node, only the part of that node after the
    /// position is returned.
    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if index == parent.child_count() {
            return None;
        }
        let d_off = self.text_offset();
        let child = parent.child(index);
        if d_off > 0 {
            Some(child.cut_from(d_off))
        } else {
            Some(child.clone())
        }
    }

    /// Get the node directly before the position, if any. If the position
    /// points into a text node, only the part of that node before the
    /// position is returned.
    pub fn node_before(&self) -> Option<Node> {
        let index = self.index(self.depth());
        let d_off = self.text_offset();
        if d_off > 0 {
            return Some(self.parent().child(index).cut(0, d_off));
        }
        if index == 0 {
            None
        } else {
            Some(self.parent().child(index - 1).clone())
        }
    }

    /// Get the position at the given index in the parent node at the given
    /// depth.
    pub fn pos_at_index(&self, index: usize, depth: usize) -> usize {
        let node = &self.path[depth].node;
        let mut pos = self.start(depth);
        for i in 0..index {
            pos += node.child(i).node_size();
        }
        pos
    }

    /// Get the marks at this position, factoring in the surrounding marks'
    /// `inclusive` property. If the position is at the start of a non-empty
    /// node, the marks of the node after it (if any) are returned.
    pub fn marks(&self) -> Vec<Mark> {
        let parent = self.parent();
        let index = self.index(self.depth());
        if parent.content().size() == 0 {
            return Vec::new();
        }
        if self.text_offset() > 0 {
            return parent.child(index).marks().to_vec();
        }
        let mut main = if index == 0 {
            None
        } else {
            parent.maybe_child(index - 1)
        };
        let mut other = parent.maybe_child(index);
        if main.is_none() {
            std::mem::swap(&mut main, &mut other);
        }
        let main = main.expect("parent has content");
        let mut marks = main.marks().to_vec();
        let mut i = 0;
        while i < marks.len() {
            let mark = marks[i].clone();
            if !mark.mark_type().spec().inclusive
                && !other.is_some_and(|o| mark.is_in_set(o.marks()))
            {
                marks = mark.remove_from_set(&marks);
            } else {
                i += 1;
            }
        }
        marks
    }

    /// Get the marks after this position, if any, except those that are
    /// non-inclusive and not present at position `end`. Used for copying
    /// marks across a replaced range.
    pub fn marks_across(&self, end: &ResolvedPos) -> Option<Vec<Mark>> {
        let after = self.parent().maybe_child(self.index(self.depth()))?;
        if !after.is_inline() {
            return None;
        }
        let mut marks = after.marks().to_vec();
        let next = end.parent().maybe_child(end.index(end.depth()));
        let mut i = 0;
        while i < marks.len() {
            let mark = marks[i].clone();
            if !mark.mark_type().spec().inclusive
                && !next.is_some_and(|n| mark.is_in_set(n.marks()))
            {
                marks = mark.remove_from_set(&marks);
            } else {
                i += 1;
            }
        }
        Some(marks)
    }

    /// The depth up to which this position and the given (non-resolved)
    /// position share the same parent nodes.
    pub fn shared_depth(&self, pos: usize) -> usize {
        let mut depth = self.depth();
        while depth > 0 {
            if self.start(depth) <= pos && self.end(depth) >= pos {
                return depth;
            }
            depth -= 1;
        }
        0
    }

    /// Returns a range based on the place where this position and the given
    /// position diverge around block content. If both point into the same
    /// textblock, for example, a range around that textblock is returned.
    /// If they point into different blocks, the range around those blocks
    /// in their shared ancestor is returned. You can pass a predicate that
    /// every ancestor considered must satisfy.
    pub fn block_range(
        &self,
        other: Option<&ResolvedPos>,
        pred: Option<&dyn Fn(&Node) -> bool>,
    ) -> Option<NodeRange> {
        let other = other.unwrap_or(self);
        if other.pos < self.pos {
            return other.block_range(Some(self), pred);
        }
        let adjust = if self.parent().inline_content() {
            1
        } else {
            usize::from(self.pos == other.pos)
        };
        let mut d = self.depth() as isize - adjust as isize;
        while d >= 0 {
            let depth = d as usize;
            if other.pos <= self.end(depth) && pred.map_or(true, |p| p(self.node(depth))) {
                return Some(NodeRange::new(self.clone(), other.clone(), depth));
            }
            d -= 1;
        }
        None
    }

    /// Query whether the given position shares the same parent node.
    pub fn same_parent(&self, other: &ResolvedPos) -> bool {
        self.pos - self.parent_offset == other.pos - other.parent_offset
    }

    /// Return the greater of this and the given position.
    pub fn max<'a>(&'a self, other: &'a ResolvedPos) -> &'a ResolvedPos {
        if other.pos > self.pos {
            other
        } else {
            self
        }
    }

    /// Return the smaller of this and the given position.
    pub fn min<'a>(&'a self, other: &'a ResolvedPos) -> &'a ResolvedPos {
        if other.pos < self.pos {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for ResolvedPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 1..=self.depth() {
            if i > 1 {
                write!(f, "/")?;
            }
            write!(f, "{}_{}", self.node(i).node_type().name(), self.index(i - 1))?;
        }
        write!(f, ":{}", self.parent_offset)
    }
}

impl fmt::Debug for ResolvedPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ResolvedPos {self}>")
    }
}

/// Represents a flat range of content, i.e. one that starts and ends in the
/// same node.
#[derive(Clone)]
pub struct NodeRange {
    from: ResolvedPos,
    to: ResolvedPos,
    depth: usize,
}

impl NodeRange {
    /// Construct a node range. `from` and `to` should point into the same
    /// node until at least the given `depth`, since a node range denotes an
    /// adjacent set of nodes in a single parent node.
    pub fn new(from: ResolvedPos, to: ResolvedPos, depth: usize) -> NodeRange {
        NodeRange { from, to, depth }
    }

    /// A resolved position along the start of the content.
    pub fn from(&self) -> &ResolvedPos {
        &self.from
    }

    /// A position along the end of the content.
    pub fn to(&self) -> &ResolvedPos {
        &self.to
    }

    /// The depth of the node that this range points into.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The position at the start of the range.
    pub fn start(&self) -> usize {
        self.from.before(self.depth + 1)
    }

    /// The position at the end of the range.
    pub fn end(&self) -> usize {
        self.to.after(self.depth + 1)
    }

    /// The parent node that the range points into.
    pub fn parent(&self) -> &Node {
        self.from.node(self.depth)
    }

    /// The start index of the range in the parent node.
    pub fn start_index(&self) -> usize {
        self.from.index(self.depth)
    }

    /// The end index of the range in the parent node.
    pub fn end_index(&self) -> usize {
        self.to.index_after(self.depth)
    }
}
