//! Ordered sequences of sibling nodes.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde_json::Value;

use crate::diff::{find_diff_end, find_diff_start, DiffEnd};
use crate::error::{JsonError, PositionError};
use crate::node::Node;
use crate::schema::Schema;
use crate::util::text_length;

static EMPTY: Lazy<Fragment> = Lazy::new(|| Fragment {
    inner: Arc::new(Inner {
        children: Vec::new(),
        size: 0,
    }),
});

/// The result of locating a position within a fragment: the index of the
/// child the position points into (or after) and the offset at which that
/// child starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index {
    /// Index of the child.
    pub index: usize,
    /// Offset of the start of that child within the fragment.
    pub offset: usize,
}

struct Inner {
    children: Vec<Node>,
    size: usize,
}

/// A fragment represents a node's collection of child nodes.
///
/// Like nodes, fragments are persistent data structures: you should not
/// mutate them, and all operations return a new fragment, sharing unchanged
/// children with the original.
#[derive(Clone)]
pub struct Fragment {
    inner: Arc<Inner>,
}

impl Fragment {
    /// The shared empty fragment.
    pub fn empty() -> Fragment {
        EMPTY.clone()
    }

    fn from_vec(children: Vec<Node>) -> Fragment {
        let size = children.iter().map(Node::node_size).sum();
        Fragment::from_vec_sized(children, size)
    }

    fn from_vec_sized(children: Vec<Node>, size: usize) -> Fragment {
        Fragment {
            inner: Arc::new(Inner { children, size }),
        }
    }

    /// Build a fragment from a list of nodes, joining adjacent text nodes
    /// with the same marks into a single node.
    pub fn from_nodes(nodes: Vec<Node>) -> Fragment {
        if nodes.is_empty() {
            return Fragment::empty();
        }
        let mut joined: Option<Vec<Node>> = None;
        let mut size = 0;
        for i in 0..nodes.len() {
            let node = &nodes[i];
            size += node.node_size();
            if i > 0 && node.is_text() && nodes[i - 1].same_markup(node) {
                let joined = joined.get_or_insert_with(|| nodes[0..i].to_vec());
                let last = joined.last().expect("a preceding text node");
                let merged = last.with_text(format!("{}{}", last.text(), node.text()));
                *joined.last_mut().expect("a preceding text node") = merged;
            } else if let Some(joined) = joined.as_mut() {
                joined.push(node.clone());
            }
        }
        match joined {
            Some(joined) => Fragment::from_vec_sized(joined, size),
            None => Fragment::from_vec_sized(nodes, size),
        }
    }

    /// The total size of this fragment: the sum of its children's sizes.
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// The number of child nodes in this fragment.
    pub fn child_count(&self) -> usize {
        self.inner.children.len()
    }

    /// Get the child node at the given index.
    ///
    /// # Panics
    /// Panics when the index is out of range; use
    /// [`maybe_child`](Fragment::maybe_child) for a checked variant.
    pub fn child(&self, index: usize) -> &Node {
        &self.inner.children[index]
    }

    /// Get the child node at the given index, if it exists.
    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.inner.children.get(index)
    }

    /// The first child of the fragment, or `None` if it is empty.
    pub fn first_child(&self) -> Option<&Node> {
        self.inner.children.first()
    }

    /// The last child of the fragment, or `None` if it is empty.
    pub fn last_child(&self) -> Option<&Node> {
        self.inner.children.last()
    }

    /// Iterate over the child nodes.
    pub fn children(&self) -> impl Iterator<Item = &Node> {
        self.inner.children.iter()
    }

    /// Invoke `f` for every child, passing the child, its offset into this
    /// fragment, and its index.
    pub fn for_each(&self, mut f: impl FnMut(&Node, usize, usize)) {
        let mut pos = 0;
        for (i, child) in self.inner.children.iter().enumerate() {
            f(child, pos, i);
            pos += child.node_size();
        }
    }

    /// Invoke `f` for all descendant nodes between the given two positions,
    /// counting from the start of this fragment. Descends into a child only
    /// when `f` returns `true` for it.
    pub fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize, Option<&Node>, usize) -> bool,
        node_start: usize,
        parent: Option<&Node>,
    ) {
        let mut pos = 0;
        for (i, child) in self.inner.children.iter().enumerate() {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from && f(child, node_start + pos, parent, i) && child.content().size() > 0 {
                let start = pos + 1;
                child.content().nodes_between(
                    from.saturating_sub(start),
                    (child.content().size()).min(to - start),
                    f,
                    node_start + start,
                    Some(child),
                );
            }
            pos = end;
        }
    }

    /// Call `f` for every descendant node. `f` may return `false` to
    /// prevent traversal of a node's children.
    pub fn descendants(&self, f: &mut dyn FnMut(&Node, usize, Option<&Node>, usize) -> bool) {
        self.nodes_between(0, self.size(), f, 0, None);
    }

    /// Extract the text between `from` and `to`. Block content is separated
    /// by `block_separator` (when given), and leaf nodes render through
    /// `leaf_text` or their type's `leaf_text` spec.
    pub fn text_between(
        &self,
        from: usize,
        to: usize,
        block_separator: Option<&str>,
        leaf_text: Option<&dyn Fn(&Node) -> String>,
    ) -> String {
        let mut text = String::new();
        let mut separated = true;
        self.nodes_between(
            from,
            to,
            &mut |node, pos, _parent, _index| {
                if node.is_text() {
                    text.push_str(node.cut_text(from.max(pos) - pos, to - pos));
                    separated = block_separator.is_none();
                } else if node.is_leaf() {
                    if let Some(leaf_text) = leaf_text {
                        text.push_str(&leaf_text(node));
                    } else if let Some(spec_leaf) = node.node_type().spec().leaf_text.as_ref() {
                        text.push_str(&spec_leaf(node));
                    }
                    separated = block_separator.is_none();
                } else if !separated && node.is_block() {
                    if let Some(sep) = block_separator {
                        text.push_str(sep);
                    }
                    separated = true;
                }
                true
            },
            0,
            None,
        );
        text
    }

    /// Create a new fragment containing the combined content of this
    /// fragment and the other. Adjacent text nodes with identical marks are
    /// joined at the seam.
    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.size() == 0 {
            return self.clone();
        }
        if self.size() == 0 {
            return other.clone();
        }
        let last = self.last_child().expect("non-empty fragment");
        let first = other.first_child().expect("non-empty fragment");
        let mut content = self.inner.children.clone();
        let mut i = 0;
        if last.is_text() && last.same_markup(first) {
            let merged = last.with_text(format!("{}{}", last.text(), first.text()));
            *content.last_mut().expect("non-empty fragment") = merged;
            i = 1;
        }
        content.extend(other.inner.children[i..].iter().cloned());
        Fragment::from_vec_sized(content, self.size() + other.size())
    }

    /// Cut out the sub-fragment between the two given positions.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to == self.size() {
            return self.clone();
        }
        if to <= from {
            return Fragment::empty();
        }
        let mut result = Vec::new();
        let mut size = 0;
        let mut pos = 0;
        for child in &self.inner.children {
            if pos >= to {
                break;
            }
            let end = pos + child.node_size();
            if end > from {
                let child = if pos < from || end > to {
                    if child.is_text() {
                        child.cut(
                            from.saturating_sub(pos),
                            text_length(child.text()).min(to - pos),
                        )
                    } else {
                        child.cut(
                            from.saturating_sub(pos + 1),
                            child.content().size().min(to.saturating_sub(pos + 1)),
                        )
                    }
                } else {
                    child.clone()
                };
                size += child.node_size();
                result.push(child);
            }
            pos = end;
        }
        Fragment::from_vec_sized(result, size)
    }

    /// Like [`cut`](Fragment::cut), but takes the suffix starting at `from`.
    pub fn cut_from(&self, from: usize) -> Fragment {
        self.cut(from, self.size())
    }

    /// Cut out the sub-fragment between the two given child indices.
    pub fn cut_by_index(&self, from: usize, to: usize) -> Fragment {
        if from == to {
            return Fragment::empty();
        }
        if from == 0 && to == self.child_count() {
            return self.clone();
        }
        Fragment::from_vec(self.inner.children[from..to].to_vec())
    }

    /// Create a new fragment in which the node at the given index is
    /// replaced by the given node.
    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        let current = &self.inner.children[index];
        if current.ptr_eq(&node) {
            return self.clone();
        }
        let size = self.size() + node.node_size() - current.node_size();
        let mut copy = self.inner.children.clone();
        copy[index] = node;
        Fragment::from_vec_sized(copy, size)
    }

    /// Create a new fragment by prepending the given node.
    pub fn add_to_start(&self, node: Node) -> Fragment {
        let size = self.size() + node.node_size();
        let mut children = Vec::with_capacity(self.child_count() + 1);
        children.push(node);
        children.extend(self.inner.children.iter().cloned());
        Fragment::from_vec_sized(children, size)
    }

    /// Create a new fragment by appending the given node.
    pub fn add_to_end(&self, node: Node) -> Fragment {
        let size = self.size() + node.node_size();
        let mut children = self.inner.children.clone();
        children.push(node);
        Fragment::from_vec_sized(children, size)
    }

    /// Find the first position at which this fragment and another differ,
    /// or `None` if they are the same.
    pub fn find_diff_start(&self, other: &Fragment) -> Option<usize> {
        find_diff_start(self, other, 0)
    }

    /// Find the first position, searching from the end, at which this
    /// fragment and the other differ.
    pub fn find_diff_end(&self, other: &Fragment) -> Option<DiffEnd> {
        find_diff_end(self, other, self.size(), other.size())
    }

    /// Find the index and inner offset corresponding to a given relative
    /// position, biased towards the left child when `pos` falls exactly on
    /// a child boundary.
    pub fn find_index(&self, pos: usize) -> Result<Index, PositionError> {
        self.find_index_round(pos, false)
    }

    /// Like [`find_index`](Fragment::find_index), but `round_right` selects
    /// which side wins when `pos` sits on a boundary.
    pub fn find_index_round(&self, pos: usize, round_right: bool) -> Result<Index, PositionError> {
        if pos == 0 {
            return Ok(Index { index: 0, offset: pos });
        }
        if pos == self.size() {
            return Ok(Index {
                index: self.child_count(),
                offset: pos,
            });
        }
        if pos > self.size() {
            return Err(PositionError::OutsideFragment { pos });
        }
        let mut cur_pos = 0;
        for (i, cur) in self.inner.children.iter().enumerate() {
            let end = cur_pos + cur.node_size();
            if end >= pos {
                if end == pos || round_right {
                    return Ok(Index {
                        index: i + 1,
                        offset: end,
                    });
                }
                return Ok(Index {
                    index: i,
                    offset: cur_pos,
                });
            }
            cur_pos = end;
        }
        unreachable!("position {pos} within fragment of size {}", self.size())
    }

    /// The JSON representation of this fragment: an array of node JSON.
    pub fn to_json(&self) -> Value {
        Value::Array(self.inner.children.iter().map(Node::to_json).collect())
    }

    /// Deserialize a fragment from its JSON representation. `None` or JSON
    /// `null` produce the empty fragment.
    pub fn from_json(schema: &Schema, value: Option<&Value>) -> Result<Fragment, JsonError> {
        let Some(value) = value else {
            return Ok(Fragment::empty());
        };
        match value {
            Value::Null => Ok(Fragment::empty()),
            Value::Array(items) => {
                let nodes = items
                    .iter()
                    .map(|item| Node::from_json(schema, item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Fragment::from_nodes(nodes))
            }
            _ => Err(JsonError::Invalid("Fragment.from_json")),
        }
    }

    pub(crate) fn to_string_inner(&self) -> String {
        self.inner
            .children
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl PartialEq for Fragment {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner.children == other.inner.children
    }
}

impl Eq for Fragment {}

impl From<Node> for Fragment {
    fn from(node: Node) -> Self {
        let size = node.node_size();
        Fragment::from_vec_sized(vec![node], size)
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(nodes: Vec<Node>) -> Self {
        Fragment::from_nodes(nodes)
    }
}

impl From<Option<Fragment>> for Fragment {
    fn from(fragment: Option<Fragment>) -> Self {
        fragment.unwrap_or_else(Fragment::empty)
    }
}

impl FromIterator<Node> for Fragment {
    fn from_iter<T: IntoIterator<Item = Node>>(iter: T) -> Self {
        Fragment::from_nodes(iter.into_iter().collect())
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.to_string_inner())
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Fragment {self}>")
    }
}
