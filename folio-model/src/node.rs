//! Document tree nodes.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::content::ContentMatch;
use crate::error::{JsonError, PositionError, ReplaceError, SchemaError};
use crate::fragment::{Fragment, Index};
use crate::mark::Mark;
use crate::replace::replace;
use crate::resolved_pos::ResolvedPos;
use crate::schema::{MarkType, NodeType, Schema};
use crate::slice::Slice;
use crate::util::{slice_utf16, text_length};
use crate::Attrs;

/// The node found directly after or before a position, together with its
/// index and start offset inside the parent.
#[derive(Debug, Clone)]
pub struct ChildInfo {
    /// The child node, if any.
    pub node: Option<Node>,
    /// Its index in the parent.
    pub index: usize,
    /// The offset at which it starts.
    pub offset: usize,
}

struct Inner {
    node_type: NodeType,
    attrs: Arc<Attrs>,
    content: Fragment,
    marks: Vec<Mark>,
    text: Option<String>,
}

/// A node in the document tree.
///
/// Nodes are persistent: never mutated after construction. "Updating" a node
/// builds a new one sharing unchanged children with the original, which
/// makes whole-document values cheap to keep around and compare. Text lives
/// in leaf nodes whose size is their length in UTF-16 code units; all other
/// nodes count one position before and one after their content (or a single
/// position for non-text leaves).
#[derive(Clone)]
pub struct Node {
    inner: Arc<Inner>,
}

impl Node {
    pub(crate) fn new(
        node_type: NodeType,
        attrs: Arc<Attrs>,
        content: Fragment,
        marks: Vec<Mark>,
    ) -> Node {
        Node {
            inner: Arc::new(Inner {
                node_type,
                attrs,
                content,
                marks,
                text: None,
            }),
        }
    }

    /// # Panics
    /// Panics when `text` is empty; empty text nodes are not allowed.
    pub(crate) fn new_text(
        node_type: NodeType,
        attrs: Arc<Attrs>,
        text: String,
        marks: Vec<Mark>,
    ) -> Node {
        assert!(!text.is_empty(), "Empty text nodes are not allowed");
        Node {
            inner: Arc::new(Inner {
                node_type,
                attrs,
                content: Fragment::empty(),
                marks,
                text: Some(text),
            }),
        }
    }

    /// The type of this node.
    pub fn node_type(&self) -> &NodeType {
        &self.inner.node_type
    }

    /// This node's attributes.
    pub fn attrs(&self) -> &Attrs {
        &self.inner.attrs
    }

    /// The marks (things like whether it is emphasized or part of a link)
    /// applied to this node.
    pub fn marks(&self) -> &[Mark] {
        &self.inner.marks
    }

    /// A container holding the node's children.
    pub fn content(&self) -> &Fragment {
        &self.inner.content
    }

    /// For text nodes, the node's text.
    ///
    /// # Panics
    /// Panics when called on a non-text node.
    pub fn text(&self) -> &str {
        self.inner
            .text
            .as_deref()
            .expect("text() called on a non-text node")
    }

    pub(crate) fn cut_text(&self, from: usize, to: usize) -> &str {
        slice_utf16(self.text(), from, to)
    }

    /// True when both handles point at the same underlying node.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The size of this node, as defined by the integer-based indexing
    /// scheme: text length for text nodes, 1 for other leaf nodes, and two
    /// more than the content size for everything else.
    pub fn node_size(&self) -> usize {
        if let Some(text) = &self.inner.text {
            text_length(text)
        } else if self.is_leaf() {
            1
        } else {
            2 + self.inner.content.size()
        }
    }

    /// The number of children the node has.
    pub fn child_count(&self) -> usize {
        self.inner.content.child_count()
    }

    /// Get the child node at the given index.
    ///
    /// # Panics
    /// Panics when the index is out of range.
    pub fn child(&self, index: usize) -> &Node {
        self.inner.content.child(index)
    }

    /// Get the child node at the given index, if it exists.
    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.inner.content.maybe_child(index)
    }

    /// The first child of the node, or `None` if there are no children.
    pub fn first_child(&self) -> Option<&Node> {
        self.inner.content.first_child()
    }

    /// The last child of the node, or `None` if there are no children.
    pub fn last_child(&self) -> Option<&Node> {
        self.inner.content.last_child()
    }

    /// Call `f` for every child node, passing the child, its offset into
    /// this parent node, and its index.
    pub fn for_each(&self, f: impl FnMut(&Node, usize, usize)) {
        self.inner.content.for_each(f);
    }

    /// Invoke `f` for all descendant nodes recursively between the two
    /// given positions that are relative to the start of this node's
    /// content. `f` receives the node, its position relative to the start
    /// of this node, its parent, and its index; returning `false` keeps the
    /// traversal from descending into the node.
    pub fn nodes_between(
        &self,
        from: usize,
        to: usize,
        f: &mut dyn FnMut(&Node, usize, Option<&Node>, usize) -> bool,
    ) {
        self.inner.content.nodes_between(from, to, f, 0, Some(self));
    }

    /// Call the given callback for every descendant node.
    pub fn descendants(&self, f: &mut dyn FnMut(&Node, usize, Option<&Node>, usize) -> bool) {
        self.nodes_between(0, self.inner.content.size(), f);
    }

    /// Concatenates all the text nodes found in this node and its children.
    pub fn text_content(&self) -> String {
        if let Some(text) = &self.inner.text {
            return text.clone();
        }
        if self.is_leaf() {
            if let Some(leaf_text) = self.node_type().spec().leaf_text.as_ref() {
                return leaf_text(self);
            }
        }
        self.text_between(0, self.inner.content.size(), None, None)
    }

    /// Get all text between positions `from` and `to`.
    pub fn text_between(
        &self,
        from: usize,
        to: usize,
        block_separator: Option<&str>,
        leaf_text: Option<&dyn Fn(&Node) -> String>,
    ) -> String {
        if self.inner.text.is_some() {
            return self.cut_text(from, to).to_owned();
        }
        self.inner
            .content
            .text_between(from, to, block_separator, leaf_text)
    }

    /// Compare the markup (type, attributes, and marks) of this node to
    /// those of another.
    pub fn same_markup(&self, other: &Node) -> bool {
        self.has_markup(other.node_type(), Some(other.attrs()), Some(other.marks()))
    }

    /// Check whether this node's markup corresponds to the given type,
    /// attributes, and marks. Omitted attributes compare against the type's
    /// defaults; omitted marks against the empty set.
    pub fn has_markup(
        &self,
        node_type: &NodeType,
        attrs: Option<&Attrs>,
        marks: Option<&[Mark]>,
    ) -> bool {
        let expected = attrs
            .or_else(|| node_type.default_attrs())
            .unwrap_or(&crate::util::EMPTY_ATTRS);
        self.node_type() == node_type
            && *self.inner.attrs == *expected
            && Mark::same_set(&self.inner.marks, marks.unwrap_or(&[]))
    }

    /// Create a new node with the same markup as this node, containing the
    /// given content. For text nodes, the content is ignored and the node
    /// itself is returned.
    pub fn copy(&self, content: Fragment) -> Node {
        if self.inner.text.is_some() {
            return self.clone();
        }
        if content == self.inner.content {
            return self.clone();
        }
        Node::new(
            self.inner.node_type.clone(),
            Arc::clone(&self.inner.attrs),
            content,
            self.inner.marks.clone(),
        )
    }

    /// Create a copy of this node with the given set of marks instead of
    /// the node's own marks.
    pub fn mark(&self, marks: Vec<Mark>) -> Node {
        if Mark::same_set(&self.inner.marks, &marks) {
            return self.clone();
        }
        Node {
            inner: Arc::new(Inner {
                node_type: self.inner.node_type.clone(),
                attrs: Arc::clone(&self.inner.attrs),
                content: self.inner.content.clone(),
                marks,
                text: self.inner.text.clone(),
            }),
        }
    }

    /// For text nodes, a copy carrying the given text instead.
    pub fn with_text(&self, text: String) -> Node {
        if self.text() == text {
            return self.clone();
        }
        Node::new_text(
            self.inner.node_type.clone(),
            Arc::clone(&self.inner.attrs),
            text,
            self.inner.marks.clone(),
        )
    }

    /// Create a copy of this node with only the content between the given
    /// positions. For text nodes, positions index UTF-16 code units.
    pub fn cut(&self, from: usize, to: usize) -> Node {
        if self.inner.text.is_some() {
            if from == 0 && to == text_length(self.text()) {
                return self.clone();
            }
            return self.with_text(self.cut_text(from, to).to_owned());
        }
        if from == 0 && to == self.inner.content.size() {
            return self.clone();
        }
        self.copy(self.inner.content.cut(from, to))
    }

    /// Like [`cut`](Node::cut), keeping everything from `from` to the end.
    pub fn cut_from(&self, from: usize) -> Node {
        let to = if self.inner.text.is_some() {
            text_length(self.text())
        } else {
            self.inner.content.size()
        };
        self.cut(from, to)
    }

    /// Cut out the part of the document between the given positions and
    /// return it as a [`Slice`] whose open depths reflect how far the
    /// endpoints sit below their shared ancestor.
    pub fn slice(&self, from: usize, to: usize) -> Result<Slice, PositionError> {
        self.slice_with_parents(from, to, false)
    }

    /// Like [`slice`](Node::slice); when `include_parents` is set, the
    /// slice keeps the full path of ancestors instead of opening only up to
    /// the shared depth.
    pub fn slice_with_parents(
        &self,
        from: usize,
        to: usize,
        include_parents: bool,
    ) -> Result<Slice, PositionError> {
        if from == to {
            return Ok(Slice::empty());
        }
        let rp_from = self.resolve(from)?;
        let rp_to = self.resolve(to)?;
        let depth = if include_parents {
            0
        } else {
            rp_from.shared_depth(to)
        };
        let start = rp_from.start(depth);
        let node = rp_from.node(depth);
        let content = node.content().cut(rp_from.pos() - start, rp_to.pos() - start);
        Ok(Slice::new(
            content,
            rp_from.depth() - depth,
            rp_to.depth() - depth,
        ))
    }

    /// Replace the part of the document between the given positions with
    /// the given slice. The slice must "fit": its open sides must be able
    /// to connect to the surrounding content, and its content nodes must be
    /// valid children for the node they are placed into.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> Result<Node, ReplaceError> {
        let rp_from = self.resolve(from)?;
        let rp_to = self.resolve(to)?;
        replace(&rp_from, &rp_to, slice)
    }

    /// Find the node directly after the given position, descending as long
    /// as the position sits on a child boundary. Returns `None` when the
    /// position points at no node (including out-of-range positions).
    pub fn node_at(&self, pos: usize) -> Option<Node> {
        let mut node = self.clone();
        let mut pos = pos;
        loop {
            let index = node.content().find_index(pos).ok()?;
            let next = node.maybe_child(index.index)?.clone();
            if index.offset == pos || next.is_text() {
                return Some(next);
            }
            pos -= index.offset + 1;
            node = next;
        }
    }

    /// Find the (direct) child node after the given offset, if any, and
    /// return it along with its index and offset relative to this node.
    pub fn child_after(&self, pos: usize) -> Result<ChildInfo, PositionError> {
        let Index { index, offset } = self.inner.content.find_index(pos)?;
        Ok(ChildInfo {
            node: self.maybe_child(index).cloned(),
            index,
            offset,
        })
    }

    /// Find the (direct) child node before the given offset, if any, and
    /// return it along with its index and offset relative to this node.
    pub fn child_before(&self, pos: usize) -> Result<ChildInfo, PositionError> {
        if pos == 0 {
            return Ok(ChildInfo {
                node: None,
                index: 0,
                offset: 0,
            });
        }
        let Index { index, offset } = self.inner.content.find_index(pos)?;
        if offset < pos {
            return Ok(ChildInfo {
                node: Some(self.child(index).clone()),
                index,
                offset,
            });
        }
        let node = self.child(index - 1);
        Ok(ChildInfo {
            node: Some(node.clone()),
            index: index - 1,
            offset: offset - node.node_size(),
        })
    }

    /// Resolve the given position in the document, returning a
    /// [`ResolvedPos`] with information about its context.
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, PositionError> {
        ResolvedPos::resolve(self, pos)
    }

    /// Test whether the given mark is applied anywhere in the range.
    pub fn range_has_mark(&self, from: usize, to: usize, mark: &Mark) -> bool {
        let mut found = false;
        if to > from {
            self.nodes_between(from, to, &mut |node, _pos, _parent, _index| {
                if mark.is_in_set(node.marks()) {
                    found = true;
                }
                !found
            });
        }
        found
    }

    /// Test whether a mark of the given type is applied anywhere in the
    /// range.
    pub fn range_has_mark_type(&self, from: usize, to: usize, mark_type: &MarkType) -> bool {
        let mut found = false;
        if to > from {
            self.nodes_between(from, to, &mut |node, _pos, _parent, _index| {
                if mark_type.is_in_set(node.marks()).is_some() {
                    found = true;
                }
                !found
            });
        }
        found
    }

    /// True when this is a block (non-inline) node.
    pub fn is_block(&self) -> bool {
        self.inner.node_type.is_block()
    }

    /// True when this is a textblock node, a block node with inline
    /// content.
    pub fn is_textblock(&self) -> bool {
        self.inner.node_type.is_textblock()
    }

    /// True when this node allows inline content.
    pub fn inline_content(&self) -> bool {
        self.inner.node_type.inline_content()
    }

    /// True when this is an inline node (a text node or a node that can
    /// appear among text).
    pub fn is_inline(&self) -> bool {
        self.inner.node_type.is_inline()
    }

    /// True when this is a text node.
    pub fn is_text(&self) -> bool {
        self.inner.text.is_some()
    }

    /// True when this is a leaf node.
    pub fn is_leaf(&self) -> bool {
        self.inner.node_type.is_leaf()
    }

    /// True when this is an atom: a node that does not have directly
    /// editable content.
    pub fn is_atom(&self) -> bool {
        self.inner.node_type.is_atom()
    }

    /// Get the content match in this node at the given index.
    ///
    /// # Panics
    /// Panics when the node's content does not match its content
    /// expression up to `index`.
    pub fn content_match_at(&self, index: usize) -> ContentMatch {
        self.inner
            .node_type
            .content_match()
            .match_fragment(&self.inner.content, 0, index)
            .expect("Called content_match_at on a node with invalid content")
    }

    /// Test whether replacing the range between `from` and `to` (by child
    /// index) with the given replacement fragment (which defaults to the
    /// empty fragment) would leave the node's content valid.
    pub fn can_replace(&self, from: usize, to: usize, replacement: Option<&Fragment>) -> bool {
        let empty = Fragment::empty();
        let replacement = replacement.unwrap_or(&empty);
        let one = self
            .content_match_at(from)
            .match_fragment(replacement, 0, replacement.child_count());
        let two = one.and_then(|m| m.match_fragment(&self.inner.content, to, self.child_count()));
        let Some(two) = two else { return false };
        if !two.valid_end() {
            return false;
        }
        let marks_ok = replacement
            .children()
            .all(|child| self.inner.node_type.allows_marks(child.marks()));
        marks_ok
    }

    /// Test whether replacing the range `from` to `to` (by child index)
    /// with a node of the given type would leave the node's content valid.
    pub fn can_replace_with(
        &self,
        from: usize,
        to: usize,
        node_type: &NodeType,
        marks: Option<&[Mark]>,
    ) -> bool {
        if let Some(marks) = marks {
            if !self.inner.node_type.allows_marks(marks) {
                return false;
            }
        }
        let start = self.content_match_at(from).match_type(node_type);
        let end = start.and_then(|m| m.match_fragment(&self.inner.content, to, self.child_count()));
        end.is_some_and(|m| m.valid_end())
    }

    /// Test whether the given node's content could be appended to this
    /// node. If that node is empty, this tests whether their types are
    /// compatible instead.
    pub fn can_append(&self, other: &Node) -> bool {
        if other.content().size() > 0 {
            self.can_replace(self.child_count(), self.child_count(), Some(other.content()))
        } else {
            self.inner.node_type.compatible_content(other.node_type())
        }
    }

    /// Check whether this node and its descendants conform to the schema.
    pub fn check(&self) -> Result<(), SchemaError> {
        if !self.inner.node_type.valid_content(&self.inner.content) {
            return Err(SchemaError::InvalidContent(
                self.inner.node_type.name().to_owned(),
            ));
        }
        let mut copy: Vec<Mark> = Vec::new();
        for mark in &self.inner.marks {
            copy = mark.add_to_set(&copy);
        }
        if !Mark::same_set(&copy, &self.inner.marks) {
            return Err(SchemaError::InvalidMarks {
                node: self.inner.node_type.name().to_owned(),
                marks: self
                    .inner
                    .marks
                    .iter()
                    .map(|m| m.mark_type().name().to_owned())
                    .collect(),
            });
        }
        for child in self.inner.content.children() {
            child.check()?;
        }
        Ok(())
    }

    /// The JSON representation of this node.
    pub fn to_json(&self) -> Value {
        let mut obj = Attrs::new();
        obj.insert(
            "type".to_owned(),
            Value::String(self.inner.node_type.name().to_owned()),
        );
        if !self.inner.attrs.is_empty() {
            obj.insert("attrs".to_owned(), Value::Object((*self.inner.attrs).clone()));
        }
        if self.inner.content.size() > 0 {
            obj.insert("content".to_owned(), self.inner.content.to_json());
        }
        if !self.inner.marks.is_empty() {
            obj.insert(
                "marks".to_owned(),
                Value::Array(self.inner.marks.iter().map(Mark::to_json).collect()),
            );
        }
        if let Some(text) = &self.inner.text {
            obj.insert("text".to_owned(), Value::String(text.clone()));
        }
        Value::Object(obj)
    }

    /// Deserialize a node from its JSON representation.
    pub fn from_json(schema: &Schema, value: &Value) -> Result<Node, JsonError> {
        let obj = value.as_object().ok_or(JsonError::Invalid("Node.from_json"))?;
        let marks = match obj.get("marks") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(
                items
                    .iter()
                    .map(|item| Mark::from_json(schema, item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Some(_) => return Err(JsonError::Invalid("Node.from_json")),
        };
        let type_name = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(JsonError::Invalid("Node.from_json"))?;
        if type_name == "text" {
            let text = obj
                .get("text")
                .and_then(Value::as_str)
                .ok_or(JsonError::Invalid("Node.from_json"))?;
            return Ok(schema.text(text, marks));
        }
        let content = Fragment::from_json(schema, obj.get("content"))?;
        let node_type = schema
            .node_type(type_name)
            .map_err(JsonError::Schema)?
            .clone();
        Ok(node_type.create(
            obj.get("attrs").and_then(Value::as_object),
            Some(content),
            marks,
        )?)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.same_markup(other)
            && self.inner.text == other.inner.text
            && self.inner.content == other.inner.content
    }
}

impl Eq for Node {}

fn wrap_marks(marks: &[Mark], inner: String) -> String {
    marks.iter().rev().fold(inner, |acc, mark| {
        format!("{}({})", mark.mark_type().name(), acc)
    })
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(to_debug) = self.node_type().spec().to_debug_string.as_ref() {
            return write!(f, "{}", to_debug(self));
        }
        let inner = if let Some(text) = &self.inner.text {
            format!("{text:?}")
        } else if self.inner.content.size() > 0 {
            format!(
                "{}({})",
                self.inner.node_type.name(),
                self.inner.content.to_string_inner()
            )
        } else {
            self.inner.node_type.name().to_owned()
        };
        write!(f, "{}", wrap_marks(&self.inner.marks, inner))
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Node {self}>")
    }
}
