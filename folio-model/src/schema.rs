//! Schema specs and the compiled node and mark types.
//!
//! A [`SchemaSpec`] is a declarative description: an ordered map of node
//! specs, an ordered map of mark specs, and the name of the top node. Order
//! is semantically significant — it determines mark sort order and which
//! types come first in a group. Compiling the spec produces per-schema
//! singleton [`NodeType`]s and [`MarkType`]s, each node type carrying the
//! DFA start state for its content expression.

use std::fmt;
use std::sync::{Arc, Weak};

use ahash::AHashMap;
use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde_json::Value;

use crate::content::ContentMatch;
use crate::error::{JsonError, SchemaError};
use crate::fragment::Fragment;
use crate::mark::Mark;
use crate::node::Node;
use crate::Attrs;

/// The compiled node types of a schema, by name, in declaration order.
pub type NodeTypes = IndexMap<String, NodeType>;

/// The compiled mark types of a schema, by name, in declaration order.
pub type MarkTypes = IndexMap<String, MarkType>;

/// Whitespace handling for a node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whitespace {
    /// Whitespace may be collapsed.
    Normal,
    /// Whitespace must be preserved.
    Pre,
}

/// Describes one attribute of a node or mark type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSpec {
    /// The default value for this attribute. `None` makes the attribute
    /// required: creating a node or mark without supplying it is an error.
    /// `Some(Value::Null)` is a present default of JSON `null`.
    pub default: Option<Value>,
}

type LeafTextFn = Arc<dyn Fn(&Node) -> String + Send + Sync>;

/// A description of a node type, used when defining a schema.
#[derive(Clone, Default)]
pub struct NodeSpec {
    /// The content expression for this node, as described in the schema
    /// guide. When not given, the node does not allow any content.
    pub content: Option<String>,
    /// The marks that are allowed inside of this node. May be a
    /// space-separated string referring to mark names or groups, `"_"` to
    /// explicitly allow all marks, or `""` to disallow marks. When not
    /// given, nodes with inline content default to allowing all marks,
    /// other nodes default to not allowing marks.
    pub marks: Option<String>,
    /// The group or space-separated groups to which this node belongs.
    pub group: Option<String>,
    /// Should be set to true for inline nodes.
    pub inline: bool,
    /// Can be set to true to indicate that, though this isn't a leaf node,
    /// it doesn't have directly editable content.
    pub atom: bool,
    /// The attributes that nodes of this type get.
    pub attrs: IndexMap<String, AttributeSpec>,
    /// Can be used to indicate that this node contains code, which causes
    /// some commands and whitespace handling to behave differently.
    pub code: bool,
    /// Controls the way whitespace in this node is handled. Defaults to
    /// `Pre` for code nodes and `Normal` otherwise.
    pub whitespace: Option<Whitespace>,
    /// When enabled, enables both `defining_as_context` and
    /// `defining_for_content`.
    pub defining: bool,
    /// Determines whether this node is considered an important parent node
    /// during replace operations (such as paste).
    pub defining_as_context: bool,
    /// In inserted content, the defining parents of the content are
    /// preserved when possible.
    pub defining_for_content: bool,
    /// When enabled, the sides of nodes of this type count as boundaries
    /// that regular editing operations, like backspacing or lifting,
    /// won't cross.
    pub isolating: bool,
    /// Defines the default way a leaf node of this type should be rendered
    /// to a string.
    pub leaf_text: Option<LeafTextFn>,
    /// Defines the default way a node of this type should be rendered to a
    /// debug string.
    pub to_debug_string: Option<LeafTextFn>,
}

impl fmt::Debug for NodeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeSpec")
            .field("content", &self.content)
            .field("marks", &self.marks)
            .field("group", &self.group)
            .field("inline", &self.inline)
            .field("attrs", &self.attrs)
            .finish_non_exhaustive()
    }
}

/// A description of a mark type, used when defining a schema.
#[derive(Clone, Debug)]
pub struct MarkSpec {
    /// The attributes that marks of this type get.
    pub attrs: IndexMap<String, AttributeSpec>,
    /// Whether this mark should be active when the cursor is positioned at
    /// its end (or at its start when that is also the start of the parent
    /// node). Defaults to true.
    pub inclusive: bool,
    /// Determines which other marks this mark can coexist with. A
    /// space-separated string naming other marks or groups of marks. When a
    /// mark is added to a set, all marks that it excludes are removed in
    /// the process. Defaults to only being exclusive with marks of the same
    /// type (expressed by leaving this unset).
    pub excludes: Option<String>,
    /// The group or space-separated groups to which this mark belongs.
    pub group: Option<String>,
    /// Determines whether marks of this type can span multiple adjacent
    /// nodes when serialized. Defaults to true.
    pub spanning: bool,
}

impl Default for MarkSpec {
    fn default() -> Self {
        MarkSpec {
            attrs: IndexMap::new(),
            inclusive: true,
            excludes: None,
            group: None,
            spanning: true,
        }
    }
}

/// An object describing a schema, as passed to the [`Schema`] constructor.
#[derive(Clone, Debug, Default)]
pub struct SchemaSpec {
    /// The node types in this schema, in order of precedence.
    pub nodes: IndexMap<String, NodeSpec>,
    /// The mark types that exist in this schema. Their order determines the
    /// order in which mark sets are sorted.
    pub marks: IndexMap<String, MarkSpec>,
    /// The name of the default top-level node for the schema. Defaults to
    /// `"doc"`.
    pub top_node: Option<String>,
}

/// A compiled attribute descriptor.
#[derive(Debug, Clone)]
struct Attribute {
    default: Option<Value>,
}

impl Attribute {
    fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

type Attributes = IndexMap<String, Attribute>;

fn init_attrs(specs: &IndexMap<String, AttributeSpec>) -> Attributes {
    specs
        .iter()
        .map(|(name, spec)| {
            (
                name.clone(),
                Attribute {
                    default: spec.default.clone(),
                },
            )
        })
        .collect()
}

fn default_attrs(attrs: &Attributes) -> Option<Attrs> {
    let mut defaults = Attrs::new();
    for (name, attr) in attrs {
        defaults.insert(name.clone(), attr.default.clone()?);
    }
    Some(defaults)
}

fn compute_attrs(attrs: &Attributes, value: Option<&Attrs>) -> Result<Attrs, SchemaError> {
    let mut built = Attrs::new();
    for (name, attr) in attrs {
        let given = value.and_then(|v| v.get(name));
        let given = match given {
            None | Some(Value::Null) => match &attr.default {
                Some(default) => default.clone(),
                None => return Err(SchemaError::MissingAttr(name.clone())),
            },
            Some(v) => v.clone(),
        };
        built.insert(name.clone(), given);
    }
    Ok(built)
}

struct NodeTypeInner {
    name: String,
    spec: NodeSpec,
    groups: Vec<String>,
    attrs: Attributes,
    default_attrs: Option<Arc<Attrs>>,
    is_block: bool,
    is_text: bool,
    schema: OnceCell<Weak<SchemaInner>>,
    content_match: OnceCell<ContentMatch>,
    inline_content: OnceCell<bool>,
    mark_set: OnceCell<Option<Vec<MarkType>>>,
}

/// Node types are objects allocated once per schema and used to tag `Node`
/// instances. They contain information about the node type, such as its
/// name and what kind of node it represents. Two handles compare equal
/// exactly when they refer to the same per-schema singleton.
#[derive(Clone)]
pub struct NodeType {
    inner: Arc<NodeTypeInner>,
}

impl NodeType {
    fn compile(name: &str, spec: &NodeSpec) -> NodeType {
        let attrs = init_attrs(&spec.attrs);
        let default_attrs = default_attrs(&attrs).map(Arc::new);
        NodeType {
            inner: Arc::new(NodeTypeInner {
                name: name.to_owned(),
                groups: spec
                    .group
                    .as_deref()
                    .map(|g| g.split(' ').map(ToOwned::to_owned).collect())
                    .unwrap_or_default(),
                attrs,
                default_attrs,
                is_block: !(spec.inline || name == "text"),
                is_text: name == "text",
                spec: spec.clone(),
                schema: OnceCell::new(),
                content_match: OnceCell::new(),
                inline_content: OnceCell::new(),
                mark_set: OnceCell::new(),
            }),
        }
    }

    /// The name the node type has in this schema.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The spec that this type is based on.
    pub fn spec(&self) -> &NodeSpec {
        &self.inner.spec
    }

    /// The groups this node type belongs to.
    pub fn groups(&self) -> &[String] {
        &self.inner.groups
    }

    /// A link back to the schema the node type belongs to.
    ///
    /// # Panics
    /// Panics when the schema has been dropped, which cannot happen while
    /// any node created through it is alive in supported usage.
    pub fn schema(&self) -> Schema {
        Schema {
            inner: self
                .inner
                .schema
                .get()
                .expect("node type used before its schema was built")
                .upgrade()
                .expect("schema was dropped"),
        }
    }

    /// The default attributes for this type, when all of its attributes
    /// have defaults.
    pub fn default_attrs(&self) -> Option<&Attrs> {
        self.inner.default_attrs.as_deref()
    }

    /// The starting match of the node type's content expression.
    pub fn content_match(&self) -> &ContentMatch {
        self.inner
            .content_match
            .get()
            .expect("content match is compiled at schema build time")
    }

    /// True if this node type has inline content.
    pub fn inline_content(&self) -> bool {
        *self
            .inner
            .inline_content
            .get()
            .expect("inline content flag is set at schema build time")
    }

    fn mark_set(&self) -> Option<&[MarkType]> {
        self.inner
            .mark_set
            .get()
            .expect("mark set is resolved at schema build time")
            .as_deref()
    }

    /// True if this is a block type.
    pub fn is_block(&self) -> bool {
        self.inner.is_block
    }

    /// True if this is the text node type.
    pub fn is_text(&self) -> bool {
        self.inner.is_text
    }

    /// True if this is an inline type.
    pub fn is_inline(&self) -> bool {
        !self.inner.is_block
    }

    /// True if this is a textblock type, a block that contains inline
    /// content.
    pub fn is_textblock(&self) -> bool {
        self.inner.is_block && self.inline_content()
    }

    /// True for node types that allow no content.
    pub fn is_leaf(&self) -> bool {
        self.content_match().ptr_eq(&ContentMatch::empty())
    }

    /// True when this node is an atom, i.e. when it does not have directly
    /// editable content.
    pub fn is_atom(&self) -> bool {
        self.is_leaf() || self.inner.spec.atom
    }

    /// The whitespace handling for this node type.
    pub fn whitespace(&self) -> Whitespace {
        self.inner.spec.whitespace.unwrap_or(if self.inner.spec.code {
            Whitespace::Pre
        } else {
            Whitespace::Normal
        })
    }

    /// Tells you whether this node type has any required attributes.
    pub fn has_required_attrs(&self) -> bool {
        self.inner.attrs.values().any(Attribute::is_required)
    }

    /// Indicates whether this node allows some of the same content as the
    /// given node type.
    pub fn compatible_content(&self, other: &NodeType) -> bool {
        self == other || self.content_match().compatible(other.content_match())
    }

    /// Fill in the defaults for the given attribute object.
    pub fn compute_attrs(&self, attrs: Option<&Attrs>) -> Result<Arc<Attrs>, SchemaError> {
        match (attrs, &self.inner.default_attrs) {
            (None, Some(defaults)) => Ok(Arc::clone(defaults)),
            _ => Ok(Arc::new(compute_attrs(&self.inner.attrs, attrs)?)),
        }
    }

    /// Create a node of this type. The given attributes are checked and
    /// defaulted; content may be a fragment or `None`. Does not check that
    /// the resulting content is valid, use
    /// [`create_checked`](NodeType::create_checked) for that.
    ///
    /// # Errors
    /// Fails when a required attribute is missing, or when called on the
    /// text node type.
    pub fn create(
        &self,
        attrs: Option<&Attrs>,
        content: Option<Fragment>,
        marks: Option<Vec<Mark>>,
    ) -> Result<Node, SchemaError> {
        if self.inner.is_text {
            return Err(SchemaError::TextNodeCreate);
        }
        Ok(Node::new(
            self.clone(),
            self.compute_attrs(attrs)?,
            content.unwrap_or_else(Fragment::empty),
            Mark::set_from(marks.unwrap_or_default()),
        ))
    }

    /// Like [`create`](NodeType::create), but checks that the given content
    /// is valid for this type.
    pub fn create_checked(
        &self,
        attrs: Option<&Attrs>,
        content: Option<Fragment>,
        marks: Option<Vec<Mark>>,
    ) -> Result<Node, SchemaError> {
        let content = content.unwrap_or_else(Fragment::empty);
        if !self.valid_content(&content) {
            return Err(SchemaError::InvalidContent(self.inner.name.clone()));
        }
        self.create(attrs, Some(content), marks)
    }

    /// Like [`create`](NodeType::create), but see if it is necessary to add
    /// nodes to the start or end of the given fragment to make it fit the
    /// node. Returns `None` when no fitting wrapping can be found.
    pub fn create_and_fill(
        &self,
        attrs: Option<&Attrs>,
        content: Option<Fragment>,
        marks: Option<Vec<Mark>>,
    ) -> Result<Option<Node>, SchemaError> {
        let attrs = self.compute_attrs(attrs)?;
        let mut frag = content.unwrap_or_else(Fragment::empty);
        if frag.size() > 0 {
            let Some(before) = self.content_match().fill_before(&frag, false, 0) else {
                return Ok(None);
            };
            frag = before.append(&frag);
        }
        let Some(matched) = self
            .content_match()
            .match_fragment(&frag, 0, frag.child_count())
        else {
            return Ok(None);
        };
        let Some(after) = matched.fill_before(&Fragment::empty(), true, 0) else {
            return Ok(None);
        };
        Ok(Some(Node::new(
            self.clone(),
            attrs,
            frag.append(&after),
            Mark::set_from(marks.unwrap_or_default()),
        )))
    }

    /// Returns true if the given fragment is valid content for this node
    /// type.
    pub fn valid_content(&self, content: &Fragment) -> bool {
        let result = self
            .content_match()
            .match_fragment(content, 0, content.child_count());
        if !result.is_some_and(|m| m.valid_end()) {
            return false;
        }
        content.children().all(|child| self.allows_marks(child.marks()))
    }

    /// Check whether the given mark type is allowed in this node.
    pub fn allows_mark_type(&self, mark_type: &MarkType) -> bool {
        self.mark_set().map_or(true, |set| set.contains(mark_type))
    }

    /// Test whether the given set of marks are allowed in this node.
    pub fn allows_marks(&self, marks: &[Mark]) -> bool {
        self.mark_set().is_none() || marks.iter().all(|m| self.allows_mark_type(m.mark_type()))
    }

    /// Removes the marks that are not allowed in this node from the given
    /// set.
    pub fn allowed_marks(&self, marks: &[Mark]) -> Vec<Mark> {
        if self.mark_set().is_none() {
            return marks.to_vec();
        }
        let mut copy: Option<Vec<Mark>> = None;
        for (i, mark) in marks.iter().enumerate() {
            if self.allows_mark_type(mark.mark_type()) {
                if let Some(copy) = copy.as_mut() {
                    copy.push(mark.clone());
                }
            } else {
                copy.get_or_insert_with(|| marks[0..i].to_vec());
            }
        }
        copy.unwrap_or_else(|| marks.to_vec())
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for NodeType {}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.name)
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<NodeType {}>", self.inner.name)
    }
}

struct MarkTypeInner {
    name: String,
    rank: usize,
    spec: MarkSpec,
    attrs: Attributes,
    default_attrs: Option<Arc<Attrs>>,
    excluded: OnceCell<Vec<MarkType>>,
    schema: OnceCell<Weak<SchemaInner>>,
}

/// Like nodes, marks are tagged with type objects, which are instantiated
/// once per schema. Handles compare by identity.
#[derive(Clone)]
pub struct MarkType {
    inner: Arc<MarkTypeInner>,
}

impl MarkType {
    fn compile(name: &str, rank: usize, spec: &MarkSpec) -> MarkType {
        let attrs = init_attrs(&spec.attrs);
        let default_attrs = default_attrs(&attrs).map(Arc::new);
        MarkType {
            inner: Arc::new(MarkTypeInner {
                name: name.to_owned(),
                rank,
                spec: spec.clone(),
                attrs,
                default_attrs,
                excluded: OnceCell::new(),
                schema: OnceCell::new(),
            }),
        }
    }

    /// The name of the mark type.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The rank of this type in the schema's mark order; mark sets are kept
    /// sorted by it.
    pub fn rank(&self) -> usize {
        self.inner.rank
    }

    /// The spec on which the type is based.
    pub fn spec(&self) -> &MarkSpec {
        &self.inner.spec
    }

    /// A link back to the schema the mark type belongs to.
    ///
    /// # Panics
    /// Panics when the schema has been dropped.
    pub fn schema(&self) -> Schema {
        Schema {
            inner: self
                .inner
                .schema
                .get()
                .expect("mark type used before its schema was built")
                .upgrade()
                .expect("schema was dropped"),
        }
    }

    /// Create a mark of this type. Attributes are checked and defaulted.
    pub fn create(&self, attrs: Option<&Attrs>) -> Result<Mark, SchemaError> {
        match (attrs, &self.inner.default_attrs) {
            (None, Some(defaults)) => Ok(Mark::new(self.clone(), Arc::clone(defaults))),
            _ => Ok(Mark::new(
                self.clone(),
                Arc::new(compute_attrs(&self.inner.attrs, attrs)?),
            )),
        }
    }

    /// When there is a mark of this type in the given set, a new set
    /// without it is returned. Otherwise, the input set is returned.
    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter()
            .filter(|mark| mark.mark_type() != self)
            .cloned()
            .collect()
    }

    /// Tests whether there is a mark of this type in the given set.
    pub fn is_in_set<'a>(&self, set: &'a [Mark]) -> Option<&'a Mark> {
        set.iter().find(|mark| mark.mark_type() == self)
    }

    /// Queries whether a given mark type is excluded by this one.
    pub fn excludes(&self, other: &MarkType) -> bool {
        self.inner
            .excluded
            .get()
            .expect("exclusions are resolved at schema build time")
            .iter()
            .any(|e| e == other)
    }
}

impl PartialEq for MarkType {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for MarkType {}

impl fmt::Debug for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<MarkType {}>", self.inner.name)
    }
}

struct SchemaInner {
    spec: SchemaSpec,
    nodes: NodeTypes,
    marks: MarkTypes,
    top_node_type: NodeType,
    text_type: NodeType,
}

/// A document schema. Holds node and mark type objects for the nodes and
/// marks that may occur in conforming documents, and provides functionality
/// for creating and deserializing such documents.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

impl Schema {
    /// Construct a schema from a schema spec, compiling content expressions
    /// and resolving mark permissions and exclusions.
    pub fn new(spec: SchemaSpec) -> Result<Schema, SchemaError> {
        let mut nodes = NodeTypes::new();
        for (name, node_spec) in &spec.nodes {
            nodes.insert(name.clone(), NodeType::compile(name, node_spec));
        }
        let top_node = spec.top_node.clone().unwrap_or_else(|| "doc".to_owned());
        let Some(top_node_type) = nodes.get(&top_node).cloned() else {
            return Err(SchemaError::MissingTopNode(top_node));
        };
        let Some(text_type) = nodes.get("text").cloned() else {
            return Err(SchemaError::MissingTextType);
        };
        if !text_type.inner.attrs.is_empty() {
            return Err(SchemaError::TextTypeWithAttrs);
        }

        let mut marks = MarkTypes::new();
        for (rank, (name, mark_spec)) in spec.marks.iter().enumerate() {
            marks.insert(name.clone(), MarkType::compile(name, rank, mark_spec));
        }

        let mut content_expr_cache: AHashMap<String, ContentMatch> = AHashMap::new();
        for (name, node_type) in &nodes {
            if marks.contains_key(name) {
                return Err(SchemaError::NodeMarkCollision(name.clone()));
            }
            let content_expr = node_type.inner.spec.content.clone().unwrap_or_default();
            let content_match = match content_expr_cache.get(&content_expr) {
                Some(m) => m.clone(),
                None => {
                    let compiled = ContentMatch::parse(&content_expr, &nodes)?;
                    content_expr_cache.insert(content_expr, compiled.clone());
                    compiled
                }
            };
            node_type
                .inner
                .content_match
                .set(content_match.clone())
                .unwrap_or_else(|_| unreachable!("content match is set once"));
            node_type
                .inner
                .inline_content
                .set(content_match.inline_content())
                .unwrap_or_else(|_| unreachable!("inline content is set once"));
            let mark_set = match node_type.inner.spec.marks.as_deref() {
                Some("_") => None,
                Some(expr) if !expr.is_empty() => {
                    Some(gather_marks(&marks, expr.split(' '))?)
                }
                Some(_) => Some(Vec::new()),
                None if !node_type.inline_content() => Some(Vec::new()),
                None => None,
            };
            node_type
                .inner
                .mark_set
                .set(mark_set)
                .unwrap_or_else(|_| unreachable!("mark set is set once"));
        }

        for mark_type in marks.values() {
            let excluded = match mark_type.inner.spec.excludes.as_deref() {
                None => vec![mark_type.clone()],
                Some("") => Vec::new(),
                Some(expr) => gather_marks(&marks, expr.split(' '))?,
            };
            mark_type
                .inner
                .excluded
                .set(excluded)
                .unwrap_or_else(|_| unreachable!("exclusions are set once"));
        }

        let schema = Schema {
            inner: Arc::new(SchemaInner {
                spec,
                nodes,
                marks,
                top_node_type,
                text_type,
            }),
        };
        let weak = Arc::downgrade(&schema.inner);
        for node_type in schema.inner.nodes.values() {
            node_type
                .inner
                .schema
                .set(weak.clone())
                .unwrap_or_else(|_| unreachable!("schema backref is set once"));
        }
        for mark_type in schema.inner.marks.values() {
            mark_type
                .inner
                .schema
                .set(weak.clone())
                .unwrap_or_else(|_| unreachable!("schema backref is set once"));
        }
        tracing::debug!(
            nodes = schema.inner.nodes.len(),
            marks = schema.inner.marks.len(),
            "compiled schema"
        );
        Ok(schema)
    }

    /// The spec this schema is based on.
    pub fn spec(&self) -> &SchemaSpec {
        &self.inner.spec
    }

    /// The node types of this schema, in declaration order.
    pub fn nodes(&self) -> &NodeTypes {
        &self.inner.nodes
    }

    /// The mark types of this schema, in declaration order.
    pub fn marks(&self) -> &MarkTypes {
        &self.inner.marks
    }

    /// The type of the default top node for this schema.
    pub fn top_node_type(&self) -> &NodeType {
        &self.inner.top_node_type
    }

    /// Get the node type with the given name.
    pub fn node_type(&self, name: &str) -> Result<&NodeType, SchemaError> {
        self.inner
            .nodes
            .get(name)
            .ok_or_else(|| SchemaError::UnknownNodeType(name.to_owned()))
    }

    /// Get the mark type with the given name, if defined.
    pub fn mark_type(&self, name: &str) -> Option<&MarkType> {
        self.inner.marks.get(name)
    }

    /// Create a node in this schema, checking its content against the
    /// type's content expression.
    pub fn node(
        &self,
        name: &str,
        attrs: Option<&Attrs>,
        content: Option<Fragment>,
        marks: Option<Vec<Mark>>,
    ) -> Result<Node, SchemaError> {
        self.node_type(name)?.create_checked(attrs, content, marks)
    }

    /// Create a text node in the schema. Empty text nodes are not allowed.
    ///
    /// # Panics
    /// Panics when `text` is empty.
    pub fn text(&self, text: &str, marks: Option<Vec<Mark>>) -> Node {
        let text_type = &self.inner.text_type;
        Node::new_text(
            text_type.clone(),
            text_type
                .inner
                .default_attrs
                .clone()
                .expect("text type has no attributes"),
            text.to_owned(),
            Mark::set_from(marks.unwrap_or_default()),
        )
    }

    /// Create a mark with the given type and attributes.
    pub fn mark(&self, name: &str, attrs: Option<&Attrs>) -> Result<Mark, SchemaError> {
        self.inner
            .marks
            .get(name)
            .ok_or_else(|| SchemaError::UnknownMarkType(name.to_owned()))?
            .create(attrs)
    }

    /// Deserialize a node from its JSON representation.
    pub fn node_from_json(&self, value: &Value) -> Result<Node, JsonError> {
        Node::from_json(self, value)
    }

    /// Deserialize a mark from its JSON representation.
    pub fn mark_from_json(&self, value: &Value) -> Result<Mark, JsonError> {
        Mark::from_json(self, value)
    }

    /// True when both handles refer to the same schema.
    pub fn ptr_eq(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("nodes", &self.inner.nodes.keys().collect::<Vec<_>>())
            .field("marks", &self.inner.marks.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn gather_marks<'a>(
    marks: &MarkTypes,
    names: impl Iterator<Item = &'a str>,
) -> Result<Vec<MarkType>, SchemaError> {
    let mut found = Vec::new();
    for name in names {
        let mut ok = false;
        if let Some(mark) = marks.get(name) {
            found.push(mark.clone());
            ok = true;
        } else {
            for mark in marks.values() {
                let in_group = mark
                    .inner
                    .spec
                    .group
                    .as_deref()
                    .is_some_and(|g| g.split(' ').any(|part| part == name));
                if name == "_" || in_group {
                    found.push(mark.clone());
                    ok = true;
                }
            }
        }
        if !ok {
            return Err(SchemaError::UnknownMarkType(name.to_owned()));
        }
    }
    Ok(found)
}
