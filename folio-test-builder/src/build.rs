//! Tagged-document builders.
//!
//! Documents for tests are written as nested builder calls, with `<name>`
//! markers embedded in text to record interesting positions:
//!
//! ```
//! use folio_test_builder::{doc, p};
//!
//! let d = doc(p("hello <a>there"));
//! assert_eq!(d.tag("a"), 7);
//! ```

use ahash::AHashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use folio_model::{text_length, Attrs, Fragment, Node, Schema};

use crate::test_schema;

static TAG_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"<(\w+)>").expect("valid pattern"));

/// A node together with the positions of the `<name>` markers that
/// occurred in its builder input.
#[derive(Debug, Clone)]
pub struct Tagged {
    /// The built node.
    pub node: Node,
    /// Marker positions by name.
    pub tag: AHashMap<String, usize>,
}

impl Tagged {
    /// The position recorded for the given marker.
    ///
    /// # Panics
    /// Panics when the document has no such marker.
    pub fn tag(&self, name: &str) -> usize {
        *self
            .tag
            .get(name)
            .unwrap_or_else(|| panic!("no tag <{name}> in document"))
    }
}

/// One child argument of a builder: a text string (possibly containing
/// `<name>` markers), a built node, or a flat run of marked nodes.
#[derive(Debug, Clone)]
pub enum Child {
    /// Text content.
    Text(String),
    /// A single node.
    Node(Tagged),
    /// An already-flattened list of inline nodes with tags.
    Flat(Vec<Node>, AHashMap<String, usize>),
}

/// A value usable as a single builder child.
pub trait IntoChild {
    /// Convert into a [`Child`].
    fn into_child(self) -> Child;
}

impl IntoChild for &str {
    fn into_child(self) -> Child {
        Child::Text(self.to_owned())
    }
}

impl IntoChild for String {
    fn into_child(self) -> Child {
        Child::Text(self)
    }
}

impl IntoChild for Tagged {
    fn into_child(self) -> Child {
        Child::Node(self)
    }
}

impl IntoChild for Child {
    fn into_child(self) -> Child {
        self
    }
}

/// A value usable as the full child list of a builder: a single child, a
/// tuple of children, or a vector.
pub trait IntoChildren {
    /// Convert into a list of [`Child`] values.
    fn into_children(self) -> Vec<Child>;
}

impl IntoChildren for &str {
    fn into_children(self) -> Vec<Child> {
        vec![self.into_child()]
    }
}

impl IntoChildren for String {
    fn into_children(self) -> Vec<Child> {
        vec![self.into_child()]
    }
}

impl IntoChildren for Tagged {
    fn into_children(self) -> Vec<Child> {
        vec![self.into_child()]
    }
}

impl IntoChildren for Child {
    fn into_children(self) -> Vec<Child> {
        vec![self]
    }
}

impl IntoChildren for () {
    fn into_children(self) -> Vec<Child> {
        Vec::new()
    }
}

impl IntoChildren for Vec<Child> {
    fn into_children(self) -> Vec<Child> {
        self
    }
}

macro_rules! tuple_into_children {
    ($($name:ident),+) => {
        impl<$($name: IntoChild),+> IntoChildren for ($($name,)+) {
            fn into_children(self) -> Vec<Child> {
                #[allow(non_snake_case)]
                let ($($name,)+) = self;
                vec![$($name.into_child()),+]
            }
        }
    };
}

tuple_into_children!(A);
tuple_into_children!(A, B);
tuple_into_children!(A, B, C);
tuple_into_children!(A, B, C, D);
tuple_into_children!(A, B, C, D, E);
tuple_into_children!(A, B, C, D, E, F);
tuple_into_children!(A, B, C, D, E, F, G);
tuple_into_children!(A, B, C, D, E, F, G, H);

fn flatten(
    schema: &Schema,
    children: Vec<Child>,
    f: &dyn Fn(Node) -> Node,
) -> (Vec<Node>, AHashMap<String, usize>) {
    let mut result = Vec::new();
    let mut pos = 0;
    let mut tag = AHashMap::new();
    for child in children {
        match child {
            Child::Node(tagged) => {
                let shift = usize::from(!tagged.node.is_text());
                for (id, p) in &tagged.tag {
                    tag.insert(id.clone(), p + shift + pos);
                }
                let node = f(tagged.node);
                pos += node.node_size();
                result.push(node);
            }
            Child::Flat(nodes, inner_tag) => {
                for (id, p) in &inner_tag {
                    tag.insert(id.clone(), p + pos);
                }
                for item in nodes {
                    let node = f(item);
                    pos += node.node_size();
                    result.push(node);
                }
            }
            Child::Text(text) => {
                let mut at = 0;
                let mut out = String::new();
                for captures in TAG_REGEX.captures_iter(&text) {
                    let m = captures.get(0).expect("whole match");
                    out.push_str(&text[at..m.start()]);
                    pos += text_length(&text[at..m.start()]);
                    at = m.end();
                    tag.insert(captures[1].to_owned(), pos);
                }
                out.push_str(&text[at..]);
                pos += text_length(&text[at..]);
                if !out.is_empty() {
                    result.push(f(schema.text(&out, None)));
                }
            }
        }
    }
    (result, tag)
}

/// Build a node of the named type with the given attributes.
pub fn node_with_attrs(name: &str, attrs: Attrs, children: impl IntoChildren) -> Tagged {
    let schema = test_schema();
    let node_type = schema.node_type(name).expect("known node type").clone();
    let (nodes, tag) = flatten(&schema, children.into_children(), &|n| n);
    let node = node_type
        .create(Some(&attrs), Some(Fragment::from_nodes(nodes)), None)
        .expect("valid test fixture");
    Tagged { node, tag }
}

/// Build a node of the named type.
pub fn node(name: &str, children: impl IntoChildren) -> Tagged {
    node_with_attrs(name, Attrs::new(), children)
}

/// Apply a mark of the named type, with attributes, to the given children.
pub fn mark_with_attrs(name: &str, attrs: Attrs, children: impl IntoChildren) -> Child {
    let schema = test_schema();
    let mark = schema.mark(name, Some(&attrs)).expect("known mark type");
    let f = move |n: Node| {
        if mark.mark_type().is_in_set(n.marks()).is_some() {
            n
        } else {
            let marks = mark.add_to_set(n.marks());
            n.mark(marks)
        }
    };
    let (nodes, tag) = flatten(&schema, children.into_children(), &f);
    Child::Flat(nodes, tag)
}

/// Apply a mark of the named type to the given children.
pub fn mark(name: &str, children: impl IntoChildren) -> Child {
    mark_with_attrs(name, Attrs::new(), children)
}

fn attrs(entries: &[(&str, Value)]) -> Attrs {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

/// A top-level document.
pub fn doc(children: impl IntoChildren) -> Tagged {
    node("doc", children)
}

/// A document carrying a `meta` attribute.
pub fn doc_with_meta(meta: Value, children: impl IntoChildren) -> Tagged {
    node_with_attrs("doc", attrs(&[("meta", meta)]), children)
}

/// A paragraph.
pub fn p(children: impl IntoChildren) -> Tagged {
    node("paragraph", children)
}

/// A blockquote.
pub fn blockquote(children: impl IntoChildren) -> Tagged {
    node("blockquote", children)
}

/// A code block.
pub fn pre(children: impl IntoChildren) -> Tagged {
    node("code_block", children)
}

/// A level-one heading.
pub fn h1(children: impl IntoChildren) -> Tagged {
    node_with_attrs("heading", attrs(&[("level", Value::from(1))]), children)
}

/// A level-two heading.
pub fn h2(children: impl IntoChildren) -> Tagged {
    node_with_attrs("heading", attrs(&[("level", Value::from(2))]), children)
}

/// A level-three heading.
pub fn h3(children: impl IntoChildren) -> Tagged {
    node_with_attrs("heading", attrs(&[("level", Value::from(3))]), children)
}

/// A list item.
pub fn li(children: impl IntoChildren) -> Tagged {
    node("list_item", children)
}

/// A bullet list.
pub fn ul(children: impl IntoChildren) -> Tagged {
    node("bullet_list", children)
}

/// An ordered list.
pub fn ol(children: impl IntoChildren) -> Tagged {
    node("ordered_list", children)
}

/// A hard break.
pub fn br() -> Tagged {
    node("hard_break", ())
}

/// An image with a fixed test source.
pub fn img() -> Tagged {
    node_with_attrs("image", attrs(&[("src", Value::from("img.png"))]), ())
}

/// A horizontal rule.
pub fn hr() -> Tagged {
    node("horizontal_rule", ())
}

/// Emphasis.
pub fn em(children: impl IntoChildren) -> Child {
    mark("em", children)
}

/// Strong emphasis.
pub fn strong(children: impl IntoChildren) -> Child {
    mark("strong", children)
}

/// Code font.
pub fn code(children: impl IntoChildren) -> Child {
    mark("code", children)
}

/// A link with a fixed test target.
pub fn a(children: impl IntoChildren) -> Child {
    mark_with_attrs("link", attrs(&[("href", Value::from("foo"))]), children)
}
