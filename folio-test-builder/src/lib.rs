//! Example schema and tagged-document builders for the folio test suites.
//!
//! Not part of the core API; the core crates depend on this only as a dev
//! dependency.

pub mod build;
pub mod schema_basic;
pub mod schema_list;

use once_cell::sync::Lazy;

use folio_model::{AttributeSpec, NodeSpec, Schema, SchemaSpec};

pub use build::{
    a, blockquote, br, code, doc, doc_with_meta, em, h1, h2, h3, hr, img, li, mark,
    mark_with_attrs, node, node_with_attrs, ol, p, pre, strong, ul, Child, IntoChild,
    IntoChildren, Tagged,
};
pub use schema_list::add_list_nodes;

static TEST_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    let mut nodes = add_list_nodes(schema_basic::nodes(), "paragraph block*", "block");
    let doc_spec = nodes.get_mut("doc").expect("basic schema has a doc type");
    *doc_spec = NodeSpec {
        content: Some("block+".to_owned()),
        attrs: indexmap::IndexMap::from([(
            "meta".to_owned(),
            AttributeSpec {
                default: Some(serde_json::Value::Null),
            },
        )]),
        ..NodeSpec::default()
    };
    Schema::new(SchemaSpec {
        nodes,
        marks: schema_basic::marks(),
        top_node: None,
    })
    .expect("the example schema compiles")
});

/// The schema used by the test suites: the basic schema plus list nodes,
/// with a `meta` attribute on the document node.
pub fn test_schema() -> Schema {
    TEST_SCHEMA.clone()
}
