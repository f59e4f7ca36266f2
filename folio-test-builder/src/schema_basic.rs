//! The example document schema: a doc of block-level nodes with the usual
//! inline marks. This is test data, not part of the core crates.

use indexmap::IndexMap;
use serde_json::Value;

use folio_model::{AttributeSpec, MarkSpec, NodeSpec};

pub(crate) fn attr_default(value: Value) -> AttributeSpec {
    AttributeSpec {
        default: Some(value),
    }
}

pub(crate) fn attr_required() -> AttributeSpec {
    AttributeSpec { default: None }
}

/// The node specs of the basic schema.
pub fn nodes() -> IndexMap<String, NodeSpec> {
    let mut nodes = IndexMap::new();
    nodes.insert(
        "doc".to_owned(),
        NodeSpec {
            content: Some("block+".to_owned()),
            ..NodeSpec::default()
        },
    );
    nodes.insert(
        "paragraph".to_owned(),
        NodeSpec {
            content: Some("inline*".to_owned()),
            group: Some("block".to_owned()),
            ..NodeSpec::default()
        },
    );
    nodes.insert(
        "blockquote".to_owned(),
        NodeSpec {
            content: Some("block+".to_owned()),
            group: Some("block".to_owned()),
            defining: true,
            ..NodeSpec::default()
        },
    );
    nodes.insert(
        "horizontal_rule".to_owned(),
        NodeSpec {
            group: Some("block".to_owned()),
            ..NodeSpec::default()
        },
    );
    nodes.insert(
        "heading".to_owned(),
        NodeSpec {
            attrs: IndexMap::from([("level".to_owned(), attr_default(Value::from(1)))]),
            content: Some("inline*".to_owned()),
            group: Some("block".to_owned()),
            defining: true,
            ..NodeSpec::default()
        },
    );
    nodes.insert(
        "code_block".to_owned(),
        NodeSpec {
            content: Some("text*".to_owned()),
            marks: Some(String::new()),
            group: Some("block".to_owned()),
            code: true,
            defining: true,
            ..NodeSpec::default()
        },
    );
    nodes.insert(
        "text".to_owned(),
        NodeSpec {
            group: Some("inline".to_owned()),
            ..NodeSpec::default()
        },
    );
    nodes.insert(
        "image".to_owned(),
        NodeSpec {
            inline: true,
            attrs: IndexMap::from([
                ("src".to_owned(), attr_required()),
                ("alt".to_owned(), attr_default(Value::Null)),
                ("title".to_owned(), attr_default(Value::Null)),
            ]),
            group: Some("inline".to_owned()),
            ..NodeSpec::default()
        },
    );
    nodes.insert(
        "hard_break".to_owned(),
        NodeSpec {
            inline: true,
            group: Some("inline".to_owned()),
            ..NodeSpec::default()
        },
    );
    nodes
}

/// The mark specs of the basic schema.
pub fn marks() -> IndexMap<String, MarkSpec> {
    let mut marks = IndexMap::new();
    marks.insert(
        "link".to_owned(),
        MarkSpec {
            attrs: IndexMap::from([
                ("href".to_owned(), attr_required()),
                ("title".to_owned(), attr_default(Value::Null)),
            ]),
            inclusive: false,
            ..MarkSpec::default()
        },
    );
    marks.insert("em".to_owned(), MarkSpec::default());
    marks.insert("strong".to_owned(), MarkSpec::default());
    marks.insert("code".to_owned(), MarkSpec::default());
    marks
}
