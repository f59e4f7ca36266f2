use folio_model::{Node, Schema, SchemaSpec};
use folio_test_builder::{blockquote, br, doc, em, hr, img, p, pre, strong, test_schema};
use indexmap::IndexMap;
use serde_json::json;

fn sample() -> Node {
    doc((
        p(("foo", em(("bar", strong("baz"))))),
        blockquote(p("quux")),
        pre("xyz"),
    ))
    .node
}

#[test]
fn nodes_between_iterates_the_range() {
    let d = sample();
    let mut found = Vec::new();
    d.nodes_between(0, d.content().size(), &mut |node, pos, _parent, _index| {
        found.push((pos, node.to_string()));
        true
    });
    assert_eq!(found[0].0, 0);
    assert!(found[0].1.starts_with("paragraph"));
    assert!(found.iter().any(|(_, repr)| repr == "\"foo\""));
    assert!(found.iter().any(|(pos, repr)| *pos == 11 && repr.starts_with("blockquote")));
}

#[test]
fn text_content_concatenates() {
    let d = sample();
    assert_eq!(d.text_content(), "foobarbazquuxxyz");
    assert_eq!(d.child(0).text_content(), "foobarbaz");
}

#[test]
fn text_between_uses_separators() {
    let d = sample();
    assert_eq!(
        d.text_between(0, d.content().size(), Some("\n"), None),
        "foobarbaz\nquux\nxyz"
    );
    assert_eq!(d.text_between(2, 8, None, None), "oobarb");
}

#[test]
fn text_between_renders_leaves() {
    let d = doc(p(("foo", img(), br(), "bar"))).node;
    let leaf = |_: &Node| "<leaf>".to_owned();
    assert_eq!(
        d.text_between(0, d.content().size(), None, Some(&leaf)),
        "foo<leaf><leaf>bar"
    );
}

#[test]
fn node_at_finds_nodes() {
    let d = sample();
    assert_eq!(d.node_at(0).map(|n| n.node_type().name().to_owned()), Some("paragraph".to_owned()));
    assert_eq!(d.node_at(1).map(|n| n.text_content()), Some("foo".to_owned()));
    assert!(d.node_at(d.content().size()).is_none());
}

#[test]
fn node_size_counts_boundaries_and_text() {
    let d = doc(p("ab")).node;
    assert_eq!(d.child(0).node_size(), 4);
    assert_eq!(hr().node.node_size(), 1);
    assert_eq!(br().node.node_size(), 1);
    assert_eq!(d.node_size(), 6);
}

#[test]
fn cut_respects_utf16_units() {
    let schema = test_schema();
    let text = schema.text("a\u{1F4A9}b", None);
    assert_eq!(text.node_size(), 4);
    assert_eq!(text.cut(0, 1).text(), "a");
    assert_eq!(text.cut(1, 3).text(), "\u{1F4A9}");
    assert_eq!(text.cut(3, 4).text(), "b");
}

#[test]
fn json_round_trips() {
    let schema = test_schema();
    let d = sample();
    let json = d.to_json();
    let parsed = Node::from_json(&schema, &json).unwrap();
    assert_eq!(parsed, d);
}

#[test]
fn json_rejects_malformed_input() {
    let schema = test_schema();
    assert!(Node::from_json(&schema, &json!({"content": []})).is_err());
    assert!(Node::from_json(&schema, &json!({"type": "bogus"})).is_err());
    assert!(Node::from_json(&schema, &json!({"type": "text"})).is_err());
    assert!(Node::from_json(&schema, &json!(null)).is_err());
}

#[test]
fn check_validates_recursively() {
    let d = sample();
    assert!(d.check().is_ok());
    // An unchecked create can produce invalid content, which check flags.
    let schema = test_schema();
    let bad = schema
        .node_type("blockquote")
        .unwrap()
        .create(None, None, None)
        .unwrap();
    assert!(bad.check().is_err());
}

#[test]
fn schema_rejects_bad_specs() {
    let err = Schema::new(SchemaSpec {
        nodes: IndexMap::from([("doc".to_owned(), folio_model::NodeSpec::default())]),
        marks: IndexMap::new(),
        top_node: None,
    })
    .unwrap_err();
    assert!(matches!(err, folio_model::SchemaError::MissingTextType));

    let err = Schema::new(SchemaSpec {
        nodes: IndexMap::from([("text".to_owned(), folio_model::NodeSpec::default())]),
        marks: IndexMap::new(),
        top_node: None,
    })
    .unwrap_err();
    assert!(matches!(err, folio_model::SchemaError::MissingTopNode(_)));
}

#[test]
fn can_replace_checks_content_and_marks() {
    let d = doc((p("one"), p("two"))).node;
    assert!(d.can_replace(0, 1, None));
    assert!(d.can_replace(0, 2, Some(doc(p("x")).node.content())));
    // A doc must keep at least one block.
    assert!(!d.can_replace(0, 2, None));
}

#[test]
fn can_append_compatible_content() {
    let d = doc(p("one")).node;
    let other = doc(p("two")).node;
    assert!(d.can_append(&other));
    let quote = blockquote(p("x")).node;
    assert!(quote.can_append(&blockquote(p("y")).node));
}
