use folio_model::{Attrs, Mark, MarkSpec, Node, NodeSpec, Schema, SchemaSpec};
use folio_test_builder::{a, doc, em, p, test_schema, Tagged};
use indexmap::IndexMap;
use serde_json::{json, Value};

fn attrs(value: Value) -> Attrs {
    value.as_object().expect("object").clone()
}

fn em_() -> Mark {
    test_schema().mark("em", None).unwrap()
}

fn strong() -> Mark {
    test_schema().mark("strong", None).unwrap()
}

fn code() -> Mark {
    test_schema().mark("code", None).unwrap()
}

fn link(href: &str, title: Option<&str>) -> Mark {
    test_schema()
        .mark("link", Some(&attrs(json!({"href": href, "title": title}))))
        .unwrap()
}

/// A schema with mark types covering exclusion by group, by wildcard, and
/// self-coexistence.
fn custom_schema() -> Schema {
    let mut nodes = IndexMap::new();
    nodes.insert(
        "doc".to_owned(),
        NodeSpec {
            content: Some("paragraph+".to_owned()),
            ..NodeSpec::default()
        },
    );
    nodes.insert(
        "paragraph".to_owned(),
        NodeSpec {
            content: Some("text*".to_owned()),
            ..NodeSpec::default()
        },
    );
    nodes.insert("text".to_owned(), NodeSpec::default());
    let mut marks = IndexMap::new();
    marks.insert(
        "remark".to_owned(),
        MarkSpec {
            attrs: IndexMap::from([(
                "id".to_owned(),
                folio_model::AttributeSpec { default: None },
            )]),
            excludes: Some(String::new()),
            inclusive: false,
            ..MarkSpec::default()
        },
    );
    marks.insert(
        "user".to_owned(),
        MarkSpec {
            attrs: IndexMap::from([(
                "id".to_owned(),
                folio_model::AttributeSpec { default: None },
            )]),
            excludes: Some("_".to_owned()),
            ..MarkSpec::default()
        },
    );
    marks.insert(
        "strong".to_owned(),
        MarkSpec {
            excludes: Some("em-group".to_owned()),
            ..MarkSpec::default()
        },
    );
    marks.insert(
        "em".to_owned(),
        MarkSpec {
            group: Some("em-group".to_owned()),
            ..MarkSpec::default()
        },
    );
    Schema::new(SchemaSpec {
        nodes,
        marks,
        top_node: None,
    })
    .unwrap()
}

fn custom_mark(schema: &Schema, name: &str, id: Option<i64>) -> Mark {
    let attrs = id.map(|id| attrs(json!({"id": id})));
    schema.mark(name, attrs.as_ref()).unwrap()
}

#[test]
fn same_set_compares_by_value() {
    assert!(Mark::same_set(&[em_(), strong()], &[em_(), strong()]));
    assert!(!Mark::same_set(&[em_(), strong()], &[em_(), code()]));
    assert!(!Mark::same_set(&[em_(), strong()], &[em_(), strong(), code()]));
    assert!(Mark::same_set(
        &[link("http://foo", None), code()],
        &[link("http://foo", None), code()]
    ));
    assert!(!Mark::same_set(
        &[link("http://foo", None), code()],
        &[link("http://bar", None), code()]
    ));
}

#[test]
fn mark_equality_includes_attrs() {
    assert_eq!(link("http://foo", None), link("http://foo", None));
    assert_ne!(link("http://foo", None), link("http://bar", None));
    assert_ne!(link("http://foo", Some("A")), link("http://foo", Some("B")));
}

#[test]
fn add_to_set_sorts_and_dedupes() {
    assert!(Mark::same_set(&em_().add_to_set(&[]), &[em_()]));
    assert!(Mark::same_set(&em_().add_to_set(&[em_()]), &[em_()]));
    assert!(Mark::same_set(&em_().add_to_set(&[strong()]), &[em_(), strong()]));
    assert!(Mark::same_set(&strong().add_to_set(&[em_()]), &[em_(), strong()]));
    assert!(Mark::same_set(
        &link("http://bar", None).add_to_set(&[link("http://foo", None), em_()]),
        &[link("http://bar", None), em_()]
    ));
    assert!(Mark::same_set(
        &link("http://foo", None).add_to_set(&[em_(), link("http://foo", None)]),
        &[em_(), link("http://foo", None)]
    ));
    assert!(Mark::same_set(
        &code().add_to_set(&[em_(), strong(), link("http://foo", None)]),
        &[em_(), strong(), link("http://foo", None), code()]
    ));
    assert!(Mark::same_set(
        &strong().add_to_set(&[em_(), code()]),
        &[em_(), strong(), code()]
    ));
}

#[test]
fn add_to_set_honors_exclusions() {
    let schema = custom_schema();
    let remark1 = custom_mark(&schema, "remark", Some(1));
    let remark2 = custom_mark(&schema, "remark", Some(2));
    let user1 = custom_mark(&schema, "user", Some(1));
    let user2 = custom_mark(&schema, "user", Some(2));
    let custom_em = custom_mark(&schema, "em", None);
    let custom_strong = custom_mark(&schema, "strong", None);

    // `remark` excludes nothing, so distinct remarks coexist.
    assert!(Mark::same_set(
        &remark2.add_to_set(&[remark1.clone()]),
        &[remark1.clone(), remark2.clone()]
    ));
    assert!(Mark::same_set(&remark1.add_to_set(&[remark1.clone()]), &[remark1.clone()]));
    // `user` excludes everything.
    assert!(Mark::same_set(
        &user1.add_to_set(&[remark1.clone(), custom_em.clone()]),
        &[user1.clone()]
    ));
    assert!(Mark::same_set(&custom_em.add_to_set(&[user1.clone()]), &[user1.clone()]));
    assert!(Mark::same_set(&user2.add_to_set(&[user1.clone()]), &[user2.clone()]));
    // `strong` excludes the em group.
    assert!(Mark::same_set(
        &custom_em.add_to_set(&[remark1.clone(), custom_strong.clone()]),
        &[remark1.clone(), custom_strong.clone()]
    ));
    assert!(Mark::same_set(
        &custom_strong.add_to_set(&[remark1.clone(), custom_em.clone()]),
        &[remark1.clone(), custom_strong.clone()]
    ));
}

#[test]
fn remove_from_set_matches_attrs() {
    assert!(Mark::same_set(&em_().remove_from_set(&[]), &[]));
    assert!(Mark::same_set(&em_().remove_from_set(&[em_()]), &[]));
    assert!(Mark::same_set(&strong().remove_from_set(&[em_()]), &[em_()]));
    assert!(Mark::same_set(
        &link("http://foo", None).remove_from_set(&[link("http://foo", None)]),
        &[]
    ));
    assert!(Mark::same_set(
        &link("http://foo", Some("title")).remove_from_set(&[link("http://foo", None)]),
        &[link("http://foo", None)]
    ));
}

fn marks_at(d: &Tagged, tag: &str) -> Vec<Mark> {
    d.node.resolve(d.tag(tag)).unwrap().marks()
}

#[test]
fn marks_at_positions_respect_inclusivity() {
    let d = doc(p(em("fo<a>o")));
    assert!(em_().is_in_set(&marks_at(&d, "a")));
    let d = doc(p(em("fo<a>o")));
    assert!(!strong().is_in_set(&marks_at(&d, "a")));
    let d = doc(p((em("hi"), "<a> there")));
    assert!(em_().is_in_set(&marks_at(&d, "a")));
    let d = doc(p(("one <a>", em("two"))));
    assert!(!em_().is_in_set(&marks_at(&d, "a")));
    let d = doc(p(em("<a>one")));
    assert!(em_().is_in_set(&marks_at(&d, "a")));
    // Links are non-inclusive, so the position after one has no link mark.
    let d = doc(p(a("li<a>nk")));
    assert!(!link("http://baz", None).is_in_set(&marks_at(&d, "a")));
}

#[test]
fn marks_in_custom_doc() {
    let schema = custom_schema();
    let custom_doc = Node::from_json(
        &schema,
        &json!({
            "type": "doc",
            "content": [
                {"type": "paragraph", "content": [
                    {"type": "text", "marks": [{"type": "remark", "attrs": {"id": 1}}, {"type": "strong"}], "text": "one"},
                    {"type": "text", "text": "two"},
                ]},
                {"type": "paragraph", "content": [
                    {"type": "text", "text": "one"},
                    {"type": "text", "marks": [{"type": "remark", "attrs": {"id": 1}}], "text": "twothree"},
                ]},
                {"type": "paragraph", "content": [
                    {"type": "text", "marks": [{"type": "remark", "attrs": {"id": 2}}], "text": "one"},
                    {"type": "text", "marks": [{"type": "remark", "attrs": {"id": 1}}], "text": "two"},
                ]},
            ],
        }),
    )
    .unwrap();
    let remark1 = custom_mark(&schema, "remark", Some(1));
    let custom_strong = custom_mark(&schema, "strong", None);
    let marks = |pos: usize| custom_doc.resolve(pos).unwrap().marks();
    // A non-inclusive mark is dropped at its end boundary unless it spans on.
    assert!(Mark::same_set(&marks(4), &[custom_strong.clone()]));
    assert!(Mark::same_set(&marks(3), &[remark1.clone(), custom_strong]));
    assert!(Mark::same_set(&marks(20), &[]));
    assert!(Mark::same_set(&marks(15), &[remark1]));
    assert!(Mark::same_set(&marks(25), &[]));
}
