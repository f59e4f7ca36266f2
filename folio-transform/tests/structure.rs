use folio_model::{Fragment, Node, NodeRange, NodeSpec, Schema, SchemaSpec, Slice};
use folio_transform::{can_split, find_wrapping, lift_target, Transform, TypeAndAttrs};
use indexmap::IndexMap;

fn spec(content: Option<&str>, group: Option<&str>, marks: Option<&str>) -> NodeSpec {
    NodeSpec {
        content: content.map(ToOwned::to_owned),
        group: group.map(ToOwned::to_owned),
        marks: marks.map(ToOwned::to_owned),
        ..NodeSpec::default()
    }
}

fn schema() -> Schema {
    let mut nodes = IndexMap::new();
    nodes.insert("doc".to_owned(), spec(Some("head? block* sect* closing?"), None, None));
    nodes.insert("para".to_owned(), spec(Some("text*"), Some("block"), None));
    nodes.insert("head".to_owned(), spec(Some("text*"), None, Some("")));
    nodes.insert(
        "figure".to_owned(),
        spec(Some("caption figureimage"), Some("block"), None),
    );
    nodes.insert("quote".to_owned(), spec(Some("block+"), Some("block"), None));
    nodes.insert("figureimage".to_owned(), spec(None, None, None));
    nodes.insert("caption".to_owned(), spec(Some("text*"), None, Some("")));
    nodes.insert("sect".to_owned(), spec(Some("head block* sect*"), None, None));
    nodes.insert("closing".to_owned(), spec(Some("text*"), None, None));
    nodes.insert("text".to_owned(), spec(None, Some("inline"), None));
    nodes.insert(
        "fixed".to_owned(),
        spec(Some("head para closing"), Some("block"), None),
    );
    let mut marks = IndexMap::new();
    marks.insert("em".to_owned(), folio_model::MarkSpec::default());
    Schema::new(SchemaSpec {
        nodes,
        marks,
        top_node: None,
    })
    .unwrap()
}

fn n(s: &Schema, name: &str, children: Vec<Node>) -> Node {
    s.node_type(name)
        .unwrap()
        .create(None, Some(Fragment::from_nodes(children)), None)
        .unwrap()
}

fn t(s: &Schema, text: &str) -> Node {
    s.text(text, None)
}

fn test_doc(s: &Schema) -> Node {
    n(
        s,
        "doc",
        vec![
            n(s, "head", vec![t(s, "Head")]),
            n(s, "para", vec![t(s, "Intro")]),
            n(
                s,
                "sect",
                vec![
                    n(s, "head", vec![t(s, "Section head")]),
                    n(
                        s,
                        "sect",
                        vec![
                            n(s, "head", vec![t(s, "Subsection head")]),
                            n(s, "para", vec![t(s, "Subtext")]),
                            n(
                                s,
                                "figure",
                                vec![
                                    n(s, "caption", vec![t(s, "Figure caption")]),
                                    n(s, "figureimage", vec![]),
                                ],
                            ),
                            n(s, "quote", vec![n(s, "para", vec![t(s, "!")])]),
                        ],
                    ),
                ],
            ),
            n(
                s,
                "sect",
                vec![
                    n(s, "head", vec![t(s, "S2")]),
                    n(s, "para", vec![t(s, "Yes")]),
                ],
            ),
            n(s, "closing", vec![t(s, "fin")]),
        ],
    )
}

fn range(doc: &Node, pos: usize, end: Option<usize>) -> Option<NodeRange> {
    let rp = doc.resolve(pos).unwrap();
    let other = end.map(|end| doc.resolve(end).unwrap());
    rp.block_range(other.as_ref(), None)
}

#[test]
fn can_split_at_valid_points_only() {
    let s = schema();
    let d = test_doc(&s);
    let cases: &[(bool, usize, usize, Option<&str>)] = &[
        (false, 0, 1, None),
        (false, 3, 1, None),
        (true, 3, 1, Some("para")),
        (false, 6, 1, None),
        (true, 8, 1, None),
        (false, 14, 1, None),
        (false, 17, 1, None),
        (true, 17, 2, None),
        (true, 18, 1, Some("para")),
        (false, 46, 1, None),
        (true, 48, 1, None),
        (false, 60, 1, None),
        (false, 62, 2, None),
        (false, 72, 1, None),
        (true, 76, 1, None),
        (true, 77, 2, None),
        (false, 97, 1, None),
    ];
    for &(expected, pos, depth, after) in cases {
        let types_after: Option<Vec<Option<TypeAndAttrs>>> = after.map(|name| {
            vec![Some(TypeAndAttrs::plain(
                s.node_type(name).unwrap().clone(),
            ))]
        });
        assert_eq!(
            can_split(&d, pos, depth, types_after.as_deref()),
            expected,
            "can_split at {pos} depth {depth}"
        );
    }
}

#[test]
fn can_split_checks_the_given_type() {
    let mut nodes = IndexMap::new();
    nodes.insert("doc".to_owned(), spec(Some("chapter+"), None, None));
    nodes.insert("para".to_owned(), spec(Some("text*"), Some("block"), None));
    nodes.insert("title".to_owned(), spec(Some("text*"), None, None));
    nodes.insert("chapter".to_owned(), spec(Some("title scene+"), None, None));
    nodes.insert("scene".to_owned(), spec(Some("para+"), None, None));
    nodes.insert("text".to_owned(), spec(None, None, None));
    let s = Schema::new(SchemaSpec {
        nodes,
        marks: IndexMap::new(),
        top_node: None,
    })
    .unwrap();
    let d = n(
        &s,
        "doc",
        vec![n(
            &s,
            "chapter",
            vec![
                n(&s, "title", vec![t(&s, "title")]),
                n(&s, "scene", vec![n(&s, "para", vec![t(&s, "scene")])]),
            ],
        )],
    );
    assert!(!can_split(
        &d,
        4,
        1,
        Some(&[Some(TypeAndAttrs::plain(
            s.node_type("scene").unwrap().clone()
        ))])
    ));
}

#[test]
fn lift_target_finds_valid_targets_only() {
    let s = schema();
    let d = test_doc(&s);
    for &(expected, pos) in &[
        (false, 0),
        (false, 3),
        (false, 52),
        (false, 70),
        (true, 76),
        (false, 86),
    ] {
        let found = range(&d, pos, None).and_then(|r| lift_target(&r));
        assert_eq!(found.is_some(), expected, "lift target at {pos}");
    }
}

#[test]
fn find_wrapping_checks_both_sides() {
    let s = schema();
    let d = test_doc(&s);
    let cases: &[(bool, usize, usize, &str)] = &[
        (true, 0, 92, "sect"),
        (false, 4, 4, "sect"),
        (true, 8, 8, "quote"),
        (false, 18, 18, "quote"),
        (true, 55, 74, "quote"),
        (false, 90, 90, "figure"),
    ];
    for &(expected, pos, end, name) in cases {
        let node_type = s.node_type(name).unwrap();
        let found =
            range(&d, pos, Some(end)).and_then(|r| find_wrapping(&r, node_type, None, None));
        assert_eq!(found.is_some(), expected, "wrapping in {name} at {pos}");
    }
}

#[test]
fn replace_fits_structured_content() {
    let s = schema();
    type Case = (Node, usize, usize, Option<(Node, usize, usize)>, Node);
    let cases: Vec<Case> = vec![
        (
            n(
                &s,
                "doc",
                vec![n(
                    &s,
                    "sect",
                    vec![
                        n(&s, "head", vec![t(&s, "foo")]),
                        n(&s, "para", vec![t(&s, "bar")]),
                    ],
                )],
            ),
            6,
            6,
            Some((
                n(&s, "doc", vec![n(&s, "sect", vec![]), n(&s, "sect", vec![])]),
                1,
                1,
            )),
            n(
                &s,
                "doc",
                vec![
                    n(&s, "sect", vec![n(&s, "head", vec![t(&s, "foo")])]),
                    n(
                        &s,
                        "sect",
                        vec![
                            n(&s, "head", vec![]),
                            n(&s, "para", vec![t(&s, "bar")]),
                        ],
                    ),
                ],
            ),
        ),
        (
            n(
                &s,
                "doc",
                vec![
                    n(&s, "para", vec![t(&s, "a")]),
                    n(&s, "para", vec![t(&s, "b")]),
                ],
            ),
            3,
            3,
            Some((n(&s, "doc", vec![n(&s, "closing", vec![t(&s, ".")])]), 0, 0)),
            n(
                &s,
                "doc",
                vec![
                    n(&s, "para", vec![t(&s, "a")]),
                    n(&s, "para", vec![t(&s, "b")]),
                ],
            ),
        ),
        (
            n(
                &s,
                "doc",
                vec![n(
                    &s,
                    "sect",
                    vec![
                        n(&s, "head", vec![t(&s, "foo")]),
                        n(&s, "para", vec![t(&s, "bar")]),
                    ],
                )],
            ),
            1,
            3,
            Some((
                n(
                    &s,
                    "doc",
                    vec![
                        n(&s, "sect", vec![]),
                        n(&s, "sect", vec![n(&s, "head", vec![t(&s, "hi")])]),
                    ],
                ),
                1,
                2,
            )),
            n(
                &s,
                "doc",
                vec![
                    n(&s, "sect", vec![n(&s, "head", vec![])]),
                    n(
                        &s,
                        "sect",
                        vec![
                            n(&s, "head", vec![t(&s, "hioo")]),
                            n(&s, "para", vec![t(&s, "bar")]),
                        ],
                    ),
                ],
            ),
        ),
        (
            n(&s, "doc", vec![]),
            0,
            0,
            Some((
                n(&s, "doc", vec![n(&s, "figure", vec![n(&s, "figureimage", vec![])])]),
                1,
                0,
            )),
            n(
                &s,
                "doc",
                vec![n(
                    &s,
                    "figure",
                    vec![n(&s, "caption", vec![]), n(&s, "figureimage", vec![])],
                )],
            ),
        ),
        (
            n(&s, "doc", vec![]),
            0,
            0,
            Some((
                n(&s, "doc", vec![n(&s, "figure", vec![n(&s, "caption", vec![])])]),
                0,
                1,
            )),
            n(
                &s,
                "doc",
                vec![n(
                    &s,
                    "figure",
                    vec![n(&s, "caption", vec![]), n(&s, "figureimage", vec![])],
                )],
            ),
        ),
        (
            n(
                &s,
                "doc",
                vec![
                    n(
                        &s,
                        "figure",
                        vec![n(&s, "caption", vec![]), n(&s, "figureimage", vec![])],
                    ),
                    n(
                        &s,
                        "figure",
                        vec![n(&s, "caption", vec![]), n(&s, "figureimage", vec![])],
                    ),
                ],
            ),
            3,
            8,
            None,
            n(
                &s,
                "doc",
                vec![n(
                    &s,
                    "figure",
                    vec![n(&s, "caption", vec![]), n(&s, "figureimage", vec![])],
                )],
            ),
        ),
        (
            n(
                &s,
                "doc",
                vec![n(
                    &s,
                    "sect",
                    vec![
                        n(&s, "head", vec![]),
                        n(
                            &s,
                            "figure",
                            vec![n(&s, "caption", vec![]), n(&s, "figureimage", vec![])],
                        ),
                    ],
                )],
            ),
            7,
            9,
            Some((n(&s, "doc", vec![n(&s, "para", vec![t(&s, "hi")])]), 0, 0)),
            n(
                &s,
                "doc",
                vec![n(
                    &s,
                    "sect",
                    vec![
                        n(&s, "head", vec![]),
                        n(
                            &s,
                            "figure",
                            vec![n(&s, "caption", vec![]), n(&s, "figureimage", vec![])],
                        ),
                        n(&s, "para", vec![t(&s, "hi")]),
                    ],
                )],
            ),
        ),
    ];
    for (i, (d, from, to, source, expected)) in cases.into_iter().enumerate() {
        let slice = source.map_or_else(Slice::empty, |(content, open_start, open_end)| {
            Slice::new(content.content().clone(), open_start, open_end)
        });
        let mut tr = Transform::new(d);
        tr.replace(from, to, slice).unwrap();
        assert_eq!(tr.doc(), &expected, "structured replace case {i}");
    }
}
