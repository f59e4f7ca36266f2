use folio_model::{ContentMatch, Node, SchemaError};
use folio_test_builder::test_schema;
use serde_json::json;

fn get(expr: &str) -> ContentMatch {
    ContentMatch::parse(expr, test_schema().nodes()).expect("valid content expression")
}

fn matches(expr: &str, types: &str) -> bool {
    let schema = test_schema();
    let mut m = Some(get(expr));
    for name in types.split_whitespace() {
        let node_type = schema.node_type(name).expect("known type");
        m = m.and_then(|m| m.match_type(node_type));
    }
    m.is_some_and(|m| m.valid_end())
}

fn node(json: serde_json::Value) -> Node {
    Node::from_json(&test_schema(), &json).expect("valid node json")
}

#[test]
fn matches_type_sequences() {
    let cases: &[(&str, &str, bool)] = &[
        ("", "", true),
        ("", "image", false),
        ("image*", "", true),
        ("image*", "image", true),
        ("image*", "image image image image", true),
        ("image*", "image text", false),
        ("inline*", "image text", true),
        ("inline*", "paragraph", false),
        ("(paragraph | heading)", "paragraph", true),
        ("(paragraph | heading)", "image", false),
        (
            "paragraph horizontal_rule paragraph",
            "paragraph horizontal_rule paragraph",
            true,
        ),
        ("paragraph horizontal_rule", "paragraph horizontal_rule paragraph", false),
        ("paragraph horizontal_rule paragraph", "paragraph horizontal_rule", false),
        (
            "paragraph horizontal_rule",
            "horizontal_rule paragraph horizontal_rule",
            false,
        ),
        ("heading paragraph*", "heading", true),
        ("heading paragraph*", "heading paragraph paragraph", true),
        ("heading paragraph+", "heading paragraph", true),
        ("heading paragraph+", "heading paragraph paragraph", true),
        ("heading paragraph+", "heading", false),
        ("heading paragraph+", "paragraph paragraph", false),
        ("image?", "image", true),
        ("image?", "", true),
        ("image?", "image image", false),
        (
            "(heading paragraph+)+",
            "heading paragraph heading paragraph paragraph",
            true,
        ),
        (
            "(heading paragraph+)+",
            "heading paragraph heading paragraph paragraph horizontal_rule",
            false,
        ),
        ("hard_break{2}", "hard_break hard_break", true),
        ("hard_break{2}", "hard_break", false),
        ("hard_break{2}", "hard_break hard_break hard_break", false),
        ("hard_break{2, 4}", "hard_break hard_break", true),
        ("hard_break{2, 4}", "hard_break hard_break hard_break hard_break", true),
        ("hard_break{2, 4}", "hard_break hard_break hard_break", true),
        ("hard_break{2, 4}", "hard_break", false),
        (
            "hard_break{2, 4}",
            "hard_break hard_break hard_break hard_break hard_break",
            false,
        ),
        ("hard_break{2, 4} text*", "hard_break hard_break image", false),
        ("hard_break{2, 4} image?", "hard_break hard_break image", true),
        ("hard_break{2,}", "hard_break hard_break", true),
        ("hard_break{2,}", "hard_break hard_break hard_break hard_break", true),
        ("hard_break{2,}", "hard_break", false),
    ];
    for (expr, types, valid) in cases {
        assert_eq!(
            matches(expr, types),
            *valid,
            "{expr:?} against {types:?} should be {valid}"
        );
    }
}

#[test]
fn fills_before_to_end() {
    let cases = [
        (
            "paragraph horizontal_rule paragraph",
            json!({"type":"doc","content":[{"type":"paragraph"},{"type":"horizontal_rule"}]}),
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            Some(json!({"type":"doc"})),
        ),
        (
            "paragraph horizontal_rule paragraph",
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            Some(json!({"type":"doc","content":[{"type":"horizontal_rule"}]})),
        ),
        (
            "hard_break*",
            json!({"type":"paragraph","content":[{"type":"hard_break"}]}),
            json!({"type":"paragraph","content":[{"type":"hard_break"}]}),
            Some(json!({"type":"paragraph"})),
        ),
        (
            "hard_break*",
            json!({"type":"paragraph"}),
            json!({"type":"paragraph","content":[{"type":"hard_break"}]}),
            Some(json!({"type":"paragraph"})),
        ),
        (
            "hard_break+",
            json!({"type":"paragraph"}),
            json!({"type":"paragraph"}),
            Some(json!({"type":"paragraph","content":[{"type":"hard_break"}]})),
        ),
        (
            "hard_break+",
            json!({"type":"paragraph"}),
            json!({"type":"paragraph","content":[{"type":"image","attrs":{"src":"img.png","alt":null,"title":null}}]}),
            None,
        ),
        (
            "heading* paragraph*",
            json!({"type":"doc","content":[{"type":"heading","attrs":{"level":1}}]}),
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            Some(json!({"type":"doc"})),
        ),
        (
            "heading+ paragraph+",
            json!({"type":"doc","content":[{"type":"heading","attrs":{"level":1}}]}),
            json!({"type":"doc"}),
            Some(json!({"type":"doc","content":[{"type":"paragraph"}]})),
        ),
        (
            "hard_break{3}",
            json!({"type":"paragraph","content":[{"type":"hard_break"}]}),
            json!({"type":"paragraph","content":[{"type":"hard_break"}]}),
            Some(json!({"type":"paragraph","content":[{"type":"hard_break"}]})),
        ),
        (
            "hard_break{3}",
            json!({"type":"paragraph","content":[{"type":"hard_break"},{"type":"hard_break"}]}),
            json!({"type":"paragraph","content":[{"type":"hard_break"},{"type":"hard_break"}]}),
            None,
        ),
        (
            "code_block{2} paragraph{2}",
            json!({"type":"doc","content":[{"type":"code_block"}]}),
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            Some(json!({"type":"doc","content":[{"type":"code_block"},{"type":"paragraph"}]})),
        ),
    ];
    for (expr, before, after, expected) in cases {
        let before = node(before);
        let after = node(after);
        let filled = get(expr)
            .match_fragment(before.content(), 0, before.child_count())
            .expect("before content matches")
            .fill_before(after.content(), true, 0);
        if let Some(filled) = &filled {
            // Whatever was filled in must make the whole sequence valid.
            let full = before.content().append(filled).append(after.content());
            assert!(
                get(expr)
                    .match_fragment(&full, 0, full.child_count())
                    .is_some_and(|m| m.valid_end()),
                "filled content matches for {expr:?}"
            );
        }
        match expected {
            Some(expected) => {
                let expected = node(expected);
                assert_eq!(
                    filled.as_ref(),
                    Some(expected.content()),
                    "fill for {expr:?}"
                );
            }
            None => assert!(filled.is_none(), "no fill for {expr:?}"),
        }
    }
}

// Filling in the middle has to find content that works with both the filled
// prefix and the following fragment.
#[test]
fn fills_three_way() {
    let cases = [
        (
            "paragraph horizontal_rule paragraph horizontal_rule paragraph",
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            Some((
                json!({"type":"doc","content":[{"type":"horizontal_rule"}]}),
                json!({"type":"doc","content":[{"type":"horizontal_rule"}]}),
            )),
        ),
        (
            "code_block+ paragraph+",
            json!({"type":"doc","content":[{"type":"code_block"}]}),
            json!({"type":"doc","content":[{"type":"code_block"}]}),
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            Some((json!({"type":"doc"}), json!({"type":"doc"}))),
        ),
        (
            "code_block+ paragraph+",
            json!({"type":"doc"}),
            json!({"type":"doc"}),
            json!({"type":"doc"}),
            Some((
                json!({"type":"doc"}),
                json!({"type":"doc","content":[{"type":"code_block"},{"type":"paragraph"}]}),
            )),
        ),
        (
            "code_block{3} paragraph{3}",
            json!({"type":"doc","content":[{"type":"code_block"}]}),
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            json!({"type":"doc"}),
            Some((
                json!({"type":"doc","content":[{"type":"code_block"},{"type":"code_block"}]}),
                json!({"type":"doc","content":[{"type":"paragraph"},{"type":"paragraph"}]}),
            )),
        ),
        (
            "paragraph*",
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            json!({"type":"doc","content":[{"type":"code_block"}]}),
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            None,
        ),
        (
            "paragraph{4}",
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            Some((
                json!({"type":"doc"}),
                json!({"type":"doc","content":[{"type":"paragraph"}]}),
            )),
        ),
        (
            "paragraph{2}",
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            json!({"type":"doc","content":[{"type":"paragraph"}]}),
            None,
        ),
    ];
    for (expr, before, mid, after, expected) in cases {
        let before = node(before);
        let mid = node(mid);
        let after = node(after);
        let content = get(expr);
        let a = content
            .match_fragment(before.content(), 0, before.child_count())
            .expect("before content matches")
            .fill_before(mid.content(), false, 0);
        let b = a.as_ref().and_then(|a| {
            let prefix = before.content().append(a).append(mid.content());
            content
                .match_fragment(&prefix, 0, prefix.child_count())
                .and_then(|m| m.fill_before(after.content(), true, 0))
        });
        match expected {
            Some((left, right)) => {
                assert_eq!(a.as_ref(), Some(node(left).content()), "left fill for {expr:?}");
                assert_eq!(b.as_ref(), Some(node(right).content()), "right fill for {expr:?}");
            }
            None => assert!(b.is_none(), "no fill for {expr:?}"),
        }
    }
}

#[test]
fn rejects_unknown_names() {
    let err = ContentMatch::parse("foo+", test_schema().nodes()).unwrap_err();
    assert!(matches!(err, SchemaError::ContentExpression { .. }));
}

#[test]
fn rejects_mixed_inline_and_block() {
    let err = ContentMatch::parse("(paragraph | text)", test_schema().nodes()).unwrap_err();
    let SchemaError::ContentExpression { message, .. } = err else {
        panic!("expected a content expression error");
    };
    assert!(message.contains("Mixing inline and block content"));
}

#[test]
fn rejects_dead_ends() {
    // `image` has a required attribute, so a position that requires it can
    // never be auto-filled.
    let err = ContentMatch::parse("image", test_schema().nodes()).unwrap_err();
    let SchemaError::ContentExpression { message, .. } = err else {
        panic!("expected a content expression error");
    };
    assert!(message.contains("non-generatable"));
}

#[test]
fn wrapping_for_valid_content_is_empty() {
    let schema = test_schema();
    let paragraph = schema.node_type("paragraph").unwrap();
    let wrapping = get("block+").find_wrapping(paragraph);
    assert_eq!(wrapping, Some(vec![]));
}

#[test]
fn finds_list_wrapping() {
    let schema = test_schema();
    let paragraph = schema.node_type("paragraph").unwrap().clone();
    let ordered_list = schema.node_type("ordered_list").unwrap();
    let wrapping = ordered_list
        .content_match()
        .find_wrapping(&paragraph)
        .expect("a paragraph can be wrapped into a list");
    assert_eq!(wrapping, vec![schema.node_type("list_item").unwrap().clone()]);
}

#[test]
fn default_type_skips_text_and_required_attrs() {
    assert_eq!(
        get("inline*").default_type().map(|t| t.name().to_owned()),
        Some("hard_break".to_owned())
    );
    assert_eq!(
        get("block+").default_type().map(|t| t.name().to_owned()),
        Some("paragraph".to_owned())
    );
}
