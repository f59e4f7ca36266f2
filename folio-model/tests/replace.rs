use folio_model::{Node, ReplaceError, Slice};
use folio_test_builder::{blockquote, doc, h1, li, p, ul, Tagged};

fn rpl(target: (&Tagged, usize, usize), insert: Option<(&Tagged, usize, usize)>, expect: &Tagged) {
    let slice = insert.map_or_else(Slice::empty, |(source, from, to)| {
        source.node.slice(from, to).expect("valid slice range")
    });
    let result = target
        .0
        .node
        .replace(target.1, target.2, &slice)
        .expect("replace succeeds");
    assert_eq!(result, expect.node, "{slice}");
}

fn bad(
    target: (&Tagged, usize, usize),
    insert: Option<(&Tagged, usize, usize)>,
    expect: &ReplaceError,
) {
    let slice = insert.map_or_else(Slice::empty, |(source, from, to)| {
        source.node.slice(from, to).expect("valid slice range")
    });
    let err = target
        .0
        .node
        .replace(target.1, target.2, &slice)
        .expect_err("replace fails");
    assert_eq!(err, *expect);
}

#[test]
fn joins_on_delete() {
    let t = doc((p("one"), p("two")));
    let e = doc(p("onwo"));
    rpl((&t, 3, 7), None, &e);
}

#[test]
fn merges_matching_blocks() {
    let t = doc((p("one"), p("two")));
    let i = doc((p("xxxx"), p("yyyy")));
    let slice = i.node.slice(3, 9).unwrap();
    assert_eq!(slice.open_start(), 1);
    assert_eq!(slice.open_end(), 1);
    assert_eq!(slice.size(), 6);
    let e = doc((p("onxx"), p("yywo")));
    rpl((&t, 3, 7), Some((&i, 3, 9)), &e);
}

#[test]
fn merges_when_adding_text() {
    let t = doc((p("one"), p("two")));
    let i = doc(p("H"));
    let e = doc(p("onHwo"));
    rpl((&t, 3, 7), Some((&i, 1, 2)), &e);
}

#[test]
fn can_insert_text() {
    let t = doc((p("before"), p("one"), p("after")));
    let i = doc(p("H"));
    let e = doc((p("before"), p("onHe"), p("after")));
    rpl((&t, 11, 11), Some((&i, 1, 2)), &e);
}

#[test]
fn keeps_the_first_node_type_when_merging() {
    let t = doc((p("one"), p("two")));
    let i = doc(h1("H"));
    let e = doc(p("onHwo"));
    rpl((&t, 3, 7), Some((&i, 1, 2)), &e);
}

#[test]
fn can_merge_a_nested_node() {
    let t = doc(blockquote(blockquote((p("one"), p("two")))));
    let i = doc(p("H"));
    let e = doc(blockquote(blockquote(p("onHwo"))));
    rpl((&t, 5, 9), Some((&i, 1, 2)), &e);
}

#[test]
fn can_replace_within_a_block() {
    let t = doc(blockquote(p("abcd")));
    let i = doc(p("xyz"));
    let e = doc(blockquote(p("ayd")));
    rpl((&t, 3, 5), Some((&i, 2, 3)), &e);
}

#[test]
fn can_insert_a_lopsided_slice() {
    let t = doc(blockquote(blockquote((p("one"), p("two"), p("three")))));
    let i = doc(blockquote((p("aaaa"), p("bb"), p("cc"), p("dd"))));
    let e = doc(blockquote(blockquote((p("onaa"), p("bb"), p("cc"), p("three")))));
    rpl((&t, 5, 12), Some((&i, 4, 15)), &e);
}

#[test]
fn can_insert_a_deep_lopsided_slice() {
    let t = doc(blockquote((
        blockquote((p("one"), p("two"), p("three"))),
        p("x"),
    )));
    let i = doc((blockquote((p("aaaa"), p("bb"), p("cc"))), p("dd")));
    let e = doc(blockquote((
        blockquote((p("onaa"), p("bb"), p("cc"))),
        p("x"),
    )));
    rpl((&t, 5, 20), Some((&i, 4, 16)), &e);
}

#[test]
fn can_merge_multiple_levels() {
    let t = doc((
        blockquote(blockquote(p("hello"))),
        blockquote(blockquote(p("a"))),
    ));
    let e = doc(blockquote(blockquote(p("hella"))));
    rpl((&t, 7, 14), None, &e);
}

#[test]
fn can_merge_multiple_levels_while_inserting() {
    let t = doc((
        blockquote(blockquote(p("hello"))),
        blockquote(blockquote(p("a"))),
    ));
    let i = doc(p("i"));
    let e = doc(blockquote(blockquote(p("hellia"))));
    rpl((&t, 7, 14), Some((&i, 1, 2)), &e);
}

#[test]
fn can_insert_a_split() {
    let t = doc(p("foobar"));
    let i = doc((p("x"), p("y")));
    let e = doc((p("foox"), p("ybar")));
    rpl((&t, 4, 4), Some((&i, 1, 5)), &e);
}

#[test]
fn can_insert_a_deep_split() {
    let t = doc(blockquote(p("fooxbar")));
    let i = doc((blockquote(p("x")), blockquote(p("y"))));
    let e = doc((blockquote(p("foox")), blockquote(p("ybar"))));
    rpl((&t, 5, 6), Some((&i, 2, 8)), &e);
}

#[test]
fn can_add_a_split_one_level_up() {
    let t = doc(blockquote((p("foou"), p("vbar"))));
    let i = doc((blockquote(p("x")), blockquote(p("y"))));
    let e = doc((blockquote(p("foox")), blockquote(p("ybar"))));
    rpl((&t, 5, 9), Some((&i, 2, 8)), &e);
}

#[test]
fn keeps_the_node_type_of_the_left_node() {
    let t = doc(h1("foobar"));
    let i = doc(p("foobaz"));
    let e = doc(h1("foobaz"));
    rpl((&t, 4, 8), Some((&i, 4, 8)), &e);
}

#[test]
fn keeps_the_node_type_even_when_empty() {
    let t = doc(h1("bar"));
    let i = doc(p("foobaz"));
    let e = doc(h1("baz"));
    rpl((&t, 1, 5), Some((&i, 4, 8)), &e);
}

#[test]
fn doesnt_allow_the_left_side_to_be_too_deep() {
    let t = doc(p(()));
    let i = doc(blockquote(p(())));
    bad((&t, 1, 1), Some((&i, 2, 4)), &ReplaceError::InsertTooDeep);
}

#[test]
fn doesnt_allow_a_depth_mismatch() {
    let t = doc(p(()));
    let i = doc(p(()));
    bad((&t, 1, 1), Some((&i, 0, 1)), &ReplaceError::InconsistentOpenDepths);
}

#[test]
fn rejects_a_bad_fit() {
    let t = doc(());
    let i = doc(p("foo"));
    bad(
        (&t, 0, 0),
        Some((&i, 1, 4)),
        &ReplaceError::InvalidContent("doc".to_owned()),
    );
}

#[test]
fn rejects_unjoinable_content() {
    let t = doc(ul(li(p("a"))));
    let i = doc(p("foo"));
    bad(
        (&t, 6, 7),
        Some((&i, 4, 5)),
        &ReplaceError::CannotJoin {
            sub: "paragraph".to_owned(),
            main: "bullet_list".to_owned(),
        },
    );
}

#[test]
fn rejects_an_unjoinable_delete() {
    let t = doc((blockquote(p("a")), ul(li(p("b")))));
    bad(
        (&t, 4, 6),
        None,
        &ReplaceError::CannotJoin {
            sub: "bullet_list".to_owned(),
            main: "blockquote".to_owned(),
        },
    );
}

#[test]
fn checks_content_validity() {
    let t = doc(blockquote(p("hi")));
    let i = doc(blockquote("hi"));
    bad(
        (&t, 1, 6),
        Some((&i, 3, 4)),
        &ReplaceError::InvalidContent("blockquote".to_owned()),
    );
}

#[test]
fn replace_of_own_slice_is_identity() {
    let d = doc((p("hello"), blockquote((p("one"), p("two"))), p("end"))).node;
    for (from, to) in [(0, 0), (1, 4), (3, 14), (0, d.content().size()), (9, 16)] {
        let slice = d.slice(from, to).unwrap();
        let result = d.replace(from, to, &slice).expect("identity replace fits");
        assert_eq!(result, d, "replacing {from}..{to} with its own slice");
    }
}

#[test]
fn slices_expose_open_depths() {
    let d = doc((p("hello"), p("world"))).node;
    let slice = d.slice(2, 9).unwrap();
    assert_eq!(slice.open_start(), 1);
    assert_eq!(slice.open_end(), 1);
    assert_eq!(slice.content().child_count(), 2);
    assert_eq!(slice.size(), 7);

    let full: Node = d.slice(0, d.content().size()).unwrap().content().child(0).clone();
    assert_eq!(full.text_content(), "hello");
}

#[test]
fn max_open_descends_the_spines() {
    let d = doc(blockquote(p("ab"))).node;
    let slice = Slice::max_open(d.content().clone(), true);
    assert_eq!(slice.open_start(), 2);
    assert_eq!(slice.open_end(), 2);
}
