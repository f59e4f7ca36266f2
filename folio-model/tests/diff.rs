use folio_test_builder::{blockquote, doc, em, h1, h2, p, strong, Tagged};

fn diff_start(a: &Tagged, b: &Tagged) -> Option<usize> {
    a.node.content().find_diff_start(b.node.content())
}

fn diff_end(a: &Tagged, b: &Tagged) -> Option<usize> {
    a.node.content().find_diff_end(b.node.content()).map(|d| d.a)
}

#[test]
fn finds_the_start_of_a_difference() {
    let cases: Vec<(Tagged, Tagged)> = vec![
        (
            doc((p(("a", em("b"))), p("hello"), blockquote(h1("bye")))),
            doc((p(("a", em("b"))), p("hello"), blockquote(h1("bye")))),
        ),
        (
            doc((p(("a", em("b"))), p("hello"), blockquote(h1("bye")), "<a>")),
            doc((p(("a", em("b"))), p("hello"), blockquote(h1("bye")), p("oops"))),
        ),
        (
            doc((
                p(("a", em("b"))),
                p("hello"),
                blockquote(h1("bye")),
                "<a>",
                p("oops"),
            )),
            doc((p(("a", em("b"))), p("hello"), blockquote(h1("bye")))),
        ),
        (doc(p(("a<a>", em("b")))), doc(p(("a", strong("b"))))),
        (doc(p(("foo<a>bar", em("b")))), doc(p(("foo", em("b"))))),
        (doc(p("foo<a>bar")), doc(p("foocar"))),
        (doc((p("a"), "<a>", p("b"))), doc((p("a"), h1("b")))),
        (doc(("<a>", p("b"))), doc(h1("b"))),
        (doc((p("a"), "<a>", h1("foo"))), doc((p("a"), h2("foo")))),
    ];
    for (a, b) in cases {
        assert_eq!(diff_start(&a, &b), a.tag.get("a").copied());
    }
}

#[test]
fn finds_the_end_of_a_difference() {
    let cases: Vec<(Tagged, Tagged)> = vec![
        (
            doc((p(("a", em("b"))), p("hello"), blockquote(h1("bye")))),
            doc((p(("a", em("b"))), p("hello"), blockquote(h1("bye")))),
        ),
        (
            doc(("<a>", p(("a", em("b"))), p("hello"), blockquote(h1("bye")))),
            doc((p("oops"), p(("a", em("b"))), p("hello"), blockquote(h1("bye")))),
        ),
        (
            doc((p("oops"), "<a>", p(("a", em("b"))), p("hello"), blockquote(h1("bye")))),
            doc((p(("a", em("b"))), p("hello"), blockquote(h1("bye")))),
        ),
        (doc(p(("a", em("b"), "<a>c"))), doc(p(("a", strong("b"), "c")))),
        (doc(p(("bar<a>foo", em("b")))), doc(p(("foo", em("b"))))),
        (doc(p("foob<a>ar")), doc(p("foocar"))),
        (doc((p("a"), "<a>", p("b"))), doc((h1("a"), p("b")))),
        (doc((p("b"), "<a>")), doc(h1("b"))),
        (doc(("<a>", p("hello"))), doc((p("hey"), p("hello")))),
    ];
    for (a, b) in cases {
        assert_eq!(diff_end(&a, &b), a.tag.get("a").copied());
    }
}
