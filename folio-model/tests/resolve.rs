use folio_model::Node;
use folio_test_builder::{blockquote, doc, em, p};

fn test_doc() -> Node {
    doc((p("ab"), blockquote(p((em("cd"), "ef"))))).node
}

const DOC: (usize, usize) = (0, 12);
const P1: (usize, usize) = (1, 3);
const BLK: (usize, usize) = (5, 11);
const P2: (usize, usize) = (6, 10);

// For each position in the test doc: the ancestor (start, end) pairs, the
// parent offset, and the text content of the nodes before and after the
// position (`None` for no node).
#[allow(clippy::type_complexity)]
fn expected() -> Vec<(Vec<(usize, usize)>, usize, Option<&'static str>, Option<&'static str>)> {
    vec![
        (vec![DOC], 0, None, Some("ab")),
        (vec![DOC, P1], 0, None, Some("ab")),
        (vec![DOC, P1], 1, Some("a"), Some("b")),
        (vec![DOC, P1], 2, Some("ab"), None),
        (vec![DOC], 4, Some("ab"), Some("cdef")),
        (vec![DOC, BLK], 0, None, Some("cdef")),
        (vec![DOC, BLK, P2], 0, None, Some("cd")),
        (vec![DOC, BLK, P2], 1, Some("c"), Some("d")),
        (vec![DOC, BLK, P2], 2, Some("cd"), Some("ef")),
        (vec![DOC, BLK, P2], 3, Some("e"), Some("f")),
        (vec![DOC, BLK, P2], 4, Some("ef"), None),
        (vec![DOC, BLK], 6, Some("cdef"), None),
        (vec![DOC], 12, Some("cdef"), None),
    ]
}

#[test]
fn resolves_every_position() {
    let d = test_doc();
    for (pos, (levels, parent_offset, before, after)) in expected().into_iter().enumerate() {
        let rp = d.resolve(pos).unwrap();
        assert_eq!(rp.pos(), pos);
        assert_eq!(rp.depth(), levels.len() - 1, "depth at {pos}");
        for (i, &(start, end)) in levels.iter().enumerate() {
            assert_eq!(rp.start(i), start, "start({i}) at {pos}");
            assert_eq!(rp.end(i), end, "end({i}) at {pos}");
            if i > 0 {
                assert_eq!(rp.before(i), start - 1, "before({i}) at {pos}");
                assert_eq!(rp.after(i), end + 1, "after({i}) at {pos}");
            }
        }
        assert_eq!(rp.parent_offset(), parent_offset, "parent offset at {pos}");
        assert_eq!(
            rp.node_before().map(|n| n.text_content()),
            before.map(ToOwned::to_owned),
            "node before {pos}"
        );
        assert_eq!(
            rp.node_after().map(|n| n.text_content()),
            after.map(ToOwned::to_owned),
            "node after {pos}"
        );
    }
}

#[test]
fn rejects_positions_out_of_range() {
    let d = test_doc();
    assert!(d.resolve(13).is_err());
    assert!(d.resolve(12).is_ok());
}

#[test]
fn renders_positions_as_paths() {
    let d = test_doc();
    assert_eq!(d.resolve(0).unwrap().to_string(), ":0");
    assert_eq!(d.resolve(1).unwrap().to_string(), "paragraph_0:0");
    assert_eq!(
        d.resolve(7).unwrap().to_string(),
        "blockquote_1/paragraph_0:1"
    );
}

#[test]
fn pos_at_index_walks_siblings() {
    let d = doc(blockquote((
        p("one"),
        blockquote((p(("two ", em("three"))), p("four"))),
    )))
    .node;
    let rp = d.resolve(12).unwrap();
    let depth = rp.depth();
    let cases: &[(usize, usize, usize)] = &[
        (0, depth, 8),
        (1, depth, 12),
        (2, depth, 17),
        (0, 2, 7),
        (1, 2, 18),
        (2, 2, 24),
        (0, 1, 1),
        (1, 1, 6),
        (2, 1, 25),
        (0, 0, 0),
        (1, 0, 26),
    ];
    for &(index, depth, pos) in cases {
        assert_eq!(rp.pos_at_index(index, depth), pos, "index {index} depth {depth}");
    }
}

#[test]
fn resolution_round_trips_across_the_document() {
    let d = test_doc();
    for pos in 0..=d.content().size() {
        let rp = d.resolve(pos).unwrap();
        assert_eq!(rp.pos(), pos);
        for depth in 0..=rp.depth() {
            assert!(rp.start(depth) <= pos && pos <= rp.end(depth));
            assert_eq!(
                rp.end(depth) - rp.start(depth),
                rp.node(depth).content().size()
            );
        }
    }
}
