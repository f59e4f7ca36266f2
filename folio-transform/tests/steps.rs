use folio_model::{Fragment, Node, Slice};
use folio_test_builder::{doc, p, test_schema};
use folio_transform::{
    AddMarkStep, AddNodeMarkStep, AttrStep, DocAttrStep, RemoveMarkStep, RemoveNodeMarkStep,
    ReplaceAroundStep, ReplaceStep, Step,
};
use serde_json::json;

fn test_doc() -> Node {
    doc(p("foobar")).node
}

fn make_step(from: usize, to: usize, val: Option<&str>) -> Step {
    let schema = test_schema();
    match val {
        Some("+em") => AddMarkStep::new(from, to, schema.mark("em", None).unwrap()).into(),
        Some("-em") => RemoveMarkStep::new(from, to, schema.mark("em", None).unwrap()).into(),
        Some(text) => ReplaceStep::new(
            from,
            to,
            Slice::new(Fragment::from(schema.text(text, None)), 0, 0),
            false,
        )
        .into(),
        None => ReplaceStep::new(from, to, Slice::empty(), false).into(),
    }
}

fn yes(from1: usize, to1: usize, val1: Option<&str>, from2: usize, to2: usize, val2: Option<&str>) {
    let step1 = make_step(from1, to1, val1);
    let step2 = make_step(from2, to2, val2);
    let merged = step1.merge(&step2).expect("steps merge");
    let d = test_doc();
    let sequential = step2.apply(&step1.apply(&d).unwrap()).unwrap();
    assert_eq!(merged.apply(&d).unwrap(), sequential);
}

fn no(from1: usize, to1: usize, val1: Option<&str>, from2: usize, to2: usize, val2: Option<&str>) {
    let step1 = make_step(from1, to1, val1);
    let step2 = make_step(from2, to2, val2);
    assert!(step1.merge(&step2).is_none());
}

#[test]
fn merges_typing_and_deletion() {
    yes(2, 2, Some("a"), 3, 3, Some("b"));
    yes(2, 2, Some("a"), 2, 2, Some("b"));
    no(2, 2, Some("a"), 4, 4, Some("b"));
    no(3, 3, Some("a"), 2, 2, Some("b"));
    yes(3, 4, None, 2, 3, None);
    yes(2, 3, None, 2, 3, None);
    no(1, 2, None, 2, 3, None);
    yes(2, 3, None, 2, 2, Some("x"));
    yes(2, 2, Some("quux"), 6, 6, Some("baz"));
    yes(2, 2, Some("quux"), 2, 2, Some("baz"));
    yes(2, 5, None, 2, 4, None);
    yes(4, 6, None, 2, 4, None);
    yes(3, 4, Some("x"), 4, 5, Some("y"));
}

#[test]
fn merges_mark_steps() {
    yes(1, 2, Some("+em"), 2, 4, Some("+em"));
    yes(1, 3, Some("+em"), 2, 4, Some("+em"));
    no(1, 2, Some("+em"), 3, 4, Some("+em"));
    yes(1, 2, Some("-em"), 2, 4, Some("-em"));
    yes(1, 3, Some("-em"), 2, 4, Some("-em"));
    no(1, 2, Some("-em"), 3, 4, Some("-em"));
}

#[test]
fn refuses_to_merge_structural_steps() {
    let plain = ReplaceStep::new(2, 3, Slice::empty(), false);
    let structural = ReplaceStep::new(3, 4, Slice::empty(), true);
    assert!(Step::from(structural.clone())
        .merge(&plain.clone().into())
        .is_none());
    assert!(Step::from(plain).merge(&structural.into()).is_none());
}

#[test]
fn every_step_kind_round_trips_through_json() {
    let schema = test_schema();
    let em = schema.mark("em", None).unwrap();
    let slice = Slice::new(Fragment::from(schema.text("hi", None)), 0, 0);
    let steps: Vec<Step> = vec![
        ReplaceStep::new(1, 3, slice.clone(), false).into(),
        ReplaceStep::new(1, 1, Slice::empty(), true).into(),
        ReplaceAroundStep::new(0, 10, 1, 9, Slice::new(Fragment::from(p("x").node), 0, 0), 1, true)
            .into(),
        AddMarkStep::new(1, 4, em.clone()).into(),
        RemoveMarkStep::new(1, 4, em.clone()).into(),
        AddNodeMarkStep::new(0, em.clone()).into(),
        RemoveNodeMarkStep::new(0, em).into(),
        AttrStep::new(0, "level", json!(2)).into(),
        DocAttrStep::new("meta", json!("yes")).into(),
    ];
    for step in steps {
        let parsed = Step::from_json(&schema, &step.to_json()).expect("json parses");
        assert_eq!(parsed, step);
    }
}

#[test]
fn rejects_unknown_step_types() {
    let schema = test_schema();
    let err = Step::from_json(&schema, &json!({"stepType": "bogus"})).unwrap_err();
    assert!(matches!(
        err,
        folio_transform::StepJsonError::UnknownStepType(_)
    ));
    assert!(Step::from_json(&schema, &json!({})).is_err());
    assert!(Step::from_json(&schema, &json!({"stepType": "replace"})).is_err());
}

#[test]
fn inverts_each_step_kind() {
    let d = doc(p("hello there")).node;
    let steps: Vec<Step> = vec![
        make_step(3, 5, None),
        make_step(3, 3, Some("xyz")),
        make_step(2, 8, Some("+em")),
        AttrStep::new(0, "level", json!(2)).into(),
        DocAttrStep::new("meta", json!(1)).into(),
    ];
    for step in steps {
        let applied = step.apply(&d).unwrap();
        let inverted = step.invert(&d);
        assert_eq!(
            inverted.apply(&applied).unwrap(),
            d,
            "inverting {}",
            step.step_type()
        );
    }
}

#[test]
fn structural_replace_refuses_to_overwrite_content() {
    let d = doc((p("one"), p("two"))).node;
    let step = ReplaceStep::new(2, 8, Slice::empty(), true);
    assert!(Step::from(step).apply(&d).is_err());
    let boundary = ReplaceStep::new(5, 5, Slice::empty(), true);
    assert!(Step::from(boundary).apply(&d).is_ok());
}

#[test]
fn failed_steps_leave_a_transform_untouched() {
    let d = doc(p("ok")).node;
    let mut tr = folio_transform::Transform::new(d.clone());
    let bad = ReplaceStep::new(2, 100, Slice::empty(), false);
    assert!(tr.maybe_step(bad.into()).is_err());
    assert!(!tr.doc_changed());
    assert_eq!(tr.doc(), &d);
}
