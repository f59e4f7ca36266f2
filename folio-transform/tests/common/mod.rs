//! Shared checks for transform tests: every transform is verified to
//! produce the expected document, to invert back to its input, to survive a
//! step JSON round trip, and to map the marker positions correctly.

use folio_test_builder::Tagged;
use folio_transform::{Mappable, Mapping, Step, StepMap, Transform};

pub fn invert_transform(tr: &Transform) -> Transform {
    let mut out = Transform::new(tr.doc().clone());
    for (i, step) in tr.steps().iter().enumerate().rev() {
        out.step(step.invert(&tr.docs()[i]))
            .expect("inverted step applies");
    }
    out
}

fn check_step_json(tr: &Transform) {
    let schema = tr.doc().node_type().schema();
    let mut new_tr = Transform::new(tr.before().clone());
    for step in tr.steps() {
        let parsed = Step::from_json(&schema, &step.to_json()).expect("step json parses");
        assert_eq!(&parsed, step, "step json round trip");
        new_tr.step(parsed).expect("round-tripped step applies");
    }
    assert_eq!(new_tr.doc(), tr.doc());
}

fn check_position(mapping: &Mapping, pos: usize, new_pos: usize) {
    assert_eq!(mapping.map(pos, 1), new_pos, "mapping {pos}");
    let maps = mapping.maps();
    let mut remap = Mapping::from_maps(maps.iter().map(StepMap::invert).collect());
    for (i, map) in maps.iter().rev().enumerate() {
        remap.append_map(map.clone(), Some(maps.len() - 1 - i));
    }
    assert_eq!(remap.map(pos, 1), pos, "remapping {pos} through mirrors");
}

pub fn test_transform(tr: &Transform, before: &Tagged, expect: &Tagged) {
    assert_eq!(tr.doc(), &expect.node, "expected {}", expect.node);
    assert_eq!(
        invert_transform(tr).doc(),
        tr.before(),
        "inversion restores the input"
    );
    check_step_json(tr);
    for (tag, &pos) in &expect.tag {
        check_position(tr.mapping(), before.tag(tag), pos);
    }
}

pub fn tag_or(d: &Tagged, first: &str, fallback: &str) -> usize {
    d.tag
        .get(first)
        .copied()
        .unwrap_or_else(|| d.tag(fallback))
}
