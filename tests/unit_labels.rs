// Unit tests for the label space.
//
// Canonical ordering, encode/decode round trips, and the typed errors for
// labels or indices outside the fitted space.

mod common;

use common::labels;
use medtag::labels::{LabelError, LabelSpace};

// ============================================================
// fit — sorted union
// ============================================================

#[test]
fn fit_is_sorted_union() {
    let sets = [labels(&["oncological", "cardiovascular"]), labels(&["neurological"])];
    let space = LabelSpace::fit(&sets);
    assert_eq!(space.classes(), ["cardiovascular", "neurological", "oncological"]);
}

#[test]
fn fit_ignores_input_order() {
    let a = [labels(&["b"]), labels(&["a", "c"])];
    let b = [labels(&["c", "a"]), labels(&["b"])];
    assert_eq!(LabelSpace::fit(&a), LabelSpace::fit(&b));
}

#[test]
fn fit_empty_input_gives_empty_space() {
    let sets: Vec<std::collections::BTreeSet<String>> = Vec::new();
    assert!(LabelSpace::fit(&sets).is_empty());
}

// ============================================================
// transform / inverse
// ============================================================

#[test]
fn transform_then_inverse_recovers_sets() {
    let sets = [
        labels(&["cardiovascular", "neurological"]),
        labels(&["oncological"]),
        labels(&["hepatorenal", "neurological"]),
    ];
    let space = LabelSpace::fit(&sets);
    let encoded = space.transform(&sets).unwrap();
    for (vector, original) in encoded.iter().zip(&sets) {
        assert_eq!(&space.inverse_vector(vector).unwrap(), original);
    }
}

#[test]
fn transform_marks_correct_columns() {
    let space = LabelSpace::from_classes(vec!["a".into(), "b".into(), "c".into()]).unwrap();
    assert_eq!(
        space.transform_one(&labels(&["c", "a"])).unwrap(),
        vec![true, false, true]
    );
}

#[test]
fn transform_unknown_label_is_error() {
    let space = LabelSpace::from_classes(vec!["a".into()]).unwrap();
    assert_eq!(
        space.transform_one(&labels(&["zzz"])).unwrap_err(),
        LabelError::UnknownLabel {
            label: "zzz".to_string()
        }
    );
}

#[test]
fn inverse_out_of_range_is_error() {
    let space = LabelSpace::from_classes(vec!["a".into(), "b".into()]).unwrap();
    assert_eq!(
        space.inverse([0, 5]).unwrap_err(),
        LabelError::IndexOutOfRange { index: 5, len: 2 }
    );
}

// ============================================================
// persistence
// ============================================================

#[test]
fn serializes_as_plain_list() {
    let space = LabelSpace::from_classes(vec!["a".into(), "b".into()]).unwrap();
    assert_eq!(serde_json::to_string(&space).unwrap(), r#"["a","b"]"#);
    let back: LabelSpace = serde_json::from_str(r#"["a","b"]"#).unwrap();
    assert_eq!(back, space);
}

#[test]
fn unsorted_persisted_list_is_rejected() {
    assert!(serde_json::from_str::<LabelSpace>(r#"["b","a"]"#).is_err());
    assert!(serde_json::from_str::<LabelSpace>(r#"["a","a"]"#).is_err());
}
