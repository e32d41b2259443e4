// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Integration tests for translation tables and parameter spaces

use neurobridge_parameters::*;
use proptest::prelude::*;

fn abc_table() -> TranslationTable {
    build_translations(&[
        TranslationSpec::identity("a", "A"),
        TranslationSpec::scaled("b", "B", 1000.0),
        TranslationSpec::expression("c", "C", "c + a", "C - A"),
    ])
    .unwrap()
}

fn scalar(ps: &ParameterSpace, name: &str) -> f64 {
    match ps.value(name).unwrap() {
        Value::Scalar(v) => v,
        other => panic!("expected scalar for {name}, got {other:?}"),
    }
}

#[test]
fn test_translate_and_back() {
    let table = abc_table();
    let mut logical = ParameterSpace::from_pairs([
        ("a", ParameterValue::Scalar(23.4)),
        ("b", ParameterValue::Scalar(34.5)),
        ("c", ParameterValue::Scalar(45.6)),
    ]);
    logical.set_shape(77);

    let mut native = table.translate(&logical, &Globals::new()).unwrap();
    assert_eq!(native.shape(), Some(77));
    native.evaluate(true).unwrap();
    assert_eq!(scalar(&native, "A"), 23.4);
    assert_eq!(scalar(&native, "B"), 34500.0);
    assert!((scalar(&native, "C") - 69.0).abs() < 1e-9);

    let mut back = table.reverse_translate(&native, &Globals::new()).unwrap();
    back.evaluate(true).unwrap();
    assert_eq!(back.names(), &["a".to_string(), "b".to_string(), "c".to_string()]);
    assert_eq!(scalar(&back, "a"), 23.4);
    assert_eq!(scalar(&back, "b"), 34.5);
    assert!((scalar(&back, "c") - 45.6).abs() < 1e-9);

    // input untouched
    assert_eq!(logical.get("b").and_then(ParameterValue::as_scalar), Some(34.5));
}

#[test]
fn test_inhomogeneous_translation_keeps_arrays() {
    let table = abc_table();
    let mut logical = ParameterSpace::from_pairs([
        ("a", ParameterValue::from(vec![1.0, 2.0, 3.0])),
        ("c", ParameterValue::Scalar(10.0)),
    ]);
    logical.set_shape(3);
    let mut native = table.translate(&logical, &Globals::new()).unwrap();
    assert!(!native.is_homogeneous("C"));
    native.evaluate(true).unwrap();
    assert_eq!(
        native.value("C").unwrap(),
        Value::Array(ndarray::Array1::from(vec![11.0, 12.0, 13.0]))
    );
}

#[test]
fn test_undefined_name_forward() {
    let table = abc_table();
    // 'c' needs 'a', which is missing
    let logical = ParameterSpace::from_pairs([("c", ParameterValue::Scalar(45.6))]);
    let err = table.translate(&logical, &Globals::new()).unwrap_err();
    assert!(matches!(err, TranslationError::UndefinedName { ref name, .. } if name == "a"));
}

#[test]
fn test_undefined_name_reverse() {
    let table = abc_table();
    let native = ParameterSpace::from_pairs([("C", ParameterValue::Scalar(69.0))]);
    let err = table.reverse_translate(&native, &Globals::new()).unwrap_err();
    assert!(matches!(err, TranslationError::UndefinedName { ref name, .. } if name == "A"));
}

#[test]
fn test_divide_by_zero_fails_on_evaluate() {
    let table = build_translations(&[
        TranslationSpec::identity("a", "A"),
        TranslationSpec::expression("b", "B", "b / 0", "B * 0"),
    ])
    .unwrap();
    let logical = ParameterSpace::from_pairs([
        ("a", ParameterValue::Scalar(1.0)),
        ("b", ParameterValue::Scalar(2.0)),
    ]);
    let mut native = table.translate(&logical, &Globals::new()).unwrap();
    let err = native.evaluate(true).unwrap_err();
    assert!(matches!(
        err,
        ParameterError::Translation(TranslationError::DivideByZero { .. })
    ));
}

#[test]
fn test_parameter_categories() {
    let table = abc_table();
    assert_eq!(table.simple_parameters(), vec!["a"]);
    assert_eq!(table.scaled_parameters(), vec!["b"]);
    assert_eq!(table.computed_parameters(), vec!["c"]);
    assert!(table.contains("b"));
    assert_eq!(table.native_name("c"), Some("C"));
}

proptest! {
    #[test]
    fn prop_scaled_round_trip(
        values in prop::collection::vec(-1.0e6f64..1.0e6, 1..40),
        factor in prop::sample::select(vec![0.001, 0.1, 10.0, 1000.0, 1.0e-9]),
        homogeneous in any::<bool>(),
    ) {
        let table = build_translations(&[TranslationSpec::scaled("w", "W", factor)]).unwrap();
        let mut logical = ParameterSpace::with_shape(values.len());
        if homogeneous {
            logical.insert("w", ParameterValue::Scalar(values[0]));
        } else {
            logical.insert("w", ParameterValue::from(values.clone()));
        }
        let native = table.translate(&logical, &Globals::new()).unwrap();
        prop_assert_eq!(native.is_homogeneous("W"), homogeneous);

        let mut back = table.reverse_translate(&native, &Globals::new()).unwrap();
        back.evaluate(false).unwrap();
        let restored = back.value("w").unwrap().broadcast(values.len());
        for (i, r) in restored.iter().enumerate() {
            let expected = if homogeneous { values[0] } else { values[i] };
            prop_assert!((r - expected).abs() <= 1e-9 * expected.abs().max(1.0));
        }
    }
}
