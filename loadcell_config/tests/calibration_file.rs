use loadcell_config::{CalibrationFileError, PersistedCalibration};
use rstest::rstest;

#[test]
fn reads_record_written_by_previous_versions() {
    let text = r#"{
  "offset_a": -123456,
  "reference_unit_a": 21.5
}"#;
    let cal = PersistedCalibration::from_json(text, "a").unwrap();
    assert_eq!(cal.offset, -123456);
    assert!((cal.reference_unit - 21.5).abs() < f64::EPSILON);
}

#[test]
fn integer_reference_unit_is_accepted() {
    let cal = PersistedCalibration::from_json(r#"{"offset_a": 0, "reference_unit_a": 1}"#, "a")
        .unwrap();
    assert_eq!(cal.reference_unit, 1.0);
}

#[test]
fn written_record_is_keyed_by_channel() {
    let cal = PersistedCalibration {
        offset: 500,
        reference_unit: 2.0,
    };
    let text = cal.to_json("b").unwrap();
    assert!(text.contains("\"offset_b\": 500"));
    assert!(text.contains("\"reference_unit_b\": 2.0"));
    assert_eq!(PersistedCalibration::from_json(&text, "b").unwrap(), cal);
    assert!(matches!(
        PersistedCalibration::from_json(&text, "a"),
        Err(CalibrationFileError::MissingField(f)) if f == "offset_a"
    ));
}

#[test]
fn non_finite_reference_unit_cannot_be_written() {
    let cal = PersistedCalibration {
        offset: 0,
        reference_unit: f64::NAN,
    };
    assert!(cal.to_json("a").is_err());
}

#[rstest]
#[case("", "not valid JSON")]
#[case("{\"offset_a\": 1", "not valid JSON")]
#[case("[1, 2]", "JSON object")]
#[case("{\"reference_unit_a\": 2.0}", "missing field 'offset_a'")]
#[case("{\"offset_a\": 3}", "missing field 'reference_unit_a'")]
#[case("{\"offset_a\": \"3\", \"reference_unit_a\": 2.0}", "'offset_a' has the wrong type")]
#[case("{\"offset_a\": 3.5, \"reference_unit_a\": 2.0}", "'offset_a' has the wrong type")]
#[case("{\"offset_a\": 3, \"reference_unit_a\": null}", "'reference_unit_a' has the wrong type")]
fn malformed_records_are_rejected(#[case] text: &str, #[case] needle: &str) {
    let err = PersistedCalibration::from_json(text, "a").expect_err("should be rejected");
    assert!(format!("{err}").contains(needle), "error `{err}` lacks `{needle}`");
}
