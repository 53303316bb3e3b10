use optiform_core::definition::ExamDefinition;
use optiform_core::record::Record;
use optiform_core::schema::{ExamSchema, NoAliases};
use optiform_forms::error::FormError;
use optiform_forms::favorites::{
    Favorite, MergePolicy, apply_favorite, capture_favorite, is_group_starable, merge_into,
};
use optiform_forms::initialize::initialize;
use serde_json::{Map, Value, json};

fn map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("fixture is not an object"),
    }
}

fn plan_schema(append: bool) -> ExamSchema {
    let definition: ExamDefinition = serde_json::from_value(json!({
        "name": "Exam",
        "appendStarValues": append,
        "fields": [
            { "name": "Plan", "starable": true, "fields": [ { "name": "tags", "multiValue": true } ] },
            { "name": "History", "fields": [ { "name": "notes" } ] },
            { "name": "Meds", "starable": true, "multiValue": true, "fields": [ { "name": "drug" } ] }
        ]
    }))
    .unwrap();
    ExamSchema::resolve(definition, &NoAliases).unwrap()
}

#[test]
fn append_and_overwrite_policies() {
    let snapshot = map(json!({ "tags": ["a"] }));

    let mut appended = map(json!({ "tags": ["b"] }));
    merge_into(&mut appended, &snapshot, MergePolicy::Append);
    assert_eq!(appended["tags"], json!(["b", "a"]));

    let mut overwritten = map(json!({ "tags": ["b"] }));
    merge_into(&mut overwritten, &snapshot, MergePolicy::Overwrite);
    assert_eq!(overwritten["tags"], json!(["a"]));
}

#[test]
fn nested_merge_fills_missing_and_overwrites_scalars() {
    let mut destination = map(json!({
        "Plan": { "tags": ["b"], "note": "old", "keep": 1 },
        "Visits": [ {} ]
    }));
    let snapshot = map(json!({
        "Plan": { "tags": ["a"], "note": "new", "extra": true },
        "Visits": [ { "date": "2026-01-01" } ],
        "Fresh": { "x": 1 }
    }));

    merge_into(&mut destination, &snapshot, MergePolicy::Append);

    assert_eq!(
        Value::Object(destination),
        json!({
            "Plan": { "tags": ["b", "a"], "note": "new", "keep": 1, "extra": true },
            "Visits": [ { "date": "2026-01-01" } ],
            "Fresh": { "x": 1 }
        })
    );
}

#[test]
fn list_onto_non_list_is_ignored_when_appending() {
    let mut destination = map(json!({ "tags": "b" }));
    merge_into(&mut destination, &map(json!({ "tags": ["a"] })), MergePolicy::Append);
    assert_eq!(destination["tags"], json!("b"));
}

#[test]
fn capture_then_apply_into_another_record() {
    let schema = plan_schema(true);
    let source = Record::from_value(json!({ "Exam": { "Plan": { "tags": ["a"] } } })).unwrap();

    let favorite = capture_favorite(&schema, &source, "Plan", "Usual plan").unwrap();
    assert_eq!(favorite.definition, "Exam");
    assert_eq!(Value::Object(favorite.snapshot.clone()), json!({ "Plan": { "tags": ["a"] } }));

    let mut target = Record::from_value(json!({ "Exam": { "Plan": { "tags": ["b"] } } })).unwrap();
    apply_favorite(&schema, &mut target, &favorite);
    assert_eq!(target.form("Exam").unwrap()["Plan"], json!({ "tags": ["b", "a"] }));

    let overwrite = plan_schema(false);
    let mut target = Record::from_value(json!({ "Exam": { "Plan": { "tags": ["b"] } } })).unwrap();
    apply_favorite(&overwrite, &mut target, &favorite);
    assert_eq!(target.form("Exam").unwrap()["Plan"], json!({ "tags": ["a"] }));
}

#[test]
fn capture_rejects_unstarable_and_empty_groups() {
    let schema = plan_schema(false);
    let record = Record::from_value(json!({ "Exam": { "Plan": {}, "History": { "notes": "x" } } })).unwrap();

    assert!(is_group_starable(&schema, "Plan"));
    assert!(!is_group_starable(&schema, "History"));
    assert!(matches!(
        capture_favorite(&schema, &record, "History", "h"),
        Err(FormError::NotStarable(_))
    ));
    assert!(matches!(
        capture_favorite(&schema, &record, "Plan", "p"),
        Err(FormError::NothingToCapture(_))
    ));
    assert!(matches!(
        capture_favorite(&schema, &record, "Nope", "n"),
        Err(FormError::UnknownGroup(_))
    ));
}

#[test]
fn favorite_json_round_trip() {
    let schema = plan_schema(false);
    let record = Record::from_value(json!({ "Exam": { "Plan": { "tags": ["a"] } } })).unwrap();
    let favorite = capture_favorite(&schema, &record, "Plan", "Usual plan").unwrap();

    let json = favorite.to_json().unwrap();
    assert!(json.contains("\"createdAt\""));
    assert_eq!(Favorite::from_json(&json).unwrap(), favorite);
}

#[test]
fn appending_into_a_fresh_repeating_group_drops_the_blank_instance() {
    let schema = plan_schema(true);
    let mut record = Record::new();
    initialize(&schema, &mut record);
    assert_eq!(record.form("Exam").unwrap()["Meds"], json!([{}]));

    let source = Record::from_value(json!({ "Exam": { "Meds": [ { "drug": "X" } ] } })).unwrap();
    let favorite = capture_favorite(&schema, &source, "Meds", "Usual meds").unwrap();
    apply_favorite(&schema, &mut record, &favorite);

    assert_eq!(record.form("Exam").unwrap()["Meds"], json!([ { "drug": "X" } ]));
}

#[test]
fn blank_repeating_group_is_nothing_to_capture() {
    let schema = plan_schema(true);
    let mut record = Record::new();
    initialize(&schema, &mut record);

    assert!(matches!(
        capture_favorite(&schema, &record, "Meds", "m"),
        Err(FormError::NothingToCapture(_))
    ));
}
