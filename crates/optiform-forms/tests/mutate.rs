use optiform_core::definition::ExamDefinition;
use optiform_core::record::{Record, RecordPath};
use optiform_core::schema::{ExamSchema, NoAliases};
use optiform_forms::initialize::initialize;
use optiform_forms::mutate::{
    AddOutcome, add_item, clear_group, duplicate_item, remove_item, replace_group, set_field,
};
use serde_json::{Value, json};

fn schema() -> ExamSchema {
    let definition: ExamDefinition = serde_json::from_value(json!({
        "name": "Exam",
        "fields": [
            {
                "name": "Visit",
                "fields": [
                    { "name": "doctor", "readonly": true },
                    { "name": "reason" },
                    { "name": "sketch", "image": "eye.png", "fields": [ { "name": "caption" } ] }
                ]
            },
            {
                "name": "Pressure",
                "multiValue": true,
                "maxLength": 3,
                "clone": ["method"],
                "fields": [
                    { "name": "method" },
                    { "name": "time" },
                    { "name": "OD", "fields": [ { "name": "iop" } ] },
                    { "name": "OS", "fields": [ { "name": "iop" } ] }
                ]
            },
            {
                "name": "Lens",
                "multiValue": true,
                "optional": true,
                "fields": [ { "name": "brand" } ]
            },
            {
                "name": "Protected",
                "multiValue": true,
                "fields": [
                    { "name": "note" },
                    { "name": "Locked", "readonly": true, "fields": [ { "name": "value" } ] }
                ]
            },
            { "name": "Final", "type": "SRx", "fields": [] }
        ]
    }))
    .unwrap();
    ExamSchema::resolve(definition, &NoAliases).unwrap()
}

fn normalized(value: Value) -> (ExamSchema, Record) {
    let schema = schema();
    let mut record = Record::from_value(value).unwrap();
    initialize(&schema, &mut record);
    (schema, record)
}

fn form(record: &Record) -> &serde_json::Map<String, Value> {
    record.form("Exam").unwrap()
}

#[test]
fn set_field_through_index_and_column() {
    let (schema, mut record) = normalized(json!({}));
    let path = RecordPath::group("Pressure").at(0).column("OD").field("iop");

    assert!(set_field(&schema, &mut record, &path, json!(17)));
    assert_eq!(form(&record)["Pressure"][0]["OD"]["iop"], json!(17));

    assert!(set_field(&schema, &mut record, &path, Value::Null));
    assert_eq!(form(&record)["Pressure"][0]["OD"], json!({}));
}

#[test]
fn set_field_on_unknown_group_is_noop() {
    let (schema, mut record) = normalized(json!({}));
    let before = record.clone();

    assert!(!set_field(&schema, &mut record, &RecordPath::group("Nope").field("x"), json!(1)));
    assert_eq!(record, before);
}

#[test]
fn add_item_goes_to_the_front_and_clones_fields() {
    let (schema, mut record) = normalized(json!({
        "Exam": { "Pressure": [ { "method": "Goldmann", "time": "09:00", "OD": { "iop": 15 }, "OS": {} } ] }
    }));

    let outcome = add_item(&schema, &mut record, "Pressure", None, false, None);
    assert_eq!(outcome, AddOutcome::Added { index: 0 });

    let items = form(&record)["Pressure"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], json!({ "method": "Goldmann", "OD": {}, "OS": {} }));
    assert_eq!(items[1]["time"], json!("09:00"));
}

#[test]
fn explicit_new_item_skips_cloning() {
    let (schema, mut record) = normalized(json!({
        "Exam": { "Pressure": [ { "method": "Goldmann" } ] }
    }));

    add_item(&schema, &mut record, "Pressure", None, true, None);
    assert_eq!(form(&record)["Pressure"][0], json!({ "OD": {}, "OS": {} }));
}

#[test]
fn clone_source_overrides_front_item() {
    let (schema, mut record) = normalized(json!({
        "Exam": { "Pressure": [ { "method": "Goldmann" } ] }
    }));
    let source = json!({ "method": "iCare" });

    add_item(&schema, &mut record, "Pressure", None, false, Some(&source));
    assert_eq!(form(&record)["Pressure"][0]["method"], json!("iCare"));
}

#[test]
fn capacity_is_enforced_without_change() {
    let (schema, mut record) = normalized(json!({}));
    add_item(&schema, &mut record, "Pressure", None, true, None);
    add_item(&schema, &mut record, "Pressure", None, true, None);
    let full = record.clone();

    let outcome = add_item(&schema, &mut record, "Pressure", None, true, None);
    match outcome {
        AddOutcome::LimitReached(notice) => {
            assert_eq!(notice.group, "Pressure");
            assert_eq!(notice.limit, 3);
            assert!(notice.message.contains("pressure"));
        }
        other => panic!("expected limit notice, got {other:?}"),
    }
    assert_eq!(record, full);
    assert_eq!(form(&record)["Pressure"].as_array().map(Vec::len), Some(3));
}

#[test]
fn duplicate_copies_the_instance() {
    let (schema, mut record) = normalized(json!({
        "Exam": { "Pressure": [ { "method": "Goldmann", "time": "09:00", "OD": { "iop": 15 }, "OS": {} } ] }
    }));

    assert!(duplicate_item(&schema, &mut record, "Pressure", 0).is_added());
    let items = form(&record)["Pressure"].as_array().unwrap();
    assert_eq!(items[0], items[1]);
    assert_eq!(duplicate_item(&schema, &mut record, "Pressure", 9), AddOutcome::Ignored);
}

#[test]
fn clearing_sole_instance_keeps_one_blank_item() {
    let (schema, mut record) = normalized(json!({
        "Exam": { "Pressure": [ { "method": "Goldmann", "OD": { "iop": 15 }, "OS": { "iop": 16 } } ] }
    }));

    assert!(clear_group(&schema, &mut record, "Pressure", Some(0)));
    assert_eq!(form(&record)["Pressure"], json!([ { "OD": {}, "OS": {} } ]));
}

#[test]
fn clearing_sole_instance_of_optional_group_removes_it() {
    let (schema, mut record) = normalized(json!({
        "Exam": { "Lens": [ { "brand": "Acuvue" } ] }
    }));

    assert!(clear_group(&schema, &mut record, "Lens", Some(0)));
    assert!(form(&record).get("Lens").is_none());
}

#[test]
fn removing_one_of_several_instances_splices() {
    let (schema, mut record) = normalized(json!({
        "Exam": { "Pressure": [ { "method": "a" }, { "method": "b" }, { "method": "c" } ] }
    }));

    assert!(remove_item(&schema, &mut record, "Pressure", 1));
    let methods: Vec<&Value> = form(&record)["Pressure"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| &item["method"])
        .collect();
    assert_eq!(methods, vec![&json!("a"), &json!("c")]);

    assert!(!remove_item(&schema, &mut record, "Pressure", 7));
}

#[test]
fn clear_never_touches_readonly() {
    let (schema, mut record) = normalized(json!({
        "Exam": {
            "Visit": {
                "doctor": "Dr. Wu",
                "reason": "checkup",
                "sketch": { "caption": "left", "lines": [[0, 1]], "image": "upload-1" }
            },
            "Protected": [ { "note": "x", "Locked": { "value": 42 } } ]
        }
    }));

    assert!(clear_group(&schema, &mut record, "Visit", None));
    assert_eq!(form(&record)["Visit"], json!({ "doctor": "Dr. Wu", "sketch": {} }));

    assert!(clear_group(&schema, &mut record, "Protected", Some(0)));
    assert_eq!(form(&record)["Protected"], json!([ { "Locked": { "value": 42 } } ]));
}

#[test]
fn clearing_composite_resets_eyes() {
    let (schema, mut record) = normalized(json!({
        "Exam": { "Final": { "od": { "sph": -1.0 }, "os": {}, "ou": {}, "notes": "x", "expiry": "2027" } }
    }));

    assert!(clear_group(&schema, &mut record, "Final", None));
    assert_eq!(
        form(&record)["Final"],
        json!({ "od": {}, "os": {}, "ou": {}, "expiry": "2027" })
    );
}

#[test]
fn replace_group_and_instance() {
    let (schema, mut record) = normalized(json!({}));

    assert!(replace_group(&schema, &mut record, "Visit", None, json!({ "reason": "pain" })));
    assert_eq!(form(&record)["Visit"], json!({ "reason": "pain" }));

    assert!(replace_group(&schema, &mut record, "Pressure", Some(0), json!({ "method": "x" })));
    assert_eq!(form(&record)["Pressure"], json!([ { "method": "x" } ]));

    assert!(!replace_group(&schema, &mut record, "Pressure", Some(4), json!({})));
}
