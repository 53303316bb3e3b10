use optiform_card::card::{CardContext, format_card};
use optiform_card::format::{format_diopter, format_field_value, refraction_summary};
use optiform_card::line::{CardIcon, CardLine, CardSpan};
use optiform_core::definition::{Definition, ExamDefinition};
use optiform_core::record::Record;
use optiform_core::schema::{ExamSchema, NoAliases};
use optiform_core::visibility::RecordVisibility;
use serde_json::{Value, json};

fn resolve(definition: Value) -> ExamSchema {
    let definition: ExamDefinition = serde_json::from_value(definition).unwrap();
    ExamSchema::resolve(definition, &NoAliases).unwrap()
}

fn record(value: Value) -> Record {
    Record::from_value(value).unwrap()
}

fn eye_schema() -> ExamSchema {
    resolve(json!({
        "name": "Exam",
        "fields": [
            {
                "name": "Eye",
                "fields": [
                    { "name": "OD", "fields": [ { "name": "sph", "delimiter": "/" } ] },
                    { "name": "OS", "fields": [ { "name": "sph", "delimiter": "/" } ] }
                ]
            }
        ]
    }))
}

#[test]
fn column_group_joins_eyes_with_delimiter() {
    let schema = eye_schema();
    let record = record(json!({
        "Exam": { "Eye": { "OD": { "sph": -1.25 }, "OS": { "sph": -1.00 } } }
    }));

    let card = format_card(&schema, &record, &CardContext::new("exam-1"));

    assert_eq!(card.title, "Exam");
    assert_eq!(card.text_lines(), vec!["-1.25 / -1.00"]);
}

#[test]
fn delimiter_leads_when_first_column_is_empty() {
    let schema = eye_schema();
    let record = record(json!({
        "Exam": { "Eye": { "OD": {}, "OS": { "sph": -1.00 } } }
    }));

    let card = format_card(&schema, &record, &CardContext::new("exam-1"));

    assert_eq!(card.text_lines(), vec!["/ -1.00"]);
}

#[test]
fn empty_record_has_title_only() {
    let schema = eye_schema();
    let record = record(json!({ "Exam": { "Eye": { "OD": {}, "OS": {} } } }));

    let card = format_card(&schema, &record, &CardContext::new("exam-1"));

    assert!(card.is_empty());
    assert_eq!(card.to_string(), "Exam");
}

fn history_schema() -> ExamSchema {
    resolve(json!({
        "name": "History",
        "label": "Medical history",
        "showSubtitles": true,
        "fields": [
            {
                "name": "General",
                "label": "General",
                "fields": [
                    { "name": "smoker", "label": "Smoker" },
                    { "name": "pain", "label": "Pain", "normalValue": "None" },
                    { "name": "notes", "label": "Notes" }
                ]
            },
            {
                "name": "Medication",
                "label": "Medication",
                "multiValue": true,
                "fields": [
                    { "name": "drug", "label": "Drug" },
                    { "name": "dose", "label": "Dose", "suffix": " mg" }
                ]
            },
            {
                "name": "Symptoms",
                "label": "Symptoms",
                "multiValue": true,
                "options": ["Itch", "Redness", "Blur"]
            }
        ]
    }))
}

#[test]
fn groups_render_in_schema_order_with_subtitles() {
    let schema = history_schema();
    let record = record(json!({
        "History": {
            "General": { "smoker": true, "pain": "None", "notes": "Allergic to dust" },
            "Medication": [
                { "drug": "Timolol", "dose": 5 },
                {},
                { "drug": "Latanoprost" }
            ],
            "Symptoms": ["Itch", "(?) Blur"]
        }
    }));

    let card = format_card(&schema, &record, &CardContext::new("exam-1"));

    assert_eq!(card.title, "Medical history");
    assert_eq!(
        card.text_lines(),
        vec![
            "General",
            "Smoker",
            "Notes: Allergic to dust",
            "Medication",
            "Drug: Timolol",
            "Dose: 5 mg",
            "Medication",
            "Drug: Latanoprost",
            "Symptoms: Itch, (?) Blur",
        ]
    );
    assert!(matches!(card.lines[0], CardLine::Subtitle { .. }));
}

#[test]
fn single_plain_group_has_no_subtitle() {
    let schema = resolve(json!({
        "name": "Note",
        "showSubtitles": true,
        "fields": [
            { "name": "Body", "label": "Body", "fields": [ { "name": "text", "label": "Text" } ] }
        ]
    }));
    let record = record(json!({ "Note": { "Body": { "text": "Follow up" } } }));

    let card = format_card(&schema, &record, &CardContext::new("exam-1"));

    assert_eq!(card.text_lines(), vec!["Text: Follow up"]);
}

#[test]
fn card_group_limits_rendering() {
    let schema = resolve(json!({
        "name": "History",
        "cardGroup": "Medication",
        "fields": [
            { "name": "General", "fields": [ { "name": "notes", "label": "Notes" } ] },
            { "name": "Medication", "multiValue": true, "fields": [ { "name": "drug", "label": "Drug" } ] }
        ]
    }));
    let record = record(json!({
        "History": {
            "General": { "notes": "hidden on card" },
            "Medication": [ { "drug": "Timolol" } ]
        }
    }));

    let card = format_card(&schema, &record, &CardContext::new("exam-1"));

    assert_eq!(card.text_lines(), vec!["Drug: Timolol"]);
}

#[test]
fn card_fields_expand_repeating_groups() {
    let schema = resolve(json!({
        "name": "Contacts",
        "cardFields": [
            ["Lens.brand", "Lens.power"],
            ["Wear:", "Fit.schedule"],
            ["Fit.comfort"]
        ],
        "fields": [
            {
                "name": "Lens",
                "multiValue": true,
                "fields": [
                    { "name": "brand", "label": "Brand" },
                    { "name": "power", "label": "Power", "prefix": "+", "decimals": 2 }
                ]
            },
            {
                "name": "Fit",
                "fields": [
                    { "name": "schedule", "label": "Schedule" },
                    { "name": "comfort", "label": "Comfort" }
                ]
            }
        ]
    }));
    let record = record(json!({
        "Contacts": {
            "Lens": [ { "brand": "Acuvue", "power": 1.5 }, { "brand": "Biofinity", "power": -2 } ],
            "Fit": { "comfort": "Good" }
        }
    }));

    let card = format_card(&schema, &record, &CardContext::new("exam-1"));

    assert_eq!(
        card.text_lines(),
        vec!["Acuvue +1.50", "Biofinity -2.00", "Comfort: Good"]
    );
}

#[test]
fn hidden_nodes_are_skipped() {
    let schema = resolve(json!({
        "name": "Exam",
        "fields": [
            {
                "name": "Pressure",
                "fields": [
                    { "name": "method", "label": "Method" },
                    { "name": "reason", "label": "Reason", "visible": "[Exam.Pressure.method==Goldmann]" },
                    { "name": "internal", "label": "Internal", "visible": false }
                ]
            }
        ]
    }));
    let record = record(json!({
        "Exam": { "Pressure": { "method": "iCare", "reason": "Routine", "internal": "x" } }
    }));
    let visibility = RecordVisibility::new(&record);
    let ctx = CardContext::new("exam-1").with_visibility(&visibility);

    let card = format_card(&schema, &record, &ctx);

    assert_eq!(card.text_lines(), vec!["Method: iCare"]);
}

#[test]
fn labels_come_from_the_label_provider() {
    let schema = history_schema();
    let record = record(json!({ "History": { "General": { "notes": "Dust" } } }));
    let translate = |definition: &Definition| definition.label.as_ref().map(|label| format!("{label}*"));
    let ctx = CardContext::new("exam-1").with_labels(&translate);

    let card = format_card(&schema, &record, &ctx);

    assert_eq!(card.text_lines(), vec!["General*", "Notes*: Dust"]);
}

#[test]
fn drawings_render_an_icon() {
    let schema = resolve(json!({
        "name": "Fundus",
        "fields": [
            {
                "name": "Retina",
                "label": "Retina",
                "fields": [
                    { "name": "sketch", "image": "eye.png" },
                    { "name": "scan", "image": "upload" }
                ]
            }
        ]
    }));
    let record = record(json!({
        "Fundus": { "Retina": { "sketch": "drawing-42", "scan": "upload-7" } }
    }));

    let card = format_card(&schema, &record, &CardContext::new("exam-1"));

    let icons: Vec<Option<CardIcon>> = card
        .lines
        .iter()
        .filter_map(|line| match line {
            CardLine::Row { spans } => spans.first().map(|span| span.icon),
            CardLine::Subtitle { .. } => None,
        })
        .collect();
    assert_eq!(icons, vec![Some(CardIcon::Drawing), Some(CardIcon::Attachment)]);
    assert_eq!(card.text_lines()[0], "Retina: [drawing]");
}

#[test]
fn refraction_groups_use_the_summary() {
    let schema = resolve(json!({
        "name": "Refraction",
        "fields": [ { "name": "Final", "label": "Final Rx", "type": "SRx", "fields": [] } ]
    }));
    let record = record(json!({
        "Refraction": {
            "Final": {
                "od": { "sph": -1.25, "cyl": -0.5, "axis": 90, "add": 2 },
                "os": { "sph": 0 },
                "ou": {}
            }
        }
    }));

    let card = format_card(&schema, &record, &CardContext::new("exam-1"));

    assert_eq!(card.text_lines(), vec!["OD: -1.25 -0.50 x90 Add +2.00", "OS: 0.00"]);
}

#[test]
fn field_values_format_by_definition() {
    let mut definition = Definition::new("iop");
    definition.decimals = Some(1);
    definition.suffix = Some(" mmHg".to_string());
    assert_eq!(format_field_value(&definition, Some(&json!(14)), None), "14.0 mmHg");
    assert_eq!(format_field_value(&definition, Some(&Value::Null), None), "");

    definition.normal_value = Some(json!(14));
    assert_eq!(format_field_value(&definition, Some(&json!(14)), None), "");

    let mut flag = Definition::new("dilated");
    assert_eq!(format_field_value(&flag, Some(&json!(true)), Some("Dilated")), "Dilated");
    assert_eq!(format_field_value(&flag, Some(&json!(false)), Some("Dilated")), "");
    flag.default_value = Some(json!(true));
    assert_eq!(format_field_value(&flag, None, None), "dilated");
}

#[test]
fn fractional_numbers_show_two_places_without_decimals() {
    let definition = Definition::new("sph");
    assert_eq!(format_field_value(&definition, Some(&json!(-1.0)), None), "-1.00");
    assert_eq!(format_field_value(&definition, Some(&json!(-1.25)), None), "-1.25");
    assert_eq!(format_field_value(&definition, Some(&json!(0.125)), None), "0.125");
    assert_eq!(format_field_value(&definition, Some(&json!(5)), None), "5");
}

#[test]
fn diopters_are_signed() {
    assert_eq!(format_diopter(&json!(1.25)).as_deref(), Some("+1.25"));
    assert_eq!(format_diopter(&json!(-0.5)).as_deref(), Some("-0.50"));
    assert_eq!(format_diopter(&json!(0)).as_deref(), Some("0.00"));
    assert_eq!(format_diopter(&json!("plano")).as_deref(), Some("plano"));
    assert_eq!(format_diopter(&json!("")), None);
}

#[test]
fn refraction_summary_skips_empty_eyes() {
    let lines = refraction_summary(&json!({ "od": {}, "os": { "prism": "2 BI" } }));

    assert_eq!(lines, vec![CardLine::row(vec![CardSpan::labelled("OS", "2 BI")])]);
}
