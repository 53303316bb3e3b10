//! Record normalization.
//!
//! Brings a raw record into the shape its schema describes: every required
//! group present, repeating groups as non-empty lists, refraction eyes and
//! column sub-records in place. Repairs are silent apart from debug logs.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use optiform_core::record::Record;
use optiform_core::schema::{ExamSchema, Node, NodeKind};
use optiform_core::visibility::Visibility;

use crate::refraction::{init_refraction, new_refraction};

/// Normalize `record` in place and return the labels of optional groups that
/// are not present yet.
pub fn initialize(schema: &ExamSchema, record: &mut Record) -> Vec<String> {
    let form = record.form_mut(&schema.name);
    let mut addable = Vec::new();
    for group in &schema.groups {
        if let Some(label) = initialize_group(group, form) {
            addable.push(label);
        }
    }
    addable
}

/// Like [`initialize`], but leaves out optional groups the host hides.
pub fn initialize_visible(
    schema: &ExamSchema,
    record: &mut Record,
    context_id: &str,
    visibility: &dyn Visibility,
) -> Vec<String> {
    let addable = initialize(schema, record);
    addable
        .into_iter()
        .filter(|label| {
            schema
                .group_by_label(label)
                .is_none_or(|group| visibility.is_visible(context_id, &group.definition))
        })
        .collect()
}

/// Labels of optional groups currently absent from the record.
pub fn addable_groups(schema: &ExamSchema, record: &Record) -> Vec<String> {
    let form = record.form(&schema.name);
    schema
        .groups
        .iter()
        .filter(|group| group.is_optional() && group.kind != NodeKind::Checklist)
        .filter(|group| {
            form.and_then(|form| form.get(group.name()))
                .is_none_or(Value::is_null)
        })
        .map(|group| group.label_or_name().to_string())
        .collect()
}

/// Instantiate the optional group labelled (or named) `label` and return the
/// recomputed addable list. Unknown labels are ignored.
pub fn add_optional_group(schema: &ExamSchema, record: &mut Record, label: &str) -> Vec<String> {
    let Some(group) = schema
        .group_by_label(label)
        .or_else(|| schema.group(label))
    else {
        debug!(label, "no optional group with this label");
        return addable_groups(schema, record);
    };

    let form = record.form_mut(&schema.name);
    if form.get(group.name()).is_none_or(Value::is_null) {
        form.insert(group.name().to_string(), fresh_value(group));
        initialize_group(group, form);
        debug!(group = %group.name(), "optional group added");
    }
    addable_groups(schema, record)
}

/// A blank value for `group`: one instance, wrapped in a list when repeating.
pub fn fresh_value(group: &Node) -> Value {
    let instance = match group.kind {
        NodeKind::Composite { .. } => new_refraction(),
        _ => Value::Object(Map::new()),
    };
    if group.is_repeating() {
        Value::Array(vec![instance])
    } else {
        instance
    }
}

/// Returns the group's label when it is optional and absent.
fn initialize_group(group: &Node, form: &mut Map<String, Value>) -> Option<String> {
    match group.kind {
        NodeKind::Checklist | NodeKind::Scalar | NodeKind::Column => return None,
        NodeKind::Group { .. } | NodeKind::Composite { .. } => {}
    }

    let name = group.name();
    if form.get(name).is_none_or(Value::is_null) {
        if group.is_optional() {
            return Some(group.label_or_name().to_string());
        }
        let empty = if group.is_repeating() {
            Value::Array(Vec::new())
        } else {
            Value::Object(Map::new())
        };
        form.insert(name.to_string(), empty);
    }

    let value = form.get_mut(name)?;

    if group.is_repeating() {
        if !value.is_array() {
            debug!(group = %name, "wrapping single instance in a list");
            let single = std::mem::take(value);
            *value = Value::Array(vec![single]);
        }
        if let Value::Array(items) = value {
            if items.is_empty() {
                items.push(Value::Object(Map::new()));
            }
            for item in items.iter_mut() {
                initialize_instance(group, item);
            }
        }
    } else {
        initialize_instance(group, value);
    }
    None
}

fn initialize_instance(group: &Node, instance: &mut Value) {
    if group.composite().is_some() {
        if init_refraction(instance) {
            debug!(group = %group.name(), "refraction eyes created");
        }
        return;
    }
    if !instance.is_object() {
        debug!(group = %group.name(), "replacing non-object group instance");
        *instance = Value::Object(Map::new());
    }
    let Value::Object(map) = instance else {
        return;
    };
    for column in group.columns() {
        match map.get(column.name()) {
            None | Some(Value::Null) => {
                debug!(group = %group.name(), column = %column.name(), "column sub-record created");
                map.insert(column.name().to_string(), Value::Object(Map::new()));
            }
            Some(Value::Object(_)) => {}
            Some(_) => {
                warn!(group = %group.name(), column = %column.name(), "column holds a non-mapping value, kept as is");
            }
        }
    }
}
