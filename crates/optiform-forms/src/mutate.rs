//! Group and field mutations.
//!
//! Every write goes through [`apply_at`]. Calls that name a group the schema
//! does not know, or a slot that does not exist, change nothing. The only
//! condition reported back to the user is a repeating group at capacity.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use ts_rs::TS;

use optiform_core::record::{Record, RecordPath, apply_at, is_empty, value_at};
use optiform_core::schema::{ExamSchema, Node, NodeKind};

use crate::refraction::{clear_refraction, new_refraction};

/// Informational message for the user. Not an error: the record is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Notice {
    pub group: String,
    pub limit: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The new item sits at `index` (always the front).
    Added { index: usize },
    LimitReached(Notice),
    /// Unknown group or missing source item.
    Ignored,
}

impl AddOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, AddOutcome::Added { .. })
    }
}

fn known_group<'a>(schema: &'a ExamSchema, group: &str) -> Option<&'a Node> {
    let node = schema.group(group);
    if node.is_none() {
        warn!(group, exam = %schema.name, "mutation on unknown group ignored");
    }
    node
}

/// Write `value` into the slot at `path`. `null` removes the key.
pub fn set_field(schema: &ExamSchema, record: &mut Record, path: &RecordPath, value: Value) -> bool {
    let Some(group) = known_group(schema, &path.group) else {
        return false;
    };
    let path = RecordPath {
        group: group.name().to_string(),
        ..path.clone()
    };
    let form = record.form_mut(&schema.name);
    apply_at(form, &path, |_| (!value.is_null()).then_some(value))
}

/// Replace a whole group value, or one instance of a repeating group.
pub fn replace_group(
    schema: &ExamSchema,
    record: &mut Record,
    group: &str,
    index: Option<usize>,
    value: Value,
) -> bool {
    let Some(node) = known_group(schema, group) else {
        return false;
    };
    let mut path = RecordPath::group(node.name());
    path.index = index;
    let form = record.form_mut(&schema.name);
    apply_at(form, &path, |_| (!value.is_null()).then_some(value))
}

/// Insert a new instance at the front of a repeating group.
///
/// The new instance is `seed`, else a fresh refraction for composites, else
/// an empty mapping; column sub-records are filled in. Unless `is_new`, the
/// group's `clone` fields are copied from `source` or from the current front
/// instance.
pub fn add_item(
    schema: &ExamSchema,
    record: &mut Record,
    group: &str,
    seed: Option<Value>,
    is_new: bool,
    source: Option<&Value>,
) -> AddOutcome {
    let Some(node) = known_group(schema, group) else {
        return AddOutcome::Ignored;
    };
    let name = node.name();
    let form = record.form_mut(&schema.name);

    let slot = form.entry(name.to_string()).or_insert(Value::Null);
    if !slot.is_array() {
        let existing = std::mem::take(slot);
        *slot = Value::Array(if existing.is_null() { Vec::new() } else { vec![existing] });
    }
    let Value::Array(items) = slot else {
        return AddOutcome::Ignored;
    };

    if let Some(max) = node.definition.max_length
        && items.len() >= max as usize
    {
        info!(group = %name, max, "repeating group at capacity");
        return AddOutcome::LimitReached(Notice {
            group: name.to_string(),
            limit: max,
            message: format!(
                "No more than {} {} can be added.",
                max.saturating_sub(1),
                name.to_lowercase()
            ),
        });
    }

    let mut item = seed.unwrap_or_else(|| match node.kind {
        NodeKind::Composite { .. } => new_refraction(),
        _ => Value::Object(Map::new()),
    });
    if let Value::Object(map) = &mut item {
        for column in node.columns() {
            if map.get(column.name()).is_none_or(Value::is_null) {
                map.insert(column.name().to_string(), Value::Object(Map::new()));
            }
        }
        if let Some(clone) = &node.definition.clone
            && !is_new
        {
            let from = source
                .filter(|source| !is_empty(Some(*source)))
                .or_else(|| items.first());
            if let Some(Value::Object(from)) = from {
                for field in clone {
                    if let Some(value) = from.get(field) {
                        map.insert(field.clone(), value.clone());
                    }
                }
            }
        }
    }

    items.insert(0, item);
    debug!(group = %name, len = items.len(), "repeating item added");
    AddOutcome::Added { index: 0 }
}

/// Add a deep copy of instance `index` at the front.
pub fn duplicate_item(schema: &ExamSchema, record: &mut Record, group: &str, index: usize) -> AddOutcome {
    let Some(node) = known_group(schema, group) else {
        return AddOutcome::Ignored;
    };
    let copy = record
        .form(&schema.name)
        .and_then(|form| value_at(form, &RecordPath::group(node.name()).at(index)))
        .cloned();
    match copy {
        Some(copy) => add_item(schema, record, group, Some(copy), true, None),
        None => {
            debug!(group, index, "no instance to duplicate");
            AddOutcome::Ignored
        }
    }
}

/// Remove instance `index`. The last remaining instance is cleared instead.
pub fn remove_item(schema: &ExamSchema, record: &mut Record, group: &str, index: usize) -> bool {
    clear_group(schema, record, group, Some(index))
}

/// Clear a group, or one instance of a repeating group.
///
/// Optional groups go back to absent when their last content is cleared.
/// Otherwise non-readonly fields are reset recursively, column sub-records
/// and refraction eyes are kept as empty mappings.
pub fn clear_group(schema: &ExamSchema, record: &mut Record, group: &str, index: Option<usize>) -> bool {
    let Some(node) = known_group(schema, group) else {
        return false;
    };
    let name = node.name();
    let form = record.form_mut(&schema.name);
    let path = RecordPath::group(name);

    let Some(index) = index else {
        if node.is_optional() {
            debug!(group = %name, "optional group removed");
            return apply_at(form, &path, |_| None);
        }
        return apply_at(form, &path, |current| match current {
            Some(Value::Array(items)) if node.is_repeating() => Some(Value::Array(
                items
                    .into_iter()
                    .map(|item| clear_instance(node, item))
                    .collect(),
            )),
            current => clear_top_level(node, current),
        });
    };

    let len = match form.get(name) {
        Some(Value::Array(items)) => items.len(),
        _ => {
            debug!(group = %name, index, "no repeating list to clear");
            return false;
        }
    };
    if index >= len {
        debug!(group = %name, index, len, "clear index out of range");
        return false;
    }
    if len == 1 {
        if node.is_optional() {
            debug!(group = %name, "optional group removed with its last instance");
            return apply_at(form, &path, |_| None);
        }
        return apply_at(form, &path.at(0), |current| {
            Some(clear_instance(node, current.unwrap_or_default()))
        });
    }
    apply_at(form, &path, |current| match current {
        Some(Value::Array(mut items)) => {
            items.remove(index);
            Some(Value::Array(items))
        }
        other => other,
    })
}

fn clear_top_level(node: &Node, value: Option<Value>) -> Option<Value> {
    match node.kind {
        NodeKind::Checklist | NodeKind::Scalar => clear_value(node, value),
        _ => value.map(|value| clear_instance(node, value)),
    }
}

/// One group instance cleared, never removed.
fn clear_instance(node: &Node, value: Value) -> Value {
    match clear_value(node, Some(value)) {
        Some(value) if !value.is_null() => value,
        _ => Value::Object(Map::new()),
    }
}

fn clear_value(node: &Node, value: Option<Value>) -> Option<Value> {
    let mut value = value?;
    if node.is_readonly() {
        return Some(value);
    }
    if node.children.is_empty() && node.composite().is_none() {
        return None;
    }
    if node.composite().is_some() {
        clear_refraction(&mut value);
    }
    if let Value::Object(map) = &mut value {
        if node.definition.image.is_some() {
            map.remove("lines");
            map.remove("image");
        }
        for child in &node.children {
            let current = map.remove(child.name());
            if let Some(cleared) = clear_value(child, current) {
                map.insert(child.name().to_string(), cleared);
            }
        }
    }
    Some(value)
}
