//! Favorites: named snapshots of one group that can be merged back into any
//! record of the same exam.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use ts_rs::TS;
use uuid::Uuid;

use optiform_core::record::{Record, is_empty};
use optiform_core::schema::ExamSchema;

use crate::error::FormError;

/// How list values in a snapshot meet list values already in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum MergePolicy {
    /// Snapshot items are added after the existing ones.
    Append,
    /// Snapshot lists replace existing ones.
    Overwrite,
}

impl MergePolicy {
    pub fn for_schema(schema: &ExamSchema) -> Self {
        if schema.append_star_values {
            MergePolicy::Append
        } else {
            MergePolicy::Overwrite
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Favorite {
    pub id: Uuid,
    pub name: String,
    /// Name of the exam definition the snapshot was taken from.
    pub definition: String,
    /// `{ <group name>: <group value> }`
    #[ts(type = "Record<string, unknown>")]
    pub snapshot: Map<String, Value>,
    pub created_at: Timestamp,
}

impl Favorite {
    pub fn from_json(json: &str) -> Result<Self, FormError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, FormError> {
        Ok(serde_json::to_string(self)?)
    }
}

pub fn is_group_starable(schema: &ExamSchema, group: &str) -> bool {
    schema.starable || schema.group(group).is_some_and(|node| node.definition.starable())
}

/// Snapshot the current value of `group` under the name `name`.
pub fn capture_favorite(
    schema: &ExamSchema,
    record: &Record,
    group: &str,
    name: &str,
) -> Result<Favorite, FormError> {
    let node = schema
        .group(group)
        .ok_or_else(|| FormError::UnknownGroup(group.to_string()))?;
    if !is_group_starable(schema, node.name()) {
        return Err(FormError::NotStarable(node.name().to_string()));
    }
    let value = record
        .form(&schema.name)
        .and_then(|form| form.get(node.name()))
        .filter(|value| !is_empty(Some(*value)))
        .ok_or_else(|| FormError::NothingToCapture(node.name().to_string()))?;

    let mut snapshot = Map::new();
    snapshot.insert(node.name().to_string(), value.clone());

    debug!(group = %node.name(), favorite = name, "favorite captured");
    Ok(Favorite {
        id: Uuid::new_v4(),
        name: name.to_string(),
        definition: schema.name.clone(),
        snapshot,
        created_at: Timestamp::now(),
    })
}

/// Merge `favorite` into `record` with the schema's policy.
pub fn apply_favorite(schema: &ExamSchema, record: &mut Record, favorite: &Favorite) {
    if favorite.definition != schema.name {
        debug!(
            favorite = %favorite.name,
            definition = %favorite.definition,
            exam = %schema.name,
            "favorite taken from another exam; merging by group name"
        );
    }
    let form = record.form_mut(&schema.name);
    merge_into(form, &favorite.snapshot, MergePolicy::for_schema(schema));
}

/// Deep-merge `snapshot` into `destination`.
///
/// Absent or null keys take the snapshot value. Lists follow `policy`; an
/// empty destination list is simply replaced. Mappings merge recursively.
/// Anything else is overwritten.
pub fn merge_into(destination: &mut Map<String, Value>, snapshot: &Map<String, Value>, policy: MergePolicy) {
    for (key, incoming) in snapshot {
        if destination.get(key).is_none_or(Value::is_null) {
            destination.insert(key.clone(), incoming.clone());
            continue;
        }
        let Some(existing) = destination.get_mut(key) else {
            continue;
        };
        match (incoming, existing) {
            (Value::Array(items), existing) => match policy {
                MergePolicy::Overwrite => *existing = Value::Array(items.clone()),
                MergePolicy::Append if is_empty(Some(&*existing)) => {
                    *existing = Value::Array(items.clone());
                }
                MergePolicy::Append => match existing {
                    Value::Array(current) => current.extend(items.iter().cloned()),
                    _ => debug!(key = %key, "list snapshot on a non-list value ignored"),
                },
            },
            (Value::Object(incoming), Value::Object(existing)) => {
                merge_into(existing, incoming, policy);
            }
            (incoming, existing) => *existing = incoming.clone(),
        }
    }
}
