//! Records and record paths.
//!
//! A record is a JSON object whose key named after the exam definition holds
//! the form: a mapping from group names to group values. All writes go
//! through [`apply_at`], addressed by a [`RecordPath`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CoreError;

/// An exam record as persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(CoreError::InvalidRecord),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The form stored under `root`, if it is a mapping.
    pub fn form(&self, root: &str) -> Option<&Map<String, Value>> {
        self.0.get(root)?.as_object()
    }

    /// The form stored under `root`, created (or replaced, when it is not a
    /// mapping) as an empty mapping first.
    pub fn form_mut(&mut self, root: &str) -> &mut Map<String, Value> {
        let slot = self
            .0
            .entry(root.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            debug!(root, "replacing non-object form with an empty mapping");
            *slot = Value::Object(Map::new());
        }
        match slot {
            Value::Object(map) => map,
            _ => unreachable!("slot was just made an object"),
        }
    }
}

/// Address of a slot inside a form: group, optional repeat index, optional
/// column key, optional field key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordPath {
    pub group: String,
    pub index: Option<usize>,
    pub column: Option<String>,
    pub field: Option<String>,
}

impl RecordPath {
    pub fn group(group: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            index: None,
            column: None,
            field: None,
        }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl std::fmt::Display for RecordPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.group)?;
        if let Some(index) = self.index {
            write!(f, "[{index}]")?;
        }
        if let Some(column) = &self.column {
            write!(f, ".{column}")?;
        }
        if let Some(field) = &self.field {
            write!(f, ".{field}")?;
        }
        Ok(())
    }
}

/// Parses `Group`, `Group[2]`, `Group.field` or `Group[2].Column.field`.
impl std::str::FromStr for RecordPath {
    type Err = CoreError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidPath(text.to_string());
        let mut segments = text.split('.');
        let (group, index) = split_index(segments.next().ok_or_else(invalid)?);
        let rest: Vec<&str> = segments.collect();
        if group.is_empty() || group.contains('[') || rest.iter().any(|segment| segment.is_empty()) {
            return Err(invalid());
        }
        let mut path = RecordPath::group(group);
        path.index = index;
        match rest.as_slice() {
            [] => {}
            [field] => path.field = Some(field.to_string()),
            [column, field] => {
                path.column = Some(column.to_string());
                path.field = Some(field.to_string());
            }
            _ => return Err(invalid()),
        }
        Ok(path)
    }
}

/// Replace the slot at `path` with `update(current)`.
///
/// `None` in and out means absent: returning `None` removes the key. Every
/// container on the way must already exist; a missing or mistyped container
/// makes the call a no-op and returns `false`.
pub fn apply_at<F>(form: &mut Map<String, Value>, path: &RecordPath, update: F) -> bool
where
    F: FnOnce(Option<Value>) -> Option<Value>,
{
    let mut keys: Vec<&str> = Vec::with_capacity(2);
    if let Some(column) = &path.column {
        keys.push(column);
    }
    if let Some(field) = &path.field {
        keys.push(field);
    }

    let Some(index) = path.index else {
        return apply_in_map(form, &path.group, &keys, update, path);
    };

    let Some(Value::Array(items)) = form.get_mut(&path.group) else {
        debug!(%path, "no repeating list at path");
        return false;
    };
    let Some(item) = items.get_mut(index) else {
        debug!(%path, len = items.len(), "repeat index out of range");
        return false;
    };
    match keys.split_first() {
        None => {
            let current = std::mem::take(item);
            *item = update(non_null(current)).unwrap_or_else(|| Value::Object(Map::new()));
            true
        }
        Some((first, rest)) => match item {
            Value::Object(map) => apply_in_map(map, first, rest, update, path),
            _ => {
                debug!(%path, "repeat item is not a mapping");
                false
            }
        },
    }
}

fn apply_in_map<F>(
    map: &mut Map<String, Value>,
    key: &str,
    rest: &[&str],
    update: F,
    path: &RecordPath,
) -> bool
where
    F: FnOnce(Option<Value>) -> Option<Value>,
{
    match rest.split_first() {
        None => {
            let current = map.remove(key).and_then(non_null);
            if let Some(value) = update(current) {
                map.insert(key.to_string(), value);
            }
            true
        }
        Some((next, rest)) => match map.get_mut(key) {
            Some(Value::Object(child)) => apply_in_map(child, next, rest, update, path),
            _ => {
                debug!(%path, key, "no mapping at path segment");
                false
            }
        },
    }
}

fn non_null(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        other => Some(other),
    }
}

/// Read the slot at `path`.
pub fn value_at<'a>(form: &'a Map<String, Value>, path: &RecordPath) -> Option<&'a Value> {
    let mut value = form.get(&path.group)?;
    if let Some(index) = path.index {
        value = value.as_array()?.get(index)?;
    }
    if let Some(column) = &path.column {
        value = value.as_object()?.get(column)?;
    }
    if let Some(field) = &path.field {
        value = value.as_object()?.get(field)?;
    }
    non_null_ref(value)
}

fn non_null_ref(value: &Value) -> Option<&Value> {
    (!value.is_null()).then_some(value)
}

/// Read a dotted path such as `Refraction[1].OD.sph`. A segment without an
/// index that lands on a list reads its first element.
pub fn value_at_dotted<'a>(form: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut current: Option<&Value> = None;
    for segment in path.split('.') {
        let (key, index) = split_index(segment);
        let container = match current {
            None => form.get(key)?,
            Some(value) => value.as_object()?.get(key)?,
        };
        let value = match (index, container) {
            (Some(i), Value::Array(items)) => items.get(i)?,
            (None, Value::Array(items)) if items.first().is_some_and(Value::is_object) => {
                items.first()?
            }
            (Some(_), _) => return None,
            (None, value) => value,
        };
        current = Some(value);
    }
    current.and_then(non_null_ref)
}

fn split_index(segment: &str) -> (&str, Option<usize>) {
    if let Some(open) = segment.find('[')
        && let Some(inner) = segment[open + 1..].strip_suffix(']')
        && let Ok(index) = inner.parse()
    {
        return (&segment[..open], Some(index));
    }
    (segment, None)
}

/// Deep emptiness: absent, null, blank text, or a list or mapping whose
/// elements are all empty. A blank repeating group `[{}]` is empty.
pub fn is_empty(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(Value::Array(items)) => items.iter().all(|v| is_empty(Some(v))),
        Some(Value::Object(map)) => map.values().all(|v| is_empty(Some(v))),
        Some(Value::Bool(_) | Value::Number(_)) => false,
    }
}
