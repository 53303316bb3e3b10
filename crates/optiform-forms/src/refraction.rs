//! The refraction composite: a fixed-shape record holding one sub-record per
//! eye plus a few descriptive fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use optiform_core::record::{RecordPath, apply_at, is_empty, value_at};

/// Per-eye sub-records, in display order.
pub const EYES: [&str; 3] = ["od", "os", "ou"];

/// Eyes carried by the clipboard.
pub const CLIPBOARD_EYES: [&str; 2] = ["od", "os"];

/// Measurements carried by the clipboard.
pub const CLIPBOARD_FIELDS: [&str; 5] = ["sph", "cyl", "axis", "add", "prism"];

/// Descriptive fields dropped when a refraction is cleared.
const DESCRIPTIVE_FIELDS: [&str; 5] = ["lensType", "notes", "doctor", "currentWear", "since"];

pub fn new_refraction() -> Value {
    let mut value = Map::new();
    for eye in EYES {
        value.insert(eye.to_string(), Value::Object(Map::new()));
    }
    Value::Object(value)
}

/// Make sure every eye sub-record exists. Returns whether anything changed.
pub fn init_refraction(value: &mut Value) -> bool {
    if !value.is_object() {
        debug!("replacing non-object refraction");
        *value = new_refraction();
        return true;
    }
    let Value::Object(map) = value else {
        return false;
    };
    let mut changed = false;
    for eye in EYES {
        if !map.get(eye).is_some_and(Value::is_object) {
            map.insert(eye.to_string(), Value::Object(Map::new()));
            changed = true;
        }
    }
    changed
}

/// Reset the eyes to empty sub-records and drop the descriptive fields.
/// Any other key is kept.
pub fn clear_refraction(value: &mut Value) {
    if let Value::Object(map) = value {
        for key in DESCRIPTIVE_FIELDS {
            map.remove(key);
        }
        for eye in EYES {
            map.insert(eye.to_string(), Value::Object(Map::new()));
        }
    } else {
        *value = new_refraction();
    }
}

pub fn is_refraction_empty(value: &Value) -> bool {
    EYES.iter().all(|eye| is_empty(value.get(eye)))
}

/// Measurements copied out of one refraction, ready to paste into another.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefractionClipboard {
    pub od: Map<String, Value>,
    pub os: Map<String, Value>,
}

impl RefractionClipboard {
    pub fn copy(refraction: &Value) -> Self {
        Self {
            od: measurements(refraction.get("od")),
            os: measurements(refraction.get("os")),
        }
    }

    fn eye(&self, eye: &str) -> &Map<String, Value> {
        match eye {
            "od" => &self.od,
            _ => &self.os,
        }
    }

    /// Overwrite only the clipboard measurements of `refraction`. A
    /// measurement missing from the clipboard clears the target.
    pub fn paste_into(&self, refraction: &mut Value) {
        init_refraction(refraction);
        for eye in CLIPBOARD_EYES {
            let Some(Value::Object(target)) = refraction.get_mut(eye) else {
                continue;
            };
            let source = self.eye(eye);
            for field in CLIPBOARD_FIELDS {
                match source.get(field) {
                    Some(value) => target.insert(field.to_string(), value.clone()),
                    None => target.remove(field),
                };
            }
        }
    }
}

fn measurements(eye: Option<&Value>) -> Map<String, Value> {
    let mut copied = Map::new();
    if let Some(Value::Object(eye)) = eye {
        for field in CLIPBOARD_FIELDS {
            if let Some(value) = eye.get(field).filter(|v| !v.is_null()) {
                copied.insert(field.to_string(), value.clone());
            }
        }
    }
    copied
}

/// Copy the refraction at `path`. `None` when there is none.
pub fn copy_at(form: &Map<String, Value>, path: &RecordPath) -> Option<RefractionClipboard> {
    value_at(form, path).map(RefractionClipboard::copy)
}

/// Paste `clipboard` into the refraction at `path`.
pub fn paste_at(form: &mut Map<String, Value>, path: &RecordPath, clipboard: &RefractionClipboard) -> bool {
    apply_at(form, path, |current| {
        let mut refraction = current.unwrap_or_else(new_refraction);
        clipboard.paste_into(&mut refraction);
        Some(refraction)
    })
}

/// Copy the whole eye sub-records of the refraction at `from` into the one
/// at `to`, leaving the target's descriptive fields alone.
pub fn copy_eyes(form: &mut Map<String, Value>, from: &RecordPath, to: &RecordPath) -> bool {
    let Some(source) = value_at(form, from).cloned() else {
        debug!(%from, "no refraction to copy from");
        return false;
    };
    apply_at(form, to, |current| {
        let mut target = current.unwrap_or_else(new_refraction);
        init_refraction(&mut target);
        if let Value::Object(map) = &mut target {
            for eye in EYES {
                let eye_value = source
                    .get(eye)
                    .filter(|v| v.is_object())
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()));
                map.insert(eye.to_string(), eye_value);
            }
        }
        Some(target)
    })
}
