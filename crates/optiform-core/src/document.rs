//! Loading and saving exam definition documents.
//!
//! Documents carry a `schemaVersion`. Older documents are migrated on the
//! raw JSON before they are deserialized; saving always stamps the current
//! version.

use serde_json::Value;
use tracing::info;

use crate::definition::ExamDefinition;
use crate::error::CoreError;
use crate::schema::{DefinitionSource, ExamSchema};

/// Current document version. Each bump requires an entry in [`migrate`].
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Parse, migrate and resolve a definition document.
pub fn load_schema(contents: &str, source: &dyn DefinitionSource) -> Result<ExamSchema, CoreError> {
    let json: Value = serde_json::from_str(contents)?;
    load_schema_value(json, source)
}

pub fn load_schema_value(json: Value, source: &dyn DefinitionSource) -> Result<ExamSchema, CoreError> {
    let definition = load_definition(json)?;
    ExamSchema::resolve(definition, source)
}

/// Migrate and deserialize without resolving aliases.
pub fn load_definition(json: Value) -> Result<ExamDefinition, CoreError> {
    let on_disk_version = json
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .unwrap_or(0);
    let on_disk_version =
        u32::try_from(on_disk_version).map_err(|_| CoreError::UnsupportedSchemaVersion {
            found: on_disk_version,
            supported: CURRENT_SCHEMA_VERSION,
        })?;

    let migrated = migrate(json, on_disk_version)?;
    Ok(serde_json::from_value(migrated)?)
}

/// Serialize a definition, stamped with [`CURRENT_SCHEMA_VERSION`].
pub fn save_schema(definition: &ExamDefinition) -> Result<String, CoreError> {
    let mut stamped = definition.clone();
    stamped.schema_version = CURRENT_SCHEMA_VERSION;
    Ok(serde_json::to_string_pretty(&stamped)?)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_SCHEMA_VERSION`].
fn migrate(mut json: Value, from_version: u32) -> Result<Value, CoreError> {
    if from_version > CURRENT_SCHEMA_VERSION {
        return Err(CoreError::UnsupportedSchemaVersion {
            found: u64::from(from_version),
            supported: CURRENT_SCHEMA_VERSION,
        });
    }

    // v0 -> v1: `columns` was a flat list of keys, now a list of rows.
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| CoreError::InvalidDocument("document is not a JSON object".into()))?;
        let mut rewritten = 0usize;
        if let Some(Value::Array(fields)) = obj.get_mut("fields") {
            for field in fields {
                rewritten += nest_flat_columns(field);
            }
        }
        obj.insert("schemaVersion".to_string(), Value::Number(1.into()));
        info!(rewritten, "migrated exam definition v0 -> v1 (nested column rows)");
    }

    Ok(json)
}

fn nest_flat_columns(definition: &mut Value) -> usize {
    let Some(obj) = definition.as_object_mut() else {
        return 0;
    };
    let mut rewritten = 0;
    if let Some(Value::Array(columns)) = obj.get_mut("columns")
        && !columns.is_empty()
        && columns.iter().all(Value::is_string)
    {
        let row = std::mem::take(columns);
        columns.push(Value::Array(row));
        rewritten += 1;
    }
    if let Some(Value::Array(fields)) = obj.get_mut("fields") {
        for field in fields {
            rewritten += nest_flat_columns(field);
        }
    }
    rewritten
}
