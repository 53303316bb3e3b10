//! Wire shape of exam definitions.
//!
//! These structs mirror the JSON the schema source delivers. A single
//! [`Definition`] describes both leaf fields and groups; which one it is
//! depends on the properties present. [`crate::schema`] resolves that once
//! into a tagged tree.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Type tag carried by refraction-like composite groups.
pub const REFRACTION_TYPE: &str = "SRx";

/// A field or group node as stored in the exam definition.
///
/// Flags are kept as `Option<bool>` so an explicit `false` survives a
/// round trip and can override an aliased definition. Read them through the
/// same-named methods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Definition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Child nodes. Present on groups and on column sub-groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<Definition>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Options>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi_value: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readonly: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,

    /// Dotted identifier of another field whose definition this one inherits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_field: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal_value: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,

    /// Background image of a drawing field. Marks binary payload fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted_label: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted_value: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_size: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_size: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,

    /// Text length ceiling on fields, repeat-count ceiling on repeating groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freestyle: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<Prefix>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,

    /// Rows of column keys, e.g. `[["OD", "OS"]]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Vec<String>>>,

    /// Fields copied from the front instance when a repeating item is added.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clone: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starable: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<Visible>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_fields: Option<Vec<Vec<String>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_column_label: Option<bool>,

    /// Pure label node, never carries a value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_label: Option<bool>,
}

/// Enumerated choices of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum Options {
    /// Inline option texts.
    List(Vec<String>),
    /// Name of a code table supplied by the host.
    CodeTable(String),
}

impl Options {
    /// The inline option texts. Code tables expand to nothing here.
    pub fn texts(&self) -> &[String] {
        match self {
            Options::List(options) => options,
            Options::CodeTable(_) => &[],
        }
    }
}

/// Either a sign/text decoration or the bracketed selection-state vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum Prefix {
    /// `["-", "?", "+"]` style state vocabulary for checklists.
    States(Vec<String>),
    /// `"+"` forces a sign on numbers; any other text is prepended.
    Text(String),
}

/// Visibility rule of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum Visible {
    Flag(bool),
    /// `"[path]"`, `"[!path]"` or `"[path==value]"`.
    Rule(String),
}

/// Root of an exam definition document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExamDefinition {
    /// Document version. Missing or 0 = pre-versioned document.
    #[serde(default)]
    pub schema_version: u32,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default)]
    pub fields: Vec<Definition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_fields: Option<Vec<Vec<String>>>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub starable: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub append_star_values: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub show_subtitles: bool,
}

impl Definition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn multi_value(&self) -> bool {
        self.multi_value.unwrap_or(false)
    }

    pub fn required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    pub fn readonly(&self) -> bool {
        self.readonly.unwrap_or(false)
    }

    pub fn optional(&self) -> bool {
        self.optional.unwrap_or(false)
    }

    pub fn highlighted_label(&self) -> bool {
        self.highlighted_label.unwrap_or(false)
    }

    pub fn highlighted_value(&self) -> bool {
        self.highlighted_value.unwrap_or(false)
    }

    pub fn freestyle(&self) -> bool {
        self.freestyle.unwrap_or(false)
    }

    pub fn starable(&self) -> bool {
        self.starable.unwrap_or(false)
    }

    pub fn show_column_label(&self) -> bool {
        self.show_column_label.unwrap_or(false)
    }

    pub fn is_label(&self) -> bool {
        self.is_label.unwrap_or(false)
    }

    /// Label if declared, otherwise the name.
    pub fn label_or_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn children(&self) -> &[Definition] {
        self.fields.as_deref().unwrap_or_default()
    }

    pub fn has_fields(&self) -> bool {
        self.fields.as_ref().is_some_and(|fields| !fields.is_empty())
    }

    /// The selection-state vocabulary, if this field declares one.
    pub fn state_vocabulary(&self) -> Option<&[String]> {
        match &self.prefix {
            Some(Prefix::States(states)) => Some(states),
            _ => None,
        }
    }
}
