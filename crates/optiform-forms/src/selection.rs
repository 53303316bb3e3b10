//! Checklist selections.
//!
//! In memory a selection is an explicit `{option, state}` pair. On the
//! record it is stored the legacy way: the bare option text when simply
//! selected, or `"(<marker>) <option>"` when a state marker applies. A
//! single-value checklist stores one string, a multi-value checklist a list
//! of strings. Both shapes are accepted when reading.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use optiform_core::definition::Definition;

/// State of a selected option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SelectionState {
    /// Selected without a marker.
    Selected,
    /// `(-)`: finding absent.
    Absent,
    /// `(?)`: uncertain.
    Uncertain,
    /// `(+)`: finding present.
    Present,
}

impl SelectionState {
    const MARKED: [SelectionState; 3] = [Self::Absent, Self::Uncertain, Self::Present];

    pub fn marker(self) -> Option<char> {
        match self {
            Self::Selected => None,
            Self::Absent => Some('-'),
            Self::Uncertain => Some('?'),
            Self::Present => Some('+'),
        }
    }

    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            '-' | '\u{2212}' => Some(Self::Absent),
            '?' => Some(Self::Uncertain),
            '+' => Some(Self::Present),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Selection {
    pub option: String,
    pub state: SelectionState,
}

impl Selection {
    pub fn selected(option: impl Into<String>) -> Self {
        Self {
            option: option.into(),
            state: SelectionState::Selected,
        }
    }

    /// Parse a stored string. Anything that is not `"(x) text"` with a known
    /// marker is a plain selection of the whole text.
    pub fn decode(text: &str) -> Self {
        let mut chars = text.chars();
        if let (Some('('), Some(marker), Some(')'), Some(' ')) =
            (chars.next(), chars.next(), chars.next(), chars.next())
            && let Some(state) = SelectionState::from_marker(marker)
        {
            return Self {
                option: chars.as_str().to_string(),
                state,
            };
        }
        Self::selected(text)
    }

    pub fn encode(&self) -> String {
        match self.state.marker() {
            Some(marker) => format!("({marker}) {}", self.option),
            None => self.option.clone(),
        }
    }
}

/// The marked states a field cycles through, in cycle order. Empty when the
/// field has no state vocabulary.
///
/// A vocabulary whose entries are markers (`-`, `(?)`, ...) limits the cycle
/// to those markers. Any other list enables the full cycle.
pub fn enabled_states(definition: &Definition) -> Vec<SelectionState> {
    let Some(vocabulary) = definition.state_vocabulary() else {
        return Vec::new();
    };
    let recognised: Vec<SelectionState> = SelectionState::MARKED
        .into_iter()
        .filter(|state| {
            vocabulary
                .iter()
                .any(|entry| vocabulary_marker(entry) == Some(*state))
        })
        .collect();
    if recognised.is_empty() {
        SelectionState::MARKED.to_vec()
    } else {
        recognised
    }
}

/// The state a vocabulary entry names, bare (`+`) or bracketed (`(+)`).
fn vocabulary_marker(entry: &str) -> Option<SelectionState> {
    let entry = entry.trim();
    let entry = entry
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(entry)
        .trim();
    let mut chars = entry.chars();
    match (chars.next(), chars.next()) {
        (Some(marker), None) => SelectionState::from_marker(marker),
        _ => None,
    }
}

/// Decode whatever the record holds for a checklist.
pub fn selections(value: Option<&Value>) -> Vec<Selection> {
    match value {
        Some(Value::String(text)) if !text.is_empty() => vec![Selection::decode(text)],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(Selection::decode)
            .collect(),
        _ => Vec::new(),
    }
}

/// Encode selections in the shape the field stores.
pub fn encode(definition: &Definition, selections: &[Selection]) -> Option<Value> {
    if definition.multi_value() {
        return Some(Value::Array(
            selections.iter().map(|s| Value::String(s.encode())).collect(),
        ));
    }
    selections.first().map(|s| Value::String(s.encode()))
}

/// State of `option`, or `None` when it is not selected.
pub fn is_selected(value: Option<&Value>, option: &str) -> Option<SelectionState> {
    selections(value)
        .into_iter()
        .find(|selection| selection.option == option)
        .map(|selection| selection.state)
}

/// Toggle `option` and return the new stored value (`None` = absent).
///
/// With a state vocabulary, repeated toggles walk the option through
/// selected, each enabled marker in turn, and back to unselected. Without
/// one, toggling flips membership.
pub fn toggle(definition: &Definition, value: Option<&Value>, option: &str) -> Option<Value> {
    let mut current = selections(value);
    let states = enabled_states(definition);

    match current.iter().position(|selection| selection.option == option) {
        None => {
            if definition.multi_value() {
                current.push(Selection::selected(option));
            } else {
                current = vec![Selection::selected(option)];
            }
        }
        Some(index) => match next_state(&states, current[index].state) {
            Some(state) => current[index].state = state,
            None => {
                current.remove(index);
            }
        },
    }
    encode(definition, &current)
}

fn next_state(states: &[SelectionState], state: SelectionState) -> Option<SelectionState> {
    match state {
        SelectionState::Selected => states.first().copied(),
        marked => {
            let position = states.iter().position(|s| *s == marked)?;
            states.get(position + 1).copied()
        }
    }
}

/// Add a free-text entry as a selection.
pub fn add_free_text(definition: &Definition, value: Option<&Value>, text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return value.cloned();
    }
    let mut current = selections(value);
    if definition.multi_value() {
        if !current.iter().any(|selection| selection.option == text) {
            current.push(Selection::selected(text));
        }
    } else {
        current = vec![Selection::selected(text)];
    }
    encode(definition, &current)
}

/// Options to offer: the enumerated ones, then stored selections that are
/// not in the list.
pub fn display_options(definition: &Definition, value: Option<&Value>) -> Vec<String> {
    let mut options: Vec<String> = definition
        .options
        .as_ref()
        .map(|options| options.texts().to_vec())
        .unwrap_or_default();
    for selection in selections(value) {
        if !options.contains(&selection.option) {
            options.push(selection.option);
        }
    }
    options
}
