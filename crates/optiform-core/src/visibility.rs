//! Visibility predicates.
//!
//! A node's `visible` property is either a flag or a bracketed rule:
//! `[path]` (value present), `[!path]` (value absent) or `[path==value]`.
//! Paths starting with `visit.` read from the visit the record belongs to,
//! everything else is a dotted path into the record.

use serde_json::{Map, Value};

use crate::definition::{Definition, Visible};
use crate::record::{Record, is_empty, value_at_dotted};

/// Decides whether a node is currently shown for a record context.
pub trait Visibility {
    fn is_visible(&self, context_id: &str, definition: &Definition) -> bool;
}

/// Shows everything.
pub struct AlwaysVisible;

impl Visibility for AlwaysVisible {
    fn is_visible(&self, _context_id: &str, _definition: &Definition) -> bool {
        true
    }
}

/// Evaluates `visible` rules against one record and its visit.
pub struct RecordVisibility<'a> {
    record: &'a Record,
    visit: Option<&'a Map<String, Value>>,
}

impl<'a> RecordVisibility<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self {
            record,
            visit: None,
        }
    }

    pub fn with_visit(mut self, visit: &'a Map<String, Value>) -> Self {
        self.visit = Some(visit);
        self
    }

    fn lookup(&self, path: &str) -> Option<&'a Value> {
        if let Some(key) = path.strip_prefix("visit.") {
            return self.visit?.get(key);
        }
        value_at_dotted(self.record.as_map(), path)
    }
}

impl Visibility for RecordVisibility<'_> {
    fn is_visible(&self, _context_id: &str, definition: &Definition) -> bool {
        match &definition.visible {
            None => true,
            Some(Visible::Flag(flag)) => *flag,
            Some(Visible::Rule(rule)) => match VisibilityRule::parse(rule) {
                Some(rule) => rule.holds(|path| self.lookup(path)),
                None => true,
            },
        }
    }
}

/// A parsed bracketed rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityRule<'a> {
    Present(&'a str),
    Absent(&'a str),
    Equals { path: &'a str, value: &'a str },
}

impl<'a> VisibilityRule<'a> {
    /// `None` when `rule` is not bracketed; such rules never hide a node.
    pub fn parse(rule: &'a str) -> Option<Self> {
        let inner = rule.strip_prefix('[')?.strip_suffix(']')?;
        if let Some(path) = inner.strip_prefix('!') {
            return Some(Self::Absent(path));
        }
        if let Some((path, value)) = inner.split_once("==") {
            return Some(Self::Equals { path, value });
        }
        Some(Self::Present(inner))
    }

    pub fn holds<'v, F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<&'v Value>,
    {
        match self {
            Self::Present(path) => !is_empty(lookup(path)),
            Self::Absent(path) => is_empty(lookup(path)),
            Self::Equals { path, value } => match lookup(path) {
                Some(Value::String(text)) => text.as_str() == *value,
                Some(Value::Null) | None => false,
                Some(other) => other.to_string() == *value,
            },
        }
    }
}
