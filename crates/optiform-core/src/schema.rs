//! Resolved schema tree.
//!
//! [`ExamSchema::resolve`] turns a wire [`ExamDefinition`] into a tree of
//! [`Node`]s whose [`NodeKind`] is decided once, and whose `mappedField`
//! aliases are already merged into an effective definition. Downstream code
//! branches on the tag instead of probing for `options`/`fields`/`type`.

use std::collections::HashSet;

use tracing::warn;

use crate::definition::{Definition, ExamDefinition, REFRACTION_TYPE};
use crate::error::CoreError;

/// Supplies definitions referenced by `mappedField`, keyed by dotted identifier.
pub trait DefinitionSource {
    fn definition(&self, identifier: &str) -> Option<Definition>;
}

/// Source for schemas without external aliases.
pub struct NoAliases;

impl DefinitionSource for NoAliases {
    fn definition(&self, _identifier: &str) -> Option<Definition> {
        None
    }
}

impl<F> DefinitionSource for F
where
    F: Fn(&str) -> Option<Definition>,
{
    fn definition(&self, identifier: &str) -> Option<Definition> {
        self(identifier)
    }
}

/// Fixed-shape composite sub-records with their own lifecycle rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeKind {
    /// Paired eye measurements (`od`, `os`, `ou`).
    Refraction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Leaf value: free text, number, option picker or drawing.
    Scalar,
    /// Top-level selection list without child fields.
    Checklist,
    /// A record of fields. `columned` when some children are column sub-records.
    Group { repeating: bool, columned: bool },
    /// Sub-record of a group, holding one value per field row.
    Column,
    Composite { kind: CompositeKind, repeating: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Effective definition with aliases merged. `fields` is moved into `children`.
    pub definition: Definition,
    pub kind: NodeKind,
    pub children: Vec<Node>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn label_or_name(&self) -> &str {
        self.definition.label_or_name()
    }

    pub fn is_repeating(&self) -> bool {
        match self.kind {
            NodeKind::Group { repeating, .. } | NodeKind::Composite { repeating, .. } => repeating,
            _ => false,
        }
    }

    pub fn is_optional(&self) -> bool {
        self.definition.optional()
    }

    pub fn is_readonly(&self) -> bool {
        self.definition.readonly()
    }

    pub fn is_column(&self) -> bool {
        self.kind == NodeKind::Column
    }

    pub fn composite(&self) -> Option<CompositeKind> {
        match self.kind {
            NodeKind::Composite { kind, .. } => Some(kind),
            _ => None,
        }
    }

    pub fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|child| child.name() == name)
    }

    pub fn columns(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(|child| child.is_column())
    }
}

/// A fully resolved exam definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamSchema {
    pub name: String,
    pub id: Option<String>,
    pub label: Option<String>,
    pub groups: Vec<Node>,
    pub card_group: Option<String>,
    pub card_fields: Option<Vec<Vec<String>>>,
    pub starable: bool,
    pub append_star_values: bool,
    pub show_subtitles: bool,
}

impl ExamSchema {
    /// Resolve aliases and node kinds.
    ///
    /// Aliases are looked up in the exam's own tree first, then in `source`.
    /// An alias that resolves nowhere is logged and the local definition is
    /// used as is. A chain of aliases that loops is an error.
    pub fn resolve(
        definition: ExamDefinition,
        source: &dyn DefinitionSource,
    ) -> Result<Self, CoreError> {
        let resolver = Resolver {
            exam: &definition,
            source,
        };
        let groups = definition
            .fields
            .iter()
            .map(|group| resolver.node(group, 0))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: definition.name.clone(),
            id: definition.id.clone(),
            label: definition.label.clone(),
            groups,
            card_group: definition.card_group.clone(),
            card_fields: definition.card_fields.clone(),
            starable: definition.starable,
            append_star_values: definition.append_star_values,
            show_subtitles: definition.show_subtitles,
        })
    }

    pub fn label_or_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Top-level group by name. Falls back to a case-insensitive match.
    pub fn group(&self, name: &str) -> Option<&Node> {
        self.groups
            .iter()
            .find(|group| group.name() == name)
            .or_else(|| {
                self.groups
                    .iter()
                    .find(|group| group.name().eq_ignore_ascii_case(name))
            })
    }

    /// Top-level group by its label, or by name when it has no label.
    pub fn group_by_label(&self, label: &str) -> Option<&Node> {
        self.groups
            .iter()
            .find(|group| group.label_or_name() == label)
    }

    /// Node addressed by a dotted path such as `Refraction[1].OD.sph`.
    /// Repeat indices are ignored.
    pub fn node_at(&self, path: &str) -> Option<&Node> {
        let mut segments = path.split('.').map(strip_index);
        let mut node = self.group(segments.next()?)?;
        for segment in segments {
            node = node.child(segment)?;
        }
        Some(node)
    }
}

/// `Group[2]` -> `Group`.
pub fn strip_index(segment: &str) -> &str {
    match segment.find('[') {
        Some(pos) if segment.ends_with(']') => &segment[..pos],
        _ => segment,
    }
}

struct Resolver<'a> {
    exam: &'a ExamDefinition,
    source: &'a dyn DefinitionSource,
}

impl Resolver<'_> {
    fn node(&self, definition: &Definition, depth: usize) -> Result<Node, CoreError> {
        let mut effective = self.effective(definition)?;
        let fields = effective.fields.take().unwrap_or_default();
        let children = fields
            .iter()
            .map(|child| self.node(child, depth + 1))
            .collect::<Result<Vec<_>, _>>()?;

        let kind = classify(&effective, &children, depth);
        Ok(Node {
            definition: effective,
            kind,
            children,
        })
    }

    fn effective(&self, local: &Definition) -> Result<Definition, CoreError> {
        let Some(first) = local.mapped_field.clone() else {
            return Ok(local.clone());
        };

        let mut effective = local.clone();
        let mut visited = HashSet::new();
        let mut next = Some(first.clone());
        while let Some(identifier) = next {
            if !visited.insert(identifier.clone()) {
                return Err(CoreError::MappedFieldCycle(first));
            }
            let Some(base) = self.lookup(&identifier) else {
                warn!(field = %local.name, mapped_field = %identifier, "mapped field not found");
                break;
            };
            next = base.mapped_field.clone();
            effective = overlay(&base, &effective)?;
        }
        effective.mapped_field = Some(first);
        Ok(effective)
    }

    fn lookup(&self, identifier: &str) -> Option<Definition> {
        find_definition(&self.exam.fields, identifier)
            .cloned()
            .or_else(|| self.source.definition(identifier))
    }
}

fn classify(definition: &Definition, children: &[Node], depth: usize) -> NodeKind {
    if definition.type_tag.as_deref() == Some(REFRACTION_TYPE) {
        return NodeKind::Composite {
            kind: CompositeKind::Refraction,
            repeating: definition.multi_value(),
        };
    }
    if !children.is_empty() {
        if depth > 0 {
            return NodeKind::Column;
        }
        return NodeKind::Group {
            repeating: definition.multi_value(),
            columned: children.iter().any(|child| !child.children.is_empty()),
        };
    }
    if depth == 0 && definition.options.is_some() {
        return NodeKind::Checklist;
    }
    if depth == 0 && !definition.is_label() {
        // A top-level node without fields or options still holds a record.
        return NodeKind::Group {
            repeating: definition.multi_value(),
            columned: false,
        };
    }
    NodeKind::Scalar
}

/// Shallow merge: every property present on `local` wins over `base`.
fn overlay(base: &Definition, local: &Definition) -> Result<Definition, CoreError> {
    let serde_json::Value::Object(mut merged) = serde_json::to_value(base)? else {
        return Err(CoreError::InvalidDocument(format!(
            "definition '{}' is not an object",
            base.name
        )));
    };
    if let serde_json::Value::Object(overrides) = serde_json::to_value(local)? {
        merged.extend(overrides);
    }
    Ok(serde_json::from_value(serde_json::Value::Object(merged))?)
}

/// Walk `Group.Column.field` through a list of definitions.
pub fn find_definition<'a>(fields: &'a [Definition], identifier: &str) -> Option<&'a Definition> {
    let mut current = fields;
    let mut found = None;
    for segment in identifier.split('.').map(strip_index) {
        let definition = current.iter().find(|d| d.name == segment)?;
        current = definition.children();
        found = Some(definition);
    }
    found
}
