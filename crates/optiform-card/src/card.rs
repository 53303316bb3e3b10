//! Group-by-group card rendering.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use ts_rs::TS;

use optiform_core::definition::Definition;
use optiform_core::labels::{DeclaredLabels, Labels};
use optiform_core::record::{Record, is_empty};
use optiform_core::schema::{ExamSchema, Node, NodeKind};
use optiform_core::visibility::{AlwaysVisible, Visibility};

use crate::card_fields::{expand_card_fields, render_card_rows};
use crate::format::{format_field_value, refraction_summary};
use crate::line::{CardIcon, CardLine, CardSpan, Delimiter, DelimiterPosition};

/// Column-row placeholder that renders nothing.
const SKIP_COLUMN: &str = ">>";

/// Collaborators used while rendering.
#[derive(Clone, Copy)]
pub struct CardContext<'a> {
    /// Record identity handed to the visibility predicate.
    pub context_id: &'a str,
    pub visibility: &'a dyn Visibility,
    pub labels: &'a dyn Labels,
}

impl<'a> CardContext<'a> {
    pub fn new(context_id: &'a str) -> Self {
        Self {
            context_id,
            visibility: &AlwaysVisible,
            labels: &DeclaredLabels,
        }
    }

    pub fn with_visibility(mut self, visibility: &'a dyn Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_labels(mut self, labels: &'a dyn Labels) -> Self {
        self.labels = labels;
        self
    }

    pub(crate) fn is_visible(&self, definition: &Definition) -> bool {
        self.visibility.is_visible(self.context_id, definition)
    }

    pub(crate) fn label(&self, definition: &Definition) -> Option<String> {
        self.labels.label(definition)
    }

    /// Heading text: the label, or the name when there is none.
    pub(crate) fn heading(&self, definition: &Definition) -> String {
        self.label(definition)
            .unwrap_or_else(|| definition.name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Card {
    pub title: String,
    pub lines: Vec<CardLine>,
}

impl Card {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Body lines as plain text.
    pub fn text_lines(&self) -> Vec<String> {
        self.lines.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)?;
        for line in &self.lines {
            write!(f, "\n{line}")?;
        }
        Ok(())
    }
}

/// Project a record into display lines.
///
/// `cardFields` templates win over group rendering. Otherwise only the
/// `cardGroup` is rendered when declared, else every group in order.
pub fn format_card(schema: &ExamSchema, record: &Record, ctx: &CardContext<'_>) -> Card {
    let title = schema.label.clone().unwrap_or_else(|| schema.name.clone());
    let Some(form) = record.form(&schema.name).filter(|form| !is_empty_form(form)) else {
        return Card {
            title,
            lines: Vec::new(),
        };
    };

    let lines = if let Some(card_fields) = &schema.card_fields {
        let rows = expand_card_fields(schema, form, card_fields);
        render_card_rows(schema, form, &rows, ctx)
    } else if let Some(card_group) = &schema.card_group {
        match schema.groups.iter().find(|group| group.name() == card_group) {
            Some(group) => render_group(schema, form, group, ctx),
            None => {
                debug!(card_group = %card_group, "card group not in schema");
                Vec::new()
            }
        }
    } else {
        schema
            .groups
            .iter()
            .flat_map(|group| render_group(schema, form, group, ctx))
            .collect()
    };

    Card { title, lines }
}

fn is_empty_form(form: &Map<String, Value>) -> bool {
    form.values().all(|value| is_empty(Some(value)))
}

fn render_group(schema: &ExamSchema, form: &Map<String, Value>, group: &Node, ctx: &CardContext<'_>) -> Vec<CardLine> {
    if !ctx.is_visible(&group.definition) {
        return Vec::new();
    }
    let value = form.get(group.name());

    match group.kind {
        NodeKind::Composite { .. } => {
            let instances: Vec<&Value> = match value {
                Some(Value::Array(items)) => items.iter().collect(),
                Some(value) => vec![value],
                None => Vec::new(),
            };
            instances
                .into_iter()
                .filter(|rx| !is_empty(Some(*rx)))
                .flat_map(|rx| with_subtitle(schema.show_subtitles, group, refraction_summary(rx), ctx))
                .collect()
        }
        NodeKind::Group { repeating: true, .. } => {
            let Some(Value::Array(items)) = value else {
                return Vec::new();
            };
            items
                .iter()
                .filter(|item| item.as_object().is_some_and(|map| !map.is_empty()))
                .flat_map(|item| with_subtitle(schema.show_subtitles, group, render_rows(group, item, ctx), ctx))
                .collect()
        }
        NodeKind::Checklist => {
            let label = ctx.heading(&group.definition);
            let text = format_field_value(&group.definition, value, Some(&label));
            if text.is_empty() {
                return Vec::new();
            }
            let mut span = CardSpan::labelled(label, text);
            span.highlighted_label = group.definition.highlighted_label();
            span.highlighted_value = group.definition.highlighted_value();
            vec![CardLine::row(vec![span])]
        }
        NodeKind::Group { repeating: false, .. } => {
            let Some(instance) = value.filter(|v| v.as_object().is_some_and(|map| !map.is_empty())) else {
                return Vec::new();
            };
            let single_group = schema.groups.len() == 1 && !schema.groups[0].is_repeating();
            let show_subtitles = schema.show_subtitles && !single_group;
            with_subtitle(show_subtitles, group, render_rows(group, instance, ctx), ctx)
        }
        NodeKind::Scalar | NodeKind::Column => Vec::new(),
    }
}

fn with_subtitle(show: bool, group: &Node, rows: Vec<CardLine>, ctx: &CardContext<'_>) -> Vec<CardLine> {
    if !show || rows.is_empty() {
        return rows;
    }
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(CardLine::subtitle(ctx.heading(&group.definition)));
    lines.extend(rows);
    lines
}

/// Column rows of `group`: the declared ones, or all column children as a
/// single row when none are declared.
fn column_rows(group: &Node) -> Vec<Vec<String>> {
    match &group.definition.columns {
        Some(rows) if !rows.is_empty() => rows.clone(),
        _ => {
            let names: Vec<String> = group.columns().map(|column| column.name().to_string()).collect();
            if names.is_empty() { Vec::new() } else { vec![names] }
        }
    }
}

fn render_rows(group: &Node, instance: &Value, ctx: &CardContext<'_>) -> Vec<CardLine> {
    let rows = column_rows(group);
    let mut lines = Vec::new();
    for child in &group.children {
        let position = rows
            .iter()
            .find_map(|row| row.iter().position(|column| column == child.name()));
        match position {
            Some(0) => {
                if let Some(row) = rows.iter().find(|row| row.first().is_some_and(|first| first == child.name())) {
                    lines.extend(render_columned_rows(group, child, row, instance, ctx));
                }
            }
            Some(_) => {}
            None if child.is_column() => {
                let row = [child.name().to_string()];
                lines.extend(render_columned_rows(group, child, &row, instance, ctx));
            }
            None => {
                if let Some(span) = render_field(group, None, child, true, instance, None, ctx) {
                    lines.push(CardLine::row(vec![span]));
                }
            }
        }
    }
    lines
}

fn render_columned_rows(
    group: &Node,
    first_column: &Node,
    columns: &[String],
    instance: &Value,
    ctx: &CardContext<'_>,
) -> Vec<CardLine> {
    (0..first_column.children.len())
        .filter_map(|row_index| render_columned_row(group, columns, row_index, instance, ctx))
        .collect()
}

/// One row across columns. The delimiter trails every column except the
/// last; once a column renders nothing, later delimiters lead instead.
fn render_columned_row(
    group: &Node,
    columns: &[String],
    row_index: usize,
    instance: &Value,
    ctx: &CardContext<'_>,
) -> Option<CardLine> {
    let mut show_label = true;
    let mut position = Some(DelimiterPosition::After);
    let mut previous_rendered = false;
    let mut spans = Vec::new();

    for (column_index, column) in columns.iter().enumerate() {
        if column == SKIP_COLUMN {
            continue;
        }
        let Some(column_node) = group.child(column) else {
            debug!(group = %group.name(), column = %column, "column not in schema");
            previous_rendered = false;
            continue;
        };
        if column_index == columns.len() - 1 {
            position = None;
        }
        if column_index != 0 && !previous_rendered {
            position = Some(DelimiterPosition::Before);
        }
        let span = column_node.children.get(row_index).and_then(|field| {
            render_field(group, Some(column_node), field, show_label, instance, position, ctx)
        });
        previous_rendered = span.is_some();
        if let Some(span) = span {
            show_label = false;
            spans.push(span);
        }
    }

    (!spans.is_empty()).then(|| CardLine::row(spans))
}

fn render_field(
    group: &Node,
    column: Option<&Node>,
    field: &Node,
    show_label: bool,
    instance: &Value,
    delimiter: Option<DelimiterPosition>,
    ctx: &CardContext<'_>,
) -> Option<CardSpan> {
    let definition = &field.definition;
    if definition.is_label() || !ctx.is_visible(definition) || is_empty(Some(instance)) {
        return None;
    }
    let value = match column {
        Some(column) => instance.get(column.name())?.get(field.name()),
        None => instance.get(field.name()),
    };

    if definition.image.is_some() {
        if is_empty(value) {
            return None;
        }
        let icon = match value.and_then(Value::as_str) {
            Some(reference) if reference.starts_with("upload-") => CardIcon::Attachment,
            _ => CardIcon::Drawing,
        };
        return Some(CardSpan {
            label: show_label.then(|| ctx.label(&group.definition)).flatten(),
            icon: Some(icon),
            ..CardSpan::default()
        });
    }

    let label = ctx.label(definition);
    let formatted = format_field_value(definition, value, label.as_deref());
    if formatted.is_empty() {
        return None;
    }

    let is_checkbox_text = value.and_then(Value::as_str) == Some(field.name());
    let show_label = show_label
        && !is_checkbox_text
        && label.as_deref().is_some_and(|label| !label.trim().is_empty() && label != formatted);

    let column_label = match column {
        Some(column) if group.definition.show_column_label() => ctx
            .label(&column.definition)
            .filter(|label| !label.is_empty())
            .map(|label| format!("{label}: "))
            .unwrap_or_default(),
        _ => String::new(),
    };

    Some(CardSpan {
        label: if show_label { label } else { None },
        text: format!("{column_label}{formatted}"),
        delimiter: definition.delimiter.clone().zip(delimiter).map(|(text, position)| Delimiter { text, position }),
        highlighted_label: definition.highlighted_label(),
        highlighted_value: definition.highlighted_value(),
        icon: None,
    })
}
