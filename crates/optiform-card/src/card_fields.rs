//! `cardFields` templates: rows of `Group.field` references and literal text.

use serde_json::{Map, Value};
use tracing::debug;

use optiform_core::record::value_at_dotted;
use optiform_core::schema::{ExamSchema, Node, NodeKind};

use crate::card::CardContext;
use crate::format::format_field_value;
use crate::line::{CardLine, CardSpan};

/// Expand template rows that reference a repeating group into one copy per
/// instance, with `Group.` rewritten to `Group[i].`.
///
/// All rows of a repeating group are emitted together, instance by instance,
/// where the group is first referenced. A group with no instances drops its
/// rows.
pub fn expand_card_fields(
    schema: &ExamSchema,
    form: &Map<String, Value>,
    card_fields: &[Vec<String>],
) -> Vec<Vec<String>> {
    let repeating: Vec<&Node> = schema
        .groups
        .iter()
        .filter(|group| matches!(group.kind, NodeKind::Group { repeating: true, .. }))
        .collect();
    if repeating.is_empty() {
        return card_fields.to_vec();
    }

    let mut expanded = Vec::new();
    let mut rendered: Vec<&str> = Vec::new();
    for row in card_fields {
        let Some(group) = row_group(row, &repeating) else {
            expanded.push(row.clone());
            continue;
        };
        if rendered.contains(&group) {
            continue;
        }
        rendered.push(group);

        let count = match form.get(group) {
            Some(Value::Array(items)) => items.len(),
            _ => 0,
        };
        let prefix = format!("{group}.");
        for index in 0..count {
            let indexed = format!("{group}[{index}].");
            for template in card_fields
                .iter()
                .filter(|template| row_group(template, &repeating) == Some(group))
            {
                expanded.push(
                    template
                        .iter()
                        .map(|entry| entry.replacen(&prefix, &indexed, 1))
                        .collect(),
                );
            }
        }
    }
    expanded
}

/// The repeating group a template row refers to, if any.
fn row_group<'a>(row: &[String], repeating: &[&'a Node]) -> Option<&'a str> {
    row.iter().find_map(|entry| {
        let (group, _) = entry.split_once('.')?;
        repeating
            .iter()
            .find(|node| node.name() == group)
            .map(|node| node.name())
    })
}

/// Render expanded template rows. Rows left with nothing but labels are
/// dropped.
pub fn render_card_rows(
    schema: &ExamSchema,
    form: &Map<String, Value>,
    rows: &[Vec<String>],
    ctx: &CardContext<'_>,
) -> Vec<CardLine> {
    rows.iter()
        .filter_map(|row| {
            let spans: Vec<CardSpan> = row
                .iter()
                .map(|entry| render_entry(schema, form, entry, row.len() == 1, ctx))
                .collect();
            let has_content = spans
                .iter()
                .any(|span| !span.to_string().trim().is_empty() && !span.text.trim().ends_with(':'));
            has_content.then(|| {
                CardLine::row(spans.into_iter().filter(|span| !span.text.is_empty()).collect())
            })
        })
        .collect()
}

fn render_entry(
    schema: &ExamSchema,
    form: &Map<String, Value>,
    entry: &str,
    single: bool,
    ctx: &CardContext<'_>,
) -> CardSpan {
    if !entry.contains('.') {
        return CardSpan::text(entry);
    }
    let Some(node) = schema.node_at(entry) else {
        debug!(entry, "card field not in schema");
        return CardSpan::default();
    };
    let definition = &node.definition;
    if !ctx.is_visible(definition) {
        return CardSpan::default();
    }
    let label = ctx.heading(definition);
    let text = format_field_value(definition, value_at_dotted(form, entry), Some(&label));
    if text.is_empty() {
        return CardSpan::default();
    }

    let mut span = if single && text != label {
        CardSpan::labelled(label, text)
    } else {
        CardSpan::text(text)
    };
    span.highlighted_label = definition.highlighted_label();
    span.highlighted_value = definition.highlighted_value();
    span
}
