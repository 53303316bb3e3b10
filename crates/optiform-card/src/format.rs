//! Value formatting for card text.

use serde_json::{Map, Value};

use optiform_core::definition::{Definition, Prefix};
use optiform_forms::refraction::EYES;

use crate::line::{CardLine, CardSpan};

/// Text for one field value, or `""` when nothing should be shown.
///
/// A missing value falls back to `defaultValue`. Values equal to
/// `normalValue` are suppressed. `true` renders as the field label.
pub fn format_field_value(definition: &Definition, value: Option<&Value>, label: Option<&str>) -> String {
    let value = match value {
        Some(value) => Some(value),
        None => definition.default_value.as_ref(),
    };
    let Some(value) = value else {
        return String::new();
    };
    if value.is_null() || value.as_str() == Some("") {
        return String::new();
    }
    if definition.normal_value.as_ref() == Some(value) {
        return String::new();
    }

    match value {
        Value::Bool(true) => label.unwrap_or(&definition.name).to_string(),
        Value::Bool(false) => String::new(),
        Value::Array(items) => items
            .iter()
            .map(|item| decorate(definition, item))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => decorate(definition, other),
    }
}

fn decorate(definition: &Definition, value: &Value) -> String {
    let text = format_value(definition, value);
    if text.is_empty() {
        return text;
    }
    let prefix = match &definition.prefix {
        Some(Prefix::Text(prefix)) if prefix != "+" && !is_option(definition, value) => prefix.as_str(),
        _ => "",
    };
    let suffix = definition.suffix.as_deref().unwrap_or("");
    format!("{prefix}{text}{suffix}")
}

fn is_option(definition: &Definition, value: &Value) -> bool {
    let (Some(options), Some(text)) = (&definition.options, value.as_str()) else {
        return false;
    };
    options.texts().iter().any(|option| option == text)
}

/// Numbers get `decimals` fixed places, and a forced sign under the `"+"` prefix.
/// Integers print as stored.
pub fn format_value(definition: &Definition, value: &Value) -> String {
    let signed = matches!(&definition.prefix, Some(Prefix::Text(prefix)) if prefix == "+");
    let text = match value {
        Value::Null => return String::new(),
        Value::String(text) => text.clone(),
        Value::Number(number) => match (definition.decimals, number.as_f64()) {
            (Some(decimals), Some(n)) => format!("{:.*}", decimals as usize, n),
            (None, Some(n)) if number.is_f64() => format_fraction(n),
            _ => number.to_string(),
        },
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    };
    if signed && !text.is_empty() && !text.starts_with('-') && !text.starts_with('+') {
        return format!("+{text}");
    }
    text
}

/// Fractional numbers keep their digits but show at least two places,
/// so `-1.0` reads `-1.00` and `0.125` stays `0.125`.
fn format_fraction(n: f64) -> String {
    let text = n.to_string();
    match text.split_once('.') {
        Some((_, fraction)) if fraction.len() >= 2 => text,
        _ => format!("{n:.2}"),
    }
}

/// Signed diopter text with two decimals, e.g. `+1.25`, `-0.50`, `0.00`.
pub fn format_diopter(value: &Value) -> Option<String> {
    let n = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(text) => match text.trim().parse::<f64>() {
            Ok(n) => n,
            Err(_) if !text.trim().is_empty() => return Some(text.trim().to_string()),
            Err(_) => return None,
        },
        _ => return None,
    };
    if n > 0.0 {
        Some(format!("+{n:.2}"))
    } else if n == 0.0 {
        Some("0.00".to_string())
    } else {
        Some(format!("{n:.2}"))
    }
}

/// One summary line per eye that has measurements.
pub fn refraction_summary(refraction: &Value) -> Vec<CardLine> {
    EYES.iter()
        .filter_map(|eye| {
            let measurements = refraction.get(eye)?.as_object()?;
            let text = eye_summary(measurements)?;
            Some(CardLine::row(vec![CardSpan::labelled(eye.to_uppercase(), text)]))
        })
        .collect()
}

fn eye_summary(eye: &Map<String, Value>) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(sph) = eye.get("sph").and_then(format_diopter) {
        parts.push(sph);
    }
    if let Some(cyl) = eye.get("cyl").and_then(format_diopter) {
        parts.push(cyl);
    }
    match eye.get("axis") {
        Some(Value::Number(axis)) => parts.push(format!("x{axis}")),
        Some(Value::String(axis)) if !axis.trim().is_empty() => parts.push(format!("x{}", axis.trim())),
        _ => {}
    }
    if let Some(add) = eye.get("add").and_then(format_diopter) {
        parts.push(format!("Add {add}"));
    }
    match eye.get("prism") {
        Some(Value::String(prism)) if !prism.trim().is_empty() => parts.push(prism.trim().to_string()),
        Some(Value::Number(prism)) => parts.push(format!("{prism}\u{0394}")),
        _ => {}
    }
    (!parts.is_empty()).then(|| parts.join(" "))
}
