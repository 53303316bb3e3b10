//! Card output: lines made of labelled spans.

use std::fmt;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum CardIcon {
    Drawing,
    Attachment,
}

/// Where a field's delimiter goes relative to its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DelimiterPosition {
    Before,
    After,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Delimiter {
    pub text: String,
    pub position: DelimiterPosition,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CardSpan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<Delimiter>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub highlighted_label: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub highlighted_value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<CardIcon>,
}

impl CardSpan {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn labelled(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            text: text.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for CardSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{label}: ")?;
        }
        if let Some(Delimiter { text, position: DelimiterPosition::Before }) = &self.delimiter {
            write!(f, "{text} ")?;
        }
        match self.icon {
            Some(CardIcon::Drawing) => f.write_str("[drawing]")?,
            Some(CardIcon::Attachment) => f.write_str("[attachment]")?,
            None => {}
        }
        f.write_str(&self.text)?;
        if let Some(Delimiter { text, position: DelimiterPosition::After }) = &self.delimiter {
            write!(f, " {text}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum CardLine {
    Subtitle { text: String },
    Row { spans: Vec<CardSpan> },
}

impl CardLine {
    pub fn subtitle(text: impl Into<String>) -> Self {
        CardLine::Subtitle { text: text.into() }
    }

    pub fn row(spans: Vec<CardSpan>) -> Self {
        CardLine::Row { spans }
    }
}

impl fmt::Display for CardLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CardLine::Subtitle { text } => f.write_str(text),
            CardLine::Row { spans } => {
                let joined = spans
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                let words: Vec<&str> = joined.split_whitespace().collect();
                f.write_str(&words.join(" "))
            }
        }
    }
}
