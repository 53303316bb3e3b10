//! Card rendering: a compact, read-only text summary of an exam record.
//!
//! Cards are built from the resolved schema. Empty values, values equal to
//! the field's normal value and hidden nodes are left out.

pub mod card;
pub mod card_fields;
pub mod format;
pub mod line;

pub use card::{Card, CardContext, format_card};
