//! optiform-forms
//!
//! Editing rules over a resolved exam schema: record initialization, group
//! and field mutation, checklist selection encoding, favorites and the
//! refraction composite.

pub mod error;
pub mod favorites;
pub mod initialize;
pub mod mutate;
pub mod refraction;
pub mod selection;
