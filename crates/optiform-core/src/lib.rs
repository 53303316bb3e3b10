//! optiform-core
//!
//! Exam definitions, the resolved schema tree, records and the path-addressed
//! update primitive. No editing policy lives here; this is the shared
//! vocabulary of the form, favorites and card crates.

pub mod definition;
pub mod document;
pub mod error;
pub mod labels;
pub mod record;
pub mod schema;
pub mod store;
pub mod visibility;
