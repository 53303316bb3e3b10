//! Record persistence seam.
//!
//! The engine never retries or wraps store failures; the store's own error
//! type reaches the caller unchanged.

use std::collections::HashMap;
use std::convert::Infallible;

use crate::record::Record;

pub trait RecordStore {
    type Error;

    fn fetch(&self, id: &str) -> Result<Option<Record>, Self::Error>;

    /// Store `record` under `id` and return what the store now holds.
    fn store(&mut self, id: &str, record: Record) -> Result<Record, Self::Error>;
}

/// In-memory store keyed by record id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<String, Record>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    type Error = Infallible;

    fn fetch(&self, id: &str) -> Result<Option<Record>, Self::Error> {
        Ok(self.records.get(id).cloned())
    }

    fn store(&mut self, id: &str, record: Record) -> Result<Record, Self::Error> {
        tracing::debug!(id, "record stored");
        self.records.insert(id.to_string(), record.clone());
        Ok(record)
    }
}
