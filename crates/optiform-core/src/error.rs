use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("schemaVersion {found} is newer than this build supports ({supported})")]
    UnsupportedSchemaVersion { found: u64, supported: u32 },

    #[error("invalid schema document: {0}")]
    InvalidDocument(String),

    #[error("mapped field chain starting at '{0}' loops back on itself")]
    MappedFieldCycle(String),

    #[error("record is not a JSON object")]
    InvalidRecord,

    #[error("invalid record path '{0}'")]
    InvalidPath(String),
}
