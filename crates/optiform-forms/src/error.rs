use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("schema error: {0}")]
    Schema(#[from] optiform_core::error::CoreError),

    #[error("unknown group: {0}")]
    UnknownGroup(String),

    #[error("group '{0}' cannot be saved as a favorite")]
    NotStarable(String),

    #[error("group '{0}' has nothing to save")]
    NothingToCapture(String),
}
