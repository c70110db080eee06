//! Shared error types for redmap.

use thiserror::Error;

/// Result type for commons helpers.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised by the value model and the key codec.
///
/// None of these involve store I/O: they are detected before a request is
/// issued (missing identity) or while decoding data read back from the store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommonError {
    /// Entity has no `id` field
    #[error("Entity must have an '{0}' field")]
    MissingId(&'static str),

    /// A store key could not be decoded with the expected shape
    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// Entity (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CommonError {
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
