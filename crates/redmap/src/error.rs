//! Top-level error type.

use redmap_commons::CommonError;
use redmap_store::StoreError;
use thiserror::Error;

use crate::schema::SchemaError;

pub type Result<T> = std::result::Result<T, RedmapError>;

#[derive(Debug, Error)]
pub enum RedmapError {
    /// Malformed schema declaration
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Entity rejected before any store I/O
    #[error(transparent)]
    Entity(#[from] CommonError),

    /// API used before `connect` or after `close`
    #[error("Attempt to access the store before the connection was initialized")]
    NotConnected,

    /// Failure returned by the store, unchanged
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}
