//! Error types for store operations.

use redmap_commons::CommonError;
use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
///
/// Failures of the underlying primitives are surfaced unchanged; this layer
/// never retries or partially recovers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Operation issued before the connection was established or after close
    #[error("Store is not connected")]
    NotConnected,

    /// A query must constrain at least one field
    #[error("Query must constrain at least one field")]
    EmptyQuery,

    /// Invalid entity, key, or stored document
    #[error(transparent)]
    Entity(#[from] CommonError),

    /// Error returned by the Redis server or client
    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    /// Operation against a key holding the wrong kind of value
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value: {0}")]
    WrongType(String),

    /// Other backend failures
    #[error("Backend error: {0}")]
    Backend(String),
}
