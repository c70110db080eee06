//! Key-value store primitives.
//!
//! Everything above this module (index registry, index maintenance, queries,
//! record storage) is written against the `KvBackend` trait, which exposes
//! exactly the primitives the indexing scheme needs:
//!
//! - plain values: `get`, `set`, `multi_get`, `multi_set`, `delete`
//! - sets: `set_add`, `set_remove`, `set_members`
//! - discovery: `keys_matching` (glob pattern scan)
//! - lifecycle: `flush_all`, `close`
//!
//! ## Implementations
//!
//! - `RedisBackend`: one Redis command per primitive over a multiplexed connection
//! - `InMemoryBackend`: process-local map with Redis semantics, for tests and embedding
//!
//! ## Implementing a Custom Backend
//!
//! ```rust,ignore
//! use redmap_store::{KvBackend, Result};
//!
//! pub struct MyBackend {
//!     // Your backend's connection/state
//! }
//!
//! #[async_trait::async_trait]
//! impl KvBackend for MyBackend {
//!     async fn get(&self, key: &str) -> Result<Option<String>> {
//!         todo!()
//!     }
//!
//!     // ... implement other required methods
//! }
//! ```

use std::collections::HashSet;

use crate::error::Result;

/// Trait for pluggable key-value store implementations.
///
/// Implementations must be thread-safe (Send + Sync); one instance is shared
/// by every component as `Arc<dyn KvBackend>`.
///
/// ## Semantics
///
/// - Set primitives follow Redis: removing the last member deletes the key,
///   and reading a missing set yields an empty set.
/// - Batch primitives called with no keys/members are no-ops.
/// - After `close`, every call fails with `StoreError::NotConnected`.
#[async_trait::async_trait]
pub trait KvBackend: Send + Sync {
    /// Retrieves a value by key. Returns `Ok(None)` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores a value, replacing any existing one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieves many values; the result is positionally aligned with `keys`.
    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// Stores many values in one request.
    async fn multi_set(&self, pairs: &[(String, String)]) -> Result<()>;

    /// Deletes keys of any type. Returns how many existed.
    async fn delete(&self, keys: &[String]) -> Result<usize>;

    /// Adds members to a set. Returns how many were newly added.
    async fn set_add(&self, key: &str, members: &[String]) -> Result<usize>;

    /// Removes members from a set. Returns how many were present.
    async fn set_remove(&self, key: &str, members: &[String]) -> Result<usize>;

    /// Returns all members of a set.
    async fn set_members(&self, key: &str) -> Result<HashSet<String>>;

    /// Returns every key matching a glob pattern (`*`, `?`, `\` escapes).
    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>>;

    /// Removes every key in the store.
    async fn flush_all(&self) -> Result<()>;

    /// Releases the connection.
    async fn close(&self) -> Result<()>;
}
