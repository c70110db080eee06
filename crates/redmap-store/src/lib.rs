//! # redmap-store
//!
//! Secondary indexing for a key-value store that has none of its own.
//!
//! ## Architecture
//!
//! ```text
//! RecordStore (get / set / add / del / find)
//!     ├── IndexRegistry        indexed field names per namespace, kept in the store
//!     ├── SecondaryIndexStore  diff-driven SADD / SREM maintenance
//!     └── QueryEngine          set intersection + batch hydration
//!             ↓
//! KvBackend (GET, SET, MGET, MSET, DEL, SADD, SREM, SMEMBERS, KEYS, FLUSHALL)
//!     ├── RedisBackend
//!     └── InMemoryBackend
//! ```
//!
//! ## Key Layout
//!
//! - **Primary records**: `{ns}:{id}` holding the JSON document
//! - **Index registry**: `$schema:index-key:{ns}` set of indexed field names
//! - **Index entries**: `$schema:index-key:{ns}:{field}:{value}` set of primary keys

pub mod error;
pub mod index_registry;
pub mod index_store;
pub mod memory;
pub mod query;
pub mod record_store;
pub mod redis_impl;
pub mod storage_trait;

pub use error::{Result, StoreError};
pub use index_registry::IndexRegistry;
pub use index_store::{
    IndexChange, IndexPlan, MaintenanceStrategy, SecondaryIndexStore, DEFAULT_BATCH_THRESHOLD,
};
pub use memory::InMemoryBackend;
pub use query::{Query, QueryEngine, RecordSource};
pub use record_store::RecordStore;
pub use redis_impl::RedisBackend;
pub use storage_trait::KvBackend;

// Make test_utils available for testing in dependent crates
pub mod test_utils;
