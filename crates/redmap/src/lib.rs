//! # redmap
//!
//! Schema-validated entities over Redis with application-level secondary
//! indexes.
//!
//! ```rust,ignore
//! use redmap::{Database, FieldType, RedmapConfig, Schema};
//! use serde_json::json;
//!
//! let db = Database::new(RedmapConfig::default());
//! db.connect().await?;
//!
//! let users = db
//!     .model(
//!         "users",
//!         Schema::builder()
//!             .field("id", FieldType::Number)
//!             .indexed("flag", FieldType::Number)
//!             .field("label", FieldType::String)
//!             .build()?,
//!     )
//!     .await?;
//!
//! users.set(&json!({ "id": 1, "flag": 1, "label": "one" })).await?;
//! let flagged = users.find_by(&json!({ "flag": 1 })).await?;
//!
//! db.close().await?;
//! ```

pub mod database;
pub mod error;
pub mod logging;
pub mod model;
pub mod schema;

pub use database::Database;
pub use error::{RedmapError, Result};
pub use logging::init_logging;
pub use model::Model;
pub use schema::{FieldSchema, FieldType, Schema, SchemaBuilder, SchemaError};

pub use redmap_commons::{Entity, FieldMap, NamespaceId, Value};
pub use redmap_configs::RedmapConfig;
pub use redmap_store::{KvBackend, Query, RecordStore, StoreError};
