//! # redmap-commons
//!
//! Shared types and pure helpers used across all redmap crates.
//!
//! ## Contents
//!
//! - `Value` / `FieldMap`: scalar field values and the flat field mapping of an entity
//! - `Entity`: a field mapping that is guaranteed to carry an `id`
//! - `NamespaceId`: type-safe wrapper for collection names
//! - `key_codec`: collision-free composite key construction for the store
//! - `diff`: field-level change detection between two entity versions
//!
//! Nothing in this crate performs I/O.
//!
//! ## Example Usage
//!
//! ```rust
//! use redmap_commons::{key_codec, Entity, NamespaceId, Value};
//!
//! let ns = NamespaceId::new("users");
//! let entity = Entity::from_pairs([("id", Value::from(7)), ("role", Value::from("admin"))]).unwrap();
//! let key = key_codec::primary_key(&ns, entity.id());
//! assert_eq!(key, "users:7");
//! ```

pub mod diff;
pub mod entity;
pub mod errors;
pub mod ids;
pub mod key_codec;
pub mod value;

pub use diff::{diff, diff_fields};
pub use entity::Entity;
pub use errors::{CommonError, Result};
pub use ids::NamespaceId;
pub use key_codec::KeyShape;
pub use value::{FieldMap, Value};
