//! Entities: field mappings with a mandatory identity.

use serde::{Deserialize, Serialize};

use crate::errors::{CommonError, Result};
use crate::value::{FieldMap, Value};

/// A field mapping that is guaranteed to carry an `id` field.
///
/// The identity check happens at construction (and on deserialization), so
/// every `Entity` that reaches the store is addressable. Entities are plain
/// values: "modifying" one produces a new `Entity` via [`Entity::with_field`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldMap", into = "FieldMap")]
pub struct Entity {
    fields: FieldMap,
}

impl Entity {
    /// Name of the identity field.
    pub const ID_FIELD: &'static str = "id";

    pub fn new(fields: FieldMap) -> Result<Self> {
        if !fields.contains_key(Self::ID_FIELD) {
            return Err(CommonError::MissingId(Self::ID_FIELD));
        }
        Ok(Self { fields })
    }

    /// Builds an entity from `(field, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn id(&self) -> &Value {
        // Presence is checked by every constructor.
        &self.fields[Self::ID_FIELD]
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn into_fields(self) -> FieldMap {
        self.fields
    }

    /// Returns a copy of this entity with `field` set to `value`.
    ///
    /// Replacing `id` is allowed; the result addresses a different record.
    pub fn with_field(&self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut fields = self.fields.clone();
        fields.insert(field.into(), value.into());
        Self { fields }
    }

    /// Serializes to the JSON document stored under the primary key.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.fields).map_err(|e| CommonError::Serialization(e.to_string()))
    }

    /// Parses a stored JSON document.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| CommonError::Serialization(e.to_string()))
    }
}

impl TryFrom<FieldMap> for Entity {
    type Error = CommonError;

    fn try_from(fields: FieldMap) -> Result<Self> {
        Self::new(fields)
    }
}

impl From<Entity> for FieldMap {
    fn from(entity: Entity) -> Self {
        entity.fields
    }
}
