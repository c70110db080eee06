//! Per-namespace CRUD over a [`Schema`].
//!
//! A [`Model`] binds a namespace to a schema and a [`RecordStore`]. Raw JSON
//! input goes through [`Schema::sanitize`] before it reaches the store, and
//! records read back are re-applied to the schema, so callers only ever see
//! declared, coerced fields.

use std::sync::Arc;

use redmap_commons::{Entity, NamespaceId, Value};
use redmap_store::{Query, RecordStore};
use serde_json::Value as JsonValue;

use crate::error::{RedmapError, Result};
use crate::schema::Schema;

#[derive(Clone)]
pub struct Model {
    namespace: NamespaceId,
    schema: Arc<Schema>,
    store: Arc<RecordStore>,
}

impl Model {
    /// Binds `schema` to `namespace` and declares its indexed fields in the store.
    pub async fn register(
        namespace: impl Into<NamespaceId>,
        schema: Schema,
        store: Arc<RecordStore>,
    ) -> Result<Self> {
        let namespace = namespace.into();
        let indexed = schema.indexed_fields();
        store.declare_indexes(&namespace, &indexed).await?;
        log::debug!(
            "Registered model '{}' with indexed fields {:?}",
            namespace,
            indexed
        );

        Ok(Self {
            namespace,
            schema: Arc::new(schema),
            store,
        })
    }

    pub fn namespace(&self) -> &NamespaceId {
        &self.namespace
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Builds an entity from raw input without storing it.
    pub fn create(&self, raw: &JsonValue) -> Result<Entity> {
        Ok(self.schema.sanitize(raw)?)
    }

    /// Equality query over the indexed fields present in `raw`.
    pub fn create_query(&self, raw: &JsonValue) -> Query {
        self.schema.query(raw)
    }

    pub async fn get(&self, id: impl Into<Value>) -> Result<Option<Entity>> {
        match self.store.get(&self.namespace, &id.into()).await? {
            Some(entity) => Ok(Some(self.schema.conform(&entity)?)),
            None => Ok(None),
        }
    }

    pub async fn get_many(&self, ids: &[Value]) -> Result<Vec<Entity>> {
        self.conform_all(self.store.get_many(&self.namespace, ids).await?)
    }

    pub async fn find(&self, query: &Query) -> Result<Vec<Entity>> {
        self.conform_all(self.store.find(&self.namespace, query).await?)
    }

    /// Shorthand for `find(&create_query(raw))`.
    pub async fn find_by(&self, raw: &JsonValue) -> Result<Vec<Entity>> {
        self.find(&self.create_query(raw)).await
    }

    pub async fn find_ids(&self, query: &Query) -> Result<Vec<String>> {
        Ok(self.store.find_ids(&self.namespace, query).await?)
    }

    pub async fn all(&self) -> Result<Vec<Entity>> {
        self.conform_all(self.store.all(&self.namespace).await?)
    }

    /// Sanitizes and stores `raw`, replacing any previous version.
    pub async fn set(&self, raw: &JsonValue) -> Result<Entity> {
        let entity = self.create(raw)?;
        self.store.set(&self.namespace, &entity).await?;
        Ok(entity)
    }

    pub async fn set_many(&self, raws: &[JsonValue]) -> Result<Vec<Entity>> {
        let entities = self.create_all(raws)?;
        self.store.set_many(&self.namespace, &entities).await?;
        Ok(entities)
    }

    /// Stores a new entity without reading a previous version.
    pub async fn add(&self, raw: &JsonValue) -> Result<Entity> {
        let entity = self.create(raw)?;
        self.store.add(&self.namespace, &entity).await?;
        Ok(entity)
    }

    pub async fn add_many(&self, raws: &[JsonValue]) -> Result<Vec<Entity>> {
        let entities = self.create_all(raws)?;
        self.store.add_many(&self.namespace, &entities).await?;
        Ok(entities)
    }

    pub async fn del(&self, ids: &[Value]) -> Result<usize> {
        Ok(self.store.del(&self.namespace, ids).await?)
    }

    fn create_all(&self, raws: &[JsonValue]) -> Result<Vec<Entity>> {
        raws.iter().map(|raw| self.create(raw)).collect()
    }

    fn conform_all(&self, entities: Vec<Entity>) -> Result<Vec<Entity>> {
        entities
            .iter()
            .map(|e| self.schema.conform(e).map_err(RedmapError::from))
            .collect()
    }
}
