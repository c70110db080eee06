//! Record Store - primary records with automatic secondary index maintenance.
//!
//! Every mutation follows the same sequence:
//!
//! ```text
//! set(ns, entity)
//!     │
//!     ├── 1. registry.list(ns)  ┐ concurrently
//!     ├── 2. GET previous       ┘
//!     ├── 3. update_indexes(previous → entity)
//!     └── 4. SET primary record
//!
//! del(ns, ids)
//!     │
//!     ├── 1. registry.list(ns) + MGET previous
//!     ├── 2. update_indexes_many(previous → none)
//!     └── 3. DEL primary records
//! ```
//!
//! Index maintenance always completes before the primary write, so a record
//! that is visible through `get` has been added to its index entries. The
//! sequence is not atomic: two concurrent writers of one id can leave a stale
//! membership behind, which queries tolerate by dropping ids whose record is
//! gone.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use redmap_commons::{key_codec, Entity, FieldMap, NamespaceId, Value};

use crate::error::{Result, StoreError};
use crate::index_registry::IndexRegistry;
use crate::index_store::{IndexChange, SecondaryIndexStore, DEFAULT_BATCH_THRESHOLD};
use crate::query::{Query, QueryEngine, RecordSource};
use crate::storage_trait::KvBackend;

pub struct RecordStore {
    backend: Arc<dyn KvBackend>,
    registry: IndexRegistry,
    indexes: SecondaryIndexStore,
    queries: QueryEngine,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self::with_batch_threshold(backend, DEFAULT_BATCH_THRESHOLD)
    }

    /// Batches of at least `batch_threshold` records use grouped index maintenance.
    pub fn with_batch_threshold(backend: Arc<dyn KvBackend>, batch_threshold: usize) -> Self {
        Self {
            registry: IndexRegistry::new(backend.clone()),
            indexes: SecondaryIndexStore::with_batch_threshold(backend.clone(), batch_threshold),
            queries: QueryEngine::new(backend.clone()),
            backend,
        }
    }

    pub fn backend(&self) -> &Arc<dyn KvBackend> {
        &self.backend
    }

    // ========================================================================
    // Index declarations
    // ========================================================================

    pub async fn declare_indexes<S: AsRef<str>>(&self, ns: &NamespaceId, fields: &[S]) -> Result<()> {
        self.registry.declare(ns, fields).await
    }

    /// Stops indexing `fields` and deletes their index entries.
    pub async fn revoke_indexes<S: AsRef<str>>(&self, ns: &NamespaceId, fields: &[S]) -> Result<()> {
        self.registry.revoke(ns, fields).await?;
        for field in fields {
            self.registry.sweep(ns, field.as_ref()).await?;
        }
        Ok(())
    }

    pub async fn indexed_fields(&self, ns: &NamespaceId) -> Result<BTreeSet<String>> {
        self.registry.list(ns).await
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn get(&self, ns: &NamespaceId, id: &Value) -> Result<Option<Entity>> {
        self.read(&key_codec::primary_key(ns, id)).await
    }

    /// Records for `ids`, skipping ids that have none.
    pub async fn get_many(&self, ns: &NamespaceId, ids: &[Value]) -> Result<Vec<Entity>> {
        let keys: Vec<String> = ids.iter().map(|id| key_codec::primary_key(ns, id)).collect();
        self.load_many(&keys).await
    }

    pub async fn find(&self, ns: &NamespaceId, query: &Query) -> Result<Vec<Entity>> {
        self.queries.find(ns, query, self).await
    }

    pub async fn find_ids(&self, ns: &NamespaceId, query: &Query) -> Result<Vec<String>> {
        self.queries.find_ids(ns, query).await
    }

    /// Every record of a namespace (pattern scan over primary keys).
    pub async fn all(&self, ns: &NamespaceId) -> Result<Vec<Entity>> {
        let keys = self
            .backend
            .keys_matching(&key_codec::namespace_pattern(ns))
            .await?;
        self.load_many(&keys).await
    }

    /// Ids of every record of a namespace.
    pub async fn ids(&self, ns: &NamespaceId) -> Result<Vec<String>> {
        let keys = self
            .backend
            .keys_matching(&key_codec::namespace_pattern(ns))
            .await?;
        keys.iter()
            .map(|key| key_codec::primary_key_to_id(key).map_err(StoreError::from))
            .collect()
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Writes `entity`, replacing any previous version and moving its index memberships.
    pub async fn set(&self, ns: &NamespaceId, entity: &Entity) -> Result<()> {
        let pk = key_codec::primary_key(ns, entity.id());
        let (fields, previous) = futures::try_join!(self.registry.list(ns), self.read(&pk))?;
        let previous = previous.map(Entity::into_fields);

        self.indexes
            .update_indexes(
                ns,
                &fields,
                IndexChange::new(&pk, previous.as_ref(), Some(entity.fields())),
            )
            .await?;
        self.backend.set(&pk, &entity.to_json()?).await
    }

    /// Batch [`RecordStore::set`]. When an id occurs more than once the last
    /// occurrence wins.
    pub async fn set_many(&self, ns: &NamespaceId, entities: &[Entity]) -> Result<()> {
        let batch = Self::dedupe(ns, entities);
        if batch.is_empty() {
            return Ok(());
        }

        let keys: Vec<String> = batch.iter().map(|(pk, _)| pk.clone()).collect();
        let (fields, raw) =
            futures::try_join!(self.registry.list(ns), self.backend.multi_get(&keys))?;
        let previous = raw
            .into_iter()
            .map(|raw| Self::parse(raw.as_deref()))
            .collect::<Result<Vec<_>>>()?;

        let changes: Vec<IndexChange<'_>> = batch
            .iter()
            .zip(&previous)
            .map(|((pk, entity), prev)| IndexChange::new(pk, prev.as_ref(), Some(entity.fields())))
            .collect();
        self.indexes.update_indexes_many(ns, &fields, &changes).await?;

        self.write_batch(&batch).await?;
        log::debug!("Stored {} record(s) in '{}'", batch.len(), ns);
        Ok(())
    }

    /// First-insert path: skips reading the previous version.
    ///
    /// Index entries of an existing record with the same id are not removed;
    /// use [`RecordStore::set`] when the id may already exist.
    pub async fn add(&self, ns: &NamespaceId, entity: &Entity) -> Result<()> {
        let pk = key_codec::primary_key(ns, entity.id());
        let fields = self.registry.list(ns).await?;
        self.indexes
            .set_indexes(ns, &fields, &pk, entity.fields())
            .await?;
        self.backend.set(&pk, &entity.to_json()?).await
    }

    /// Batch [`RecordStore::add`].
    pub async fn add_many(&self, ns: &NamespaceId, entities: &[Entity]) -> Result<()> {
        let batch = Self::dedupe(ns, entities);
        if batch.is_empty() {
            return Ok(());
        }

        let fields = self.registry.list(ns).await?;
        let changes: Vec<IndexChange<'_>> = batch
            .iter()
            .map(|(pk, entity)| IndexChange::new(pk, None, Some(entity.fields())))
            .collect();
        self.indexes.update_indexes_many(ns, &fields, &changes).await?;

        self.write_batch(&batch).await?;
        log::debug!("Added {} record(s) to '{}'", batch.len(), ns);
        Ok(())
    }

    /// Deletes records and all their index memberships. Returns how many records existed.
    pub async fn del(&self, ns: &NamespaceId, ids: &[Value]) -> Result<usize> {
        let mut seen: HashSet<String> = HashSet::with_capacity(ids.len());
        let mut keys: Vec<String> = Vec::with_capacity(ids.len());
        for id in ids {
            let pk = key_codec::primary_key(ns, id);
            if seen.insert(pk.clone()) {
                keys.push(pk);
            }
        }
        if keys.is_empty() {
            return Ok(0);
        }

        let (fields, raw) =
            futures::try_join!(self.registry.list(ns), self.backend.multi_get(&keys))?;
        let previous = raw
            .into_iter()
            .map(|raw| Self::parse(raw.as_deref()))
            .collect::<Result<Vec<_>>>()?;

        let changes: Vec<IndexChange<'_>> = keys
            .iter()
            .zip(&previous)
            .filter_map(|(pk, prev)| prev.as_ref().map(|p| IndexChange::new(pk, Some(p), None)))
            .collect();
        self.indexes.update_indexes_many(ns, &fields, &changes).await?;

        let removed = self.backend.delete(&keys).await?;
        log::debug!("Deleted {} record(s) from '{}'", removed, ns);
        Ok(removed)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Removes every record, index entry, and index declaration of one namespace.
    pub async fn drop_namespace(&self, ns: &NamespaceId) -> Result<usize> {
        let record_pattern = key_codec::namespace_pattern(ns);
        let index_pattern = key_codec::index_namespace_pattern(ns);
        let (mut keys, index_keys) = futures::try_join!(
            self.backend.keys_matching(&record_pattern),
            self.backend.keys_matching(&index_pattern),
        )?;
        keys.extend(index_keys);
        keys.push(key_codec::registry_key(ns));

        let removed = self.backend.delete(&keys).await?;
        log::info!("Dropped namespace '{}' ({} keys)", ns, removed);
        Ok(removed)
    }

    /// Wipes the whole store.
    pub async fn flush(&self) -> Result<()> {
        log::warn!("Flushing every key of the store");
        self.backend.flush_all().await
    }

    pub async fn close(&self) -> Result<()> {
        self.backend.close().await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn read(&self, pk: &str) -> Result<Option<Entity>> {
        match self.backend.get(pk).await? {
            Some(raw) => Ok(Some(Entity::from_json(&raw)?)),
            None => Ok(None),
        }
    }

    fn parse(raw: Option<&str>) -> Result<Option<FieldMap>> {
        match raw {
            Some(raw) => Ok(Some(Entity::from_json(raw)?.into_fields())),
            None => Ok(None),
        }
    }

    /// Pairs each entity with its primary key, keeping the first position and
    /// the last value of a repeated id.
    fn dedupe<'e>(ns: &NamespaceId, entities: &'e [Entity]) -> Vec<(String, &'e Entity)> {
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(entities.len());
        let mut batch: Vec<(String, &Entity)> = Vec::with_capacity(entities.len());

        for entity in entities {
            let pk = key_codec::primary_key(ns, entity.id());
            match positions.get(&pk) {
                Some(&pos) => batch[pos].1 = entity,
                None => {
                    positions.insert(pk.clone(), batch.len());
                    batch.push((pk, entity));
                }
            }
        }

        batch
    }

    async fn write_batch(&self, batch: &[(String, &Entity)]) -> Result<()> {
        let mut pairs = Vec::with_capacity(batch.len());
        for (pk, entity) in batch {
            pairs.push((pk.clone(), entity.to_json()?));
        }
        self.backend.multi_set(&pairs).await
    }
}

#[async_trait::async_trait]
impl RecordSource for RecordStore {
    async fn load_many(&self, primary_keys: &[String]) -> Result<Vec<Entity>> {
        let raw = self.backend.multi_get(primary_keys).await?;
        let mut records = Vec::with_capacity(raw.len());
        for doc in raw.into_iter().flatten() {
            records.push(Entity::from_json(&doc)?);
        }
        Ok(records)
    }
}
