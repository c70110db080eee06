//! Equality queries over secondary indexes.
//!
//! A [`Query`] is a conjunction of `field = value` conditions. Each condition
//! names one index entry; the matching primary keys are the intersection of
//! those entries:
//!
//! ```text
//! {flag: 1, label: "a"}
//!     │
//!     ├── SMEMBERS $schema:index-key:ns:flag:1     ┐ concurrently
//!     ├── SMEMBERS $schema:index-key:ns:label:a    ┘
//!     │
//!     ├── intersect, smallest set first
//!     │
//!     └── RecordSource::load_many(primary keys)   (missing records dropped)
//! ```
//!
//! Conditions on fields that are not indexed resolve to an empty entry and
//! therefore to no results.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use redmap_commons::{key_codec, Entity, FieldMap, NamespaceId, Value};

use crate::error::{Result, StoreError};
use crate::storage_trait::KvBackend;

/// Conjunction of field equality conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    conditions: FieldMap,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the condition on `field`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.insert(field.into(), value.into());
        self
    }

    pub fn conditions(&self) -> &FieldMap {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }
}

impl From<FieldMap> for Query {
    fn from(conditions: FieldMap) -> Self {
        Self { conditions }
    }
}

/// Batch loader used to hydrate query results.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Loads the records stored under `primary_keys`, skipping keys that hold no record.
    async fn load_many(&self, primary_keys: &[String]) -> Result<Vec<Entity>>;
}

#[derive(Clone)]
pub struct QueryEngine {
    backend: Arc<dyn KvBackend>,
}

impl QueryEngine {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Primary keys satisfying every condition of `query`.
    pub async fn resolve(&self, ns: &NamespaceId, query: &Query) -> Result<HashSet<String>> {
        if query.is_empty() {
            return Err(StoreError::EmptyQuery);
        }

        let keys: Vec<String> = query
            .conditions()
            .iter()
            .map(|(field, value)| key_codec::index_entry_key(ns, field, value))
            .collect();

        let mut sets = try_join_all(keys.iter().map(|key| self.backend.set_members(key))).await?;
        sets.sort_by_key(|set| set.len());

        let mut sets = sets.into_iter();
        let mut matched = sets.next().unwrap_or_default();
        for set in sets {
            if matched.is_empty() {
                break;
            }
            matched.retain(|pk| set.contains(pk));
        }

        log::trace!(
            "Query on '{}' with {} condition(s) matched {} key(s)",
            ns,
            query.len(),
            matched.len()
        );
        Ok(matched)
    }

    /// Matching records, hydrated through `source`. Order is unspecified.
    pub async fn find(
        &self,
        ns: &NamespaceId,
        query: &Query,
        source: &dyn RecordSource,
    ) -> Result<Vec<Entity>> {
        let primary_keys: Vec<String> = self.resolve(ns, query).await?.into_iter().collect();
        if primary_keys.is_empty() {
            return Ok(Vec::new());
        }
        source.load_many(&primary_keys).await
    }

    /// Ids (key parts) of matching records, without reading the records.
    pub async fn find_ids(&self, ns: &NamespaceId, query: &Query) -> Result<Vec<String>> {
        self.resolve(ns, query)
            .await?
            .iter()
            .map(|pk| key_codec::primary_key_to_id(pk).map_err(StoreError::from))
            .collect()
    }
}
