//! Secondary index maintenance.
//!
//! An index entry is a store set keyed by `(namespace, field, value)` holding
//! the primary keys of every record whose `field` currently equals `value`.
//! Entries are kept in step with primary records by diffing the previous and
//! next version of each written record:
//!
//! ```text
//! update_indexes(change)
//!     │
//!     ├── stale = diff(next, previous)   → SREM pk from (ns, f, old)
//!     │
//!     └── fresh = diff(previous, next)   → SADD pk to   (ns, f, new)
//! ```
//!
//! Only fields listed in the namespace's registry are considered, so a write
//! that leaves every indexed field untouched issues no set mutation at all.
//!
//! Batches go through one of two strategies (see [`MaintenanceStrategy`]):
//! small batches run the per-record path concurrently, larger ones are folded
//! into a single [`IndexPlan`] whose round trips are bounded by the number of
//! distinct index entries touched rather than by the number of records.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures::future::try_join_all;
use redmap_commons::{diff_fields, key_codec, FieldMap, NamespaceId};

use crate::error::Result;
use crate::storage_trait::KvBackend;

/// Default batch size at which maintenance switches to [`MaintenanceStrategy::Grouped`].
pub const DEFAULT_BATCH_THRESHOLD: usize = 2;

/// One record's transition. `previous` is `None` for a first write,
/// `next` is `None` for a deletion.
#[derive(Debug, Clone, Copy)]
pub struct IndexChange<'a> {
    pub primary_key: &'a str,
    pub previous: Option<&'a FieldMap>,
    pub next: Option<&'a FieldMap>,
}

impl<'a> IndexChange<'a> {
    pub fn new(
        primary_key: &'a str,
        previous: Option<&'a FieldMap>,
        next: Option<&'a FieldMap>,
    ) -> Self {
        Self {
            primary_key,
            previous,
            next,
        }
    }

    /// `(stale, fresh)` indexed pairs of this change.
    fn split(&self, fields: &[&str]) -> (FieldMap, FieldMap) {
        (
            diff_fields(self.next, self.previous, fields),
            diff_fields(self.previous, self.next, fields),
        )
    }
}

/// How a batch of changes is turned into store calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceStrategy {
    /// Each change is applied on its own (unset then set); changes run concurrently.
    PerRecord,
    /// All changes are folded into one [`IndexPlan`]: one SREM per stale entry,
    /// then one SADD per fresh entry.
    Grouped,
}

impl MaintenanceStrategy {
    pub fn for_batch(len: usize, threshold: usize) -> Self {
        if len >= threshold {
            MaintenanceStrategy::Grouped
        } else {
            MaintenanceStrategy::PerRecord
        }
    }
}

/// Index entry key → primary keys, for removals and additions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexPlan {
    pub removals: BTreeMap<String, Vec<String>>,
    pub additions: BTreeMap<String, Vec<String>>,
}

impl IndexPlan {
    pub fn build(ns: &NamespaceId, fields: &BTreeSet<String>, changes: &[IndexChange<'_>]) -> Self {
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        let mut plan = IndexPlan::default();

        for change in changes {
            let (stale, fresh) = change.split(&fields);
            for (field, value) in &stale {
                plan.removals
                    .entry(key_codec::index_entry_key(ns, field, value))
                    .or_default()
                    .push(change.primary_key.to_string());
            }
            for (field, value) in &fresh {
                plan.additions
                    .entry(key_codec::index_entry_key(ns, field, value))
                    .or_default()
                    .push(change.primary_key.to_string());
            }
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.additions.is_empty()
    }

    /// Number of set commands [`SecondaryIndexStore::apply`] will issue.
    pub fn round_trips(&self) -> usize {
        self.removals.len() + self.additions.len()
    }
}

/// Maintains index entries for records of any namespace.
#[derive(Clone)]
pub struct SecondaryIndexStore {
    backend: Arc<dyn KvBackend>,
    batch_threshold: usize,
}

impl SecondaryIndexStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self::with_batch_threshold(backend, DEFAULT_BATCH_THRESHOLD)
    }

    pub fn with_batch_threshold(backend: Arc<dyn KvBackend>, batch_threshold: usize) -> Self {
        Self {
            backend,
            batch_threshold: batch_threshold.max(1),
        }
    }

    pub fn batch_threshold(&self) -> usize {
        self.batch_threshold
    }

    /// Adds `primary_key` to the entry of every indexed field present in `values`.
    pub async fn set_indexes(
        &self,
        ns: &NamespaceId,
        fields: &BTreeSet<String>,
        primary_key: &str,
        values: &FieldMap,
    ) -> Result<()> {
        let member = [primary_key.to_string()];
        let keys = Self::entry_keys(ns, fields, values);
        try_join_all(keys.iter().map(|key| self.backend.set_add(key, &member))).await?;
        Ok(())
    }

    /// Removes `primary_key` from the entry of every indexed field present in `values`.
    pub async fn unset_indexes(
        &self,
        ns: &NamespaceId,
        fields: &BTreeSet<String>,
        primary_key: &str,
        values: &FieldMap,
    ) -> Result<()> {
        let member = [primary_key.to_string()];
        let keys = Self::entry_keys(ns, fields, values);
        try_join_all(keys.iter().map(|key| self.backend.set_remove(key, &member))).await?;
        Ok(())
    }

    /// Moves one record's memberships from its previous to its next values.
    pub async fn update_indexes(
        &self,
        ns: &NamespaceId,
        fields: &BTreeSet<String>,
        change: IndexChange<'_>,
    ) -> Result<()> {
        let field_names: Vec<&str> = fields.iter().map(String::as_str).collect();
        let (stale, fresh) = change.split(&field_names);
        log::trace!(
            "Index update for '{}': {} stale, {} fresh",
            change.primary_key,
            stale.len(),
            fresh.len()
        );

        self.unset_indexes(ns, fields, change.primary_key, &stale).await?;
        self.set_indexes(ns, fields, change.primary_key, &fresh).await
    }

    /// Applies a batch of changes with the strategy chosen by batch size.
    pub async fn update_indexes_many(
        &self,
        ns: &NamespaceId,
        fields: &BTreeSet<String>,
        changes: &[IndexChange<'_>],
    ) -> Result<()> {
        if changes.is_empty() || fields.is_empty() {
            return Ok(());
        }

        match MaintenanceStrategy::for_batch(changes.len(), self.batch_threshold) {
            MaintenanceStrategy::PerRecord => {
                try_join_all(
                    changes
                        .iter()
                        .map(|change| self.update_indexes(ns, fields, *change)),
                )
                .await?;
                Ok(())
            }
            MaintenanceStrategy::Grouped => {
                let plan = IndexPlan::build(ns, fields, changes);
                log::debug!(
                    "Grouped index update on '{}': {} changes, {} round trips",
                    ns,
                    changes.len(),
                    plan.round_trips()
                );
                self.apply(&plan).await
            }
        }
    }

    /// Issues every removal, then every addition, of a plan.
    pub async fn apply(&self, plan: &IndexPlan) -> Result<()> {
        try_join_all(
            plan.removals
                .iter()
                .map(|(key, members)| self.backend.set_remove(key, members)),
        )
        .await?;
        try_join_all(
            plan.additions
                .iter()
                .map(|(key, members)| self.backend.set_add(key, members)),
        )
        .await?;
        Ok(())
    }

    fn entry_keys(ns: &NamespaceId, fields: &BTreeSet<String>, values: &FieldMap) -> Vec<String> {
        values
            .iter()
            .filter(|(field, _)| fields.contains(*field))
            .map(|(field, value)| key_codec::index_entry_key(ns, field, value))
            .collect()
    }
}
