//! Test utilities for redmap-store.
//!
//! Provides an in-memory store wrapper that counts the primitives issued
//! against it, so tests can assert round-trip bounds.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::memory::InMemoryBackend;
use crate::storage_trait::KvBackend;

/// Per-primitive call counters.
#[derive(Debug, Default)]
pub struct CallCounts {
    pub get: AtomicUsize,
    pub set: AtomicUsize,
    pub multi_get: AtomicUsize,
    pub multi_set: AtomicUsize,
    pub delete: AtomicUsize,
    pub set_add: AtomicUsize,
    pub set_remove: AtomicUsize,
    pub set_members: AtomicUsize,
    pub keys_matching: AtomicUsize,
}

/// Wraps another backend and counts every call made through it.
///
/// # Example
///
/// ```no_run
/// use redmap_store::test_utils::CountingBackend;
///
/// let backend = CountingBackend::in_memory();
/// // ... drive a RecordStore built on backend.clone() ...
/// assert_eq!(backend.set_mutations(), 0);
/// ```
#[derive(Clone)]
pub struct CountingBackend {
    inner: Arc<dyn KvBackend>,
    counts: Arc<CallCounts>,
}

impl CountingBackend {
    pub fn new(inner: Arc<dyn KvBackend>) -> Self {
        Self {
            inner,
            counts: Arc::new(CallCounts::default()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    pub fn counts(&self) -> &CallCounts {
        &self.counts
    }

    /// SADD plus SREM calls.
    pub fn set_mutations(&self) -> usize {
        self.counts.set_add.load(Ordering::SeqCst) + self.counts.set_remove.load(Ordering::SeqCst)
    }

    /// Every call except `flush_all` and `close`.
    pub fn total_calls(&self) -> usize {
        let c = &self.counts;
        [
            &c.get,
            &c.set,
            &c.multi_get,
            &c.multi_set,
            &c.delete,
            &c.set_add,
            &c.set_remove,
            &c.set_members,
            &c.keys_matching,
        ]
        .iter()
        .map(|n| n.load(Ordering::SeqCst))
        .sum()
    }

    pub fn reset(&self) {
        let c = &self.counts;
        for n in [
            &c.get,
            &c.set,
            &c.multi_get,
            &c.multi_set,
            &c.delete,
            &c.set_add,
            &c.set_remove,
            &c.set_members,
            &c.keys_matching,
        ] {
            n.store(0, Ordering::SeqCst);
        }
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl KvBackend for CountingBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Self::bump(&self.counts.get);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        Self::bump(&self.counts.set);
        self.inner.set(key, value).await
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        Self::bump(&self.counts.multi_get);
        self.inner.multi_get(keys).await
    }

    async fn multi_set(&self, pairs: &[(String, String)]) -> Result<()> {
        Self::bump(&self.counts.multi_set);
        self.inner.multi_set(pairs).await
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        Self::bump(&self.counts.delete);
        self.inner.delete(keys).await
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<usize> {
        Self::bump(&self.counts.set_add);
        self.inner.set_add(key, members).await
    }

    async fn set_remove(&self, key: &str, members: &[String]) -> Result<usize> {
        Self::bump(&self.counts.set_remove);
        self.inner.set_remove(key, members).await
    }

    async fn set_members(&self, key: &str) -> Result<HashSet<String>> {
        Self::bump(&self.counts.set_members);
        self.inner.set_members(key).await
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>> {
        Self::bump(&self.counts.keys_matching);
        self.inner.keys_matching(pattern).await
    }

    async fn flush_all(&self) -> Result<()> {
        self.inner.flush_all().await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}
