//! Process-local implementation of the KvBackend trait.
//!
//! Mirrors the Redis behaviour the index engine relies on (type checks,
//! empty sets disappearing, glob scans) so that code exercised against it
//! behaves the same against a server.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use globset::GlobBuilder;
use parking_lot::RwLock;

use crate::error::{Result, StoreError};
use crate::storage_trait::KvBackend;

#[derive(Debug, Clone)]
enum Slot {
    Value(String),
    Set(HashSet<String>),
}

/// In-memory backend.
///
/// ## Example
///
/// ```rust,ignore
/// use redmap_store::{InMemoryBackend, KvBackend, RecordStore};
/// use std::sync::Arc;
///
/// let backend: Arc<dyn KvBackend> = Arc::new(InMemoryBackend::new());
/// let store = RecordStore::new(backend);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: RwLock<HashMap<String, Slot>>,
    closed: AtomicBool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::NotConnected);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl KvBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_open()?;
        match self.data.read().get(key) {
            None => Ok(None),
            Some(Slot::Value(v)) => Ok(Some(v.clone())),
            Some(Slot::Set(_)) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_open()?;
        self.data
            .write()
            .insert(key.to_string(), Slot::Value(value.to_string()));
        Ok(())
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        self.check_open()?;
        let data = self.data.read();
        // MGET reports non-string keys as missing instead of failing
        Ok(keys
            .iter()
            .map(|k| match data.get(k) {
                Some(Slot::Value(v)) => Some(v.clone()),
                _ => None,
            })
            .collect())
    }

    async fn multi_set(&self, pairs: &[(String, String)]) -> Result<()> {
        self.check_open()?;
        let mut data = self.data.write();
        for (key, value) in pairs {
            data.insert(key.clone(), Slot::Value(value.clone()));
        }
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        self.check_open()?;
        let mut data = self.data.write();
        Ok(keys.iter().filter(|k| data.remove(*k).is_some()).count())
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<usize> {
        self.check_open()?;
        if members.is_empty() {
            return Ok(0);
        }
        let mut data = self.data.write();
        let slot = data
            .entry(key.to_string())
            .or_insert_with(|| Slot::Set(HashSet::new()));
        match slot {
            Slot::Set(set) => Ok(members.iter().filter(|m| set.insert((*m).clone())).count()),
            Slot::Value(_) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn set_remove(&self, key: &str, members: &[String]) -> Result<usize> {
        self.check_open()?;
        let mut data = self.data.write();
        let removed = match data.get_mut(key) {
            None => return Ok(0),
            Some(Slot::Value(_)) => return Err(StoreError::WrongType(key.to_string())),
            Some(Slot::Set(set)) => {
                let removed = members.iter().filter(|m| set.remove(*m)).count();
                if set.is_empty() {
                    data.remove(key);
                }
                removed
            }
        };
        Ok(removed)
    }

    async fn set_members(&self, key: &str) -> Result<HashSet<String>> {
        self.check_open()?;
        match self.data.read().get(key) {
            None => Ok(HashSet::new()),
            Some(Slot::Set(set)) => Ok(set.clone()),
            Some(Slot::Value(_)) => Err(StoreError::WrongType(key.to_string())),
        }
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>> {
        self.check_open()?;
        let matcher = GlobBuilder::new(pattern)
            .backslash_escape(true)
            .literal_separator(false)
            .build()
            .map_err(|e| StoreError::Backend(format!("Invalid pattern '{}': {}", pattern, e)))?
            .compile_matcher();

        Ok(self
            .data
            .read()
            .keys()
            .filter(|k| matcher.is_match(k.as_str()))
            .cloned()
            .collect())
    }

    async fn flush_all(&self) -> Result<()> {
        self.check_open()?;
        self.data.write().clear();
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
