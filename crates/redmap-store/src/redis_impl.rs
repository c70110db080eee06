//! Redis implementation of the KvBackend trait.
//!
//! Each primitive is exactly one Redis command issued over a shared,
//! auto-reconnecting `ConnectionManager`:
//!
//! | primitive       | command  |
//! |-----------------|----------|
//! | `get`           | GET      |
//! | `set`           | SET      |
//! | `multi_get`     | MGET     |
//! | `multi_set`     | MSET     |
//! | `delete`        | DEL      |
//! | `set_add`       | SADD     |
//! | `set_remove`    | SREM     |
//! | `set_members`   | SMEMBERS |
//! | `keys_matching` | KEYS     |
//! | `flush_all`     | FLUSHALL |

use std::collections::HashSet;

use parking_lot::RwLock;
use redis::aio::ConnectionManager;

use crate::error::{Result, StoreError};
use crate::storage_trait::KvBackend;

/// Redis-backed store.
///
/// ## Example
///
/// ```rust,ignore
/// use redmap_store::{RedisBackend, RecordStore};
/// use std::sync::Arc;
///
/// let backend = RedisBackend::connect("redis://127.0.0.1:6379").await?;
/// let store = RecordStore::new(Arc::new(backend));
/// ```
pub struct RedisBackend {
    conn: RwLock<Option<ConnectionManager>>,
}

impl RedisBackend {
    /// Opens a connection and waits until it is established.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        log::info!("Connected to redis at {}", url);
        Ok(Self {
            conn: RwLock::new(Some(manager)),
        })
    }

    /// Clones the multiplexed handle; the lock is never held across an await.
    fn connection(&self) -> Result<ConnectionManager> {
        self.conn.read().clone().ok_or(StoreError::NotConnected)
    }
}

#[async_trait::async_trait]
impl KvBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection()?;
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection()?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.connection()?;
        let mut cmd = redis::cmd("MGET");
        for key in keys {
            cmd.arg(key);
        }
        let values: Vec<Option<String>> = cmd.query_async(&mut conn).await?;
        Ok(values)
    }

    async fn multi_set(&self, pairs: &[(String, String)]) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection()?;
        let mut cmd = redis::cmd("MSET");
        for (key, value) in pairs {
            cmd.arg(key).arg(value);
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection()?;
        let mut cmd = redis::cmd("DEL");
        for key in keys {
            cmd.arg(key);
        }
        let removed: usize = cmd.query_async(&mut conn).await?;
        Ok(removed)
    }

    async fn set_add(&self, key: &str, members: &[String]) -> Result<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection()?;
        let mut cmd = redis::cmd("SADD");
        cmd.arg(key);
        for member in members {
            cmd.arg(member);
        }
        let added: usize = cmd.query_async(&mut conn).await?;
        Ok(added)
    }

    async fn set_remove(&self, key: &str, members: &[String]) -> Result<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection()?;
        let mut cmd = redis::cmd("SREM");
        cmd.arg(key);
        for member in members {
            cmd.arg(member);
        }
        let removed: usize = cmd.query_async(&mut conn).await?;
        Ok(removed)
    }

    async fn set_members(&self, key: &str) -> Result<HashSet<String>> {
        let mut conn = self.connection()?;
        let members: HashSet<String> = redis::cmd("SMEMBERS")
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(members)
    }

    async fn keys_matching(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection()?;
        let keys: Vec<String> = redis::cmd("KEYS").arg(pattern).query_async(&mut conn).await?;
        Ok(keys)
    }

    async fn flush_all(&self) -> Result<()> {
        let mut conn = self.connection()?;
        let _: () = redis::cmd("FLUSHALL").query_async(&mut conn).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        // Dropping the last manager handle closes the socket
        if self.conn.write().take().is_some() {
            log::info!("Redis connection closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Needs a live server: REDMAP_TEST_REDIS_URL=redis://127.0.0.1:6379 cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_round_trip_against_server() {
        let url = std::env::var("REDMAP_TEST_REDIS_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let backend = RedisBackend::connect(&url).await.unwrap();

        backend.set("redmap-test:1", "{\"id\":1}").await.unwrap();
        backend
            .set_add("redmap-test:set", &["a".to_string(), "b".to_string()])
            .await
            .unwrap();

        assert_eq!(
            backend.get("redmap-test:1").await.unwrap().as_deref(),
            Some("{\"id\":1}")
        );
        assert_eq!(backend.set_members("redmap-test:set").await.unwrap().len(), 2);

        let removed = backend
            .delete(&["redmap-test:1".to_string(), "redmap-test:set".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 2);

        backend.close().await.unwrap();
        assert!(matches!(
            backend.get("redmap-test:1").await,
            Err(StoreError::NotConnected)
        ));
    }
}
