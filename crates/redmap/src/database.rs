//! Connection context.
//!
//! A [`Database`] owns the configuration and, once connected, the shared
//! [`RecordStore`]. Everything that touches the store goes through
//! [`Database::store`], which fails with [`RedmapError::NotConnected`] until
//! [`Database::connect`] has succeeded and again after [`Database::close`].

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use redmap_configs::RedmapConfig;
use redmap_store::{InMemoryBackend, KvBackend, RecordStore, RedisBackend};

use crate::error::{RedmapError, Result};
use crate::model::Model;
use crate::schema::Schema;

const MEMORY_SCHEME: &str = "memory://";

pub struct Database {
    config: RedmapConfig,
    store: RwLock<Option<Arc<RecordStore>>>,
}

impl Database {
    /// Creates an unconnected context.
    pub fn new(config: RedmapConfig) -> Self {
        Self {
            config,
            store: RwLock::new(None),
        }
    }

    /// Loads, overrides from the environment, and validates a config file.
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = RedmapConfig::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &RedmapConfig {
        &self.config
    }

    /// Opens the backend named by `store.url`. Connecting twice is a no-op.
    pub async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }

        let url = &self.config.store.url;
        let backend: Arc<dyn KvBackend> = if url.starts_with(MEMORY_SCHEME) {
            log::info!("Using in-memory store");
            Arc::new(InMemoryBackend::new())
        } else {
            Arc::new(RedisBackend::connect(url).await?)
        };

        let store = RecordStore::with_batch_threshold(backend, self.config.index.batch_threshold);
        *self.store.write() = Some(Arc::new(store));
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.store.read().is_some()
    }

    pub fn store(&self) -> Result<Arc<RecordStore>> {
        self.store.read().clone().ok_or(RedmapError::NotConnected)
    }

    /// Registers a model for `namespace` on the connected store.
    pub async fn model(&self, namespace: &str, schema: Schema) -> Result<Model> {
        Model::register(namespace, schema, self.store()?).await
    }

    /// Wipes every key of the store.
    pub async fn drop_all(&self) -> Result<()> {
        Ok(self.store()?.flush().await?)
    }

    /// Releases the connection. Models created earlier fail with store errors afterwards.
    pub async fn close(&self) -> Result<()> {
        let store = self.store.write().take();
        match store {
            Some(store) => Ok(store.close().await?),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldType;
    use redmap_store::StoreError;
    use serde_json::json;
    use std::io::Write;

    fn memory_config() -> RedmapConfig {
        let mut config = RedmapConfig::default();
        config.store.url = MEMORY_SCHEME.to_string();
        config
    }

    fn schema() -> Schema {
        Schema::builder()
            .field("id", FieldType::Number)
            .indexed("flag", FieldType::Number)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_store_before_connect_fails() {
        let db = Database::new(memory_config());
        assert!(!db.is_connected());
        assert!(matches!(db.store(), Err(RedmapError::NotConnected)));
        assert!(matches!(
            db.model("users", schema()).await,
            Err(RedmapError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_connect_model_close() {
        let db = Database::new(memory_config());
        db.connect().await.unwrap();
        db.connect().await.unwrap();
        assert!(db.is_connected());

        let users = db.model("users", schema()).await.unwrap();
        users.set(&json!({ "id": 1, "flag": 1 })).await.unwrap();
        assert_eq!(users.find_by(&json!({ "flag": 1 })).await.unwrap().len(), 1);

        db.close().await.unwrap();
        assert!(!db.is_connected());
        assert!(matches!(db.store(), Err(RedmapError::NotConnected)));

        // A model outliving the connection reports the store's own error
        assert!(matches!(
            users.get(1).await,
            Err(RedmapError::Store(StoreError::NotConnected))
        ));
    }

    #[tokio::test]
    async fn test_drop_all() {
        let db = Database::new(memory_config());
        db.connect().await.unwrap();
        let users = db.model("users", schema()).await.unwrap();
        users.set(&json!({ "id": 1, "flag": 1 })).await.unwrap();

        db.drop_all().await.unwrap();
        assert_eq!(users.get(1).await.unwrap(), None);
    }

    #[test]
    fn test_from_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[store]\nurl = \"memory://\"\n\n[index]\nbatch_threshold = 4").unwrap();

        let db = Database::from_config_file(file.path()).unwrap();
        assert_eq!(db.config().index.batch_threshold, 4);
        assert!(!db.is_connected());
    }
}
