//! Persisted index declarations.
//!
//! The set of indexed field names of a namespace lives in the store itself,
//! as a set under the registry key (`$schema:index-key:{ns}`). Maintenance and
//! query code read it back on every call, so declarations made by one process
//! are visible to every other process sharing the store.

use std::collections::BTreeSet;
use std::sync::Arc;

use redmap_commons::key_codec;
use redmap_commons::NamespaceId;

use crate::error::Result;
use crate::storage_trait::KvBackend;

#[derive(Clone)]
pub struct IndexRegistry {
    backend: Arc<dyn KvBackend>,
}

impl IndexRegistry {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Marks fields as indexed. Idempotent.
    pub async fn declare<S: AsRef<str>>(&self, ns: &NamespaceId, fields: &[S]) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let members: Vec<String> = fields.iter().map(|f| f.as_ref().to_string()).collect();
        let added = self
            .backend
            .set_add(&key_codec::registry_key(ns), &members)
            .await?;
        log::debug!("Declared {} new indexed field(s) on '{}'", added, ns);
        Ok(())
    }

    /// Stops maintaining fields. Existing index entries are left in place;
    /// see [`IndexRegistry::sweep`].
    pub async fn revoke<S: AsRef<str>>(&self, ns: &NamespaceId, fields: &[S]) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let members: Vec<String> = fields.iter().map(|f| f.as_ref().to_string()).collect();
        self.backend
            .set_remove(&key_codec::registry_key(ns), &members)
            .await?;
        log::debug!("Revoked indexed field(s) {:?} on '{}'", members, ns);
        Ok(())
    }

    pub async fn list(&self, ns: &NamespaceId) -> Result<BTreeSet<String>> {
        let members = self
            .backend
            .set_members(&key_codec::registry_key(ns))
            .await?;
        Ok(members.into_iter().collect())
    }

    /// Deletes every index entry of one field. Returns the number of keys removed.
    pub async fn sweep(&self, ns: &NamespaceId, field: &str) -> Result<usize> {
        let keys = self
            .backend
            .keys_matching(&key_codec::index_field_pattern(ns, field))
            .await?;
        let removed = self.backend.delete(&keys).await?;
        log::debug!("Swept {} index entries of '{}.{}'", removed, ns, field);
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;
    use redmap_commons::Value;

    fn registry() -> (IndexRegistry, Arc<dyn KvBackend>) {
        let backend: Arc<dyn KvBackend> = Arc::new(InMemoryBackend::new());
        (IndexRegistry::new(backend.clone()), backend)
    }

    #[tokio::test]
    async fn test_declare_is_idempotent() {
        let (registry, _) = registry();
        let ns = NamespaceId::new("users");

        registry.declare(&ns, &["flag", "email"]).await.unwrap();
        registry.declare(&ns, &["flag"]).await.unwrap();
        registry.declare::<&str>(&ns, &[]).await.unwrap();

        let fields: Vec<String> = registry.list(&ns).await.unwrap().into_iter().collect();
        assert_eq!(fields, vec!["email".to_string(), "flag".to_string()]);
        assert!(registry.list(&NamespaceId::new("other")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revoke_and_sweep() {
        let (registry, backend) = registry();
        let ns = NamespaceId::new("users");
        registry.declare(&ns, &["flag", "email"]).await.unwrap();

        for value in [1, 2] {
            let key = key_codec::index_entry_key(&ns, "flag", &Value::from(value));
            backend.set_add(&key, &["users:1".to_string()]).await.unwrap();
        }
        let email_key = key_codec::index_entry_key(&ns, "email", &Value::from("a@b.c"));
        backend.set_add(&email_key, &["users:1".to_string()]).await.unwrap();

        registry.revoke(&ns, &["flag"]).await.unwrap();
        assert_eq!(registry.list(&ns).await.unwrap().len(), 1);

        // Revoking alone keeps the data
        assert_eq!(backend.keys_matching("$schema:*").await.unwrap().len(), 4);

        assert_eq!(registry.sweep(&ns, "flag").await.unwrap(), 2);
        assert_eq!(backend.set_members(&email_key).await.unwrap().len(), 1);
    }
}
