//! In-memory secret client for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use tokio::sync::Mutex;

use crate::models::{Preconditions, Secret};

use super::{check_preconditions, prepare_create, prepare_update, SecretClient, StoreError};

type Key = (String, String);

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

/// In-memory secret store for testing purposes.
///
/// Counts writes so tests can assert that a reconcile pass was a no-op.
pub struct MemorySecretClient {
    secrets: Mutex<HashMap<Key, Secret>>,
    writes: AtomicUsize,
}

impl MemorySecretClient {
    pub fn new() -> Self {
        Self {
            secrets: Mutex::new(HashMap::new()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of successful create, update and delete calls.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Default for MemorySecretClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SecretClient for MemorySecretClient {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        let secrets = self.secrets.lock().await;
        Ok(secrets.get(&key(namespace, name)).cloned())
    }

    async fn list(&self, namespace: &str) -> Result<Vec<Secret>> {
        let secrets = self.secrets.lock().await;
        let mut found: Vec<Secret> = secrets
            .values()
            .filter(|s| s.namespace() == namespace)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(found)
    }

    async fn create(&self, secret: &Secret) -> Result<Secret> {
        let mut secrets = self.secrets.lock().await;
        let k = key(secret.namespace(), secret.name());
        if secrets.contains_key(&k) {
            return Err(StoreError::already_exists(secret).into());
        }
        let created = prepare_create(secret);
        secrets.insert(k, created.clone());
        self.record_write();
        Ok(created)
    }

    async fn update(&self, secret: &Secret) -> Result<Secret> {
        let mut secrets = self.secrets.lock().await;
        let k = key(secret.namespace(), secret.name());
        let stored = secrets
            .get(&k)
            .ok_or_else(|| StoreError::not_found(secret))?;
        let updated = prepare_update(stored, secret)?;
        secrets.insert(k, updated.clone());
        self.record_write();
        Ok(updated)
    }

    async fn delete(
        &self,
        namespace: &str,
        name: &str,
        preconditions: &Preconditions,
    ) -> Result<()> {
        let mut secrets = self.secrets.lock().await;
        let k = key(namespace, name);
        let stored = secrets.get(&k).ok_or_else(|| StoreError::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        })?;
        check_preconditions(stored, preconditions)?;
        secrets.remove(&k);
        self.record_write();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{is_conflict, is_not_found};

    #[tokio::test]
    async fn memory_client_create_then_update() -> Result<()> {
        let client = MemorySecretClient::new();
        let created = client.create(&Secret::new("ns", "s")).await?;
        assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));
        assert!(created.metadata.uid.is_some());

        let mut changed = created.clone();
        changed.data.insert("k".to_string(), b"v".to_vec());
        let updated = client.update(&changed).await?;
        assert_eq!(updated.metadata.resource_version.as_deref(), Some("2"));
        assert_eq!(updated.metadata.uid, created.metadata.uid);
        assert_eq!(client.write_count(), 2);

        // Writing with the old version loses the race.
        let err = client.update(&changed).await.unwrap_err();
        assert!(is_conflict(&err));

        Ok(())
    }

    #[tokio::test]
    async fn memory_client_rejects_duplicate_create() -> Result<()> {
        let client = MemorySecretClient::new();
        client.create(&Secret::new("ns", "s")).await?;
        let err = client.create(&Secret::new("ns", "s")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::AlreadyExists { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn memory_client_delete_missing_is_not_found() {
        let client = MemorySecretClient::new();
        let err = client
            .delete("ns", "missing", &Preconditions::default())
            .await
            .unwrap_err();
        assert!(is_not_found(&err));
    }

    #[tokio::test]
    async fn memory_client_list_is_namespace_scoped() -> Result<()> {
        let client = MemorySecretClient::new();
        client.create(&Secret::new("a", "two")).await?;
        client.create(&Secret::new("a", "one")).await?;
        client.create(&Secret::new("b", "three")).await?;

        let names: Vec<String> = client
            .list("a")
            .await?
            .into_iter()
            .map(|s| s.metadata.name)
            .collect();
        assert_eq!(names, vec!["one", "two"]);
        Ok(())
    }
}
