#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use remote_keys::keystore::ALIASES_ANNOTATION;
use remote_keys::models::{Elasticsearch, Preconditions, Secret};
use remote_keys::storage::{MemorySecretClient, SecretClient};

pub const SECRET_NAME: &str = "quickstart-es-remote-api-keys";

pub fn owner() -> Elasticsearch {
    Elasticsearch::from_identity("ns", "quickstart")
}

/// Secret as it would be written by an earlier reconciliation pass.
pub fn keys_secret(aliases: &str, data: &[(&str, &str)]) -> Secret {
    let mut secret = Secret::new("ns", SECRET_NAME);
    secret
        .metadata
        .annotations
        .insert(ALIASES_ANNOTATION.to_string(), aliases.to_string());
    secret.data = data
        .iter()
        .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
        .collect::<BTreeMap<_, _>>();
    secret
}

/// Client whose secret is deleted and recreated by another writer right
/// before the first delete call reaches the store.
pub struct RecreatingClient {
    pub inner: MemorySecretClient,
    raced: AtomicBool,
}

impl RecreatingClient {
    pub fn new(inner: MemorySecretClient) -> Self {
        Self {
            inner,
            raced: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl SecretClient for RecreatingClient {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        self.inner.get(namespace, name).await
    }

    async fn list(&self, namespace: &str) -> Result<Vec<Secret>> {
        self.inner.list(namespace).await
    }

    async fn create(&self, secret: &Secret) -> Result<Secret> {
        self.inner.create(secret).await
    }

    async fn update(&self, secret: &Secret) -> Result<Secret> {
        self.inner.update(secret).await
    }

    async fn delete(
        &self,
        namespace: &str,
        name: &str,
        preconditions: &Preconditions,
    ) -> Result<()> {
        if !self.raced.swap(true, Ordering::SeqCst) {
            if let Some(current) = self.inner.get(namespace, name).await? {
                self.inner
                    .delete(namespace, name, &Preconditions::default())
                    .await?;
                let mut recreated = current;
                recreated.metadata.uid = None;
                recreated.metadata.resource_version = None;
                self.inner.create(&recreated).await?;
            }
        }
        self.inner.delete(namespace, name, preconditions).await
    }
}

/// Client whose secret is deleted by another writer right before each
/// delete call reaches the store.
pub struct VanishingClient {
    pub inner: MemorySecretClient,
}

#[async_trait]
impl SecretClient for VanishingClient {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        self.inner.get(namespace, name).await
    }

    async fn list(&self, namespace: &str) -> Result<Vec<Secret>> {
        self.inner.list(namespace).await
    }

    async fn create(&self, secret: &Secret) -> Result<Secret> {
        self.inner.create(secret).await
    }

    async fn update(&self, secret: &Secret) -> Result<Secret> {
        self.inner.update(secret).await
    }

    async fn delete(
        &self,
        namespace: &str,
        name: &str,
        preconditions: &Preconditions,
    ) -> Result<()> {
        if self.inner.get(namespace, name).await?.is_some() {
            self.inner
                .delete(namespace, name, &Preconditions::default())
                .await?;
        }
        self.inner.delete(namespace, name, preconditions).await
    }
}

/// Client whose every call fails as if the API server were unreachable.
pub struct UnavailableClient;

#[async_trait]
impl SecretClient for UnavailableClient {
    async fn get(&self, _namespace: &str, _name: &str) -> Result<Option<Secret>> {
        anyhow::bail!("connection refused")
    }

    async fn list(&self, _namespace: &str) -> Result<Vec<Secret>> {
        anyhow::bail!("connection refused")
    }

    async fn create(&self, _secret: &Secret) -> Result<Secret> {
        anyhow::bail!("connection refused")
    }

    async fn update(&self, _secret: &Secret) -> Result<Secret> {
        anyhow::bail!("connection refused")
    }

    async fn delete(
        &self,
        _namespace: &str,
        _name: &str,
        _preconditions: &Preconditions,
    ) -> Result<()> {
        anyhow::bail!("connection refused")
    }
}
