use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::sync::Mutex;

use crate::models::{check_object_name, Preconditions, Secret};

use super::{check_preconditions, prepare_create, prepare_update, SecretClient, StoreError};

/// JSON file-based secret store.
///
/// Directory structure:
/// ```text
/// data/
///   {namespace}/
///     {name}.json
/// ```
///
/// Writes are serialized within the process so that the resource version
/// check and the write happen as one step.
pub struct JsonFileSecretClient {
    base_path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileSecretClient {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    fn namespace_dir(&self, namespace: &str) -> Result<PathBuf> {
        let namespace = check_object_name(namespace).map_err(StoreError::from)?;
        Ok(self.base_path.join(namespace))
    }

    fn secret_file(&self, namespace: &str, name: &str) -> Result<PathBuf> {
        let name = check_object_name(name).map_err(StoreError::from)?;
        Ok(self.namespace_dir(namespace)?.join(format!("{name}.json")))
    }

    async fn read_secret(&self, path: &Path) -> Result<Option<Secret>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let secret = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse secret from {}", path.display()))?;
                Ok(Some(secret))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn write_secret(&self, path: &Path, secret: &Secret) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }
        let content = serde_json::to_string_pretty(secret).context("Failed to serialize secret")?;

        // Write to a sibling then rename so readers never see a torn file.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl SecretClient for JsonFileSecretClient {
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>> {
        self.read_secret(&self.secret_file(namespace, name)?).await
    }

    async fn list(&self, namespace: &str) -> Result<Vec<Secret>> {
        let dir = self.namespace_dir(namespace)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to read directory"),
        };

        let mut secrets = Vec::new();
        while let Some(entry) = entries.next_entry().await.context("Failed to read entry")? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_secret(&path).await {
                Ok(Some(secret)) => secrets.push(secret),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Skipping unreadable secret");
                }
            }
        }
        secrets.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(secrets)
    }

    async fn create(&self, secret: &Secret) -> Result<Secret> {
        let path = self.secret_file(secret.namespace(), secret.name())?;
        let _guard = self.write_lock.lock().await;
        if self.read_secret(&path).await?.is_some() {
            return Err(StoreError::already_exists(secret).into());
        }
        let created = prepare_create(secret);
        self.write_secret(&path, &created).await?;
        Ok(created)
    }

    async fn update(&self, secret: &Secret) -> Result<Secret> {
        let path = self.secret_file(secret.namespace(), secret.name())?;
        let _guard = self.write_lock.lock().await;
        let stored = self
            .read_secret(&path)
            .await?
            .ok_or_else(|| StoreError::not_found(secret))?;
        let updated = prepare_update(&stored, secret)?;
        self.write_secret(&path, &updated).await?;
        Ok(updated)
    }

    async fn delete(
        &self,
        namespace: &str,
        name: &str,
        preconditions: &Preconditions,
    ) -> Result<()> {
        let path = self.secret_file(namespace, name)?;
        let _guard = self.write_lock.lock().await;
        let stored = self
            .read_secret(&path)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;
        check_preconditions(&stored, preconditions)?;
        fs::remove_file(&path)
            .await
            .with_context(|| format!("Failed to delete {}", path.display()))?;
        Ok(())
    }
}
