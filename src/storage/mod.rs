//! Secret storage abstraction.
//!
//! [`SecretClient`] is the minimal surface the key index needs from a
//! Kubernetes-style object store: get/create/update/delete on named,
//! namespaced secrets, with optimistic concurrency on writes.

mod json_file;
mod memory;

pub use json_file::JsonFileSecretClient;
pub use memory::MemorySecretClient;

use anyhow::Result;

use crate::models::{NameError, Preconditions, Secret, Uid};

/// Typed failures a caller may need to tell apart.
///
/// Client methods return `anyhow::Result`; these are recoverable through
/// `downcast_ref::<StoreError>()`, see [`is_not_found`] and [`is_conflict`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("secret {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    #[error("secret {namespace}/{name} already exists")]
    AlreadyExists { namespace: String, name: String },

    #[error("conflict on secret {namespace}/{name}: {reason}")]
    Conflict {
        namespace: String,
        name: String,
        reason: String,
    },

    #[error(transparent)]
    InvalidName(#[from] NameError),
}

impl StoreError {
    pub fn not_found(secret: &Secret) -> Self {
        Self::NotFound {
            namespace: secret.namespace().to_string(),
            name: secret.name().to_string(),
        }
    }

    pub fn already_exists(secret: &Secret) -> Self {
        Self::AlreadyExists {
            namespace: secret.namespace().to_string(),
            name: secret.name().to_string(),
        }
    }

    pub fn conflict(secret: &Secret, reason: impl Into<String>) -> Self {
        Self::Conflict {
            namespace: secret.namespace().to_string(),
            name: secret.name().to_string(),
            reason: reason.into(),
        }
    }
}

/// True if the error, or any error in its chain, is [`StoreError::NotFound`].
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| matches!(cause.downcast_ref::<StoreError>(), Some(StoreError::NotFound { .. })))
}

/// True if the error, or any error in its chain, is [`StoreError::Conflict`].
pub fn is_conflict(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| matches!(cause.downcast_ref::<StoreError>(), Some(StoreError::Conflict { .. })))
}

/// Client for an external secret store.
#[async_trait::async_trait]
pub trait SecretClient: Send + Sync {
    /// Fetch a secret. Returns `Ok(None)` if it doesn't exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<Secret>>;

    async fn list(&self, namespace: &str) -> Result<Vec<Secret>>;

    /// Create a secret, assigning its uid and initial resource version.
    async fn create(&self, secret: &Secret) -> Result<Secret>;

    /// Replace an existing secret.
    ///
    /// When `secret.metadata.resource_version` is set it must match the stored
    /// version, otherwise the update fails with [`StoreError::Conflict`].
    async fn update(&self, secret: &Secret) -> Result<Secret>;

    /// Delete a secret if the stored object satisfies `preconditions`.
    async fn delete(&self, namespace: &str, name: &str, preconditions: &Preconditions)
        -> Result<()>;
}

/// Stamp server-owned metadata on a secret about to be created.
pub(crate) fn prepare_create(secret: &Secret) -> Secret {
    let mut created = secret.clone();
    created.metadata.uid = Some(Uid::new());
    created.metadata.resource_version = Some("1".to_string());
    created.metadata.creation_timestamp = Some(chrono::Utc::now());
    created
}

/// Validate an update against the stored object and return what to persist.
pub(crate) fn prepare_update(stored: &Secret, secret: &Secret) -> Result<Secret, StoreError> {
    if let Some(expected) = &secret.metadata.resource_version {
        if stored.metadata.resource_version.as_ref() != Some(expected) {
            return Err(StoreError::conflict(
                secret,
                format!(
                    "resource version {expected} is stale (stored {})",
                    stored.metadata.resource_version.as_deref().unwrap_or("none")
                ),
            ));
        }
    }
    if let Some(uid) = &secret.metadata.uid {
        if stored.metadata.uid.as_ref() != Some(uid) {
            return Err(StoreError::conflict(secret, "uid does not match stored object"));
        }
    }

    let mut updated = secret.clone();
    updated.metadata.uid = stored.metadata.uid.clone();
    updated.metadata.creation_timestamp = stored.metadata.creation_timestamp;
    updated.metadata.resource_version = Some(next_resource_version(stored));
    Ok(updated)
}

/// Check delete preconditions against the stored object.
pub(crate) fn check_preconditions(
    stored: &Secret,
    preconditions: &Preconditions,
) -> Result<(), StoreError> {
    if let Some(uid) = &preconditions.uid {
        if stored.metadata.uid.as_ref() != Some(uid) {
            return Err(StoreError::conflict(
                stored,
                format!("precondition failed: uid {uid} does not match stored object"),
            ));
        }
    }
    if let Some(version) = &preconditions.resource_version {
        if stored.metadata.resource_version.as_ref() != Some(version) {
            return Err(StoreError::conflict(
                stored,
                format!("precondition failed: resource version {version} is stale"),
            ));
        }
    }
    Ok(())
}

fn next_resource_version(stored: &Secret) -> String {
    let current = stored
        .metadata
        .resource_version
        .as_deref()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0);
    (current + 1).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Secret {
        let mut secret = Secret::new("ns", "s");
        secret.metadata.uid = Some(Uid::from("uid-1"));
        secret.metadata.resource_version = Some("4".to_string());
        secret
    }

    #[test]
    fn test_prepare_update_bumps_version_and_keeps_uid() -> Result<()> {
        let mut incoming = Secret::new("ns", "s");
        incoming.metadata.resource_version = Some("4".to_string());

        let updated = prepare_update(&stored(), &incoming)?;
        assert_eq!(updated.metadata.resource_version.as_deref(), Some("5"));
        assert_eq!(updated.metadata.uid, Some(Uid::from("uid-1")));
        Ok(())
    }

    #[test]
    fn test_prepare_update_rejects_stale_version() {
        let mut incoming = Secret::new("ns", "s");
        incoming.metadata.resource_version = Some("3".to_string());

        let err = prepare_update(&stored(), &incoming).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn test_check_preconditions_on_uid() {
        assert!(check_preconditions(&stored(), &Preconditions::uid(Uid::from("uid-1"))).is_ok());
        assert!(check_preconditions(&stored(), &Preconditions::uid(Uid::from("uid-2"))).is_err());
        assert!(check_preconditions(&stored(), &Preconditions::default()).is_ok());
    }

    #[test]
    fn test_is_not_found_walks_context_chain() {
        let err = anyhow::Error::new(StoreError::NotFound {
            namespace: "ns".to_string(),
            name: "s".to_string(),
        })
        .context("Failed to delete secret");
        assert!(is_not_found(&err));
        assert!(!is_conflict(&err));
        assert!(!is_not_found(&anyhow::anyhow!("boom")));
    }
}
