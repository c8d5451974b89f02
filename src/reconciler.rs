//! Create-or-update of a secret towards an expected state.

use anyhow::{Context, Result};

use crate::models::{Elasticsearch, Secret};
use crate::storage::SecretClient;

/// Make the stored secret match `expected`.
///
/// Creates the secret if it is missing. Otherwise updates it when its data
/// differs, when an expected label or annotation is missing or different, or
/// when the owner reference is missing. Labels and annotations set by others
/// are preserved. The update carries the fetched resource version, so a
/// concurrent writer makes it fail instead of being overwritten.
pub async fn reconcile_secret(
    client: &dyn SecretClient,
    mut expected: Secret,
    owner: &Elasticsearch,
) -> Result<Secret> {
    let owner_ref = owner.owner_reference();
    if !expected.metadata.owner_references.contains(&owner_ref) {
        expected.metadata.owner_references.push(owner_ref);
    }

    let current = client
        .get(expected.namespace(), expected.name())
        .await
        .with_context(|| format!("Failed to get secret {}/{}", expected.namespace(), expected.name()))?;

    let Some(current) = current else {
        tracing::debug!(
            namespace = %expected.namespace(),
            secret_name = %expected.name(),
            "Creating secret"
        );
        return client.create(&expected).await;
    };

    if !needs_update(&current, &expected) {
        return Ok(current);
    }

    tracing::debug!(
        namespace = %expected.namespace(),
        secret_name = %expected.name(),
        "Updating secret"
    );
    let mut updated = current;
    updated.data = expected.data;
    updated.metadata.labels.extend(expected.metadata.labels);
    updated.metadata.annotations.extend(expected.metadata.annotations);
    for owner_ref in expected.metadata.owner_references {
        if !updated.metadata.owner_references.contains(&owner_ref) {
            updated.metadata.owner_references.push(owner_ref);
        }
    }
    client.update(&updated).await
}

fn needs_update(current: &Secret, expected: &Secret) -> bool {
    let labels_match = expected
        .metadata
        .labels
        .iter()
        .all(|(k, v)| current.metadata.labels.get(k) == Some(v));
    let annotations_match = expected
        .metadata
        .annotations
        .iter()
        .all(|(k, v)| current.metadata.annotations.get(k) == Some(v));
    let owners_match = expected
        .metadata
        .owner_references
        .iter()
        .all(|o| current.metadata.owner_references.contains(o));

    current.data != expected.data || !labels_match || !annotations_match || !owners_match
}
