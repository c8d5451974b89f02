use anyhow::{Context, Result};

use crate::models::{Elasticsearch, SecretSource};
use crate::naming::remote_api_keys_secret_name;
use crate::storage::SecretClient;

/// Something whose secure settings are assembled into a keystore.
pub trait HasKeystore {
    fn name(&self) -> &str;
    fn namespace(&self) -> &str;
    fn secure_settings(&self) -> &[SecretSource];
}

impl HasKeystore for Elasticsearch {
    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn secure_settings(&self) -> &[SecretSource] {
        &self.secure_settings
    }
}

/// A missing keystore owner has no secure settings.
impl<T: HasKeystore> HasKeystore for Option<T> {
    fn name(&self) -> &str {
        self.as_ref().map_or("", HasKeystore::name)
    }

    fn namespace(&self) -> &str {
        self.as_ref().map_or("", HasKeystore::namespace)
    }

    fn secure_settings(&self) -> &[SecretSource] {
        match self {
            Some(inner) => inner.secure_settings(),
            None => &[],
        }
    }
}

/// Secure settings of a cluster, plus its remote API keys secret when it exists.
#[derive(Debug, Clone)]
pub struct ExtendedKeystore<'a> {
    es: &'a Elasticsearch,
    secure_settings: Vec<SecretSource>,
}

impl HasKeystore for ExtendedKeystore<'_> {
    fn name(&self) -> &str {
        &self.es.name
    }

    fn namespace(&self) -> &str {
        &self.es.namespace
    }

    fn secure_settings(&self) -> &[SecretSource] {
        &self.secure_settings
    }
}

/// Extend the secure settings of `es` with its remote API keys secret.
///
/// The settings are returned unchanged if the secret does not exist.
pub async fn with_remote_cluster_api_keys<'a>(
    client: &dyn SecretClient,
    es: &'a Elasticsearch,
) -> Result<ExtendedKeystore<'a>> {
    let mut secure_settings = es.secure_settings.clone();
    let secret_name = remote_api_keys_secret_name(&es.name);
    let exists = client
        .get(&es.namespace, &secret_name)
        .await
        .with_context(|| format!("Failed to get secret {}/{}", es.namespace, secret_name))?
        .is_some();
    if exists {
        secure_settings.push(SecretSource::new(secret_name));
    }
    Ok(ExtendedKeystore { es, secure_settings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Secret;
    use crate::storage::MemorySecretClient;

    fn es() -> Elasticsearch {
        Elasticsearch::new("ns", "quickstart")
            .with_secure_settings(vec![SecretSource::new("user-settings")])
    }

    #[tokio::test]
    async fn extended_keystore_without_secret_keeps_settings() -> Result<()> {
        let client = MemorySecretClient::new();
        let es = es();
        let keystore = with_remote_cluster_api_keys(&client, &es).await?;
        assert_eq!(keystore.secure_settings(), es.secure_settings.as_slice());
        Ok(())
    }

    #[tokio::test]
    async fn extended_keystore_appends_secret() -> Result<()> {
        let client = MemorySecretClient::new();
        client
            .create(&Secret::new("ns", "quickstart-es-remote-api-keys"))
            .await?;
        let es = es();

        let keystore = with_remote_cluster_api_keys(&client, &es).await?;
        assert_eq!(
            keystore.secure_settings(),
            &[
                SecretSource::new("user-settings"),
                SecretSource::new("quickstart-es-remote-api-keys"),
            ]
        );
        assert_eq!(keystore.name(), "quickstart");
        // The owner itself is untouched.
        assert_eq!(es.secure_settings.len(), 1);
        Ok(())
    }

    #[test]
    fn missing_keystore_has_no_settings() {
        let missing: Option<Elasticsearch> = None;
        assert!(missing.secure_settings().is_empty());
        assert_eq!(missing.name(), "");
    }
}
