use std::collections::BTreeMap;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

use crate::labels;
use crate::models::{Elasticsearch, ObjectMeta, Preconditions, Secret};
use crate::naming::remote_api_keys_secret_name;
use crate::reconciler::reconcile_secret;
use crate::storage::{is_not_found, SecretClient};

use super::KeystoreError;

/// Annotation holding the alias to API key ID mapping, as a JSON object.
pub const ALIASES_ANNOTATION: &str = "elasticsearch.k8s.elastic.co/remote-clusters-keys";

fn credentials_setting_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^cluster\.remote\.([A-Za-z0-9_-]+)\.credentials$")
            .expect("valid credentials regex")
    })
}

/// Keystore setting name holding the encoded API key of a remote cluster.
pub fn credentials_setting_name(alias: &str) -> String {
    format!("cluster.remote.{alias}.credentials")
}

/// Index of the cross-cluster API keys of one Elasticsearch cluster.
///
/// `aliases` maps a remote cluster alias to the ID of the API key expected for
/// it. `keys` maps the name embedded in the `cluster.remote.<name>.credentials`
/// setting to the encoded API key. That name is the alias: it is what
/// [`update`](Self::update) writes and what [`save`](Self::save) emits, which
/// matches the setting Elasticsearch reads for a remote cluster.
///
/// A default value is the empty index, used when no secret exists yet.
#[derive(Debug, Default)]
pub struct ApiKeyStore {
    aliases: BTreeMap<String, String>,
    keys: BTreeMap<String, SecretString>,
}

impl PartialEq for ApiKeyStore {
    fn eq(&self, other: &Self) -> bool {
        self.aliases == other.aliases
            && self.keys.len() == other.keys.len()
            && self.keys.iter().zip(other.keys.iter()).all(|((ka, va), (kb, vb))| {
                ka == kb && va.expose_secret() == vb.expose_secret()
            })
    }
}

impl Eq for ApiKeyStore {}

impl ApiKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the index from the cluster's remote API keys secret.
    ///
    /// A missing secret yields an empty index. A malformed aliases annotation
    /// is an error. Data entries that are not credential settings are skipped.
    pub async fn load(client: &dyn SecretClient, owner: &Elasticsearch) -> Result<Self> {
        let secret_name = remote_api_keys_secret_name(&owner.name);
        let secret = client
            .get(&owner.namespace, &secret_name)
            .await
            .with_context(|| {
                format!("Failed to get secret {}/{}", owner.namespace, secret_name)
            })?;

        let Some(secret) = secret else {
            tracing::debug!(
                namespace = %owner.namespace,
                es_name = %owner.name,
                "No remote cluster API keys secret found"
            );
            return Ok(Self::default());
        };

        Self::from_secret(&secret, owner)
    }

    fn from_secret(secret: &Secret, owner: &Elasticsearch) -> Result<Self> {
        let aliases = match secret.annotation(ALIASES_ANNOTATION) {
            Some(raw) => serde_json::from_str::<BTreeMap<String, String>>(raw).map_err(|source| {
                KeystoreError::MalformedAliases {
                    namespace: secret.namespace().to_string(),
                    secret_name: secret.name().to_string(),
                    source,
                }
            })?,
            None => BTreeMap::new(),
        };

        let mut keys = BTreeMap::new();
        for (setting, encoded) in &secret.data {
            let Some(captures) = credentials_setting_regex().captures(setting) else {
                tracing::debug!(
                    namespace = %owner.namespace,
                    es_name = %owner.name,
                    setting = %setting,
                    "Unknown remote cluster credential setting"
                );
                continue;
            };
            let Ok(encoded) = std::str::from_utf8(encoded) else {
                tracing::debug!(
                    namespace = %owner.namespace,
                    es_name = %owner.name,
                    setting = %setting,
                    "Remote cluster credential is not valid UTF-8"
                );
                continue;
            };
            keys.insert(captures[1].to_string(), SecretString::from(encoded.to_string()));
        }

        Ok(Self { aliases, keys })
    }

    /// ID of the API key expected for `alias`, or an empty string.
    pub fn key_id_for(&self, alias: &str) -> &str {
        self.aliases.get(alias).map(String::as_str).unwrap_or("")
    }

    /// [`key_id_for`](Self::key_id_for) on an index that may not have been loaded.
    pub fn key_id_for_opt<'a>(store: Option<&'a Self>, alias: &str) -> &'a str {
        store.map(|s| s.key_id_for(alias)).unwrap_or("")
    }

    /// Encoded API key stored for `alias`.
    pub fn encoded_credential(&self, alias: &str) -> Option<&SecretString> {
        self.keys.get(alias)
    }

    /// Aliases with the ID of their expected API key, in alias order.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, id)| (a.as_str(), id.as_str()))
    }

    /// Credential entries that no alias refers to.
    pub fn orphaned_credentials(&self) -> impl Iterator<Item = &str> {
        self.keys
            .keys()
            .filter(|name| !self.aliases.contains_key(*name))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Insert or replace the API key of `alias`.
    ///
    /// Aliases are limited to ASCII letters, digits, `_` and `-`; others are
    /// rejected when the index is saved.
    pub fn update(
        &mut self,
        alias: impl Into<String>,
        key_id: impl Into<String>,
        encoded_key: impl Into<String>,
    ) -> &mut Self {
        let alias = alias.into();
        self.keys
            .insert(alias.clone(), SecretString::from(encoded_key.into()));
        self.aliases.insert(alias, key_id.into());
        self
    }

    /// Forget `alias`. Does nothing if it is unknown.
    pub fn delete(&mut self, alias: &str) -> &mut Self {
        self.aliases.remove(alias);
        self.keys.remove(alias);
        self
    }

    /// True when no alias is recorded. The credential entries are not considered.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// [`is_empty`](Self::is_empty) on an index that may not have been loaded.
    pub fn is_empty_opt(store: Option<&Self>) -> bool {
        store.map_or(true, Self::is_empty)
    }

    /// Build the secret this index persists to.
    ///
    /// Fails on an alias that cannot be read back from its setting name.
    pub fn to_secret(&self, owner: &Elasticsearch) -> Result<Secret> {
        let aliases =
            serde_json::to_string(&self.aliases).context("Failed to serialize key aliases")?;
        let mut data = BTreeMap::new();
        for (name, encoded) in &self.keys {
            let setting = credentials_setting_name(name);
            if !credentials_setting_regex().is_match(&setting) {
                return Err(KeystoreError::InvalidAlias {
                    alias: name.clone(),
                }
                .into());
            }
            data.insert(setting, encoded.expose_secret().as_bytes().to_vec());
        }

        let mut metadata = ObjectMeta::new(&owner.namespace, remote_api_keys_secret_name(&owner.name));
        metadata.annotations.insert(ALIASES_ANNOTATION.to_string(), aliases);
        metadata.labels = labels::add_credentials_label(labels::new_labels(owner));

        Ok(Secret { metadata, data })
    }

    /// Persist the index.
    ///
    /// An empty index deletes the secret, guarded by the uid just read so that
    /// a secret recreated in the meantime survives. Otherwise the secret is
    /// created or updated to match the index.
    pub async fn save(&self, client: &dyn SecretClient, owner: &Elasticsearch) -> Result<()> {
        let secret_name = remote_api_keys_secret_name(&owner.name);
        if self.is_empty() {
            let current = client
                .get(&owner.namespace, &secret_name)
                .await
                .with_context(|| {
                    format!("Failed to get secret {}/{}", owner.namespace, secret_name)
                })?;
            let Some(current) = current else {
                return Ok(());
            };

            let preconditions = Preconditions {
                uid: current.metadata.uid.clone(),
                resource_version: None,
            };
            match client
                .delete(&owner.namespace, &secret_name, &preconditions)
                .await
            {
                Ok(()) => {}
                Err(err) if is_not_found(&err) => {
                    tracing::debug!(
                        namespace = %owner.namespace,
                        es_name = %owner.name,
                        "Remote cluster API keys secret already deleted"
                    );
                    return Ok(());
                }
                Err(err) => {
                    return Err(err.context(format!(
                        "Failed to delete secret {}/{}",
                        owner.namespace, secret_name
                    )));
                }
            }
            tracing::info!(
                namespace = %owner.namespace,
                es_name = %owner.name,
                "Deleted remote cluster API keys secret"
            );
            return Ok(());
        }

        let expected = self.to_secret(owner)?;
        reconcile_secret(client, expected, owner).await?;
        Ok(())
    }
}
