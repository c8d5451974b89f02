//! Cross-cluster API keys of an Elasticsearch cluster.
//!
//! The keys live in one secret per cluster (see
//! [`remote_api_keys_secret_name`](crate::naming::remote_api_keys_secret_name)):
//!
//! - the `elasticsearch.k8s.elastic.co/remote-clusters-keys` annotation maps each
//!   remote cluster alias to the ID of its API key, as a JSON object;
//! - each `cluster.remote.<alias>.credentials` entry holds the encoded key.
//!
//! A reconciliation pass loads an [`ApiKeyStore`], applies updates and
//! deletions, then saves it. [`with_remote_cluster_api_keys`] adds the secret
//! to the sources of the cluster keystore.

mod api_key_store;
mod extended;

pub use api_key_store::{credentials_setting_name, ApiKeyStore, ALIASES_ANNOTATION};
pub use extended::{with_remote_cluster_api_keys, ExtendedKeystore, HasKeystore};

#[derive(Debug, thiserror::Error)]
pub enum KeystoreError {
    #[error("malformed remote cluster key aliases in secret {namespace}/{secret_name}")]
    MalformedAliases {
        namespace: String,
        secret_name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("remote cluster alias {alias:?} must only contain ASCII letters, digits, '_' or '-'")]
    InvalidAlias { alias: String },
}
