use serde::{Deserialize, Serialize};

use super::{OwnerReference, Uid};

/// Single key of a secret projected into the keystore, optionally renamed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyToPath {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Reference to a secret whose entries are loaded into the keystore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretSource {
    pub secret_name: String,

    /// Entries to project. All entries of the secret when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<KeyToPath>,
}

impl SecretSource {
    pub fn new(secret_name: impl Into<String>) -> Self {
        Self {
            secret_name: secret_name.into(),
            entries: Vec::new(),
        }
    }
}

/// The Elasticsearch cluster that owns the remote cluster keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Elasticsearch {
    pub name: String,
    pub namespace: String,
    pub uid: Uid,

    /// User-declared keystore sources.
    #[serde(default)]
    pub secure_settings: Vec<SecretSource>,
}

impl Elasticsearch {
    pub const KIND: &'static str = "Elasticsearch";

    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: Uid::new(),
            secure_settings: Vec::new(),
        }
    }

    /// Cluster known only by namespace and name, with a uid derived from both.
    pub fn from_identity(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let name = name.into();
        let uid = Uid::from_external(&format!("{namespace}/{name}"));
        Self {
            name,
            namespace,
            uid,
            secure_settings: Vec::new(),
        }
    }

    pub fn with_secure_settings(mut self, sources: Vec<SecretSource>) -> Self {
        self.secure_settings = sources;
        self
    }

    /// Owner reference to attach to objects managed on behalf of this cluster.
    pub fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            kind: Self::KIND.to_string(),
            name: self.name.clone(),
            uid: self.uid.clone(),
        }
    }
}
