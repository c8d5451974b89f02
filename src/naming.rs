//! Names of objects derived from their Elasticsearch owner.

const ES_NAME_SEGMENT: &str = "es";
const REMOTE_API_KEYS_SUFFIX: &str = "remote-api-keys";

/// Name of the secret holding the remote cluster API keys of a cluster.
///
/// ```
/// use remote_keys::naming::remote_api_keys_secret_name;
///
/// assert_eq!(remote_api_keys_secret_name("quickstart"), "quickstart-es-remote-api-keys");
/// ```
pub fn remote_api_keys_secret_name(es_name: &str) -> String {
    format!("{es_name}-{ES_NAME_SEGMENT}-{REMOTE_API_KEYS_SUFFIX}")
}
