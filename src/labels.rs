//! Labels stamped on objects managed on behalf of an Elasticsearch cluster.

use std::collections::BTreeMap;

use crate::models::Elasticsearch;

pub const TYPE_LABEL: &str = "common.k8s.elastic.co/type";
pub const TYPE_VALUE: &str = "elasticsearch";
pub const CLUSTER_NAME_LABEL: &str = "elasticsearch.k8s.elastic.co/cluster-name";

/// Marks secrets that carry credentials.
pub const CREDENTIALS_LABEL: &str = "eck.k8s.elastic.co/credentials";

pub fn new_labels(es: &Elasticsearch) -> BTreeMap<String, String> {
    BTreeMap::from([
        (TYPE_LABEL.to_string(), TYPE_VALUE.to_string()),
        (CLUSTER_NAME_LABEL.to_string(), es.name.clone()),
    ])
}

pub fn add_credentials_label(mut labels: BTreeMap<String, String>) -> BTreeMap<String, String> {
    labels.insert(CREDENTIALS_LABEL.to_string(), "true".to_string());
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_labels() {
        let es = Elasticsearch::new("ns", "quickstart");
        let labels = add_credentials_label(new_labels(&es));
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[CLUSTER_NAME_LABEL], "quickstart");
        assert_eq!(labels[CREDENTIALS_LABEL], "true");
    }
}
