use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error(
    "Invalid object name {value:?}: names must be a single path segment (no '/', '\\\\', NUL, '.' or '..')"
)]
pub struct NameError {
    value: String,
}

/// Returns the name unchanged if it is safe to use as a single path segment.
pub fn check_object_name(value: &str) -> Result<&str, NameError> {
    if is_path_safe(value) {
        Ok(value)
    } else {
        Err(NameError {
            value: value.to_string(),
        })
    }
}

/// Returns true if the string is safe to use as a single path segment.
pub fn is_path_safe(value: &str) -> bool {
    if value.is_empty() || value == "." || value == ".." {
        return false;
    }
    !value.chars().any(|c| c == '/' || c == '\\' || c == '\0')
}

/// Server-assigned identity of a stored object.
///
/// A new uid is minted every time an object is created, so a secret that was
/// deleted and recreated under the same name carries a different uid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Default for Uid {
    fn default() -> Self {
        Self::new()
    }
}

impl Uid {
    /// Namespace UUID for deriving deterministic uids from object identities.
    const NAMESPACE: Uuid = Uuid::from_u128(0x6ba7b810_9dad_11d1_80b4_00c04fd430c8);

    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Deterministic uid for an object known only by an external identity,
    /// such as `namespace/name`. The same input always yields the same uid.
    pub fn from_external(value: &str) -> Self {
        Self(Uuid::new_v5(&Self::NAMESPACE, value.as_bytes()).to_string())
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for Uid {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uids_are_unique() {
        assert_ne!(Uid::new(), Uid::new());
    }

    #[test]
    fn test_from_external_is_deterministic() {
        assert_eq!(Uid::from_external("ns/quickstart"), Uid::from_external("ns/quickstart"));
        assert_ne!(Uid::from_external("ns/quickstart"), Uid::from_external("ns/other"));
    }

    #[test]
    fn test_check_object_name_rejects_unsafe_values() {
        assert!(check_object_name("../escape").is_err());
        assert!(check_object_name("..").is_err());
        assert!(check_object_name(".").is_err());
        assert!(check_object_name("").is_err());
        assert!(check_object_name("foo/bar").is_err());
        assert!(check_object_name("foo\\bar").is_err());
        assert!(check_object_name("bad\0name").is_err());
        assert_eq!(
            check_object_name("quickstart-es-remote-api-keys"),
            Ok("quickstart-es-remote-api-keys")
        );
    }
}
