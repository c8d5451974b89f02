mod elasticsearch;
mod secret;
mod uid;

pub use elasticsearch::{Elasticsearch, KeyToPath, SecretSource};
pub use secret::{ObjectMeta, OwnerReference, Preconditions, Secret};
pub use uid::{check_object_name, is_path_safe, NameError, Uid};
