//! Deterministic dataset identity.

use std::path::Path;

use uuid::Uuid;

/// Name-based UUID (v5, URL namespace) of a dataset file path.
///
/// The same path always maps to the same id, which is what makes re-runs
/// skip already registered files. The name is the raw path bytes, so paths
/// that are not valid UTF-8 still get distinct ids.
pub fn dataset_id(path: &Path) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_URL, path.as_os_str().as_encoded_bytes())
}
