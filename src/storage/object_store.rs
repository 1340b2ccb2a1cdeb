//! Object-storage collaborator interface.

use thiserror::Error;

use super::path::is_sidecar_key;

/// Errors raised by an object-storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Object or side-car does not exist. Callers treat this as "not scanned".
    #[error("object not found: {0}")]
    NotFound(String),

    /// Path is not of the form `{container}/{key}`.
    #[error("invalid object path: {0}")]
    InvalidPath(String),

    /// Underlying I/O failure.
    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Any other backend failure (auth, throttling, protocol).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// One entry returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Object key within the container.
    pub key: String,
    pub size: Option<u64>,
    pub content_type: Option<String>,
}

/// Properties returned by a head lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectProperties {
    pub size: u64,
    pub content_type: String,
}

/// A bucket/container-addressed blob store.
///
/// Implementations must be cheap to share behind an `Arc`; every method is a
/// single blocking round-trip without internal retries or timeouts beyond
/// what the transport enforces.
pub trait ObjectStore: Send + Sync {
    /// Lists every object under `prefix` in `container`, side-cars included.
    fn list(&self, container: &str, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError>;

    /// Returns up to `len` leading bytes of an object.
    fn read_head(&self, container: &str, key: &str, len: usize) -> Result<Vec<u8>, StorageError>;

    /// Returns a whole object.
    fn read(&self, container: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Looks up size and content type.
    fn properties(&self, container: &str, key: &str) -> Result<ObjectProperties, StorageError>;

    /// Writes a whole object, replacing any previous version.
    fn put(&self, container: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;
}

/// Lists the data objects in a container, excluding `.meta.json` side-cars.
pub fn data_objects(store: &dyn ObjectStore, container: &str) -> Result<Vec<ObjectInfo>, StorageError> {
    Ok(store
        .list(container, "")?
        .into_iter()
        .filter(|info| !is_sidecar_key(&info.key))
        .collect())
}
