/// Object storage collaborators.
///
/// Defines the `ObjectStore` interface the rest of the crate reads and writes
/// through, path helpers for `{container}/{key}` identifiers and side-car keys,
/// and a filesystem-backed implementation.
mod local;
mod object_store;
mod path;

pub use local::{LocalObjectStore, guess_content_type};
pub use object_store::{ObjectInfo, ObjectProperties, ObjectStore, StorageError, data_objects};
pub use path::{ObjectPath, SIDECAR_SUFFIX, is_sidecar_key};
