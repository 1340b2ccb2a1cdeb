use std::fmt;

use super::StorageError;

/// Suffix appended to an object key to form its side-car key.
pub const SIDECAR_SUFFIX: &str = ".meta.json";

/// A `{container_or_bucket}/{object_key}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectPath {
    container: String,
    key: String,
}

impl ObjectPath {
    pub fn new(container: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            key: key.into(),
        }
    }

    /// Splits a fully-qualified path on its first `/`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidPath` if either half is empty.
    pub fn parse(path: &str) -> Result<Self, StorageError> {
        match path.split_once('/') {
            Some((container, key)) if !container.is_empty() && !key.is_empty() => {
                Ok(Self::new(container, key))
            }
            _ => Err(StorageError::InvalidPath(path.to_string())),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Path of the side-car that describes this object.
    pub fn sidecar(&self) -> ObjectPath {
        Self::new(self.container.clone(), format!("{}{SIDECAR_SUFFIX}", self.key))
    }

    pub fn is_sidecar(&self) -> bool {
        is_sidecar_key(&self.key)
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.key)
    }
}

pub fn is_sidecar_key(key: &str) -> bool {
    key.ends_with(SIDECAR_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_on_first_slash() {
        let path = ObjectPath::parse("bucket/dir/file.csv").unwrap();
        assert_eq!(path.container(), "bucket");
        assert_eq!(path.key(), "dir/file.csv");
        assert_eq!(path.to_string(), "bucket/dir/file.csv");
    }

    #[test]
    fn parse_rejects_missing_container_or_key() {
        assert!(matches!(ObjectPath::parse("orders.csv"), Err(StorageError::InvalidPath(_))));
        assert!(ObjectPath::parse("/orders.csv").is_err());
        assert!(ObjectPath::parse("bucket/").is_err());
    }

    #[test]
    fn sidecar_appends_suffix() {
        let sidecar = ObjectPath::parse("bucket/orders.csv").unwrap().sidecar();
        assert_eq!(sidecar.to_string(), "bucket/orders.csv.meta.json");
        assert!(sidecar.is_sidecar());
    }
}
