//! Side-car metadata store.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::{FileRecord, Source};
use crate::storage::{ObjectPath, ObjectStore, SIDECAR_SUFFIX, StorageError, is_sidecar_key};

use super::SourceRouter;

enum Backend {
    /// Side-cars live beside their objects in the owning object store.
    Remote {
        router: SourceRouter,
        stores: HashMap<Source, Arc<dyn ObjectStore>>,
    },
    /// Side-cars live in one local directory, named by the percent-encoded path.
    Local { root: PathBuf },
}

/// Key-value cache from object path to [`FileRecord`], persisted as one
/// side-car per object.
///
/// Reads never fail: a missing, unreadable or corrupt side-car is reported as
/// absent. Writes are whole-record overwrites with last-writer-wins semantics;
/// there is no locking between concurrent writers of the same path.
pub struct MetadataStore {
    backend: Backend,
}

impl MetadataStore {
    /// Creates a store that writes side-cars into the object stores themselves.
    pub fn remote(router: SourceRouter, stores: HashMap<Source, Arc<dyn ObjectStore>>) -> Self {
        Self {
            backend: Backend::Remote { router, stores },
        }
    }

    /// Creates an offline store rooted at a local directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn local(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StorageError::Io {
            path: root.display().to_string(),
            source: e,
        })?;
        Ok(Self {
            backend: Backend::Local { root },
        })
    }

    /// Returns true when side-cars are kept in a local directory.
    pub fn is_offline(&self) -> bool {
        matches!(self.backend, Backend::Local { .. })
    }

    /// Fetches the record for `path`, or `None` if it was never scanned.
    ///
    /// `source` is used to route containers that were not registered
    /// explicitly.
    pub fn get(&self, path: &str, source: Source) -> Option<FileRecord> {
        let raw = match self.load(path, source) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::debug!(path, error = %e, "side-car not available");
                return None;
            }
        };
        match parse_sidecar(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!(path, error = %e, "side-car unreadable, treating as not scanned");
                None
            }
        }
    }

    /// Writes `record` as the side-car for `record.path`, replacing any
    /// existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the path is malformed, no object store handles the
    /// routed source, or the write fails.
    pub fn put(&self, record: &FileRecord) -> Result<(), StorageError> {
        let json = record
            .to_json()
            .map_err(|e| StorageError::Backend(format!("failed to serialize side-car: {e}")))?;

        match &self.backend {
            Backend::Remote { router, stores } => {
                let object = ObjectPath::parse(&record.path)?;
                let store = route(router, stores, object.container(), record.source)?;
                let sidecar = object.sidecar();
                store.put(sidecar.container(), sidecar.key(), json.as_bytes())?;
            }
            Backend::Local { root } => {
                ObjectPath::parse(&record.path)?;
                write_local(root, &record.path, json.as_bytes())?;
            }
        }

        tracing::debug!(path = %record.path, source = %record.source, "side-car written");
        Ok(())
    }

    /// Lists every readable side-car whose object path starts with `prefix`.
    ///
    /// Order is unspecified. Unreadable side-cars and unreachable containers
    /// are skipped with a warning.
    pub fn list_all(&self, prefix: &str) -> Vec<FileRecord> {
        match &self.backend {
            Backend::Remote { router, stores } => list_remote(router, stores, prefix),
            Backend::Local { root } => list_local(root, prefix),
        }
    }

    fn load(&self, path: &str, source: Source) -> Result<String, StorageError> {
        let bytes = match &self.backend {
            Backend::Remote { router, stores } => {
                let object = ObjectPath::parse(path)?;
                let store = route(router, stores, object.container(), source)?;
                let sidecar = object.sidecar();
                store.read(sidecar.container(), sidecar.key())?
            }
            Backend::Local { root } => {
                let file = local_file(root, path);
                fs::read(&file).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::NotFound {
                        StorageError::NotFound(path.to_string())
                    } else {
                        StorageError::Io {
                            path: path.to_string(),
                            source: e,
                        }
                    }
                })?
            }
        };
        String::from_utf8(bytes).map_err(|e| StorageError::Backend(e.to_string()))
    }
}

fn parse_sidecar(raw: &str) -> Result<FileRecord, serde_json::Error> {
    FileRecord::from_json(raw)
}

fn route<'a>(
    router: &SourceRouter,
    stores: &'a HashMap<Source, Arc<dyn ObjectStore>>,
    container: &str,
    hint: Source,
) -> Result<&'a Arc<dyn ObjectStore>, StorageError> {
    let source = router.route_with_hint(container, Some(hint));
    stores
        .get(&source)
        .ok_or_else(|| StorageError::Backend(format!("no object store configured for {source}")))
}

fn local_file(root: &Path, path: &str) -> PathBuf {
    root.join(format!("{}{SIDECAR_SUFFIX}", urlencoding::encode(path)))
}

fn write_local(root: &Path, path: &str, data: &[u8]) -> Result<(), StorageError> {
    let io_err = |e: std::io::Error| StorageError::Io {
        path: path.to_string(),
        source: e,
    };
    let mut tmp = tempfile::NamedTempFile::new_in(root).map_err(io_err)?;
    tmp.write_all(data).map_err(io_err)?;
    tmp.persist(local_file(root, path)).map_err(|e| io_err(e.error))?;
    Ok(())
}

fn list_local(root: &Path, prefix: &str) -> Vec<FileRecord> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(root = %root.display(), error = %e, "cannot list side-car cache");
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        let Some(encoded) = name.strip_suffix(SIDECAR_SUFFIX) else {
            continue;
        };
        let Ok(path) = urlencoding::decode(encoded) else {
            continue;
        };
        if !path.starts_with(prefix) {
            continue;
        }
        match fs::read_to_string(entry.path())
            .map_err(|e| e.to_string())
            .and_then(|raw| parse_sidecar(&raw).map_err(|e| e.to_string()))
        {
            Ok(record) => records.push(record),
            Err(e) => tracing::warn!(path = %path, error = %e, "could not parse side-car"),
        }
    }
    records
}

fn list_remote(
    router: &SourceRouter,
    stores: &HashMap<Source, Arc<dyn ObjectStore>>,
    prefix: &str,
) -> Vec<FileRecord> {
    let mut records = Vec::new();
    for (container, source) in router.registrations() {
        let Some(store) = stores.get(&source) else {
            continue;
        };
        let listed = match store.list(container, "") {
            Ok(listed) => listed,
            Err(e) => {
                tracing::warn!(container, source = %source, error = %e, "cannot list side-cars");
                continue;
            }
        };
        for info in listed.into_iter().filter(|i| is_sidecar_key(&i.key)) {
            let object_key = info.key.strip_suffix(SIDECAR_SUFFIX).unwrap_or(&info.key);
            let path = format!("{container}/{object_key}");
            if !path.starts_with(prefix) {
                continue;
            }
            let parsed = store
                .read(container, &info.key)
                .map_err(|e| e.to_string())
                .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()))
                .and_then(|raw| parse_sidecar(&raw).map_err(|e| e.to_string()));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(path = %path, error = %e, "could not parse side-car"),
            }
        }
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FileRecordBuilder;
    use crate::storage::LocalObjectStore;
    use time::macros::datetime;

    fn record(path: &str, source: Source) -> FileRecord {
        FileRecordBuilder::new(path, source)
            .description("Orders with totals per customer")
            .last_scanned(datetime!(2025-01-01 00:00:00 UTC))
            .build()
    }

    fn remote_store(dir: &Path) -> (MetadataStore, Arc<LocalObjectStore>) {
        let objects = Arc::new(LocalObjectStore::new(dir));
        let router = SourceRouter::new()
            .with("sales", Source::S3)
            .with("crm.blob", Source::Azure);
        let mut stores: HashMap<Source, Arc<dyn ObjectStore>> = HashMap::new();
        stores.insert(Source::S3, objects.clone());
        stores.insert(Source::Azure, objects.clone());
        (MetadataStore::remote(router, stores), objects)
    }

    #[test]
    fn local_put_then_get_returns_same_record() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MetadataStore::local(dir.path()).unwrap();
        let rec = record("sales/orders.csv", Source::S3);

        assert!(store.get("sales/orders.csv", Source::S3).is_none());
        store.put(&rec).unwrap();
        assert_eq!(store.get("sales/orders.csv", Source::S3), Some(rec));
        assert!(store.is_offline());
    }

    #[test]
    fn local_put_overwrites_previous_record() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MetadataStore::local(dir.path()).unwrap();
        let mut rec = record("sales/orders.csv", Source::S3);
        store.put(&rec).unwrap();
        rec.description = "Second version of the description".into();
        store.put(&rec).unwrap();

        let loaded = store.get("sales/orders.csv", Source::S3).unwrap();
        assert_eq!(loaded.description, "Second version of the description");
        assert_eq!(store.list_all("").len(), 1);
    }

    #[test]
    fn local_truncated_sidecar_reads_as_absent() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MetadataStore::local(dir.path()).unwrap();
        let json = record("sales/orders.csv", Source::S3).to_json().unwrap();
        fs::write(
            local_file(dir.path(), "sales/orders.csv"),
            &json[..json.len() - 10],
        )
        .unwrap();

        assert!(store.get("sales/orders.csv", Source::S3).is_none());
        assert!(store.list_all("").is_empty());
    }

    #[test]
    fn local_list_all_filters_by_prefix() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MetadataStore::local(dir.path()).unwrap();
        store.put(&record("sales/orders.csv", Source::S3)).unwrap();
        store.put(&record("sales/2024/q1.csv", Source::S3)).unwrap();
        store.put(&record("crm.blob/customers.csv", Source::Azure)).unwrap();

        assert_eq!(store.list_all("").len(), 3);
        let mut sales: Vec<String> = store.list_all("sales/").into_iter().map(|r| r.path).collect();
        sales.sort();
        assert_eq!(sales, vec!["sales/2024/q1.csv", "sales/orders.csv"]);
    }

    #[test]
    fn remote_put_writes_sidecar_beside_object() {
        let dir = tempfile::TempDir::new().unwrap();
        let (store, objects) = remote_store(dir.path());
        let rec = record("sales/orders.csv", Source::S3);
        store.put(&rec).unwrap();

        let raw = objects.read("sales", "orders.csv.meta.json").unwrap();
        let parsed = FileRecord::from_json(std::str::from_utf8(&raw).unwrap()).unwrap();
        assert_eq!(parsed, rec);
        assert_eq!(store.get("sales/orders.csv", Source::S3), Some(rec));
        assert!(!store.is_offline());
    }

    #[test]
    fn remote_list_all_spans_registered_containers() {
        let dir = tempfile::TempDir::new().unwrap();
        let (store, _objects) = remote_store(dir.path());
        store.put(&record("sales/orders.csv", Source::S3)).unwrap();
        store.put(&record("crm.blob/customers.csv", Source::Azure)).unwrap();

        let mut paths: Vec<String> = store.list_all("").into_iter().map(|r| r.path).collect();
        paths.sort();
        assert_eq!(paths, vec!["crm.blob/customers.csv", "sales/orders.csv"]);
        assert_eq!(store.list_all("crm").len(), 1);
    }

    #[test]
    fn remote_corrupt_sidecar_reads_as_absent() {
        let dir = tempfile::TempDir::new().unwrap();
        let (store, objects) = remote_store(dir.path());
        objects
            .put("sales", "orders.csv.meta.json", br#"{"path": "sales/ord"#)
            .unwrap();
        assert!(store.get("sales/orders.csv", Source::S3).is_none());
    }

    #[test]
    fn put_rejects_unqualified_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MetadataStore::local(dir.path()).unwrap();
        let rec = record("orders.csv", Source::S3);
        assert!(matches!(store.put(&rec), Err(StorageError::InvalidPath(_))));
    }
}
