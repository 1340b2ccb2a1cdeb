//! Filesystem-backed object store.
//!
//! Each first-level directory under the root is a bucket/container and every
//! file below it is an object keyed by its `/`-separated relative path. This
//! serves hermetic tests and buckets mounted or synced to local disk.

use std::fs;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};

use super::{ObjectInfo, ObjectProperties, ObjectStore, StorageError};

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, container: &str, key: &str) -> Result<PathBuf, StorageError> {
        let display = format!("{container}/{key}");
        let relative = Path::new(container).join(key);
        let safe = !container.is_empty()
            && !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidPath(display));
        }
        Ok(self.root.join(relative))
    }

    fn io_error(container: &str, key: &str, source: std::io::Error) -> StorageError {
        let path = format!("{container}/{key}");
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(path)
        } else {
            StorageError::Io { path, source }
        }
    }
}

impl ObjectStore for LocalObjectStore {
    fn list(&self, container: &str, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let base = self.root.join(container);
        if !base.is_dir() {
            return Err(StorageError::NotFound(container.to_string()));
        }

        let mut out = Vec::new();
        let mut pending = vec![base.clone()];
        while let Some(dir) = pending.pop() {
            let entries = fs::read_dir(&dir).map_err(|e| StorageError::Io {
                path: dir.display().to_string(),
                source: e,
            })?;
            for entry in entries {
                let entry = entry.map_err(|e| StorageError::Io {
                    path: dir.display().to_string(),
                    source: e,
                })?;
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Ok(relative) = path.strip_prefix(&base) else {
                    continue;
                };
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                if !key.starts_with(prefix) {
                    continue;
                }
                let size = entry.metadata().ok().map(|m| m.len());
                out.push(ObjectInfo {
                    content_type: Some(guess_content_type(&key).to_string()),
                    key,
                    size,
                });
            }
        }

        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    fn read_head(&self, container: &str, key: &str, len: usize) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(container, key)?;
        let file = fs::File::open(&path).map_err(|e| Self::io_error(container, key, e))?;
        let mut buf = Vec::with_capacity(len.min(1 << 20));
        file.take(len as u64)
            .read_to_end(&mut buf)
            .map_err(|e| Self::io_error(container, key, e))?;
        Ok(buf)
    }

    fn read(&self, container: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(container, key)?;
        fs::read(&path).map_err(|e| Self::io_error(container, key, e))
    }

    fn properties(&self, container: &str, key: &str) -> Result<ObjectProperties, StorageError> {
        let path = self.object_path(container, key)?;
        let metadata = fs::metadata(&path).map_err(|e| Self::io_error(container, key, e))?;
        Ok(ObjectProperties {
            size: metadata.len(),
            content_type: guess_content_type(key).to_string(),
        })
    }

    fn put(&self, container: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.object_path(container, key)?;
        let parent = path
            .parent()
            .ok_or_else(|| StorageError::InvalidPath(format!("{container}/{key}")))?;
        fs::create_dir_all(parent).map_err(|e| Self::io_error(container, key, e))?;

        // Write to a sibling temp file and rename so readers never see a partial object.
        let mut tmp =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| Self::io_error(container, key, e))?;
        tmp.write_all(data)
            .map_err(|e| Self::io_error(container, key, e))?;
        tmp.persist(&path)
            .map_err(|e| Self::io_error(container, key, e.error))?;
        Ok(())
    }
}

/// Maps a key's extension to a MIME type.
pub fn guess_content_type(key: &str) -> &'static str {
    let ext = key
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "json" => "application/json",
        "jsonl" | "ndjson" => "application/x-ndjson",
        "parquet" => "application/vnd.apache.parquet",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
