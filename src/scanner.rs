//! First-sight scanning of data objects.
//!
//! A file is scanned once: the presence of its side-car record short-circuits
//! every later attempt. Scanning seeds a cheap description from the leading
//! bytes, then runs a fuller pass that asks a model for a better description
//! and fills in the backend properties.

use std::sync::Arc;

use crate::describer::{self, DescribeError, ModelDescriber};
use crate::metadata::MetadataStore;
use crate::models::{FileRecordBuilder, Source};
use crate::storage::{ObjectPath, ObjectStore, StorageError, data_objects};

/// Bytes read for the seed description.
pub const SEED_PREVIEW_BYTES: usize = 20_000;

/// Default bytes read by the full scan.
pub const DEFAULT_SCAN_HEAD_SIZE: usize = 65_536;

/// Result of [`Scanner::ensure_scanned`] for one object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A record already existed; nothing was read or written.
    AlreadyScanned,
    /// A new record was written.
    Scanned,
    /// No record could be written. The failure was logged.
    Failed,
}

/// Counts of outcomes over a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub scanned: usize,
    pub already_scanned: usize,
    pub failed: usize,
}

impl ScanSummary {
    fn record(&mut self, outcome: ScanOutcome) {
        match outcome {
            ScanOutcome::AlreadyScanned => self.already_scanned += 1,
            ScanOutcome::Scanned => self.scanned += 1,
            ScanOutcome::Failed => self.failed += 1,
        }
    }
}

/// Scans objects of one source into the metadata store.
pub struct Scanner {
    source: Source,
    objects: Arc<dyn ObjectStore>,
    metadata: Arc<MetadataStore>,
    describer: ModelDescriber,
    head_size: usize,
}

impl Scanner {
    pub fn new(
        source: Source,
        objects: Arc<dyn ObjectStore>,
        metadata: Arc<MetadataStore>,
        describer: ModelDescriber,
    ) -> Self {
        Self {
            source,
            objects,
            metadata,
            describer,
            head_size: DEFAULT_SCAN_HEAD_SIZE,
        }
    }

    pub fn with_head_size(mut self, head_size: usize) -> Self {
        self.head_size = head_size;
        self
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Makes sure `object` has a side-car record.
    ///
    /// Existing records are left untouched. Failures are logged and reported
    /// as [`ScanOutcome::Failed`]; they never abort the caller.
    pub fn ensure_scanned(&self, object: &ObjectPath) -> ScanOutcome {
        let path = object.to_string();
        if self.metadata.get(&path, self.source).is_some() {
            return ScanOutcome::AlreadyScanned;
        }

        let used_model = match self.seed(object) {
            Ok(used_model) => used_model,
            Err(e) => {
                tracing::warn!(path = %path, source = %self.source, error = %e, "seed scan failed");
                return ScanOutcome::Failed;
            }
        };

        if let Err(e) = self.full_scan(object, !used_model) {
            tracing::warn!(path = %path, source = %self.source, error = %e, "full scan failed, keeping seed record");
        }
        ScanOutcome::Scanned
    }

    /// Ensures a record for every data object in `container`.
    ///
    /// # Errors
    ///
    /// Returns an error only if the container cannot be listed.
    pub fn scan_container(&self, container: &str) -> Result<ScanSummary, StorageError> {
        let mut summary = ScanSummary::default();
        for info in data_objects(self.objects.as_ref(), container)? {
            let object = ObjectPath::new(container, info.key);
            summary.record(self.ensure_scanned(&object));
        }
        tracing::info!(
            container,
            source = %self.source,
            scanned = summary.scanned,
            already_scanned = summary.already_scanned,
            failed = summary.failed,
            "container scan finished"
        );
        Ok(summary)
    }

    /// Writes the seed record. Returns whether the model produced it.
    fn seed(&self, object: &ObjectPath) -> Result<bool, StorageError> {
        let path = object.to_string();
        let preview = self
            .objects
            .read_head(object.container(), object.key(), SEED_PREVIEW_BYTES)?;

        let (description, used_model) = match describer::describe(&path, &preview) {
            Ok(description) => (description, false),
            Err(DescribeError::Parse(reason)) => {
                tracing::debug!(path = %path, reason = %reason, "preview not tabular, asking model");
                match self.describer.describe(&path, self.source, &preview) {
                    Ok(description) => (description.unwrap_or_default(), true),
                    Err(e) => {
                        tracing::warn!(path = %path, error = %e, "model description failed, seeding empty record");
                        (String::new(), true)
                    }
                }
            }
            Err(DescribeError::Model(e)) => {
                tracing::warn!(path = %path, error = %e, "heuristic description failed");
                (String::new(), false)
            }
        };

        let record = FileRecordBuilder::new(&path, self.source)
            .title(object.key())
            .description(description)
            .build();
        self.metadata.put(&record)?;
        Ok(used_model)
    }

    /// Refines the seed record with backend properties and, when
    /// `ask_model` is set, a model description.
    fn full_scan(&self, object: &ObjectPath, ask_model: bool) -> Result<(), StorageError> {
        let path = object.to_string();
        let Some(mut record) = self.metadata.get(&path, self.source) else {
            return Err(StorageError::NotFound(path));
        };

        if ask_model {
            let head = self
                .objects
                .read_head(object.container(), object.key(), self.head_size)?;
            match self.describer.describe(&path, self.source, &head) {
                Ok(Some(description)) => record.set_description(description),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %path, error = %e, "model description failed"),
            }
        }

        match self.objects.properties(object.container(), object.key()) {
            Ok(props) => {
                record.size_bytes = props.size;
                record.content_type = props.content_type;
            }
            Err(e) => tracing::warn!(path = %path, error = %e, "failed to get object properties"),
        }

        self.metadata.put(&record)?;
        tracing::info!(path = %path, source = %self.source, "scanned");
        Ok(())
    }
}
