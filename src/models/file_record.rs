use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::Source;

/// Content type recorded before a backend property lookup succeeds.
pub const UNKNOWN_CONTENT_TYPE: &str = "unknown";

/// Side-car metadata for one source object.
///
/// Stored as JSON at `{original_key}.meta.json` beside the object it describes.
/// The presence of a record means the object has been through at least one
/// description attempt; `description` may still be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Fully-qualified `{container_or_bucket}/{object_key}`.
    pub path: String,
    /// Backend that owns the object.
    #[serde(alias = "cloud")]
    pub source: Source,
    /// Display name, defaults to the object key.
    pub title: String,
    /// Free-text description; empty means "not yet seeded".
    #[serde(default)]
    pub description: String,
    /// Best-known content type.
    #[serde(alias = "mime_type", default = "unknown_content_type")]
    pub content_type: String,
    /// Best-known size in bytes.
    #[serde(alias = "size", default)]
    pub size_bytes: u64,
    /// Time of the last successful description write (UTC, second precision).
    #[serde(with = "sidecar_timestamp")]
    pub last_scanned: OffsetDateTime,
}

fn unknown_content_type() -> String {
    UNKNOWN_CONTENT_TYPE.to_string()
}

impl FileRecord {
    /// Serializes the record to side-car JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses side-car JSON.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Returns the object key portion of `path` (everything after the container).
    pub fn key(&self) -> &str {
        self.path
            .split_once('/')
            .map(|(_, key)| key)
            .unwrap_or(&self.path)
    }

    /// Returns true if the description is long enough to be trusted.
    pub fn has_substantive_description(&self) -> bool {
        is_substantive(&self.description)
    }

    /// Replaces the description and bumps `last_scanned`.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.last_scanned = now_utc_seconds();
    }
}

/// A description is substantive when it has more than two words.
pub fn is_substantive(description: &str) -> bool {
    description.split_whitespace().count() > 2
}

/// Current UTC time truncated to whole seconds.
///
/// Side-cars store second precision, so in-memory records are truncated the
/// same way to keep round-trips field-for-field equal.
pub fn now_utc_seconds() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now - time::Duration::nanoseconds(i64::from(now.nanosecond()))
}

/// Builder for [`FileRecord`].
///
/// # Examples
///
/// ```
/// use cloudqa::{FileRecordBuilder, Source};
///
/// let record = FileRecordBuilder::new("datasets/orders.csv", Source::S3).build();
/// assert_eq!(record.title, "orders.csv");
/// assert_eq!(record.content_type, "unknown");
/// assert_eq!(record.size_bytes, 0);
/// assert!(record.description.is_empty());
/// ```
#[derive(Debug)]
pub struct FileRecordBuilder {
    path: String,
    source: Source,
    title: Option<String>,
    description: Option<String>,
    content_type: Option<String>,
    size_bytes: Option<u64>,
    last_scanned: Option<OffsetDateTime>,
}

impl FileRecordBuilder {
    /// Starts a record for `path` owned by `source`.
    pub fn new(path: impl Into<String>, source: Source) -> Self {
        Self {
            path: path.into(),
            source,
            title: None,
            description: None,
            content_type: None,
            size_bytes: None,
            last_scanned: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size_bytes(mut self, size_bytes: u64) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }

    pub fn last_scanned(mut self, last_scanned: OffsetDateTime) -> Self {
        self.last_scanned = Some(last_scanned);
        self
    }

    /// Builds the record, defaulting the title to the object key and the
    /// timestamp to now.
    pub fn build(self) -> FileRecord {
        let title = self.title.unwrap_or_else(|| {
            self.path
                .split_once('/')
                .map(|(_, key)| key.to_string())
                .unwrap_or_else(|| self.path.clone())
        });
        FileRecord {
            title,
            path: self.path,
            source: self.source,
            description: self.description.unwrap_or_default(),
            content_type: self.content_type.unwrap_or_else(unknown_content_type),
            size_bytes: self.size_bytes.unwrap_or(0),
            last_scanned: self.last_scanned.unwrap_or_else(now_utc_seconds),
        }
    }
}

/// `YYYY-MM-DDTHH:MM:SSZ` (de)serialization for `last_scanned`.
mod sidecar_timestamp {
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _, ser::Error as _};
    use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset, format_description::BorrowedFormatItem};

    const FORMAT: &[BorrowedFormatItem<'static>] =
        time::macros::format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

    pub fn serialize<S: Serializer>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = value
            .to_offset(UtcOffset::UTC)
            .format(FORMAT)
            .map_err(S::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<OffsetDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        PrimitiveDateTime::parse(&raw, FORMAT)
            .map(PrimitiveDateTime::assume_utc)
            .map_err(D::Error::custom)
    }
}
