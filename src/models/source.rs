use serde::{Deserialize, Serialize};
use std::fmt;

/// Storage backend family that owns an object.
///
/// The set is closed for matching purposes but new variants can be added
/// without touching the side-car format, which stores the lowercase tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Amazon S3 bucket.
    S3,
    /// Azure Blob Storage container.
    Azure,
}

impl Source {
    /// All known sources, in registration order.
    pub const ALL: [Source; 2] = [Source::S3, Source::Azure];

    /// Returns the lowercase tag used in side-cars and planner output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Azure => "azure",
        }
    }

    /// Parses a source tag as produced by a planner model.
    ///
    /// Accepts a few common spellings ("AWS", "azure_blob", ...) and ignores
    /// case and surrounding whitespace. Returns `None` for anything else.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "s3" | "aws" | "aws_s3" | "amazon_s3" | "amazon s3" => Some(Self::S3),
            "azure" | "az" | "azure_blob" | "azure blob" | "blob" => Some(Self::Azure),
            _ => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
