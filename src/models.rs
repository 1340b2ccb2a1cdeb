mod discovered;
mod file_record;
mod plan;
mod source;

pub use discovered::DiscoveredFile;
pub use file_record::{
    FileRecord, FileRecordBuilder, UNKNOWN_CONTENT_TYPE, is_substantive, now_utc_seconds,
};
pub use plan::{AllowList, Plan, Step, StepTarget};
pub use source::Source;
