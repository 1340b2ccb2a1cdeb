pub mod config;
pub mod describer;
pub mod llm;
pub mod metadata;
pub mod models;
pub mod orchestrator;
pub mod query;
pub mod scanner;
pub mod storage;
pub mod tui;
pub mod utils;

#[cfg(test)]
mod testing;

pub use config::{AppConfig, ConfigError, LlmProvider, SourceConfig};
pub use llm::{LlmClient, LlmError};
pub use metadata::{MetadataStore, SourceRouter};
pub use models::{DiscoveredFile, FileRecord, FileRecordBuilder, Plan, Source, Step, StepTarget};
pub use orchestrator::{NO_PLAN_MESSAGE, OrchestrationReport, Orchestrator, OrchestratorError};
pub use query::{SourceClient, SourceQueryClient};
pub use storage::{LocalObjectStore, ObjectPath, ObjectStore, StorageError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_store_accessible_from_crate_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = MetadataStore::local(dir.path()).unwrap();
        assert!(store.is_offline());
        assert!(store.get("sales/orders.csv", Source::S3).is_none());
    }

    #[test]
    fn types_accessible_from_crate_root() {
        let record = FileRecordBuilder::new("sales/orders.csv", Source::S3).build();
        assert_eq!(record.key(), "orders.csv");
        assert_eq!(format!("{}", Source::Azure), "azure");

        let plan = Plan::new(vec![Step::dataset("sales/orders.csv", Source::S3, "count")]);
        assert_eq!(plan.len(), 1);
        assert!(matches!(plan.steps()[0].target, StepTarget::Dataset { .. }));
    }
}
