use std::sync::Arc;

use thiserror::Error;

use crate::config::SourceConfig;
use crate::describer::{ModelDescriber, infer_columns};
use crate::llm::{CompletionRequest, LlmClient, LlmError};
use crate::metadata::MetadataStore;
use crate::models::{DiscoveredFile, FileRecordBuilder, Source, is_substantive};
use crate::scanner::{SEED_PREVIEW_BYTES, ScanSummary, Scanner};
use crate::storage::{ObjectInfo, ObjectPath, ObjectStore, StorageError, data_objects};

use super::prompt::{EMPTY_DESCRIPTION, FileContext, build_prompt, sample_text};
use super::response::parse_response;

const ANSWER_MAX_TOKENS: u32 = 800;
const ANSWER_TEMPERATURE: f32 = 0.1;

/// Sentinel returned when a pinned target is not listable.
pub fn no_data_found(path: &str) -> String {
    format!("No data found for file: {path}")
}

/// Errors from one per-source answer.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Model(#[from] LlmError),
}

/// A question-answering client bound to one bucket or container.
pub trait SourceClient: Send + Sync {
    fn source(&self) -> Source;

    fn container(&self) -> &str;

    /// Lists every data object, scanning unseen ones first.
    fn discover(&self) -> Result<Vec<DiscoveredFile>, QueryError>;

    /// Answers `question` from this source's files.
    ///
    /// With `target` set, only that file is considered. It may be given as
    /// `{container}/{key}` or as a bare key. A target that is not listable
    /// yields the [`no_data_found`] sentinel instead of an error.
    fn answer(&self, question: &str, target: Option<&str>) -> Result<String, QueryError>;
}

/// The shipped [`SourceClient`]: object store + side-cars + one model.
pub struct SourceQueryClient {
    config: SourceConfig,
    objects: Arc<dyn ObjectStore>,
    metadata: Arc<MetadataStore>,
    llm: Arc<dyn LlmClient>,
    scanner: Scanner,
}

impl SourceQueryClient {
    pub fn new(
        config: SourceConfig,
        objects: Arc<dyn ObjectStore>,
        metadata: Arc<MetadataStore>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        let describer = ModelDescriber::new(llm.clone(), &config.model);
        let scanner = Scanner::new(config.source, objects.clone(), metadata.clone(), describer);
        Self {
            config,
            objects,
            metadata,
            llm,
            scanner,
        }
    }

    /// Overrides the number of bytes read by the full scan.
    pub fn with_scan_head_size(mut self, head_size: usize) -> Self {
        self.scanner = self.scanner.with_head_size(head_size);
        self
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    /// Seeds side-cars for every unscanned object.
    pub fn scan(&self) -> Result<ScanSummary, QueryError> {
        Ok(self.scanner.scan_container(&self.config.container)?)
    }

    fn list(&self) -> Result<Vec<ObjectInfo>, StorageError> {
        data_objects(self.objects.as_ref(), &self.config.container)
    }

    fn qualified(&self, key: &str) -> String {
        format!("{}/{}", self.config.container, key)
    }

    /// Strips this client's container prefix from a path, if present.
    fn key_of<'a>(&self, path: &'a str) -> &'a str {
        path.strip_prefix(self.config.container.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(path)
    }

    fn context_for(&self, info: &ObjectInfo) -> Result<FileContext, StorageError> {
        let path = self.qualified(&info.key);
        let preview = self
            .objects
            .read_head(&self.config.container, &info.key, self.config.read_bytes)?;
        let description = self
            .metadata
            .get(&path, self.config.source)
            .map(|record| record.description)
            .unwrap_or_default();
        Ok(FileContext {
            title: info.key.clone(),
            columns: infer_columns(&preview),
            sample: sample_text(&preview, self.config.sample_chars),
            description,
            path,
        })
    }

    /// Writes model-proposed descriptions back to the side-cars.
    ///
    /// Only paths of listed objects are accepted, and a record is rewritten
    /// only when its description actually changes. A short proposal never
    /// replaces a substantive description.
    fn republish(&self, descriptions: &[(String, String)], listed: &[ObjectInfo]) {
        for (raw_path, description) in descriptions {
            let key = self.key_of(raw_path);
            if is_placeholder(description) || !listed.iter().any(|info| info.key == key) {
                continue;
            }
            let path = self.qualified(key);
            let record = match self.metadata.get(&path, self.config.source) {
                Some(record) if record.description == *description => continue,
                Some(record)
                    if record.has_substantive_description() && !is_substantive(description) =>
                {
                    tracing::debug!(path = %path, proposed = %description, "keeping substantive description");
                    continue;
                }
                Some(mut record) => {
                    record.set_description(description.as_str());
                    record
                }
                None => FileRecordBuilder::new(&path, self.config.source)
                    .title(key)
                    .description(description.as_str())
                    .build(),
            };
            match self.metadata.put(&record) {
                Ok(()) => tracing::debug!(path = %path, "republished model description"),
                Err(e) => tracing::warn!(path = %path, error = %e, "failed to republish description"),
            }
        }
    }
}

/// True for echoes of the empty-description marker, however decorated.
fn is_placeholder(description: &str) -> bool {
    let bare: String = description
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();
    description == EMPTY_DESCRIPTION || bare.is_empty() || bare == "empty"
}

impl SourceClient for SourceQueryClient {
    fn source(&self) -> Source {
        self.config.source
    }

    fn container(&self) -> &str {
        &self.config.container
    }

    fn discover(&self) -> Result<Vec<DiscoveredFile>, QueryError> {
        let listed = self.list()?;
        let mut files = Vec::with_capacity(listed.len());
        for info in listed {
            let object = ObjectPath::new(&self.config.container, &info.key);
            self.scanner.ensure_scanned(&object);

            let path = object.to_string();
            let description = self
                .metadata
                .get(&path, self.config.source)
                .map(|record| record.description);
            let columns = match self.objects.read_head(
                &self.config.container,
                &info.key,
                SEED_PREVIEW_BYTES,
            ) {
                Ok(preview) => infer_columns(&preview),
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "could not read preview for schema");
                    Vec::new()
                }
            };
            files.push(
                DiscoveredFile::new(path, self.config.source)
                    .with_description(description)
                    .with_columns(columns),
            );
        }
        Ok(files)
    }

    fn answer(&self, question: &str, target: Option<&str>) -> Result<String, QueryError> {
        let listed = self.list()?;
        for info in &listed {
            self.scanner
                .ensure_scanned(&ObjectPath::new(&self.config.container, &info.key));
        }

        let candidates: Vec<&ObjectInfo> = match target {
            Some(target) => {
                let key = self.key_of(target.trim());
                let matched: Vec<&ObjectInfo> = listed.iter().filter(|i| i.key == key).collect();
                if matched.is_empty() {
                    tracing::info!(target, source = %self.config.source, "target not listable");
                    return Ok(no_data_found(target));
                }
                matched
            }
            None => listed.iter().collect(),
        };
        if candidates.is_empty() {
            return Ok(format!(
                "No data found in container: {}",
                self.config.container
            ));
        }

        let mut files = Vec::with_capacity(candidates.len());
        for info in candidates {
            match self.context_for(info) {
                Ok(ctx) => files.push(ctx),
                Err(e) => {
                    tracing::warn!(key = %info.key, source = %self.config.source, error = %e, "skipping unreadable file")
                }
            }
        }
        if files.is_empty() {
            return Ok(no_data_found(target.unwrap_or(&self.config.container)));
        }

        let request = CompletionRequest::new(&self.config.model, build_prompt(question, &files))
            .max_tokens(ANSWER_MAX_TOKENS)
            .temperature(ANSWER_TEMPERATURE);
        let raw = self.llm.complete(&request)?;

        let parsed = parse_response(&raw);
        if !parsed.has_answer_section {
            tracing::debug!(source = %self.config.source, "response had no ANSWER section, returning raw text");
        }
        self.republish(&parsed.descriptions, &listed);
        Ok(parsed.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;
    use crate::storage::LocalObjectStore;

    struct Fixture {
        _dir: tempfile::TempDir,
        metadata: Arc<MetadataStore>,
        objects: Arc<LocalObjectStore>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::TempDir::new().unwrap();
        let objects = Arc::new(LocalObjectStore::new(dir.path().join("objects")));
        objects
            .put("sales", "orders.csv", b"order_id,customer_id,total\n1,10,99\n2,11,150\n")
            .unwrap();
        objects
            .put("sales", "returns.csv", b"return_id,order_id\n7,1\n")
            .unwrap();
        let metadata = Arc::new(MetadataStore::local(dir.path().join("cache")).unwrap());
        Fixture {
            _dir: dir,
            metadata,
            objects,
        }
    }

    fn seed(fx: &Fixture, key: &str, description: &str) {
        let record = FileRecordBuilder::new(format!("sales/{key}"), Source::S3)
            .title(key)
            .description(description)
            .build();
        fx.metadata.put(&record).unwrap();
    }

    fn client(fx: &Fixture, llm: Arc<ScriptedLlm>) -> SourceQueryClient {
        SourceQueryClient::new(
            SourceConfig::new(Source::S3, "sales", "answer-model"),
            fx.objects.clone(),
            fx.metadata.clone(),
            llm,
        )
    }

    #[test]
    fn answer_returns_text_after_answer_header() {
        let fx = fixture();
        seed(&fx, "orders.csv", "Orders with totals per customer");
        seed(&fx, "returns.csv", "Returned orders by order id");
        let llm = Arc::new(ScriptedLlm::new([
            "DESCRIPTIONS\n\nSELECTED_FILES\norders.csv\n\nANSWER\nOrder 2 exceeded $100.",
        ]));
        let client = client(&fx, llm.clone());

        let answer = client.answer("Which orders exceed $100?", None).unwrap();
        assert_eq!(answer, "Order 2 exceeded $100.");

        let request = &llm.requests()[0];
        assert_eq!(request.model, "answer-model");
        assert_eq!(request.max_tokens, 800);
        assert!(request.prompt.contains("path: sales/orders.csv"));
        assert!(request.prompt.contains("path: sales/returns.csv"));
        assert!(request.prompt.contains("schema: order_id, customer_id, total"));
    }

    #[test]
    fn target_restricts_prompt_to_one_file() {
        let fx = fixture();
        seed(&fx, "orders.csv", "Orders with totals per customer");
        seed(&fx, "returns.csv", "Returned orders by order id");
        let llm = Arc::new(ScriptedLlm::new(["ANSWER\nok"]));
        let client = client(&fx, llm.clone());

        client.answer("q", Some("sales/returns.csv")).unwrap();
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains("path: sales/returns.csv"));
        assert!(!prompt.contains("path: sales/orders.csv"));
    }

    #[test]
    fn unknown_target_returns_sentinel_without_model_call() {
        let fx = fixture();
        seed(&fx, "orders.csv", "Orders with totals per customer");
        seed(&fx, "returns.csv", "Returned orders by order id");
        let llm = Arc::new(ScriptedLlm::new(Vec::<String>::new()));
        let client = client(&fx, llm.clone());

        let answer = client.answer("q", Some("sales/missing.csv")).unwrap();
        assert_eq!(answer, "No data found for file: sales/missing.csv");
        assert_eq!(llm.call_count(), 0);
    }

    #[test]
    fn descriptions_section_is_republished() {
        let fx = fixture();
        seed(&fx, "orders.csv", "");
        seed(&fx, "returns.csv", "Returned orders by order id");
        let llm = Arc::new(ScriptedLlm::new([
            "DESCRIPTIONS\norders.csv: Orders placed by customers with totals\nsales/ghost.csv: Invented file\n\nANSWER\ndone",
        ]));
        let client = client(&fx, llm);
        client.answer("q", None).unwrap();

        let record = fx.metadata.get("sales/orders.csv", Source::S3).unwrap();
        assert_eq!(record.description, "Orders placed by customers with totals");
        assert!(fx.metadata.get("sales/ghost.csv", Source::S3).is_none());
    }

    #[test]
    fn short_proposal_does_not_replace_substantive_description() {
        let fx = fixture();
        seed(&fx, "orders.csv", "Orders with totals per customer");
        seed(&fx, "returns.csv", "");
        let before = fx.metadata.get("sales/orders.csv", Source::S3).unwrap();
        let llm = Arc::new(ScriptedLlm::new([
            "DESCRIPTIONS\norders.csv: Table\nreturns.csv: ⧗ (empty)\n\nANSWER\nok",
        ]));
        let client = client(&fx, llm);
        assert_eq!(client.answer("q", None).unwrap(), "ok");

        assert_eq!(fx.metadata.get("sales/orders.csv", Source::S3).unwrap(), before);
        let returns = fx.metadata.get("sales/returns.csv", Source::S3).unwrap();
        assert_eq!(returns.description, "");
    }

    #[test]
    fn placeholder_echoes_are_recognised() {
        assert!(is_placeholder("(empty)"));
        assert!(is_placeholder("⧗ (empty)"));
        assert!(is_placeholder("Empty"));
        assert!(is_placeholder("--"));
        assert!(!is_placeholder("Empty orders awaiting cleanup"));
    }

    #[test]
    fn unchanged_description_is_not_rewritten() {
        let fx = fixture();
        seed(&fx, "orders.csv", "Orders with totals per customer");
        seed(&fx, "returns.csv", "Returned orders by order id");
        let before = fx.metadata.get("sales/orders.csv", Source::S3).unwrap();
        let llm = Arc::new(ScriptedLlm::new([
            "DESCRIPTIONS\nsales/orders.csv: Orders with totals per customer\n\nANSWER\nx",
            "ANSWER\ny",
        ]));
        let client = client(&fx, llm.clone());
        client.answer("q", None).unwrap();
        client.answer("q", None).unwrap();

        let after = fx.metadata.get("sales/orders.csv", Source::S3).unwrap();
        assert_eq!(before, after);
        // Two answer calls, no scan calls.
        assert_eq!(llm.call_count(), 2);
    }

    #[test]
    fn model_failure_is_an_error() {
        let fx = fixture();
        seed(&fx, "orders.csv", "Orders with totals per customer");
        seed(&fx, "returns.csv", "Returned orders by order id");
        let client = client(&fx, Arc::new(ScriptedLlm::new(Vec::<String>::new())));
        assert!(matches!(client.answer("q", None), Err(QueryError::Model(_))));
    }

    #[test]
    fn discover_scans_and_reports_columns() {
        let fx = fixture();
        let llm = Arc::new(ScriptedLlm::new(["Orders with totals per customer id.", "Returns linked to the original order."]));
        let client = client(&fx, llm);
        let files = client.discover().unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, "sales/orders.csv");
        assert_eq!(files[0].columns, vec!["order_id", "customer_id", "total"]);
        assert_eq!(files[0].description.as_deref(), Some("Orders with totals per customer id."));
        assert!(fx.metadata.get("sales/returns.csv", Source::S3).is_some());
    }
}
