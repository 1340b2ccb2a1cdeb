//! Environment-driven configuration.
//!
//! Every value has a default so a bare environment still yields a working
//! offline setup. Call `dotenvy::dotenv()` before [`AppConfig::from_env`] to
//! pick up a `.env` file.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::llm::{AnthropicClientBuilder, LlmClient, LlmError, OllamaClientBuilder};
use crate::metadata::SourceRouter;
use crate::models::Source;
use crate::scanner::DEFAULT_SCAN_HEAD_SIZE;

pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";
pub const DEFAULT_S3_BUCKET: &str = "datasets";
pub const DEFAULT_AZURE_CONTAINER: &str = "datasets.blob";

/// Bytes read from each object when answering.
pub const DEFAULT_READ_BYTES: usize = 256_000;

/// Characters of each object shown to the answer model.
pub const DEFAULT_SAMPLE_CHARS: usize = 1_500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to determine data directory")]
    NoDataDir,
}

/// Which completion API to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Anthropic,
    Ollama,
}

impl LlmProvider {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Some(Self::Anthropic),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }
}

/// Settings for one per-source query client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub source: Source,
    /// Bucket or container the client reads.
    pub container: String,
    /// Model used to answer and describe.
    pub model: String,
    pub read_bytes: usize,
    pub sample_chars: usize,
}

impl SourceConfig {
    pub fn new(source: Source, container: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            source,
            container: container.into(),
            model: model.into(),
            read_bytes: DEFAULT_READ_BYTES,
            sample_chars: DEFAULT_SAMPLE_CHARS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub s3_bucket: String,
    pub azure_container: String,
    pub known_s3_buckets: Vec<String>,
    pub known_azure_containers: Vec<String>,
    pub object_store_root: PathBuf,
    /// Side-cars go to `sidecar_cache_dir` instead of the object stores.
    pub test_mode: bool,
    pub sidecar_cache_dir: PathBuf,
    pub llm_provider: LlmProvider,
    pub answer_model: String,
    pub final_model: String,
    pub scan_head_size: usize,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error for unparseable numeric or enumerated values, or when
    /// no data directory can be determined for the default object root.
    pub fn from_env() -> Result<Self, ConfigError> {
        let object_store_root = match var("OBJECT_STORE_ROOT") {
            Some(root) => PathBuf::from(root),
            None => dirs::data_dir()
                .ok_or(ConfigError::NoDataDir)?
                .join("cloudqa")
                .join("objects"),
        };

        let llm_provider = match var("LLM_PROVIDER") {
            Some(value) => LlmProvider::parse(&value).ok_or_else(|| ConfigError::Invalid {
                var: "LLM_PROVIDER",
                value,
                reason: "expected \"anthropic\" or \"ollama\"".to_string(),
            })?,
            None => LlmProvider::Anthropic,
        };

        let scan_head_size = match var("SCAN_HEAD_SIZE") {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        var: "SCAN_HEAD_SIZE",
                        value,
                        reason: "must be positive".to_string(),
                    });
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: "SCAN_HEAD_SIZE",
                        value,
                        reason: e.to_string(),
                    });
                }
            },
            None => DEFAULT_SCAN_HEAD_SIZE,
        };

        Ok(Self {
            s3_bucket: var("S3_BUCKET").unwrap_or_else(|| DEFAULT_S3_BUCKET.to_string()),
            azure_container: var("AZURE_CONTAINER")
                .unwrap_or_else(|| DEFAULT_AZURE_CONTAINER.to_string()),
            known_s3_buckets: list_var("KNOWN_S3_BUCKETS"),
            known_azure_containers: list_var("KNOWN_AZURE_CONTAINERS"),
            object_store_root,
            test_mode: var("TEST_MODE").is_some_and(|v| is_truthy(&v)),
            sidecar_cache_dir: var("SIDECAR_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(".sidecar_cache")),
            llm_provider,
            answer_model: var("ANSWER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            final_model: var("FINAL_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            scan_head_size,
        })
    }

    /// Router with every configured bucket and container registered.
    pub fn router(&self) -> SourceRouter {
        let mut router = SourceRouter::new();
        router.register(&self.s3_bucket, Source::S3);
        router.register(&self.azure_container, Source::Azure);
        for bucket in &self.known_s3_buckets {
            router.register(bucket, Source::S3);
        }
        for container in &self.known_azure_containers {
            router.register(container, Source::Azure);
        }
        router
    }

    /// One query-client configuration per primary bucket/container.
    pub fn source_configs(&self) -> Vec<SourceConfig> {
        vec![
            SourceConfig::new(Source::S3, &self.s3_bucket, &self.answer_model),
            SourceConfig::new(Source::Azure, &self.azure_container, &self.answer_model),
        ]
    }

    /// Builds the configured completion client.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider is misconfigured, e.g. a missing API
    /// key.
    pub fn llm_client(&self) -> Result<Arc<dyn LlmClient>, LlmError> {
        let client: Arc<dyn LlmClient> = match self.llm_provider {
            LlmProvider::Anthropic => Arc::new(AnthropicClientBuilder::new().build()?),
            LlmProvider::Ollama => Arc::new(OllamaClientBuilder::new().build()?),
        };
        Ok(client)
    }
}

/// A non-empty environment variable.
fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn list_var(name: &str) -> Vec<String> {
    var(name)
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
