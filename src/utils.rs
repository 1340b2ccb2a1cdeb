//! Wiring shared by the CLI and TUI.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::llm::LlmClient;
use crate::metadata::MetadataStore;
use crate::models::Source;
use crate::orchestrator::Orchestrator;
use crate::query::{SourceClient, SourceQueryClient};
use crate::storage::{LocalObjectStore, ObjectStore};

/// Gets the cross-platform application data directory.
///
/// Returns `{data_dir}/cloudqa` where `data_dir` is:
/// - Linux: `~/.local/share`
/// - macOS: `~/Library/Application Support`
/// - Windows: `C:\Users\<user>\AppData\Roaming`
///
/// # Errors
///
/// Returns an error if the data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir =
        dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Failed to determine data directory"))?;

    Ok(data_dir.join("cloudqa"))
}

/// Path of the log file written while the TUI owns the terminal.
pub fn get_log_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("cloudqa.log"))
}

/// Creates `dir` and its parents if missing.
///
/// # Errors
///
/// Returns an error if directory creation fails.
pub fn ensure_directory(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory: {}", dir.display()))
}

/// Opens the metadata store the configuration asks for.
///
/// # Errors
///
/// Returns an error if the offline cache directory cannot be created.
pub fn open_metadata_store(
    config: &AppConfig,
    objects: Arc<dyn ObjectStore>,
) -> Result<MetadataStore> {
    if config.test_mode {
        return MetadataStore::local(&config.sidecar_cache_dir).with_context(|| {
            format!(
                "Failed to open side-car cache: {}",
                config.sidecar_cache_dir.display()
            )
        });
    }
    let mut stores: HashMap<Source, Arc<dyn ObjectStore>> = HashMap::new();
    for source in Source::ALL {
        stores.insert(source, objects.clone());
    }
    Ok(MetadataStore::remote(config.router(), stores))
}

/// Opens the metadata store over the configured object-store root.
///
/// # Errors
///
/// Returns an error if the metadata store cannot be opened.
pub fn open_catalog(config: &AppConfig) -> Result<MetadataStore> {
    let objects: Arc<dyn ObjectStore> =
        Arc::new(LocalObjectStore::new(&config.object_store_root));
    open_metadata_store(config, objects)
}

/// Builds one query client per configured source, all sharing `llm`.
///
/// # Errors
///
/// Returns an error if the metadata store cannot be opened.
pub fn build_source_clients(
    config: &AppConfig,
    llm: Arc<dyn LlmClient>,
) -> Result<Vec<Arc<SourceQueryClient>>> {
    let objects: Arc<dyn ObjectStore> =
        Arc::new(LocalObjectStore::new(&config.object_store_root));
    let metadata = Arc::new(open_metadata_store(config, objects.clone())?);

    Ok(config
        .source_configs()
        .into_iter()
        .map(|source_config| {
            Arc::new(
                SourceQueryClient::new(source_config, objects.clone(), metadata.clone(), llm.clone())
                    .with_scan_head_size(config.scan_head_size),
            )
        })
        .collect())
}

/// Builds the orchestrator described by `config`.
///
/// # Errors
///
/// Returns an error if the model client or metadata store cannot be set up.
pub fn build_orchestrator(config: &AppConfig) -> Result<Orchestrator> {
    let llm = config
        .llm_client()
        .context("Failed to configure language model client")?;
    let clients: Vec<Arc<dyn SourceClient>> = build_source_clients(config, llm.clone())?
        .into_iter()
        .map(|c| c as Arc<dyn SourceClient>)
        .collect();
    Ok(Orchestrator::new(clients, llm, &config.final_model))
}
