#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::sync::{Arc, Mutex};

use cloudqa::llm::{CompletionRequest, LlmClient, LlmError};
use cloudqa::{
    LocalObjectStore, MetadataStore, ObjectStore, Orchestrator, Source, SourceClient,
    SourceConfig, SourceQueryClient, SourceRouter,
};
use tempfile::TempDir;

pub const ORDERS_CSV: &str = "order_id,customer_id,total\n1,10,99.50\n2,10,150.00\n3,11,20.00\n4,12,130.00\n";
pub const CUSTOMERS_CSV: &str = "customer_id,name\n10,Ada\n11,Grace\n";

/// Replays canned model responses and records every prompt.
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|r| r.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl LlmClient for ScriptedLlm {
    fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::Api {
                message: "script exhausted".into(),
            })
    }
}

/// Object store with `sales/orders.csv` (S3) and `crm.blob/customers.csv` (Azure).
pub struct Fixture {
    pub dir: TempDir,
    pub objects: Arc<LocalObjectStore>,
    pub metadata: Arc<MetadataStore>,
}

impl Fixture {
    /// Side-cars written beside the objects.
    pub fn remote() -> Self {
        let dir = seeded_dir();
        let objects = Arc::new(LocalObjectStore::new(dir.path().join("objects")));
        let shared: Arc<dyn ObjectStore> = objects.clone();
        let router = SourceRouter::new()
            .with("sales", Source::S3)
            .with("crm.blob", Source::Azure);
        let stores = HashMap::from([(Source::S3, shared.clone()), (Source::Azure, shared)]);
        Self {
            metadata: Arc::new(MetadataStore::remote(router, stores)),
            objects,
            dir,
        }
    }

    /// Side-cars written to a local cache directory.
    pub fn offline() -> Self {
        let dir = seeded_dir();
        let objects = Arc::new(LocalObjectStore::new(dir.path().join("objects")));
        let metadata = MetadataStore::local(dir.path().join("cache")).unwrap();
        Self {
            metadata: Arc::new(metadata),
            objects,
            dir,
        }
    }

    pub fn client(&self, source: Source, llm: Arc<dyn LlmClient>) -> Arc<SourceQueryClient> {
        let container = match source {
            Source::S3 => "sales",
            Source::Azure => "crm.blob",
        };
        Arc::new(SourceQueryClient::new(
            SourceConfig::new(source, container, "answer-model"),
            self.objects.clone(),
            self.metadata.clone(),
            llm,
        ))
    }

    pub fn orchestrator(&self, llm: Arc<ScriptedLlm>) -> Orchestrator {
        let clients: Vec<Arc<dyn SourceClient>> = vec![
            self.client(Source::S3, llm.clone()),
            self.client(Source::Azure, llm.clone()),
        ];
        Orchestrator::new(clients, llm, "final-model")
    }
}

fn seeded_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    let sales = dir.path().join("objects/sales");
    let crm = dir.path().join("objects/crm.blob");
    fs::create_dir_all(&sales).unwrap();
    fs::create_dir_all(&crm).unwrap();
    fs::write(sales.join("orders.csv"), ORDERS_CSV).unwrap();
    fs::write(crm.join("customers.csv"), CUSTOMERS_CSV).unwrap();
    dir
}
