use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use crate::llm::{CompletionRequest, LlmClient, LlmError};
use crate::models::{AllowList, Plan, Source, Step};

use super::discovery::Catalog;

const PLAN_MAX_TOKENS: u32 = 1000;

/// Default number of planner calls per question, the first included.
pub const DEFAULT_PLAN_ATTEMPTS: usize = 2;

/// Errors that leave a question without a plan.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("planner response is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("planner response is not a JSON object with a steps array")]
    NotAnObject,

    #[error("planner referenced unlisted dataset {dataset:?}")]
    UnlistedDataset { dataset: String },

    #[error("planner model failed: {0}")]
    Model(#[from] LlmError),
}

impl PlanningError {
    /// Errors a corrective follow-up prompt can fix.
    fn is_correctable(&self) -> bool {
        !matches!(self, Self::Model(_))
    }
}

/// A reply without a `steps` key means the model found no relevant data,
/// and yields an empty plan.
#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    #[serde(default)]
    dataset: Option<String>,
    #[serde(default)]
    cloud: Option<String>,
    #[serde(default)]
    sub_question: Option<String>,
}

/// Produces a validated [`Plan`] for a question.
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    model: String,
    max_attempts: usize,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            max_attempts: DEFAULT_PLAN_ATTEMPTS,
        }
    }

    /// Sets how many planner calls may be made; at least one is always made.
    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Asks the model for a plan and validates it against the catalog.
    ///
    /// A rejected response is followed by one corrective prompt per
    /// remaining attempt. Model transport failures are not retried here.
    pub fn plan(&self, question: &str, catalog: &Catalog) -> Result<Plan, PlanningError> {
        let base_prompt = plan_prompt(question, catalog);
        let mut prompt = base_prompt.clone();
        let mut attempt = 1;

        loop {
            let request = CompletionRequest::new(&self.model, prompt)
                .max_tokens(PLAN_MAX_TOKENS)
                .temperature(0.0);
            let raw = self.llm.complete(&request)?;

            match parse_plan(&raw, question, catalog.allow_list()) {
                Ok(plan) => return Ok(plan),
                Err(e) if e.is_correctable() && attempt < self.max_attempts => {
                    tracing::warn!(attempt, error = %e, "planner response rejected, retrying");
                    prompt = corrective_prompt(&base_prompt, &raw, &e);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Parses and validates raw planner output.
///
/// Steps whose dataset or cloud is missing (or whose cloud is unknown) become
/// unusable steps that execute as inline errors. A dataset that is not in the
/// allow-list rejects the whole plan. A listed dataset with the wrong cloud
/// is moved to the cloud that actually owns it.
pub fn parse_plan(raw: &str, question: &str, allow_list: &AllowList) -> Result<Plan, PlanningError> {
    let json = extract_json(raw);
    let value: serde_json::Value = serde_json::from_str(json).map_err(PlanningError::InvalidJson)?;
    if !value.is_object() {
        return Err(PlanningError::NotAnObject);
    }
    let raw_plan: RawPlan = serde_json::from_value(value).map_err(|_| PlanningError::NotAnObject)?;

    let mut steps = Vec::with_capacity(raw_plan.steps.len());
    for raw_step in raw_plan.steps {
        let sub_question = raw_step
            .sub_question
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| question.to_string());

        let dataset = raw_step.dataset.unwrap_or_default();
        let dataset = dataset.trim();
        let cloud = raw_step.cloud.unwrap_or_default();
        if dataset.is_empty() || cloud.trim().is_empty() {
            steps.push(Step::unusable("missing cloud or dataset", sub_question));
            continue;
        }
        let Some(declared) = Source::parse(&cloud) else {
            steps.push(Step::unusable(format!("unknown cloud {cloud:?}"), sub_question));
            continue;
        };

        let (path, source) = allow_list
            .resolve(dataset, Some(declared))
            .ok_or_else(|| PlanningError::UnlistedDataset {
                dataset: dataset.to_string(),
            })?;
        if source != declared {
            tracing::warn!(dataset = %path, declared = %declared, actual = %source, "planner assigned wrong cloud, corrected");
        }
        steps.push(Step::dataset(path, source, sub_question));
    }
    Ok(Plan::new(steps))
}

/// Returns the JSON object inside `raw`, tolerating code fences and prose
/// around it.
pub fn extract_json(raw: &str) -> &str {
    let trimmed = raw.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn plan_prompt(question: &str, catalog: &Catalog) -> String {
    format!(
        "You are an expert multi-dataset planner.\n\n\
         Here are the available datasets with their descriptions:\n{datasets}\n\n\
         Here are their inferred schemas:\n{schemas}\n\n\
         Here is the list of all dataset files that actually exist:\n{files}\n\n\
         ## User question\n{question}\n\n\
         ## Your task\n\
         Produce a JSON plan with an array `steps`, each step containing:\n\
         - `dataset`: the file path to query next (MUST match exactly one of the files above)\n\
         - `cloud`: \"s3\" or \"azure\" (MUST match the cloud listed for that dataset)\n\
         - `sub_question`: the exact question to ask that dataset\n\n\
         Rules:\n\
         1. Only use files listed above. Do not invent file names or paths.\n\
         2. Assign each file to its correct cloud: \"s3\" or \"azure\".\n\
         3. When datasets share a field (e.g. ID, code, name), plan JOINs across them.\n\
         4. For analytical queries (counts, sums, averages, rankings): filter by date or category if needed, \
         group by relevant fields and apply the appropriate aggregation.\n\
         5. For questions about records without matches elsewhere: compare shared keys and count which are \
         missing in the second dataset.\n\
         6. When filtering a dataset by a user condition, return all columns for those filtered rows.\n\
         7. Reference previous step outputs clearly when needed.\n\
         8. If no matching data exists, return: {{\"steps\": []}}\n\
         9. Output JSON only, with no extra text or explanation.",
        datasets = or_none(catalog.dataset_block()),
        schemas = or_none(catalog.schema_block()),
        files = or_none(catalog.files_block()),
    )
}

fn corrective_prompt(base_prompt: &str, rejected: &str, error: &PlanningError) -> String {
    format!(
        "{base_prompt}\n\n\
         Your previous reply was rejected ({error}):\n{rejected}\n\n\
         Reply again with a single JSON object only, using only the listed files."
    )
}

fn or_none(block: String) -> String {
    if block.is_empty() { "(none)".to_string() } else { block }
}
