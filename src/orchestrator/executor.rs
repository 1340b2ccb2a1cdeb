use std::fmt;
use std::sync::Arc;

use crate::models::{Plan, Source, StepTarget};
use crate::query::SourceClient;

/// Source tag used for steps that produced an inline error.
pub const ERROR_TAG: &str = "error";

/// Outcome of one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    /// Source that answered; `None` for inline errors.
    pub source: Option<Source>,
    /// Dataset the step was pinned to, if any.
    pub dataset: Option<String>,
    /// Sub-question after prior answers were prepended.
    pub question: String,
    pub answer: String,
}

impl StepResult {
    fn error(dataset: Option<String>, question: String, message: String) -> Self {
        Self {
            source: None,
            dataset,
            question,
            answer: message,
        }
    }

    pub fn is_error(&self) -> bool {
        self.source.is_none()
    }

    /// `s3`, `azure` or `error`.
    pub fn tag(&self) -> &'static str {
        self.source.map_or(ERROR_TAG, Source::as_str)
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dataset {
            Some(dataset) => write!(f, "[{} {}]\n{}", self.tag(), dataset, self.answer),
            None => write!(f, "[{}]\n{}", self.tag(), self.answer),
        }
    }
}

/// Prefixes `sub_question` with every earlier answer, in order.
pub fn augment(sub_question: &str, history: &[String]) -> String {
    if history.is_empty() {
        return sub_question.to_string();
    }
    let previous = history
        .iter()
        .enumerate()
        .map(|(i, answer)| format!("[step {}]\n{}", i + 1, answer))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "\n\n----- PREVIOUS ANSWERS -----\n{previous}\n-----------------------------\n\n{sub_question}"
    )
}

/// Wraps a sub-question in the extraction prompt sent to a source client.
pub fn step_prompt(dataset: &str, source: Source, question: &str) -> String {
    format!(
        "You are a data extraction expert.\n\
         Your task is to answer the following question using ONLY the contents of the file (if it exists):\n\
         File: {dataset}\n\
         Cloud: {cloud}\n\
         QUESTION:{question}\n\
         Return direct results from the file.\n\
         If the file is missing or not available, respond with:\n\
         No data found for file: {dataset}",
        cloud = source.as_str().to_uppercase(),
    )
}

fn client_for<'a>(
    clients: &'a [Arc<dyn SourceClient>],
    path: &str,
    source: Source,
) -> Option<&'a Arc<dyn SourceClient>> {
    clients
        .iter()
        .filter(|c| c.source() == source)
        .find(|c| {
            path.strip_prefix(c.container())
                .is_some_and(|rest| rest.starts_with('/'))
        })
        .or_else(|| clients.iter().find(|c| c.source() == source))
}

/// Runs every step strictly in order.
///
/// Each successful answer is appended to the history handed to later steps.
/// Unusable steps and failing clients become inline error results; they
/// never stop the remaining steps.
pub fn execute(plan: &Plan, clients: &[Arc<dyn SourceClient>]) -> Vec<StepResult> {
    let mut results = Vec::with_capacity(plan.len());
    let mut history: Vec<String> = Vec::new();

    for (index, step) in plan.steps().iter().enumerate() {
        let question = augment(&step.sub_question, &history);
        let (path, source) = match &step.target {
            StepTarget::Dataset { path, source } => (path, *source),
            StepTarget::Unusable { reason } => {
                tracing::warn!(step = index + 1, reason = %reason, "skipping unusable step");
                let message = format!("Skipped step: {reason}.\n{question}");
                results.push(StepResult::error(None, question, message));
                continue;
            }
        };

        let Some(client) = client_for(clients, path, source) else {
            tracing::warn!(step = index + 1, source = %source, "no client for source");
            let message = format!("Skipped step: no client configured for {source}.");
            results.push(StepResult::error(Some(path.clone()), question, message));
            continue;
        };

        tracing::info!(step = index + 1, dataset = %path, source = %source, "dispatching step");
        let prompt = step_prompt(path, source, &question);
        match client.answer(&prompt, Some(path)) {
            Ok(answer) => {
                history.push(answer.clone());
                results.push(StepResult {
                    source: Some(source),
                    dataset: Some(path.clone()),
                    question,
                    answer,
                });
            }
            Err(e) => {
                tracing::warn!(step = index + 1, dataset = %path, error = %e, "step failed");
                let message = format!("Step failed for {path}: {e}");
                results.push(StepResult::error(Some(path.clone()), question, message));
            }
        }
    }
    results
}
