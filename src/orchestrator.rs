//! Multi-source orchestration: DISCOVER → PLAN → EXECUTE → MERGE.
//!
//! The orchestrator lists datasets across every [`SourceClient`], asks a
//! planner model for an ordered list of per-file sub-questions, runs them
//! strictly in sequence while threading earlier answers into later ones, and
//! folds the answers into one response.
//!
//! There is no retry loop across stages. Failures local to one step are
//! recorded inline; failures that leave no way forward (no plan, merge model
//! unavailable) end the request.

mod discovery;
mod executor;
mod merge;
mod planner;

use std::sync::Arc;

use thiserror::Error;

use crate::llm::{LlmClient, LlmError};
use crate::models::Plan;
use crate::query::SourceClient;

pub use discovery::{Catalog, discover};
pub use executor::{ERROR_TAG, StepResult, augment, execute, step_prompt};
pub use merge::{MergeAccumulator, Merger, merge_prompt};
pub use planner::{DEFAULT_PLAN_ATTEMPTS, Planner, PlanningError, extract_json, parse_plan};

/// Returned when the planner finds nothing relevant or cannot plan.
pub const NO_PLAN_MESSAGE: &str = "I couldn't create an execution plan for your query.";

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Planning(#[from] PlanningError),

    #[error("merge failed: {0}")]
    Merge(#[source] LlmError),
}

/// Everything one request produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationReport {
    pub plan: Plan,
    pub results: Vec<StepResult>,
    pub answer: String,
}

pub struct Orchestrator {
    clients: Vec<Arc<dyn SourceClient>>,
    planner: Planner,
    merger: Merger,
}

impl Orchestrator {
    /// Creates an orchestrator planning and merging with `model`.
    pub fn new(
        clients: Vec<Arc<dyn SourceClient>>,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        Self {
            clients,
            planner: Planner::new(llm.clone(), &model),
            merger: Merger::new(llm, model),
        }
    }

    /// Sets how many planner calls a question may use.
    pub fn with_plan_attempts(mut self, attempts: usize) -> Self {
        self.planner = self.planner.with_max_attempts(attempts);
        self
    }

    pub fn clients(&self) -> &[Arc<dyn SourceClient>] {
        &self.clients
    }

    /// Runs one question through every stage.
    ///
    /// An empty plan is not an error: the report carries [`NO_PLAN_MESSAGE`]
    /// and no steps run.
    ///
    /// # Errors
    ///
    /// Returns an error if no valid plan could be obtained or a merge call
    /// failed.
    pub fn run(&self, question: &str) -> Result<OrchestrationReport, OrchestratorError> {
        let catalog = discover(&self.clients);
        tracing::info!(files = catalog.files().len(), "discovery finished");

        let plan = self.planner.plan(question, &catalog)?;
        tracing::info!(steps = plan.len(), "plan created");
        tracing::debug!(plan = %plan, "execution plan");

        if plan.is_empty() {
            return Ok(OrchestrationReport {
                plan,
                results: Vec::new(),
                answer: NO_PLAN_MESSAGE.to_string(),
            });
        }

        let results = execute(&plan, &self.clients);
        let answer = self
            .merger
            .fold(question, &results)
            .map_err(OrchestratorError::Merge)?
            .unwrap_or_else(|| NO_PLAN_MESSAGE.to_string());

        Ok(OrchestrationReport {
            plan,
            results,
            answer,
        })
    }

    /// Answers a question, always with user-facing text.
    pub fn answer(&self, question: &str) -> String {
        match self.run(question) {
            Ok(report) => report.answer,
            Err(e) => failure_message(&e),
        }
    }
}

/// User-facing text for a request that could not be completed.
pub fn failure_message(error: &OrchestratorError) -> String {
    match error {
        OrchestratorError::Planning(e) => {
            tracing::error!(error = %e, "planning failed");
            NO_PLAN_MESSAGE.to_string()
        }
        e => {
            tracing::error!(error = %e, "request failed");
            format!("Request failed: {e}")
        }
    }
}
