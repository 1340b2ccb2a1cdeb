//! One-line dataset descriptions.
//!
//! Two strategies: a cheap heuristic over a parsed tabular preview
//! ([`describe`]) and a model-generated description ([`ModelDescriber`]) used
//! when the preview is not tabular or a richer summary is wanted.

mod columnar;
mod heuristic;
mod model;
mod tabular;

use thiserror::Error;

use crate::llm::LlmError;

pub use heuristic::{FALLBACK_DESCRIPTION, describe, describe_sample};
pub use model::ModelDescriber;
pub use tabular::{TabularSample, infer_columns};

/// Errors produced while describing a preview.
#[derive(Debug, Error)]
pub enum DescribeError {
    /// The preview is neither delimited text nor a readable columnar sample.
    #[error("preview is not tabular: {0}")]
    Parse(String),

    /// The model call behind a generated description failed.
    #[error("description model failed: {0}")]
    Model(#[from] LlmError),
}
