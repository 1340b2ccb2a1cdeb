use std::sync::Arc;

use crate::llm::{CompletionRequest, LlmClient};
use crate::models::{Source, is_substantive};

use super::DescribeError;

const MAX_TOKENS: u32 = 300;

/// Asks a model for a one-line factual description of a preview.
#[derive(Clone)]
pub struct ModelDescriber {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl ModelDescriber {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Describes the preview of `path`.
    ///
    /// Returns `Ok(None)` when the model answered with two words or fewer,
    /// which is not enough to replace an existing description.
    pub fn describe(
        &self,
        path: &str,
        source: Source,
        preview: &[u8],
    ) -> Result<Option<String>, DescribeError> {
        let head = String::from_utf8_lossy(preview);
        let prompt = describe_prompt(path, source, head.trim());
        let request = CompletionRequest::new(&self.model, prompt)
            .max_tokens(MAX_TOKENS)
            .temperature(0.0);

        let text = self.llm.complete(&request)?;
        let text = text.trim();
        if is_substantive(text) {
            Ok(Some(text.to_string()))
        } else {
            tracing::debug!(path, response = text, "model description too short, ignored");
            Ok(None)
        }
    }
}

fn describe_prompt(path: &str, source: Source, head: &str) -> String {
    format!(
        "You are helping index a dataset for search and discovery.\n\
         Below is a preview sample from a file stored in cloud storage:\n\
         File path: {path}\n\
         Cloud: {cloud}\n\
         ------------------------\n\
         {head}\n\
         ------------------------\n\
         Give a clear one-line factual description of the file contents. \
         Describe what kind of data is inside and how it could be used.\n\
         ONLY return the description text: no filename, no prefix, no extra commentary.",
        cloud = source.as_str().to_uppercase(),
    )
}
