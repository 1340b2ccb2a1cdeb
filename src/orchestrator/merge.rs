use std::sync::Arc;

use crate::llm::{CompletionRequest, LlmClient, LlmError};

use super::executor::StepResult;

const MERGE_MAX_TOKENS: u32 = 1000;
const MERGE_TEMPERATURE: f32 = 0.1;

/// Running state of the left fold over step results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeAccumulator {
    /// Merged answer so far.
    pub text: String,
    /// Source tags backing `text`, in fold order, without duplicates.
    pub sources: Vec<String>,
}

impl MergeAccumulator {
    pub fn new(first: &StepResult) -> Self {
        Self {
            text: first.answer.clone(),
            sources: vec![first.tag().to_string()],
        }
    }

    /// Tag shown to the merge model, e.g. `s3 + azure`.
    pub fn label(&self) -> String {
        self.sources.join(" + ")
    }

    /// The accumulator after `next` was merged into `merged_text`.
    pub fn absorb(mut self, next: &StepResult, merged_text: String) -> Self {
        let tag = next.tag();
        if !self.sources.iter().any(|s| s == tag) {
            self.sources.push(tag.to_string());
        }
        self.text = merged_text;
        self
    }
}

/// Builds the prompt merging `next` into the running answer.
pub fn merge_prompt(question: &str, acc: &MergeAccumulator, next: &StepResult) -> String {
    let prev = acc.label();
    let this = next.tag();
    format!(
        "The user asked: {question}\n\n\
         You have two result fragments:\n\
         ■ From [{prev}]:   {prev_text}\n\
         ■ From [{this}]:   {this_text}\n\n\
         **If one fragment contains no actionable facts, IGNORE that fragment and return an answer \
         based solely on the useful one.**\n\n\
         **Your job**:\n\
         1. **Extract all facts**, tagging each with its source ([{prev}] or [{this}]).\n\
         2. **Deduplicate**: merge any duplicate facts (preserving multiple sources).\n\
         3. **Check consistency**: for any key item present in one fragment but missing in the other, \
         add a \"Data Gap: <item> missing from [cloud]\" fact.\n\
         4. **Synthesize** a cohesive answer (at most 180 words) using only those facts.\n\
         5. End with one bold **Executive Takeaway** sentence.\n\n\
         Return **plain Markdown only**, with no code fences or extra sections.",
        prev_text = acc.text,
        this_text = next.answer,
    )
}

/// Folds step answers into one with sequential model calls.
pub struct Merger {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl Merger {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Merges `next` into `acc` with one model call.
    pub fn merge_step(
        &self,
        question: &str,
        acc: MergeAccumulator,
        next: &StepResult,
    ) -> Result<MergeAccumulator, LlmError> {
        let request = CompletionRequest::new(&self.model, merge_prompt(question, &acc, next))
            .max_tokens(MERGE_MAX_TOKENS)
            .temperature(MERGE_TEMPERATURE);
        let merged = self.llm.complete(&request)?;
        Ok(acc.absorb(next, merged.trim().to_string()))
    }

    /// Left-folds `results`. A single result is returned unchanged without
    /// calling the model; an empty slice yields `None`.
    pub fn fold(&self, question: &str, results: &[StepResult]) -> Result<Option<String>, LlmError> {
        let Some((first, rest)) = results.split_first() else {
            return Ok(None);
        };
        let mut acc = MergeAccumulator::new(first);
        for (i, next) in rest.iter().enumerate() {
            tracing::debug!(fold = i + 1, from = %acc.label(), next = next.tag(), "merging step result");
            acc = self.merge_step(question, acc, next)?;
        }
        Ok(Some(acc.text))
    }
}
