//! Test doubles shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::llm::{CompletionRequest, LlmClient, LlmError};

/// Replays canned responses in order and records every request.
///
/// Once the script is exhausted every call fails with `LlmError::Api`.
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.prompt).collect()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl LlmClient for ScriptedLlm {
    fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::Api {
                message: "script exhausted".to_string(),
            })
    }
}
