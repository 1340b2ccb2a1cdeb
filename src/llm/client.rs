/// Language-model client abstraction.
///
/// This module defines `LlmClient`, the trait every provider implements, the
/// request type carried to it, the error type shared by providers and the
/// retry helper they wrap their HTTP calls in.
use std::thread;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when calling a completion API.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network-related errors (connection failures, DNS resolution, etc.)
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// Request or response timeout errors
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    /// HTTP errors with status code
    #[error("HTTP error: status {status}")]
    Http { status: u16 },

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Provider-specific errors (malformed payloads, refusals)
    #[error("LLM API error: {message}")]
    Api { message: String },

    /// Invalid client configuration (URL, missing key)
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LlmError {
    /// Classifies a transport error as timeout or network failure.
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error)
        } else {
            Self::Network(error)
        }
    }
}

/// One single-turn completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Provider model identifier.
    pub model: String,
    /// The user-role prompt.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Sampling temperature; values near zero favour reproducibility.
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            max_tokens: 1000,
            temperature: 0.0,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Trait for completion API clients.
///
/// Enables mocking in tests; every component that talks to a model takes an
/// `Arc<dyn LlmClient>`.
pub trait LlmClient: Send + Sync {
    /// Sends `request` and returns the generated plain text.
    fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

/// Delays between retries of a transient failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}

impl Default for RetryPolicy {
    /// Three retries after 1s, 2s and 4s.
    fn default() -> Self {
        Self::new(vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
        ])
    }
}

/// Runs `f`, retrying transient failures with the delays in `policy`.
///
/// Only network errors, timeouts, HTTP 429 and HTTP 5xx are retried. The last
/// error is returned once the policy is exhausted.
pub fn retry_with_backoff<F, T>(policy: &RetryPolicy, mut f: F) -> Result<T, LlmError>
where
    F: FnMut() -> Result<T, LlmError>,
{
    let mut last_error = match f() {
        Ok(result) => return Ok(result),
        Err(e) if !should_retry(&e) => return Err(e),
        Err(e) => e,
    };

    for &delay in policy.delays() {
        tracing::debug!(delay_ms = delay.as_millis() as u64, error = %last_error, "retrying model call");
        thread::sleep(delay);

        match f() {
            Ok(result) => return Ok(result),
            Err(e) if !should_retry(&e) => return Err(e),
            Err(e) => last_error = e,
        }
    }

    Err(last_error)
}

fn should_retry(error: &LlmError) -> bool {
    match error {
        LlmError::Network(_) | LlmError::Timeout(_) => true,
        LlmError::Http { status } => *status == 429 || (500..600).contains(status),
        LlmError::Serialization(_) | LlmError::Api { .. } | LlmError::Config(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::error::Error;

    fn network_error() -> LlmError {
        LlmError::Network(
            reqwest::blocking::Client::new()
                .get("not-a-valid-url")
                .build()
                .unwrap_err(),
        )
    }

    fn instant_policy(retries: usize) -> RetryPolicy {
        RetryPolicy::new(vec![Duration::ZERO; retries])
    }

    #[test]
    fn http_error_display_includes_status() {
        let msg = LlmError::Http { status: 404 }.to_string();
        assert!(msg.contains("HTTP error"));
        assert!(msg.contains("404"));
    }

    #[test]
    fn serialization_error_keeps_source() {
        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err = LlmError::Serialization(json_error);
        assert!(err.to_string().contains("Serialization error"));
        assert!(err.source().is_some());
    }

    #[test]
    fn retry_succeeds_after_transient_network_error() {
        let attempts = Cell::new(0);
        let result = retry_with_backoff(&instant_policy(3), || {
            attempts.set(attempts.get() + 1);
            if attempts.get() < 2 {
                Err(network_error())
            } else {
                Ok("success")
            }
        });
        assert_eq!(result.unwrap(), "success");
        assert_eq!(attempts.get(), 2);
    }

    #[test]
    fn retry_stops_when_policy_is_exhausted() {
        let attempts = Cell::new(0);
        let result: Result<(), LlmError> = retry_with_backoff(&instant_policy(3), || {
            attempts.set(attempts.get() + 1);
            Err(network_error())
        });
        assert!(result.is_err());
        assert_eq!(attempts.get(), 4);
    }

    #[test]
    fn retry_skips_client_errors() {
        let attempts = Cell::new(0);
        let result: Result<(), LlmError> = retry_with_backoff(&instant_policy(3), || {
            attempts.set(attempts.get() + 1);
            Err(LlmError::Http { status: 400 })
        });
        assert!(matches!(result, Err(LlmError::Http { status: 400 })));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn retry_covers_rate_limits_and_server_errors() {
        for status in [429, 500, 503] {
            let attempts = Cell::new(0);
            let result = retry_with_backoff(&instant_policy(1), || {
                attempts.set(attempts.get() + 1);
                if attempts.get() == 1 {
                    Err(LlmError::Http { status })
                } else {
                    Ok(status)
                }
            });
            assert_eq!(result.unwrap(), status);
            assert_eq!(attempts.get(), 2);
        }
    }

    #[test]
    fn no_retry_policy_makes_single_attempt() {
        let attempts = Cell::new(0);
        let _: Result<(), LlmError> = retry_with_backoff(&RetryPolicy::none(), || {
            attempts.set(attempts.get() + 1);
            Err(network_error())
        });
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn completion_request_builder_sets_sampling() {
        let req = CompletionRequest::new("m", "p").max_tokens(300).temperature(0.1);
        assert_eq!(req.max_tokens, 300);
        assert!((req.temperature - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn trait_can_be_implemented_by_mock_struct() {
        struct Echo;
        impl LlmClient for Echo {
            fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
                Ok(request.prompt.clone())
            }
        }
        let client: &dyn LlmClient = &Echo;
        assert_eq!(client.complete(&CompletionRequest::new("m", "hi")).unwrap(), "hi");
    }
}
