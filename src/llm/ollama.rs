/// Ollama HTTP client.
///
/// Used when `LLM_PROVIDER=ollama`, typically for local development against a
/// model served on the same machine.
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{CompletionRequest, LlmClient, LlmError, RetryPolicy, retry_with_backoff};

/// Builder for constructing `OllamaClient` instances.
///
/// # Examples
///
/// ```
/// use cloudqa::llm::OllamaClientBuilder;
///
/// let client = OllamaClientBuilder::new()
///     .base_url("http://localhost:11434")
///     .build()
///     .expect("Failed to create client");
/// assert_eq!(client.base_url(), "http://localhost:11434");
/// ```
#[derive(Debug, Default)]
pub struct OllamaClientBuilder {
    base_url: Option<String>,
    retry: Option<RetryPolicy>,
}

impl OllamaClientBuilder {
    /// Creates a new `OllamaClientBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL for the Ollama API.
    ///
    /// # Arguments
    ///
    /// * `url` - The base URL (e.g., "http://localhost:11434")
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Builds the `OllamaClient` with the configured settings.
    ///
    /// # Environment Variables
    ///
    /// If `base_url()` was not called, this method will check the `OLLAMA_HOST`
    /// environment variable. If not set, it defaults to `http://localhost:11434`.
    pub fn build(self) -> Result<OllamaClient, LlmError> {
        let base_url = match self.base_url {
            Some(url) => url,
            None => std::env::var("OLLAMA_HOST")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
        };

        reqwest::Url::parse(&base_url)
            .map_err(|e| LlmError::Config(format!("{}: {}", base_url, e)))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(LlmError::Network)?;

        Ok(OllamaClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: self.retry.unwrap_or_default(),
        })
    }
}

/// Synchronous HTTP client for the Ollama `/api/generate` endpoint.
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    base_url: String,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    error: Option<String>,
}

impl OllamaClient {
    /// Returns the base URL configured for this client.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn generate_once(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = GenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            stream: false,
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(LlmError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Http {
                status: status.as_u16(),
            });
        }

        let text = response.text().map_err(LlmError::from_transport)?;
        parse_generate_response(&text)
    }
}

fn parse_generate_response(body: &str) -> Result<String, LlmError> {
    let parsed: GenerateResponse = serde_json::from_str(body).map_err(LlmError::Serialization)?;
    if let Some(message) = parsed.error {
        return Err(LlmError::Api { message });
    }
    parsed
        .response
        .map(|r| r.trim().to_string())
        .ok_or_else(|| LlmError::Api {
            message: "Missing 'response' field in API response".to_string(),
        })
}

impl LlmClient for OllamaClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        retry_with_backoff(&self.retry, || self.generate_once(request))
    }
}
