//! Anthropic Messages API client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{CompletionRequest, LlmClient, LlmError, RetryPolicy, retry_with_backoff};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Builder for [`AnthropicClient`].
///
/// # Examples
///
/// ```
/// use cloudqa::llm::AnthropicClientBuilder;
///
/// let client = AnthropicClientBuilder::new()
///     .api_key("sk-test")
///     .base_url("http://localhost:8080")
///     .build()
///     .expect("Failed to create client");
/// assert_eq!(client.base_url(), "http://localhost:8080");
/// ```
#[derive(Debug, Default)]
pub struct AnthropicClientBuilder {
    base_url: Option<String>,
    api_key: Option<String>,
    retry: Option<RetryPolicy>,
}

impl AnthropicClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Builds the client.
    ///
    /// Falls back to `ANTHROPIC_BASE_URL` and `ANTHROPIC_API_KEY` when the
    /// corresponding builder methods were not called.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Config` if no API key is available or the base URL
    /// does not parse.
    pub fn build(self) -> Result<AnthropicClient, LlmError> {
        let base_url = self
            .base_url
            .or_else(|| std::env::var("ANTHROPIC_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let api_key = self
            .api_key
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::Config("ANTHROPIC_API_KEY is not set".to_string()))?;

        reqwest::Url::parse(&base_url)
            .map_err(|e| LlmError::Config(format!("invalid base URL {base_url}: {e}")))?;

        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(LlmError::Network)?;

        Ok(AnthropicClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            retry: self.retry.unwrap_or_default(),
        })
    }
}

/// Blocking client for `POST /v1/messages`.
pub struct AnthropicClient {
    http: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicClient {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send_once(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: [Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
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
        extract_text(&text)
    }
}

/// Concatenates the text blocks of a Messages API response body.
fn extract_text(body: &str) -> Result<String, LlmError> {
    let parsed: MessagesResponse = serde_json::from_str(body).map_err(LlmError::Serialization)?;
    let text: String = parsed
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();
    if text.is_empty() {
        return Err(LlmError::Api {
            message: "response contained no text content".to_string(),
        });
    }
    Ok(text.trim().to_string())
}

impl LlmClient for AnthropicClient {
    fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        retry_with_backoff(&self.retry, || self.send_once(request))
    }
}
