/// Language-model clients.
///
/// Every model call in the crate goes through the [`LlmClient`] trait so that
/// tests can substitute scripted responses. Two HTTP providers are shipped:
/// the Anthropic Messages API and a local Ollama server.
mod anthropic;
mod client;
mod ollama;

pub use anthropic::{AnthropicClient, AnthropicClientBuilder};
pub use client::{
    CompletionRequest, LlmClient, LlmError, RetryPolicy, retry_with_backoff,
};
pub use ollama::{OllamaClient, OllamaClientBuilder};
