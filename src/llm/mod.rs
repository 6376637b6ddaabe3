//! Completion service clients that turn a prompt into an answer.

use async_trait::async_trait;

mod ollama;
mod openai;

pub use ollama::OllamaCompletion;
pub use openai::OpenAiCompletion;

/// Why a completion call produced no answer.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// The service answered with a non-success HTTP status.
    #[error("completion service returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
    /// The request never completed (connect, timeout, I/O).
    #[error("completion request failed: {0}")]
    Transport(#[source] reqwest::Error),
    /// The service answered 200 with an unreadable body.
    #[error("invalid completion response: {0}")]
    InvalidResponse(String),
    /// The client could not be configured.
    #[error("completion client misconfigured: {0}")]
    Config(String),
}

/// Opaque text-generation service.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Generates an answer for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String, CompletionError>;
}

pub(crate) async fn read_error_body(resp: reqwest::Response) -> CompletionError {
    let status = resp.status().as_u16();
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    CompletionError::Status { status, body }
}
