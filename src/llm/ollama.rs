use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{read_error_body, CompletionError, CompletionService};

/// Non-streaming client for Ollama's `/api/generate`.
pub struct OllamaCompletion {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaCompletion {
    /// Builds a client for `base_url` (e.g. `http://localhost:11434`) and `model`.
    pub fn new(base_url: &str, model: String, timeout: Duration) -> Result<Self, CompletionError> {
        if model.trim().is_empty() {
            return Err(CompletionError::Config("missing Ollama model name".into()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| CompletionError::Config(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: generate_endpoint(base_url),
            model,
        })
    }
}

/// Accepts either a server root or a full `/api/generate` URL.
fn generate_endpoint(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.ends_with("/api/generate") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/api/generate")
    }
}

#[async_trait]
impl CompletionService for OllamaCompletion {
    async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(CompletionError::Transport)?;
        if resp.status() != reqwest::StatusCode::OK {
            return Err(read_error_body(resp).await);
        }
        let parsed: GenerateResponse = resp
            .json()
            .await
            .map_err(|err| CompletionError::InvalidResponse(err.to_string()))?;
        Ok(parsed.response.trim().to_string())
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}
