//! Ollama `/api/embed` client for locally served embedding models.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{is_retryable_error, retry_backoff, should_retry, Embedder};

/// Embeddings client for an Ollama server.
#[derive(Clone)]
pub struct OllamaEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    max_retries: usize,
    batch_size: usize,
}

impl OllamaEmbedder {
    /// Builds a client for `base_url` (e.g. `http://localhost:11434`).
    pub fn new(
        base_url: String,
        model: String,
        timeout: Duration,
        max_retries: usize,
        batch_size: usize,
    ) -> Result<Self> {
        anyhow::ensure!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "Ollama base URL must be an http(s) URL"
        );
        anyhow::ensure!(!model.trim().is_empty(), "missing Ollama embedding model name");
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Ollama HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/embed", base_url.trim_end_matches('/')),
            model,
            max_retries: max_retries.max(1),
            batch_size: batch_size.max(1),
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        anyhow::ensure!(
            inputs.len() <= self.batch_size,
            "batch of {} exceeds configured max {}",
            inputs.len(),
            self.batch_size
        );

        let mut attempt = 0usize;
        loop {
            let request = EmbedRequest {
                model: &self.model,
                input: inputs,
            };
            match self.client.post(&self.endpoint).json(&request).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbedResponse = resp
                            .json()
                            .await
                            .context("failed to parse Ollama embed response")?;
                        anyhow::ensure!(
                            parsed.embeddings.len() == inputs.len(),
                            "Ollama returned {} embeddings for {} inputs",
                            parsed.embeddings.len(),
                            inputs.len()
                        );
                        return Ok(parsed.embeddings);
                    }
                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    anyhow::bail!("Ollama embed request failed ({}): {}", status, body);
                }
                Err(err) => {
                    if is_retryable_error(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tracing::warn!(error = %err, attempt, "retrying Ollama embed request");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(err)
                        .with_context(|| format!("failed to call Ollama at {}", self.endpoint));
                }
            }
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}
