//! OpenAI-compatible embedding client.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{is_retryable_error, retry_backoff, should_retry, Embedder};

/// Embeddings client that talks to OpenAI-compatible `/embeddings` endpoints.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
    max_retries: usize,
    batch_size: usize,
}

impl OpenAiEmbedder {
    /// Builds a new OpenAI embeddings client.
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        dimensions: Option<usize>,
        timeout: Duration,
        max_retries: usize,
        batch_size: usize,
    ) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing OpenAI API key");
        anyhow::ensure!(!model.trim().is_empty(), "missing OpenAI model name");
        let mut headers = reqwest::header::HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).context("invalid OpenAI API key")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .context("failed to build OpenAI HTTP client")?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model,
            dimensions,
            max_retries: max_retries.max(1),
            batch_size: batch_size.max(1),
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
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
            let request = EmbeddingRequest {
                model: &self.model,
                input: inputs,
                dimensions: self.dimensions,
            };
            let response = self.client.post(&self.endpoint).json(&request).send().await;
            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let mut parsed: EmbeddingResponse = resp
                            .json()
                            .await
                            .context("failed to parse OpenAI embedding response")?;
                        parsed.data.sort_by_key(|entry| entry.index);
                        anyhow::ensure!(
                            parsed.data.len() == inputs.len(),
                            "OpenAI returned {} embeddings for {} inputs",
                            parsed.data.len(),
                            inputs.len()
                        );
                        return Ok(parsed
                            .data
                            .into_iter()
                            .map(|entry| entry.embedding)
                            .collect());
                    }

                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tracing::warn!(%status, attempt, "retrying OpenAI embeddings request");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    anyhow::bail!("OpenAI embeddings request failed ({}): {}", status, body);
                }
                Err(err) => {
                    if is_retryable_error(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        tracing::warn!(error = %err, attempt, "retrying OpenAI embeddings request");
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(err).context("failed to call OpenAI embeddings");
                }
            }
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    #[serde(borrow)]
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_credentials() {
        let err = OpenAiEmbedder::new(
            " ".into(),
            "https://api.openai.com/v1".into(),
            "text-embedding-3-small".into(),
            None,
            Duration::from_secs(5),
            3,
            16,
        )
        .err()
        .expect("blank key must fail");
        assert!(err.to_string().contains("API key"));
    }

    #[test]
    fn request_omits_unset_dimensions() {
        let inputs = ["axle"];
        let request = EmbeddingRequest {
            model: "m",
            input: &inputs,
            dimensions: None,
        };
        let json = serde_json::to_value(&request).expect("serialize");
        assert_eq!(json, serde_json::json!({"model": "m", "input": ["axle"]}));
    }
}
