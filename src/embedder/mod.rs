//! Text embedding clients used for both indexing and querying.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;

pub mod ollama;
pub mod openai;

pub use ollama::OllamaEmbedder;
pub use openai::OpenAiEmbedder;

/// Maps text to vectors. Index and query must share one implementation so
/// both sides live in the same embedding space.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Largest number of inputs accepted by [`Embedder::embed_batch`].
    fn batch_size(&self) -> usize;

    /// Embeds `inputs`, returning one vector per input in the same order.
    async fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>>;
}

/// Embeds any number of inputs, splitting them into batches the embedder accepts.
pub async fn embed_all(embedder: &dyn Embedder, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
    let mut vectors = Vec::with_capacity(inputs.len());
    for batch in inputs.chunks(embedder.batch_size().max(1)) {
        let embedded = embedder.embed_batch(batch).await?;
        anyhow::ensure!(
            embedded.len() == batch.len(),
            "embedder returned {} vectors for {} inputs",
            embedded.len(),
            batch.len()
        );
        vectors.extend(embedded);
        tracing::debug!(embedded = vectors.len(), total = inputs.len(), "embedding progress");
    }
    Ok(vectors)
}

/// Embeds a single input.
pub async fn embed_one(embedder: &dyn Embedder, input: &str) -> Result<Vec<f32>> {
    embedder
        .embed_batch(&[input])
        .await?
        .pop()
        .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
}

pub(crate) fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

pub(crate) fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request()
}

pub(crate) fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}
