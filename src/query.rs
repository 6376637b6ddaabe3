//! Free-text similarity search over the indexed catalog.

use std::sync::Arc;

use anyhow::Result;

use crate::embedder::{embed_one, Embedder};
use crate::product::usable_image_url;
use crate::store::{ChunkMetadata, VectorStore};

/// Number of results requested when a caller does not say otherwise.
pub const DEFAULT_TOP_K: usize = 5;

/// Ranked metadata, most similar first.
pub type QueryResult = Vec<ChunkMetadata>;

/// Embeds query text and asks the store for its nearest chunks.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl QueryService {
    /// Pairs a store with the embedder that built its index.
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Up to `k` matches for `text`. Blank text or `k == 0` yields no results.
    pub async fn query(&self, text: &str, k: usize) -> Result<QueryResult> {
        let text = text.trim();
        if text.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let embedding = embed_one(self.embedder.as_ref(), text).await?;
        self.query_embedding(&embedding, k).await
    }

    /// Same as [`QueryService::query`] for an already embedded query.
    pub async fn query_embedding(&self, embedding: &[f32], k: usize) -> Result<QueryResult> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut results = self.store.query(embedding, k).await?;
        results.truncate(k);
        Ok(results)
    }

    /// Embedder shared with the index.
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Backing store.
    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }
}

/// Renders search results the way the CLI prints them.
pub fn render_results(results: &[ChunkMetadata]) -> String {
    if results.is_empty() {
        return "No matching products found.".to_string();
    }
    let rule = "-".repeat(60);
    let mut out = format!("Found {} matching products:\n\n", results.len());
    for (rank, meta) in results.iter().enumerate() {
        out.push_str(&format!(
            "{}. {}\n   Price: ${}\n   Source: {}\n   URL: {}\n   Image: {}\n{}\n",
            rank + 1,
            meta.name,
            meta.price,
            meta.source_site,
            meta.url,
            usable_image_url(&meta.image_url),
            rule
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::PLACEHOLDER_IMAGE_URL;

    #[test]
    fn renders_not_found_message() {
        assert_eq!(render_results(&[]), "No matching products found.");
    }

    #[test]
    fn renders_ranked_results_with_image_fallback() {
        let results = vec![ChunkMetadata {
            name: "Axle Hub".into(),
            price: "12.00".into(),
            url: "https://ebay.com/x".into(),
            source_site: "eBay".into(),
            image_url: "data:image/gif".into(),
        }];
        let rendered = render_results(&results);
        assert!(rendered.starts_with("Found 1 matching products:"));
        assert!(rendered.contains("1. Axle Hub\n   Price: $12.00\n   Source: eBay"));
        assert!(rendered.contains(&format!("Image: {PLACEHOLDER_IMAGE_URL}")));
    }
}
