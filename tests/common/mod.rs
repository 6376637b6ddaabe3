//! Trait-level stand-ins for the embedding, vector and completion services.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use trailer_rag::llm::{CompletionError, CompletionService};
use trailer_rag::store::{ChunkMetadata, IndexEntry, VectorStore};
use trailer_rag::Embedder;

const VOCABULARY: &[&str] = &[
    "axle", "hub", "leaf", "spring", "coupler", "light", "tail", "jack", "bearing", "fender",
];

/// Embeds text as counts of known vocabulary tokens plus a small bias term.
pub struct TokenOverlapEmbedder {
    pub calls: AtomicUsize,
}

impl TokenOverlapEmbedder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn vector(text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|token| !token.is_empty())
            .collect();
        let mut vector: Vec<f32> = VOCABULARY
            .iter()
            .map(|word| tokens.iter().filter(|token| *token == word).count() as f32)
            .collect();
        vector.push(0.01);
        vector
    }
}

#[async_trait]
impl Embedder for TokenOverlapEmbedder {
    fn batch_size(&self) -> usize {
        2
    }

    async fn embed_batch(&self, inputs: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(inputs.iter().map(|text| Self::vector(text)).collect())
    }
}

/// Single collection kept in memory, ranked by cosine distance then insertion order.
#[derive(Default)]
pub struct MemoryStore {
    collection: Mutex<Option<Collection>>,
}

struct Collection {
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self) -> bool {
        self.collection.lock().unwrap().is_some()
    }

    pub fn ids(&self) -> Vec<String> {
        self.collection
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| c.entries.iter().map(|entry| entry.id.clone()).collect())
            .unwrap_or_default()
    }

    pub fn documents(&self) -> Vec<String> {
        self.collection
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| c.entries.iter().map(|entry| entry.document.clone()).collect())
            .unwrap_or_default()
    }
}

fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn drop_collection(&self) -> Result<bool> {
        Ok(self.collection.lock().unwrap().take().is_some())
    }

    async fn create_collection(&self, dimensions: usize) -> Result<()> {
        let mut collection = self.collection.lock().unwrap();
        anyhow::ensure!(collection.is_none(), "collection already exists");
        *collection = Some(Collection {
            dimensions,
            entries: Vec::new(),
        });
        Ok(())
    }

    async fn insert(&self, entries: &[IndexEntry]) -> Result<()> {
        let mut guard = self.collection.lock().unwrap();
        let collection = guard
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("collection does not exist"))?;
        for entry in entries {
            anyhow::ensure!(
                entry.embedding.len() == collection.dimensions,
                "dimension mismatch"
            );
            anyhow::ensure!(
                collection.entries.iter().all(|existing| existing.id != entry.id),
                "duplicate id {}",
                entry.id
            );
            collection.entries.push(entry.clone());
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ChunkMetadata>> {
        let guard = self.collection.lock().unwrap();
        let Some(collection) = guard.as_ref() else {
            return Ok(Vec::new());
        };
        let mut scored: Vec<(f32, usize)> = collection
            .entries
            .iter()
            .enumerate()
            .map(|(ordinal, entry)| (cosine_distance(embedding, &entry.embedding), ordinal))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, ordinal)| collection.entries[ordinal].metadata.clone())
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self
            .collection
            .lock()
            .unwrap()
            .as_ref()
            .map(|c| c.entries.len())
            .unwrap_or(0))
    }
}

/// Completion stub that records how often it was called.
pub struct CountingCompletion {
    pub calls: AtomicUsize,
    pub reply: String,
}

impl CountingCompletion {
    pub fn new(reply: &str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            reply: reply.to_string(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for CountingCompletion {
    async fn generate(&self, prompt: &str) -> Result<String, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.is_empty() {
            return Err(CompletionError::InvalidResponse("empty prompt".into()));
        }
        Ok(self.reply.clone())
    }
}
