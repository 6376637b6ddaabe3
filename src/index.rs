//! Full rebuild of the vector index from a chunk list.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::chunker::{read_chunks, Chunk};
use crate::embedder::{embed_all, Embedder};
use crate::sites::resolve_source_site;
use crate::store::{ChunkMetadata, IndexEntry, VectorStore};

/// Synthetic identifier for the chunk at `ordinal`.
pub fn chunk_id(ordinal: usize) -> String {
    format!("chunk_{ordinal}")
}

/// Metadata stored for `chunk`, with the source site inferred from its link when unset.
pub fn chunk_metadata(chunk: &Chunk) -> ChunkMetadata {
    ChunkMetadata {
        name: chunk.name.clone(),
        price: chunk.price.clone(),
        url: chunk.link.clone(),
        source_site: resolve_source_site(&chunk.seller, &chunk.link),
        image_url: chunk.image_url.clone(),
    }
}

/// Pairs chunks with their embeddings. Only the product name is embedded.
pub fn build_entries(chunks: &[Chunk], embeddings: Vec<Vec<f32>>) -> Result<Vec<IndexEntry>> {
    anyhow::ensure!(
        chunks.len() == embeddings.len(),
        "got {} embeddings for {} chunks",
        embeddings.len(),
        chunks.len()
    );
    Ok(chunks
        .iter()
        .zip(embeddings)
        .enumerate()
        .map(|(ordinal, (chunk, embedding))| IndexEntry {
            id: chunk_id(ordinal),
            document: chunk.name.clone(),
            embedding,
            metadata: chunk_metadata(chunk),
        })
        .collect())
}

/// Replaces the collection with `chunks`. Returns the number of entries written.
///
/// With no chunks the collection is dropped and left absent.
pub async fn rebuild_index(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    chunks: &[Chunk],
) -> Result<usize> {
    let existed = store.drop_collection().await?;
    info!(existed, "dropped existing collection");
    if chunks.is_empty() {
        info!("no chunks to index");
        return Ok(0);
    }

    let documents: Vec<&str> = chunks.iter().map(|chunk| chunk.name.as_str()).collect();
    let embeddings = embed_all(embedder, &documents).await?;
    let dimensions = embeddings.first().map(Vec::len).unwrap_or(0);
    anyhow::ensure!(
        embeddings.iter().all(|vector| vector.len() == dimensions),
        "embedder returned vectors of differing dimensions"
    );
    let entries = build_entries(chunks, embeddings)?;

    store.create_collection(dimensions).await?;
    store.insert(&entries).await?;
    let stored = store.count().await?;
    anyhow::ensure!(
        stored == entries.len(),
        "collection holds {stored} entries after inserting {}",
        entries.len()
    );
    info!(count = stored, dimensions, "indexed products");
    Ok(stored)
}

/// Reads `chunk_file` and rebuilds the index from it.
pub async fn run_indexing(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    chunk_file: &Path,
) -> Result<usize> {
    anyhow::ensure!(chunk_file.exists(), "chunk file not found: {:?}", chunk_file);
    let chunks = read_chunks(chunk_file)?;
    rebuild_index(store, embedder, &chunks).await
}
