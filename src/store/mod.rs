//! Vector store abstraction plus the records written to and read from it.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod pgvector;

pub use pgvector::PgVectorStore;

/// Default collection holding the indexed catalog.
pub const DEFAULT_COLLECTION: &str = "trailer_parts";

/// Metadata stored alongside every embedded chunk and returned by queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkMetadata {
    /// Product title.
    pub name: String,
    /// Price text.
    pub price: String,
    /// Product detail link.
    pub url: String,
    /// Canonical source site.
    pub source_site: String,
    /// Image link.
    pub image_url: String,
}

/// One row of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// Synthetic identifier (`chunk_<ordinal>`).
    pub id: String,
    /// Text that was embedded.
    pub document: String,
    /// Embedding of `document`.
    pub embedding: Vec<f32>,
    /// Metadata returned on query hits.
    pub metadata: ChunkMetadata,
}

/// A single named collection in a vector database.
///
/// Callers never see distances; results are ordered most similar first.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Drops the collection. Returns `false` when it did not exist.
    async fn drop_collection(&self) -> Result<bool>;

    /// Creates an empty collection for vectors of `dimensions` length.
    async fn create_collection(&self, dimensions: usize) -> Result<()>;

    /// Inserts entries into the existing collection.
    async fn insert(&self, entries: &[IndexEntry]) -> Result<()>;

    /// Up to `k` nearest entries' metadata. Empty when the collection is missing.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ChunkMetadata>>;

    /// Number of stored entries, zero when the collection is missing.
    async fn count(&self) -> Result<usize>;
}

/// Fully-qualified Postgres table name (schema + collection).
#[derive(Debug, Clone)]
pub struct CollectionName {
    schema: String,
    name: String,
}

impl CollectionName {
    /// Builds a new collection identifier.
    pub fn new<S, T>(schema: S, name: T) -> Result<Self>
    where
        S: Into<String>,
        T: Into<String>,
    {
        let schema = schema.into();
        let name = name.into();
        anyhow::ensure!(!schema.trim().is_empty(), "schema name is required");
        anyhow::ensure!(!name.trim().is_empty(), "collection name is required");
        Ok(Self { schema, name })
    }

    /// Fully-qualified table reference with quoted identifiers.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.name))
    }
}

/// Quotes Postgres identifiers, escaping embedded quotes.
pub fn quote_ident(input: &str) -> String {
    let escaped = input.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}
