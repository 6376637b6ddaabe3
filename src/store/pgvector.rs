//! pgvector-backed collection: one Postgres table per collection.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use pgvector::Vector;
use tokio::sync::Mutex;
use tokio_postgres::types::Json;
use tokio_postgres::{Client, NoTls};

use super::{ChunkMetadata, CollectionName, IndexEntry, VectorStore};

/// Rows sent per insert transaction.
const INSERT_BATCH: usize = 128;

/// Collection stored in a Postgres table with a `VECTOR` column.
pub struct PgVectorStore {
    client: Mutex<Client>,
    collection: CollectionName,
}

impl PgVectorStore {
    /// Connects to Postgres and binds the store to `collection`.
    pub async fn connect(database_url: &str, collection: CollectionName) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(database_url, NoTls)
            .await
            .with_context(|| format!("failed to connect to Postgres at {}", database_url))?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::error!(error = %err, "postgres connection error");
            }
        });
        Ok(Self::from_client(client, collection))
    }

    /// Wraps an already connected client.
    pub fn from_client(client: Client, collection: CollectionName) -> Self {
        Self {
            client: Mutex::new(client),
            collection,
        }
    }

    /// Collection this store reads and writes.
    pub fn collection(&self) -> &CollectionName {
        &self.collection
    }

    async fn exists(&self, client: &Client) -> Result<bool> {
        let row = client
            .query_one(
                "SELECT to_regclass($1) IS NOT NULL AS present",
                &[&self.collection.qualified()],
            )
            .await
            .context("failed to look up collection")?;
        Ok(row.get("present"))
    }
}

#[async_trait]
impl VectorStore for PgVectorStore {
    async fn drop_collection(&self) -> Result<bool> {
        let client = self.client.lock().await;
        let existed = self.exists(&client).await?;
        client
            .execute(
                &format!("DROP TABLE IF EXISTS {}", self.collection.qualified()),
                &[],
            )
            .await
            .context("failed to drop collection")?;
        Ok(existed)
    }

    async fn create_collection(&self, dimensions: usize) -> Result<()> {
        anyhow::ensure!(dimensions > 0, "embedding dimension must be positive");
        let client = self.client.lock().await;
        client
            .execute("CREATE EXTENSION IF NOT EXISTS vector", &[])
            .await
            .context("failed to ensure pgvector extension")?;
        client
            .execute(&create_sql(&self.collection, dimensions), &[])
            .await
            .context("failed to create collection table")?;
        Ok(())
    }

    async fn insert(&self, entries: &[IndexEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut client = self.client.lock().await;
        let sql = insert_sql(&self.collection);
        for (batch_no, batch) in entries.chunks(INSERT_BATCH).enumerate() {
            let transaction = client.transaction().await?;
            let statement = transaction.prepare(&sql).await?;
            for (offset, entry) in batch.iter().enumerate() {
                let ordinal = i64::try_from(batch_no * INSERT_BATCH + offset)
                    .map_err(|_| anyhow!("ordinal exceeds i64 range"))?;
                let vector = Vector::from(entry.embedding.clone());
                let metadata = Json(&entry.metadata);
                transaction
                    .execute(
                        &statement,
                        &[&entry.id, &ordinal, &entry.document, &vector, &metadata],
                    )
                    .await
                    .with_context(|| format!("failed to insert {}", entry.id))?;
            }
            transaction.commit().await?;
            tracing::debug!(batch = batch_no, rows = batch.len(), "inserted batch");
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<Vec<ChunkMetadata>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let client = self.client.lock().await;
        if !self.exists(&client).await? {
            return Ok(Vec::new());
        }
        let vector = Vector::from(embedding.to_vec());
        let limit = i64::try_from(k).map_err(|_| anyhow!("k exceeds i64 range"))?;
        let rows = client
            .query(&select_sql(&self.collection), &[&vector, &limit])
            .await
            .context("similarity query failed")?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let Json(metadata): Json<ChunkMetadata> = row.get("metadata");
            results.push(metadata);
        }
        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let client = self.client.lock().await;
        if !self.exists(&client).await? {
            return Ok(0);
        }
        let row = client
            .query_one(
                &format!("SELECT COUNT(*) AS total FROM {}", self.collection.qualified()),
                &[],
            )
            .await
            .context("failed to count collection rows")?;
        let total: i64 = row.get("total");
        Ok(total.max(0) as usize)
    }
}

fn create_sql(collection: &CollectionName, dimensions: usize) -> String {
    format!(
        "CREATE TABLE {} (
            id TEXT PRIMARY KEY,
            ordinal BIGINT NOT NULL,
            document TEXT NOT NULL,
            embedding VECTOR({dimensions}) NOT NULL,
            metadata JSONB NOT NULL
        )",
        collection.qualified()
    )
}

fn insert_sql(collection: &CollectionName) -> String {
    format!(
        "INSERT INTO {} (id, ordinal, document, embedding, metadata) VALUES ($1, $2, $3, $4, $5)",
        collection.qualified()
    )
}

fn select_sql(collection: &CollectionName) -> String {
    format!(
        "SELECT metadata, embedding <=> $1 AS distance \
        FROM {} \
        ORDER BY embedding <=> $1 ASC, ordinal ASC \
        LIMIT $2",
        collection.qualified()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_targets_qualified_collection() {
        let name = CollectionName::new("public", "trailer_parts").expect("name");
        assert!(create_sql(&name, 384).contains("VECTOR(384)"));
        assert!(insert_sql(&name).starts_with("INSERT INTO \"public\".\"trailer_parts\""));
        let select = select_sql(&name);
        assert!(select.contains("ORDER BY embedding <=> $1 ASC"));
        assert!(select.ends_with("LIMIT $2"));
    }
}
