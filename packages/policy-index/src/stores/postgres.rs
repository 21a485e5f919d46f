//! PostgreSQL + pgvector chunk store.
//!
//! Chunks live in `policy_chunks`; metadata is JSONB so filters map onto `@>`
//! containment, and ranking uses pgvector's cosine distance operator `<=>`.

use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::{PgArguments, PgPool};
use sqlx::query::Query;
use sqlx::{FromRow, Postgres};
use tracing::{debug, instrument};

use crate::error::{IndexError, Result};
use crate::traits::store::ChunkStore;
use crate::types::{ChunkMetadata, EmbeddedChunk, MetadataFilter, PolicyChunk, ScoredChunk};

fn storage(e: sqlx::Error) -> IndexError {
    IndexError::Storage(Box::new(e))
}

/// PostgreSQL-backed chunk store.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct ChunkRow {
    id: String,
    site_url: String,
    content: String,
    metadata: serde_json::Value,
    embedding: Vector,
    score: f64,
}

impl ChunkRow {
    fn into_hit(self) -> Result<(ScoredChunk, Vec<f32>)> {
        let metadata: ChunkMetadata = serde_json::from_value(self.metadata)?;
        let chunk = PolicyChunk {
            id: self.id,
            site_url: self.site_url,
            content: self.content,
            metadata,
        };
        Ok((
            ScoredChunk {
                chunk,
                score: self.score as f32,
            },
            self.embedding.to_vec(),
        ))
    }
}

impl PostgresStore {
    /// Wrap an existing pool. `policy_chunks` comes from the server migrations.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

const UPSERT_CHUNK: &str = r#"
    INSERT INTO policy_chunks (id, site_url, content, metadata, embedding)
    VALUES ($1, $2, $3, $4, $5)
    ON CONFLICT (id) DO UPDATE
    SET site_url = EXCLUDED.site_url,
        content = EXCLUDED.content,
        metadata = EXCLUDED.metadata,
        embedding = EXCLUDED.embedding
"#;

fn upsert(embedded: &EmbeddedChunk) -> Query<'_, Postgres, PgArguments> {
    let chunk = &embedded.chunk;
    sqlx::query(UPSERT_CHUNK)
        .bind(&chunk.id)
        .bind(&chunk.site_url)
        .bind(&chunk.content)
        .bind(serde_json::Value::Object(chunk.metadata.to_json()))
        .bind(Vector::from(embedded.embedding.clone()))
}

#[async_trait]
impl ChunkStore for PostgresStore {
    #[instrument(skip(self, chunks), fields(chunk_count = chunks.len()))]
    async fn add_chunks(&self, chunks: &[EmbeddedChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(storage)?;
        for embedded in chunks {
            upsert(embedded).execute(&mut *tx).await.map_err(storage)?;
        }
        tx.commit().await.map_err(storage)
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredChunk>> {
        Ok(self
            .similarity_search_with_vectors(embedding, k, filter)
            .await?
            .into_iter()
            .map(|(hit, _)| hit)
            .collect())
    }

    #[instrument(skip(self, embedding, filter))]
    async fn similarity_search_with_vectors(
        &self,
        embedding: &[f32],
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<(ScoredChunk, Vec<f32>)>> {
        let filter_json = filter.filter(|f| !f.is_empty()).map(MetadataFilter::to_json);

        let rows: Vec<ChunkRow> = sqlx::query_as(
            r#"
            SELECT id, site_url, content, metadata, embedding,
                   1 - (embedding <=> $1) AS score
            FROM policy_chunks
            WHERE $2::jsonb IS NULL OR metadata @> $2::jsonb
            ORDER BY embedding <=> $1
            LIMIT $3
            "#,
        )
        .bind(Vector::from(embedding.to_vec()))
        .bind(filter_json)
        .bind(k as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        debug!(hits = rows.len(), "Vector search finished");
        rows.into_iter().map(ChunkRow::into_hit).collect()
    }

    #[instrument(skip(self, chunks), fields(chunk_count = chunks.len()))]
    async fn replace_site(&self, site_url: &str, chunks: &[EmbeddedChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        sqlx::query("DELETE FROM policy_chunks WHERE site_url = $1")
            .bind(site_url)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;

        for embedded in chunks {
            upsert(embedded).execute(&mut *tx).await.map_err(storage)?;
        }

        tx.commit().await.map_err(storage)
    }

    #[instrument(skip(self))]
    async fn delete_site(&self, site_url: &str) -> Result<usize> {
        let result = sqlx::query("DELETE FROM policy_chunks WHERE site_url = $1")
            .bind(site_url)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(result.rows_affected() as usize)
    }

    async fn count(&self, filter: Option<&MetadataFilter>) -> Result<usize> {
        let filter_json = filter.filter(|f| !f.is_empty()).map(MetadataFilter::to_json);
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM policy_chunks WHERE $1::jsonb IS NULL OR metadata @> $1::jsonb",
        )
        .bind(filter_json)
        .fetch_one(&self.pool)
        .await
        .map_err(storage)?;
        Ok(count as usize)
    }
}
