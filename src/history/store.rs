//! History store - pgvector-backed similarity search over browsing history
//!
//! The `history_chunks` table is written by the external ingestion pipeline:
//!
//! ```sql
//! CREATE TABLE history_chunks (
//!     id         BIGSERIAL PRIMARY KEY,
//!     content    TEXT NOT NULL,
//!     title      TEXT,
//!     source     TEXT,
//!     visit_date TEXT,
//!     embedding  vector(384)
//! );
//! ```
//!
//! This process only ever reads it.

use crate::config::{DatabaseConfig, RetrievalConfig};
use crate::error::{Error, Result};
use async_trait::async_trait;
use pgvector::Vector;
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::time::Duration;
use tracing::{debug, info};

use super::cache::RetrievalCache;
use super::embedding::EmbeddingService;
use super::record::{HistoryRecord, NO_DATE, NO_SOURCE, NO_TITLE};

/// Fixed retrieval fan-out
pub const DEFAULT_TOP_K: usize = 8;

/// Read access to the indexed browsing history.
///
/// Results are similarity-ranked descending with no minimum relevance
/// threshold; an empty result is a normal outcome, not an error.
#[async_trait]
pub trait HistoryRetriever: Send + Sync {
    /// Retrieve the top-K records matching a free-text query
    async fn query(&self, text: &str) -> Result<Vec<HistoryRecord>>;
}

/// Initialize the PostgreSQL connection pool
pub async fn init_pool(config: &DatabaseConfig) -> Result<PgPool> {
    info!("Initializing PostgreSQL connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .connect(config.url.expose_secret())
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;

    info!("PostgreSQL connection pool initialized");
    Ok(pool)
}

/// Row shape as stored by the ingestion pipeline; metadata columns are
/// nullable there and normalized to sentinels here.
#[derive(FromRow)]
struct ChunkRow {
    content: String,
    title: Option<String>,
    source: Option<String>,
    visit_date: Option<String>,
}

impl From<ChunkRow> for HistoryRecord {
    fn from(row: ChunkRow) -> Self {
        HistoryRecord {
            content: row.content,
            title: row.title.unwrap_or_else(|| NO_TITLE.to_string()),
            source: row.source.unwrap_or_else(|| NO_SOURCE.to_string()),
            date: row.visit_date.unwrap_or_else(|| NO_DATE.to_string()),
        }
    }
}

/// History store backed by PostgreSQL + pgvector
#[derive(Clone)]
pub struct HistoryStore {
    pool: PgPool,
    embedding: EmbeddingService,
    cache: RetrievalCache,
    top_k: usize,
}

impl HistoryStore {
    /// Create a new history store
    pub fn new(pool: PgPool, embedding: EmbeddingService, config: &RetrievalConfig) -> Self {
        HistoryStore {
            pool,
            embedding,
            cache: RetrievalCache::new(config.cache_capacity, config.cache_ttl_secs),
            top_k: config.top_k,
        }
    }

    /// Get or create the embedding for a query
    async fn query_embedding(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(cached) = self.cache.get_embedding(text).await {
            return Ok(cached);
        }

        let embedding = self.embedding.embed_query(text).await?;
        self.cache.put_embedding(text, embedding.clone()).await;
        Ok(embedding)
    }

    /// Run the similarity search against pgvector
    async fn search(&self, embedding: Vec<f32>) -> Result<Vec<HistoryRecord>> {
        let rows: Vec<ChunkRow> = sqlx::query_as(
            r#"
            SELECT content, title, source, visit_date
            FROM history_chunks
            WHERE embedding IS NOT NULL
            ORDER BY embedding <=> $1
            LIMIT $2
            "#,
        )
        .bind(Vector::from(embedding))
        .bind(self.top_k as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(HistoryRecord::from).collect())
    }
}

#[async_trait]
impl HistoryRetriever for HistoryStore {
    async fn query(&self, text: &str) -> Result<Vec<HistoryRecord>> {
        if let Some(cached) = self.cache.get_results(text).await {
            debug!("Retrieval cache hit");
            return Ok(cached);
        }

        // Embedding failures already arrive as retrieval errors; database
        // failures get wrapped here.
        let embedding = self.query_embedding(text).await?;

        let records = self
            .search(embedding)
            .await
            .map_err(|e| Error::Retrieval(e.to_string()))?;

        info!("Retrieved {} history records", records.len());

        self.cache.put_results(text, records.clone()).await;
        Ok(records)
    }
}
