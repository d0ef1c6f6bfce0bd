//! In-process caching for query embeddings and search results
//!
//! Uses moka async caches (Send + Sync, TTL-based eviction). Caching is
//! safe here: the history index is read-only from this process, so stale
//! entries can only lag the external ingestion pipeline by one TTL.

use moka::future::Cache;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use super::record::HistoryRecord;

/// Cache key helper: hash a string to u64
fn hash_key(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// In-process retrieval cache
#[derive(Clone)]
pub struct RetrievalCache {
    /// Embedding cache: hash(query) -> Vec<f32>
    embeddings: Cache<u64, Vec<f32>>,
    /// Search result cache: hash(query) -> Vec<HistoryRecord>
    results: Cache<u64, Vec<HistoryRecord>>,
}

impl RetrievalCache {
    /// Create a new cache
    pub fn new(capacity: u64, ttl_secs: u64) -> Self {
        RetrievalCache {
            embeddings: Cache::builder()
                .max_capacity(capacity * 2)
                .time_to_live(Duration::from_secs(ttl_secs * 6))
                .build(),
            results: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(Duration::from_secs(ttl_secs))
                .build(),
        }
    }

    /// Get a cached query embedding
    pub async fn get_embedding(&self, query: &str) -> Option<Vec<f32>> {
        self.embeddings.get(&hash_key(query)).await
    }

    /// Store a query embedding
    pub async fn put_embedding(&self, query: &str, embedding: Vec<f32>) {
        self.embeddings.insert(hash_key(query), embedding).await;
    }

    /// Get cached search results
    pub async fn get_results(&self, query: &str) -> Option<Vec<HistoryRecord>> {
        self.results.get(&hash_key(query)).await
    }

    /// Store search results
    pub async fn put_results(&self, query: &str, records: Vec<HistoryRecord>) {
        self.results.insert(hash_key(query), records).await;
    }
}

impl Default for RetrievalCache {
    fn default() -> Self {
        Self::new(500, 300)
    }
}
