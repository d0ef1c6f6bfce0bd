//! Local query embedding via fastembed
//!
//! Uses the multilingual-e5-small model (384 dimensions, ~90MB), matching
//! the dimensions of the ingestion pipeline's index. Model auto-downloads
//! on first use. This service only ever embeds retrieval queries; document
//! embedding happens in the ingestion pipeline.

use crate::error::{Error, Result};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;

/// Embedding dimensions for multilingual-e5-small
pub const EMBEDDING_DIMENSIONS: usize = 384;

/// Local embedding service wrapping fastembed
#[derive(Clone)]
pub struct EmbeddingService {
    model: Arc<TextEmbedding>,
}

impl EmbeddingService {
    /// Create a new embedding service with multilingual-e5-small
    pub fn new() -> Result<Self> {
        let model = TextEmbedding::try_new(
            InitOptions::new(EmbeddingModel::MultilingualE5Small).with_show_download_progress(true),
        )
        .map_err(|e| Error::Internal(format!("embedding model unavailable: {}", e)))?;

        Ok(EmbeddingService {
            model: Arc::new(model),
        })
    }

    /// Embed a single retrieval query.
    ///
    /// fastembed is synchronous and CPU-bound, so the call runs on the
    /// blocking pool. Failures surface as retrieval errors: a query that
    /// cannot be embedded cannot be searched.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let model = Arc::clone(&self.model);
        let input = query.to_string();

        let mut vectors = tokio::task::spawn_blocking(move || model.embed(vec![input], None))
            .await
            .map_err(|e| Error::Retrieval(format!("embedding task panicked: {}", e)))?
            .map_err(|e| Error::Retrieval(format!("query embedding failed: {}", e)))?;

        vectors
            .pop()
            .ok_or_else(|| Error::Retrieval("embedding model produced no vector".to_string()))
    }

    /// Get the embedding dimensions
    pub fn dimensions(&self) -> usize {
        EMBEDDING_DIMENSIONS
    }
}
