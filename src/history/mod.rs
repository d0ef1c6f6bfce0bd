//! History module - retrieval over the user's indexed browsing archive
//!
//! The archive itself is produced by an external ingestion pipeline; this
//! module only reads it. `HistoryRetriever` is the seam the tool layer
//! depends on, `HistoryStore` the pgvector-backed production implementation.

mod cache;
mod embedding;
mod format;
mod record;
mod store;

pub use cache::RetrievalCache;
pub use embedding::EmbeddingService;
pub use format::{dedupe_links, format_records, FormattedContext, LinkCitation};
pub use record::{Domain, HistoryRecord, NO_DATE, NO_SOURCE, NO_TITLE};
pub use store::{init_pool, HistoryRetriever, HistoryStore, DEFAULT_TOP_K};
