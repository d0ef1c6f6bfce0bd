//! # WebMemory
//!
//! A retrieval-augmented agent that answers natural-language questions about
//! a single user's web-browsing history.
//!
//! ## Features
//!
//! - **Semantic Retrieval:** PostgreSQL + pgvector over locally embedded
//!   browsing-history chunks (fastembed, no external embedding service)
//! - **Tool-Calling Loop:** bounded agent loop driving `search_history` and
//!   `get_links` tools against the history index
//! - **Structured Answers:** every turn ends in a schema-validated
//!   `{ answer }` payload, never free-form text
//! - **Privacy-Filtered:** the system prompt instructs the model to
//!   generalize and to keep dates to month/year granularity

pub mod agent;
pub mod config;
pub mod error;
pub mod history;
pub mod tools;

pub use config::Config;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
