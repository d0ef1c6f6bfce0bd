//! Tools module - the actions the agent can take against the history index
//!
//! Each tool is a self-contained module implementing the `Tool` trait and
//! registered into a `ToolRegistry` made available to the LLM for function
//! calling. Both tools are read-only and absorb retrieval failures into
//! user-facing "not found" results.

mod get_links;
mod registry;
mod search_history;
mod traits;

// Core trait and types
pub use traits::{Tool, ToolCall, ToolResult};

// Registry
pub use registry::ToolRegistry;

// Built-in tools
pub use get_links::{GetLinksTool, NO_LINKS_MESSAGE, NO_UNIQUE_LINKS_MESSAGE};
pub use search_history::{SearchHistoryTool, NO_HISTORY_MESSAGE};

use crate::history::HistoryRetriever;
use std::sync::Arc;

/// Build the standard registry with both history tools over one retriever
pub fn history_registry(retriever: Arc<dyn HistoryRetriever>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(SearchHistoryTool::new(retriever.clone()));
    registry.register(GetLinksTool::new(retriever));
    registry
}

/// Test doubles for the retrieval seam
pub mod testing {
    use crate::error::{Error, Result};
    use crate::history::{HistoryRecord, HistoryRetriever};
    use async_trait::async_trait;

    /// A `HistoryRetriever` returning a fixed record list (or a fixed failure)
    pub struct StaticRetriever {
        records: Vec<HistoryRecord>,
        fail: bool,
    }

    impl StaticRetriever {
        /// Always return these records
        pub fn with_records(records: Vec<HistoryRecord>) -> Self {
            Self { records, fail: false }
        }

        /// Always return an empty result
        pub fn empty() -> Self {
            Self::with_records(Vec::new())
        }

        /// Always fail, as if the index were unreachable
        pub fn failing() -> Self {
            Self {
                records: Vec::new(),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl HistoryRetriever for StaticRetriever {
        async fn query(&self, _text: &str) -> Result<Vec<HistoryRecord>> {
            if self.fail {
                return Err(Error::Retrieval("index unreachable".to_string()));
            }
            Ok(self.records.clone())
        }
    }

}
