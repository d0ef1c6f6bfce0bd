//! Browsing-history search tool
//!
//! Retrieves the top-K most similar history records for a query and
//! returns them as a date-annotated context block.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use super::traits::{Tool, ToolResult};
use crate::history::{format_records, HistoryRetriever};
use crate::Result;

/// Message returned when retrieval yields nothing (or fails)
pub const NO_HISTORY_MESSAGE: &str = "No relevant browsing history found.";

/// Semantic search over the user's browsing history
pub struct SearchHistoryTool {
    retriever: Arc<dyn HistoryRetriever>,
}

impl SearchHistoryTool {
    /// Create a new search tool over a retriever
    pub fn new(retriever: Arc<dyn HistoryRetriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for SearchHistoryTool {
    fn name(&self) -> &str {
        "search_history"
    }

    fn description(&self) -> &str {
        "Comprehensive search of the user's web browsing history, including page dates."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| crate::Error::InvalidInput("Missing 'query' parameter".to_string()))?;

        match self.retriever.query(query).await {
            Ok(records) if records.is_empty() => Ok(ToolResult::success(NO_HISTORY_MESSAGE)),
            Ok(records) => Ok(ToolResult::success(format_records(&records).context)),
            Err(e) => {
                // The index being down degrades to "nothing found" for the
                // model; the real failure goes to the log.
                warn!("History retrieval failed: {}", e);
                Ok(ToolResult::success(NO_HISTORY_MESSAGE))
            }
        }
    }
}
