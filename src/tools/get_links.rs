//! Source-link extraction tool
//!
//! Returns one citation per distinct source domain, highest-relevance
//! occurrence first. The system prompt restricts when the model may call
//! this; the tool itself is safe to call unconditionally.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use super::traits::{Tool, ToolResult};
use crate::history::{dedupe_links, HistoryRetriever};
use crate::Result;

/// Message returned when retrieval yields nothing (or fails)
pub const NO_LINKS_MESSAGE: &str = "No source links found for this query.";

/// Message returned when every retrieved record lacks a usable source
pub const NO_UNIQUE_LINKS_MESSAGE: &str = "No unique source links found.";

/// Extract deduplicated source URLs/domains from browsing history
pub struct GetLinksTool {
    retriever: Arc<dyn HistoryRetriever>,
}

impl GetLinksTool {
    /// Create a new links tool over a retriever
    pub fn new(retriever: Arc<dyn HistoryRetriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for GetLinksTool {
    fn name(&self) -> &str {
        "get_links"
    }

    fn description(&self) -> &str {
        "Extract source URLs/domains from browsing history. Use ONLY when the user explicitly asks for links, sources, domains, or websites."
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

        let records = match self.retriever.query(query).await {
            Ok(records) => records,
            Err(e) => {
                warn!("History retrieval failed: {}", e);
                return Ok(ToolResult::success(NO_LINKS_MESSAGE));
            }
        };

        if records.is_empty() {
            return Ok(ToolResult::success(NO_LINKS_MESSAGE));
        }

        let citations = dedupe_links(&records);
        if citations.is_empty() {
            return Ok(ToolResult::success(NO_UNIQUE_LINKS_MESSAGE));
        }

        let lines: Vec<String> = citations.iter().map(|c| c.render()).collect();
        Ok(ToolResult::success(format!(
            "FOUND {} UNIQUE SOURCE LINKS:\n{}",
            citations.len(),
            lines.join("\n")
        )))
    }
}
