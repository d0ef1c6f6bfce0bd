//! The structured answer contract
//!
//! Every answering turn must end in a `HistoryAnswer`. The schema is sent
//! to the provider as the request's `response_format`; the final assistant
//! content is validated here, and any mismatch is a hard error.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::ResponseFormat;
use crate::error::{Error, Result};

/// Structured response from the history agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct HistoryAnswer {
    /// Final comprehensive answer based on retrieved context
    pub answer: String,
}

impl HistoryAnswer {
    /// The response format advertised to the provider
    pub fn response_format() -> ResponseFormat {
        let schema = schemars::schema_for!(HistoryAnswer);
        ResponseFormat::json_schema(
            "history_answer",
            serde_json::to_value(schema.schema).unwrap_or_default(),
        )
    }

    /// Parse and validate the final model content.
    ///
    /// Fails with `SchemaViolation` on empty content, malformed JSON, or a
    /// payload missing the `answer` field. Never silently defaults.
    pub fn from_model_content(content: &str) -> Result<Self> {
        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(Error::SchemaViolation(
                "final model response was empty".to_string(),
            ));
        }

        serde_json::from_str(trimmed).map_err(|e| {
            Error::SchemaViolation(format!("final model response failed validation: {}", e))
        })
    }
}
