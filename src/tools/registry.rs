//! Tool registry - manages the tools available to the agent

use std::collections::HashMap;

use crate::agent::types::ToolDefinition;
use crate::error::Result;

use super::traits::{Tool, ToolCall, ToolResult};

/// Registry of available tools
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        ToolRegistry {
            tools: HashMap::new(),
        }
    }

    /// Register a tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Get all tool definitions
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> =
            self.tools.values().map(|t| t.to_definition()).collect();
        // HashMap iteration order is unstable; keep the advertised tool list
        // deterministic across requests.
        definitions.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        definitions
    }

    /// Execute a tool call.
    ///
    /// An unrecognized tool name yields a failure result naming the valid
    /// tools rather than an error, so the loop can surface it to the model
    /// and keep going.
    pub async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        match self.get(&call.name) {
            Some(tool) => tool.execute(call.arguments.clone()).await,
            None => {
                let mut names = self.names();
                names.sort_unstable();
                Ok(ToolResult::failure(format!(
                    "Unknown tool: {}. Available tools: {}",
                    call.name,
                    names.join(", ")
                )))
            }
        }
    }

    /// Get tool count
    pub fn count(&self) -> usize {
        self.tools.len()
    }

    /// List tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}
