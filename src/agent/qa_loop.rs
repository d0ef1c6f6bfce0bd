//! The bounded answering loop
//!
//! Drives the model over the conversation, executes requested tool calls,
//! feeds results back, and stops when the model produces a final structured
//! answer. The loop is bounded twice over: a hard step ceiling (past which
//! it gives up with a degraded fallback answer) and a tool-call budget
//! (past which tool definitions are withheld so the model must answer).

use crate::agent::answer::HistoryAnswer;
use crate::agent::types::*;
use crate::agent::OpenAiClient;
use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::tools::{ToolCall, ToolRegistry, ToolResult};

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configurable limits for the answering loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Maximum model round-trips before the loop gives up.
    pub max_steps: u32,
    /// Maximum tool calls across the whole turn.
    pub max_tool_calls: u32,
    /// Timeout applied to each individual tool execution.
    pub tool_timeout: Duration,
    /// Generation options; the loop pins temperature to 0 by default.
    pub generation_options: GenerationOptions,
    /// Degraded answer returned when the step ceiling is hit.
    pub fallback_answer: String,
}

impl LoopConfig {
    /// Standard limits for interactive question answering.
    pub fn standard() -> Self {
        Self {
            max_steps: 10,
            max_tool_calls: 6,
            tool_timeout: Duration::from_secs(30),
            generation_options: GenerationOptions::precise(),
            fallback_answer: "I wasn't able to finish searching the browsing history for \
                              this question. Please try asking in a more specific way."
                .into(),
        }
    }

    /// Limits taken from the application configuration.
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            max_steps: config.max_steps,
            max_tool_calls: config.max_tool_calls,
            tool_timeout: Duration::from_secs(config.tool_timeout_secs),
            ..Self::standard()
        }
    }
}

// ---------------------------------------------------------------------------
// Structured trace types
// ---------------------------------------------------------------------------

/// The result of executing a single tool call.
#[derive(Debug, Clone)]
pub struct ToolObservation {
    pub success: bool,
    pub content: String,
    pub duration_ms: u64,
}

/// A recorded action (tool call) and its observation (result).
#[derive(Debug, Clone)]
pub struct ToolAction {
    pub tool_name: String,
    pub arguments: String,
    pub observation: ToolObservation,
}

/// One step of the answering loop.
#[derive(Debug, Clone)]
pub struct LoopStep {
    pub step: u32,
    /// Text content produced by the model in this step (may be empty).
    pub thought: String,
    /// Tool call executed in this step, if any.
    pub action: Option<ToolAction>,
    /// The model's finish_reason for this step.
    pub finish_reason: String,
}

/// How the loop finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The model produced a final answer on its own.
    Completed,
    /// Hit `max_steps`; the fallback answer was returned.
    StepLimitReached,
    /// The tool budget ran out and the model was forced to answer.
    ToolLimitReached,
}

/// Full trace of a loop execution.
#[derive(Debug, Clone)]
pub struct LoopTrace {
    pub steps: Vec<LoopStep>,
    pub outcome: LoopOutcome,
    pub total_duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Callback trait
// ---------------------------------------------------------------------------

/// Trait for callers to observe loop events (e.g. print progress in the CLI).
#[async_trait]
pub trait LoopCallback: Send + Sync {
    /// Called at the start of each step, before the model call.
    async fn on_step_start(&self, _step: u32) {}
    /// Called after each tool has been executed.
    async fn on_tool_executed(&self, _tool_name: &str, _observation: &ToolObservation) {}
}

/// Default no-op callback.
pub struct NoOpCallback;

#[async_trait]
impl LoopCallback for NoOpCallback {}

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

/// Everything the loop needs to run one turn.
pub struct QaLoopInput<'a, C: LoopCallback> {
    /// The conversation so far (system + thread history + new question).
    pub messages: Vec<Message>,
    /// Model client to call.
    pub client: &'a OpenAiClient,
    /// Tool registry to execute tools against.
    pub tools: &'a ToolRegistry,
    /// Pre-computed tool definitions (avoids recomputing per step).
    pub tool_definitions: Vec<ToolDefinition>,
    /// Loop configuration.
    pub config: LoopConfig,
    /// Event callback.
    pub callback: C,
}

/// The result of running the answering loop.
pub struct QaLoopOutput {
    /// The validated structured answer.
    pub answer: HistoryAnswer,
    /// Structured trace of the full execution.
    pub trace: LoopTrace,
    /// Messages produced during this turn (beyond the input), in order.
    pub new_messages: Vec<Message>,
    /// Accumulated token usage across all steps.
    pub total_usage: Usage,
}

// ---------------------------------------------------------------------------
// Core loop implementation
// ---------------------------------------------------------------------------

/// Run the answering loop for one question.
///
/// Calls the model, executes at most one tool call per model turn, appends
/// the result, and repeats until the model answers, the tool budget forces
/// an answer, or the step ceiling trips. Provider failures propagate;
/// schema failures on the final message propagate; retrieval failures never
/// reach here (the tool layer absorbs them).
pub async fn run_qa_loop<C: LoopCallback>(input: QaLoopInput<'_, C>) -> Result<QaLoopOutput> {
    let QaLoopInput {
        mut messages,
        client,
        tools,
        tool_definitions,
        config,
        callback,
    } = input;

    let loop_start = Instant::now();
    let base_len = messages.len();
    let response_format = HistoryAnswer::response_format();

    let mut step: u32 = 0;
    let mut tool_calls_made: u32 = 0;
    let mut steps: Vec<LoopStep> = Vec::new();
    let mut total_usage = Usage::default();

    let (answer, outcome) = loop {
        step += 1;

        if step > config.max_steps {
            warn!(
                "Answering loop hit step ceiling ({}), giving up",
                config.max_steps
            );
            let answer = HistoryAnswer {
                answer: config.fallback_answer.clone(),
            };
            messages.push(Message::assistant(&answer.answer));
            break (answer, LoopOutcome::StepLimitReached);
        }

        info!("Answering loop step {}/{}", step, config.max_steps);
        callback.on_step_start(step).await;

        // Withhold tool definitions once the budget is spent; the model
        // then has to produce a final answer.
        let use_tools = tool_calls_made < config.max_tool_calls && !tool_definitions.is_empty();

        let response = if use_tools {
            client
                .chat_with_tools(
                    messages.clone(),
                    tool_definitions.clone(),
                    Some(response_format.clone()),
                    config.generation_options.clone(),
                )
                .await?
        } else {
            client
                .chat(
                    messages.clone(),
                    Some(response_format.clone()),
                    config.generation_options.clone(),
                )
                .await?
        };

        if let Some(ref usage) = response.usage {
            total_usage.accumulate(usage);
        }

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Provider("response contained no choices".to_string()))?;

        let finish_reason = choice
            .finish_reason
            .clone()
            .unwrap_or_else(|| "unknown".to_string());

        debug!(
            "Model step {}: finish_reason={}, has_tool_calls={}",
            step,
            finish_reason,
            choice.message.tool_calls.is_some()
        );

        // --- Tool call requested -------------------------------------------
        let requested = choice
            .message
            .tool_calls
            .as_ref()
            .filter(|calls| !calls.is_empty())
            .map(|calls| calls[0].clone());

        if let Some(tc) = requested {
            if let Some(calls) = &choice.message.tool_calls {
                if calls.len() > 1 {
                    warn!(
                        "Model requested {} simultaneous tool calls; only the first is serviced",
                        calls.len()
                    );
                }
            }

            // The assistant message joins the context so the tool result
            // below has its antecedent. Unserviced extra calls are dropped
            // from the transcript too, or replaying it would dangle.
            let mut assistant_message = choice.message.clone();
            assistant_message.tool_calls = Some(vec![tc.clone()]);
            messages.push(assistant_message);
            tool_calls_made += 1;

            let args: serde_json::Value = match serde_json::from_str(&tc.function.arguments) {
                Ok(v) => v,
                Err(e) => {
                    warn!(
                        "Failed to parse arguments for tool {}: {}",
                        tc.function.name, e
                    );
                    serde_json::json!({})
                }
            };

            info!(
                "Executing tool: {} (call {}/{})",
                tc.function.name, tool_calls_made, config.max_tool_calls
            );

            let call = ToolCall {
                id: tc.id.clone(),
                name: tc.function.name.clone(),
                arguments: args,
            };

            let tool_start = Instant::now();
            let result = match tokio::time::timeout(config.tool_timeout, tools.execute(&call)).await
            {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => ToolResult::failure(e.to_string()),
                Err(_) => ToolResult::failure(format!(
                    "Tool '{}' timed out after {}s",
                    call.name,
                    config.tool_timeout.as_secs()
                )),
            };
            let duration_ms = tool_start.elapsed().as_millis() as u64;

            let content = result.as_message();
            messages.push(Message::tool(&tc.id, &content));

            let observation = ToolObservation {
                success: result.success,
                content,
                duration_ms,
            };
            callback.on_tool_executed(&call.name, &observation).await;

            steps.push(LoopStep {
                step,
                thought: choice.message.content.clone(),
                action: Some(ToolAction {
                    tool_name: call.name,
                    arguments: tc.function.arguments,
                    observation,
                }),
                finish_reason,
            });

            continue;
        }

        // --- No tool call: validate the final structured answer ------------
        let answer = HistoryAnswer::from_model_content(&choice.message.content)?;
        messages.push(Message::assistant(&choice.message.content));

        steps.push(LoopStep {
            step,
            thought: choice.message.content.clone(),
            action: None,
            finish_reason,
        });

        let outcome = if !use_tools && tool_calls_made >= config.max_tool_calls {
            LoopOutcome::ToolLimitReached
        } else {
            LoopOutcome::Completed
        };
        break (answer, outcome);
    };

    let total_duration_ms = loop_start.elapsed().as_millis() as u64;

    info!(
        "Answering loop finished: outcome={:?}, steps={}, tool_calls={}, duration={}ms",
        outcome,
        step.min(config.max_steps),
        tool_calls_made,
        total_duration_ms,
    );

    let new_messages = messages.split_off(base_len);

    Ok(QaLoopOutput {
        answer,
        trace: LoopTrace {
            steps,
            outcome,
            total_duration_ms,
        },
        new_messages,
        total_usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_limits() {
        let config = LoopConfig::standard();
        assert_eq!(config.max_steps, 10);
        assert_eq!(config.max_tool_calls, 6);
        assert_eq!(config.generation_options.temperature, Some(0.0));
    }

    #[test]
    fn test_from_config_carries_limits() {
        let agent_config = AgentConfig {
            max_steps: 4,
            max_tool_calls: 2,
            tool_timeout_secs: 5,
        };
        let config = LoopConfig::from_config(&agent_config);
        assert_eq!(config.max_steps, 4);
        assert_eq!(config.max_tool_calls, 2);
        assert_eq!(config.tool_timeout, Duration::from_secs(5));
        assert!(!config.fallback_answer.is_empty());
    }
}
