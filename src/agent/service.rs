//! The history agent - ties the loop to conversation state
//!
//! One `HistoryAgent` is shared across a process. Each `ask` call locks its
//! thread for the whole turn, so two callers on the same thread id are
//! serialized while different threads run concurrently.

use crate::agent::answer::HistoryAnswer;
use crate::agent::qa_loop::{
    run_qa_loop, LoopCallback, LoopConfig, NoOpCallback, QaLoopInput,
};
use crate::agent::threads::ThreadStore;
use crate::agent::types::{Message, ToolDefinition};
use crate::agent::OpenAiClient;
use crate::error::Result;
use crate::tools::ToolRegistry;
use tracing::info;

/// A question-answering agent over the user's browsing history
pub struct HistoryAgent {
    client: OpenAiClient,
    tools: ToolRegistry,
    tool_definitions: Vec<ToolDefinition>,
    threads: ThreadStore,
    system_prompt: String,
    loop_config: LoopConfig,
}

impl HistoryAgent {
    /// Create a new agent
    pub fn new(
        client: OpenAiClient,
        tools: ToolRegistry,
        system_prompt: impl Into<String>,
        loop_config: LoopConfig,
    ) -> Self {
        let tool_definitions = tools.definitions();
        HistoryAgent {
            client,
            tools,
            tool_definitions,
            threads: ThreadStore::new(),
            system_prompt: system_prompt.into(),
            loop_config,
        }
    }

    /// Answer a question within a conversation thread.
    pub async fn ask(&self, question: &str, thread_id: &str) -> Result<HistoryAnswer> {
        self.ask_with_callback(question, thread_id, NoOpCallback).await
    }

    /// Answer a question, reporting loop progress through a callback.
    pub async fn ask_with_callback<C: LoopCallback>(
        &self,
        question: &str,
        thread_id: &str,
        callback: C,
    ) -> Result<HistoryAnswer> {
        let handle = self.threads.handle(thread_id).await;
        // Held for the full turn: single writer per thread.
        let mut thread = handle.lock().await;

        thread.append(Message::user(question));

        let mut messages = Vec::with_capacity(thread.len() + 1);
        messages.push(Message::system(&self.system_prompt));
        messages.extend_from_slice(thread.messages());

        let output = run_qa_loop(QaLoopInput {
            messages,
            client: &self.client,
            tools: &self.tools,
            tool_definitions: self.tool_definitions.clone(),
            config: self.loop_config.clone(),
            callback,
        })
        .await?;

        thread.extend(output.new_messages);

        info!(
            "Answered question on thread {}: outcome={:?}, tokens={}",
            thread_id, output.trace.outcome, output.total_usage.total_tokens
        );

        Ok(output.answer)
    }

    /// Access the thread store (e.g. for inspection in the CLI)
    pub fn threads(&self) -> &ThreadStore {
        &self.threads
    }
}
