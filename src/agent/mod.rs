//! Agent module - the retrieval-augmented answering loop
//!
//! This module contains everything between a user question and a validated
//! structured answer:
//! - Chat-completions client and wire types
//! - Conversation threads (append-only, keyed by thread id)
//! - The bounded tool-calling loop
//! - The structured answer contract
//! - Prompt templates and user-profile loading

mod answer;
mod client;
pub mod prompts;
mod qa_loop;
mod service;
mod threads;
pub mod types;

pub use answer::HistoryAnswer;
pub use client::{ModelInfo, OpenAiClient};
pub use qa_loop::{
    run_qa_loop, LoopCallback, LoopConfig, LoopOutcome, LoopStep, LoopTrace, NoOpCallback,
    QaLoopInput, QaLoopOutput, ToolAction, ToolObservation,
};
pub use service::HistoryAgent;
pub use threads::{Thread, ThreadStore};
pub use types::*;
