//! Conversation threads
//!
//! A thread is the append-only transcript of one conversation, keyed by a
//! caller-chosen thread id. Threads live for the process lifetime; there is
//! no eviction and no API for removing or rewriting messages.

use crate::agent::types::{Message, Role};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// An append-only conversation transcript
#[derive(Debug)]
pub struct Thread {
    /// Thread id, as chosen by the caller
    pub id: String,
    /// Messages in the conversation
    messages: Vec<Message>,
    /// When the thread was created
    pub created_at: DateTime<Utc>,
    /// When the thread was last appended to
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// Create a new empty thread
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Thread {
            id: id.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// Append a batch of messages
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
        self.updated_at = Utc::now();
    }

    /// The full transcript in order
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if the thread is empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Get the last assistant message, if any
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }
}

/// Store of conversation threads.
///
/// Each thread sits behind its own mutex; callers hold the lock for a full
/// answering turn, so writers to the same thread are serialized while
/// different threads proceed in parallel.
pub struct ThreadStore {
    threads: RwLock<HashMap<String, Arc<Mutex<Thread>>>>,
}

impl Default for ThreadStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadStore {
    /// Create an empty store
    pub fn new() -> Self {
        ThreadStore {
            threads: RwLock::new(HashMap::new()),
        }
    }

    /// Get the handle for a thread, creating it on first use
    pub async fn handle(&self, thread_id: &str) -> Arc<Mutex<Thread>> {
        {
            let threads = self.threads.read().await;
            if let Some(handle) = threads.get(thread_id) {
                return handle.clone();
            }
        }

        let mut threads = self.threads.write().await;
        threads
            .entry(thread_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Thread::new(thread_id))))
            .clone()
    }

    /// Get an existing thread handle without creating one
    pub async fn get(&self, thread_id: &str) -> Option<Arc<Mutex<Thread>>> {
        self.threads.read().await.get(thread_id).cloned()
    }

    /// Count active threads
    pub async fn count(&self) -> usize {
        self.threads.read().await.len()
    }

    /// List active thread ids
    pub async fn thread_ids(&self) -> Vec<String> {
        self.threads.read().await.keys().cloned().collect()
    }
}
