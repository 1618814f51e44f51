//! Chat history storage
//!
//! The pipeline only needs two things from a store: the most recent messages
//! in order, and a way to append. Durable stores live outside this crate.

use async_trait::async_trait;
use mission_ai::Message;
use parking_lot::Mutex;

use crate::error::Result;

/// Ordered, append-only message log
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// The last `limit` messages, oldest first
    async fn recent(&self, limit: usize) -> Result<Vec<Message>>;

    /// Append a message to the end of the log
    async fn append(&self, message: Message) -> Result<()>;
}

/// History kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    messages: Mutex<Vec<Message>>,
}

impl InMemoryHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history seeded with messages
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages: Mutex::new(messages),
        }
    }

    /// Copy of every stored message
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    /// Number of stored messages
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Whether nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Drop every stored message
    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistory {
    async fn recent(&self, limit: usize) -> Result<Vec<Message>> {
        let messages = self.messages.lock();
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }

    async fn append(&self, message: Message) -> Result<()> {
        self.messages.lock().push(message);
        Ok(())
    }
}
