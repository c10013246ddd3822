//! Append-only chat log for the current session.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A chat message as received from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender: String,
    pub body: String,
    /// Arrival time.
    pub sent_at: DateTime<Utc>,
}

/// Chat messages in arrival order.
#[derive(Debug, Default)]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a received message and return a copy of it.
    pub fn append(&mut self, sender: impl Into<String>, body: impl Into<String>) -> ChatMessage {
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            sender: sender.into(),
            body: body.into(),
            sent_at: Utc::now(),
        };
        self.messages.push(message.clone());
        message
    }

    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
