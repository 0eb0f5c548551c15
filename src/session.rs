use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// One entry of the conversation log. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Read-only copy of a session for export.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub history: Vec<Message>,
    pub first_message_sent: bool,
}

/// Append-only, chronologically ordered message log.
#[derive(Debug, Clone, Default)]
pub struct ConversationSession {
    history: Vec<Message>,
    first_message_sent: bool,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp the current time, push, and return the created record.
    pub fn append(&mut self, sender: Sender, content: impl Into<String>) -> &Message {
        self.history.push(Message {
            sender,
            content: content.into(),
            timestamp: Utc::now(),
        });
        &self.history[self.history.len() - 1]
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// `true` until [`mark_first_message_sent`](Self::mark_first_message_sent) is called.
    pub fn is_first_message(&self) -> bool {
        !self.first_message_sent
    }

    /// Flip the first-message flag. Returns `true` only on the call that flipped it.
    pub fn mark_first_message_sent(&mut self) -> bool {
        let flipped = !self.first_message_sent;
        self.first_message_sent = true;
        flipped
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            history: self.history.clone(),
            first_message_sent: self.first_message_sent,
        }
    }
}
