//! Conversation transcript types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author of a chat message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One transcript entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// Append-only transcript, cleared only by explicit user action
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationState {
    messages: Vec<ChatMessage>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user/assistant exchange
    pub fn push_exchange(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.messages.push(ChatMessage::user(question));
        self.messages.push(ChatMessage::assistant(answer));
    }

    /// All messages, oldest first
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The last `n` messages, oldest first
    pub fn recent(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_window() {
        let mut state = ConversationState::new();
        state.push_exchange("q1", "a1");
        state.push_exchange("q2", "a2");

        assert_eq!(state.len(), 4);
        let recent = state.recent(3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "a1");
        assert_eq!(recent[2].role, Role::Assistant);
        assert_eq!(state.recent(10).len(), 4);
        assert!(state.recent(0).is_empty());
    }
}
