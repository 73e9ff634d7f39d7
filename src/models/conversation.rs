// Conversation models
// Bounded message logs. Timestamps are stored timezone-naive: anything
// timezone-aware is normalized to UTC and stripped before storage so
// chronological ordering stays comparable regardless of source timezone.

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_CONVERSATION_TITLE: &str = "New Conversation";

/// Message cap for a stored conversation.
const CONVERSATION_MAX_MESSAGES: usize = 100;
/// Message cap for the legacy single-conversation history.
const HISTORY_MAX_MESSAGES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: NaiveDateTime,
}

impl ConversationMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now().naive_utc(),
        }
    }
}

/// A stored conversation with its own id and title.
///
/// Appends beyond `max_messages` evict the oldest messages; this is the
/// retention policy, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ConversationMessage>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(default = "default_conversation_cap")]
    pub max_messages: usize,
}

fn default_conversation_cap() -> usize {
    CONVERSATION_MAX_MESSAGES
}

impl Conversation {
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title)
    }

    pub fn with_id(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now().naive_utc();
        Self {
            id: id.into(),
            title: title.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            max_messages: CONVERSATION_MAX_MESSAGES,
        }
    }

    /// Append a message, refresh `updated_at` and trim from the front if the
    /// cap is exceeded.
    pub fn add_message(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(ConversationMessage::new(role, content));
        trim_to_cap(&mut self.messages, self.max_messages);
        self.updated_at = Utc::now().naive_utc();
    }

    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_CONVERSATION_TITLE
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(DEFAULT_CONVERSATION_TITLE)
    }
}

/// Legacy single-conversation history kept for file compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationHistory {
    pub messages: Vec<ConversationMessage>,
    pub max_messages: usize,
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            max_messages: HISTORY_MAX_MESSAGES,
        }
    }
}

impl ConversationHistory {
    pub fn add_message(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(ConversationMessage::new(role, content));
        trim_to_cap(&mut self.messages, self.max_messages);
    }
}

/// Keep only the most recent `cap` entries, preserving order.
fn trim_to_cap(messages: &mut Vec<ConversationMessage>, cap: usize) {
    if messages.len() > cap {
        let excess = messages.len() - cap;
        messages.drain(..excess);
    }
}

/// Lightweight listing entry for a stored conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMetadata {
    pub id: String,
    pub title: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub message_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_trims_to_most_recent() {
        let mut history = ConversationHistory {
            messages: Vec::new(),
            max_messages: 3,
        };
        for i in 0..5 {
            history.add_message(Role::User, format!("message {i}"));
        }
        assert_eq!(history.messages.len(), 3);
        let contents: Vec<_> = history.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["message 2", "message 3", "message 4"]);
    }

    #[test]
    fn test_history_below_cap_is_untouched() {
        let mut history = ConversationHistory::default();
        history.add_message(Role::User, "hello");
        history.add_message(Role::Assistant, "hi");
        assert_eq!(history.messages.len(), 2);
    }

    #[test]
    fn test_conversation_trims_and_updates_timestamp() {
        let mut conversation = Conversation::new("test");
        conversation.max_messages = 2;
        let created = conversation.updated_at;

        conversation.add_message(Role::User, "one");
        conversation.add_message(Role::Assistant, "two");
        conversation.add_message(Role::User, "three");

        assert_eq!(conversation.messages.len(), 2);
        assert_eq!(conversation.messages[0].content, "two");
        assert_eq!(conversation.messages[1].content, "three");
        assert!(conversation.updated_at >= created);
    }

    #[test]
    fn test_new_conversations_get_unique_ids() {
        let a = Conversation::default();
        let b = Conversation::default();
        assert_ne!(a.id, b.id);
        assert!(a.has_default_title());
    }
}
