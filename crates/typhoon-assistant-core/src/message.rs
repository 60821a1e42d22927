//! Transcript message model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::ids::MessageId;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A question typed by the user.
    User,
    /// An answer produced by the AI assistant.
    Assistant,
}

impl Role {
    /// Wire/display string for the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Text field of a message that streamed fragments are appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    /// The primary answer text.
    Content,
    /// Auxiliary reasoning text, shown separately from the answer.
    Reasoning,
}

/// One entry in a session transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Local key, stable for the lifetime of the exchange.
    pub id: MessageId,
    /// Message author.
    pub role: Role,
    /// Primary text content.
    pub content: String,
    /// Reasoning text (empty when the model produced none).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reasoning: String,
    /// Creation time; rewritten to the completion time when streaming finishes.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a user message stamped with the current time.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::User,
            content: content.into(),
            reasoning: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Create a finished assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::generate(),
            role: Role::Assistant,
            content: content.into(),
            reasoning: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Create the empty assistant message that a stream appends into.
    #[must_use]
    pub fn assistant_placeholder() -> Self {
        Self::assistant(String::new())
    }

    /// Attach reasoning text.
    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Override the timestamp (used for history loaded from the server).
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Check if this is a user message.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Check if the message carries reasoning text.
    #[must_use]
    pub fn has_reasoning(&self) -> bool {
        !self.reasoning.is_empty()
    }

    pub(crate) fn push_text(&mut self, field: TextField, text: &str) {
        match field {
            TextField::Content => self.content.push_str(text),
            TextField::Reasoning => self.reasoning.push_str(text),
        }
    }
}

/// Trim a question and reject it if nothing is left.
///
/// # Errors
///
/// Returns [`CoreError::EmptyQuestion`] for empty or whitespace-only input.
pub fn validate_question(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(CoreError::EmptyQuestion)
    } else {
        Ok(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_creation() {
        let msg = Message::user("Where will Typhoon Haikui make landfall?");
        assert_eq!(msg.role, Role::User);
        assert!(msg.is_user());
        assert!(!msg.has_reasoning());
    }

    #[test]
    fn placeholder_is_empty_assistant() {
        let msg = Message::assistant_placeholder();
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.content.is_empty());
        assert!(msg.reasoning.is_empty());
    }

    #[test]
    fn push_text_targets_field() {
        let mut msg = Message::assistant_placeholder();
        msg.push_text(TextField::Content, "Wind ");
        msg.push_text(TextField::Reasoning, "Check track. ");
        msg.push_text(TextField::Content, "speed 45 m/s");
        assert_eq!(msg.content, "Wind speed 45 m/s");
        assert_eq!(msg.reasoning, "Check track. ");
    }

    #[test]
    fn role_serialization() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        assert_eq!(Role::User.as_str(), "user");
    }

    #[test]
    fn empty_reasoning_is_not_serialized() {
        let msg = Message::assistant("ok");
        let value = serde_json::to_value(&msg).unwrap();
        assert!(value.get("reasoning").is_none());
    }

    #[test]
    fn validate_question_trims() {
        assert_eq!(validate_question("  What is typhoon X?  "), Ok("What is typhoon X?"));
        assert_eq!(validate_question(" \n\t "), Err(CoreError::EmptyQuestion));
    }
}
