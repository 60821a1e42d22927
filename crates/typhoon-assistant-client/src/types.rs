//! Wire types for the assistant backend.
//!
//! These mirror the JSON bodies of the agent API and the payloads carried in
//! `data:` lines of the chat stream.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use typhoon_assistant_core::{Message, Role, SessionId};

// =============================================================================
// Chat Stream
// =============================================================================

/// Body of a streaming chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    /// Session the question belongs to.
    pub session_id: SessionId,
    /// Trimmed question text.
    pub question: String,
    /// Model selector.
    pub model: String,
    /// Whether the model should emit reasoning text.
    pub deep_thinking: bool,
}

/// JSON payload of one `data:` line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FramePayload {
    /// Reasoning text fragment.
    ReasoningContent {
        /// Text to append.
        #[serde(alias = "text", alias = "message")]
        content: String,
    },
    /// Answer text fragment.
    Content {
        /// Text to append.
        #[serde(alias = "text", alias = "message")]
        content: String,
    },
    /// Error reported by the model service; the stream may continue.
    Error {
        /// Error description.
        #[serde(alias = "content", alias = "detail")]
        message: String,
    },
}

// =============================================================================
// Session Types
// =============================================================================

/// Response from creating a session.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSessionResponse {
    /// The new session ID.
    pub session_id: SessionId,
    /// Creation time, when the server reports one.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Session entry in the session list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionSummary {
    /// Session ID.
    pub session_id: SessionId,
    /// Title (usually the first question).
    #[serde(default)]
    pub title: Option<String>,
    /// Creation time as sent by the server.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Last activity time as sent by the server.
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Number of messages in the session.
    #[serde(default)]
    pub message_count: Option<u32>,
}

impl SessionSummary {
    /// Label for list display.
    #[must_use]
    pub fn label(&self) -> &str {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("New conversation")
    }
}

/// Response from listing sessions.
#[derive(Debug, Clone, Deserialize)]
pub struct ListSessionsResponse {
    /// Sessions, most recent first.
    #[serde(default)]
    pub sessions: Vec<SessionSummary>,
}

/// One message of a stored session.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryMessage {
    /// Author.
    pub role: Role,
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// Reasoning text, if the answer had any.
    #[serde(default, alias = "reasoning")]
    pub reasoning_content: Option<String>,
    /// Timestamp as sent by the server.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HistoryMessage {
    /// Convert to a transcript message with a fresh local ID.
    #[must_use]
    pub fn into_message(self) -> Message {
        let message = match self.role {
            Role::User => Message::user(self.content),
            Role::Assistant => Message::assistant(self.content),
        };
        let message = match self.reasoning_content {
            Some(reasoning) if !reasoning.is_empty() => message.with_reasoning(reasoning),
            _ => message,
        };
        match self.timestamp.as_deref().and_then(parse_timestamp) {
            Some(at) => message.with_created_at(at),
            None => message,
        }
    }
}

/// Response from fetching a session's history.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionHistoryResponse {
    /// Session ID.
    pub session_id: SessionId,
    /// Messages in chronological order.
    #[serde(default)]
    pub messages: Vec<HistoryMessage>,
}

/// Response listing suggested questions.
#[derive(Debug, Clone, Deserialize)]
pub struct PopularQuestionsResponse {
    /// Suggested questions.
    #[serde(default)]
    pub questions: Vec<String>,
}

// =============================================================================
// Errors
// =============================================================================

/// API error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error description; a string or a structured validation report.
    #[serde(alias = "error", alias = "message")]
    pub detail: serde_json::Value,
}

impl ApiErrorResponse {
    /// Render the detail as a single line.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Parse server timestamps, accepting RFC 3339 and naive ISO 8601 (read as UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_serialization() {
        let request = ChatRequest {
            session_id: SessionId::new("sess-42").unwrap(),
            question: "What is typhoon X?".into(),
            model: "deepseek-chat".into(),
            deep_thinking: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["session_id"], "sess-42");
        assert_eq!(value["question"], "What is typhoon X?");
        assert_eq!(value["model"], "deepseek-chat");
        assert_eq!(value["deep_thinking"], true);
    }

    #[test]
    fn frame_payload_variants() {
        let reasoning: FramePayload =
            serde_json::from_str(r#"{"type":"reasoning_content","content":"Track points west."}"#)
                .unwrap();
        assert_eq!(
            reasoning,
            FramePayload::ReasoningContent {
                content: "Track points west.".into()
            }
        );

        let content: FramePayload =
            serde_json::from_str(r#"{"type":"content","content":"It is..."}"#).unwrap();
        assert_eq!(
            content,
            FramePayload::Content {
                content: "It is...".into()
            }
        );

        let error: FramePayload =
            serde_json::from_str(r#"{"type":"error","message":"rate limited"}"#).unwrap();
        assert_eq!(
            error,
            FramePayload::Error {
                message: "rate limited".into()
            }
        );
    }

    #[test]
    fn frame_payload_aliases() {
        let content: FramePayload =
            serde_json::from_str(r#"{"type":"content","text":"Hi"}"#).unwrap();
        assert_eq!(content, FramePayload::Content { content: "Hi".into() });
    }

    #[test]
    fn unknown_frame_type_fails() {
        assert!(serde_json::from_str::<FramePayload>(r#"{"type":"heartbeat"}"#).is_err());
        assert!(serde_json::from_str::<FramePayload>(r#"{"content":"no type"}"#).is_err());
    }

    #[test]
    fn history_message_conversion() {
        let json = r#"{
            "session_id": "sess-1",
            "messages": [
                {"role": "user", "content": "Where is it heading?", "timestamp": "2024-09-15T10:00:00"},
                {"role": "assistant", "content": "North-west.", "reasoning_content": "Steering ridge.", "timestamp": "2024-09-15T10:00:05Z"}
            ]
        }"#;
        let history: SessionHistoryResponse = serde_json::from_str(json).unwrap();
        let messages: Vec<Message> = history.messages.into_iter().map(HistoryMessage::into_message).collect();

        assert_eq!(messages.len(), 2);
        assert!(messages[0].is_user());
        assert_eq!(messages[1].content, "North-west.");
        assert_eq!(messages[1].reasoning, "Steering ridge.");
        assert_eq!(
            messages[0].created_at,
            parse_timestamp("2024-09-15T10:00:00Z").unwrap()
        );
    }

    #[test]
    fn session_list_deserialization() {
        let json = r#"{"sessions":[{"session_id":"a","title":"Typhoon Haikui"},{"session_id":"b","title":"  "}]}"#;
        let list: ListSessionsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(list.sessions.len(), 2);
        assert_eq!(list.sessions[0].label(), "Typhoon Haikui");
        assert_eq!(list.sessions[1].label(), "New conversation");
    }

    #[test]
    fn error_envelope_variants() {
        let detail: ApiErrorResponse = serde_json::from_str(r#"{"detail":"Session not found"}"#).unwrap();
        assert_eq!(detail.message(), "Session not found");

        let error: ApiErrorResponse = serde_json::from_str(r#"{"error":"bad token"}"#).unwrap();
        assert_eq!(error.message(), "bad token");

        let structured: ApiErrorResponse =
            serde_json::from_str(r#"{"detail":[{"loc":["body","question"]}]}"#).unwrap();
        assert!(structured.message().contains("question"));
    }

    #[test]
    fn timestamp_parsing() {
        assert!(parse_timestamp("2024-09-15T10:00:00+08:00").is_some());
        assert!(parse_timestamp("2024-09-15T10:00:00.123456").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
