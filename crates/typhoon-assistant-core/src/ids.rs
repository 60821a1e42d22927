//! Identifier types for chat sessions and transcript messages.
//!
//! Session IDs are issued by the backend and treated as opaque strings.
//! Message IDs are generated locally and only need to be unique within
//! one running client.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A server-issued chat session identifier.
///
/// The backend decides the format; the client only guarantees the value
/// is non-empty and free of surrounding whitespace.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Create a `SessionId` from a server-provided string.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::Empty`] if the value is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(IdError::Empty);
        }
        if trimmed.len() == value.len() {
            Ok(Self(value))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    /// Return the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SessionId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A locally generated message key (UUID v4).
///
/// Stable for the lifetime of one exchange; the assistant message's ID also
/// identifies the exchange that streams into it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageId(uuid::Uuid);

impl MessageId {
    /// Create a new `MessageId` from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a new random `MessageId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Return the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl FromStr for MessageId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = uuid::Uuid::parse_str(s).map_err(|_| IdError::InvalidUuid)?;
        Ok(Self(uuid))
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for MessageId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MessageId> for String {
    fn from(id: MessageId) -> Self {
        id.0.to_string()
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The identifier is empty or whitespace only.
    #[error("identifier is empty")]
    Empty,

    /// The input string is not a valid UUID.
    #[error("invalid UUID format")]
    InvalidUuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_keeps_server_value() {
        let id = SessionId::new("sess_20240915_abc").unwrap();
        assert_eq!(id.as_str(), "sess_20240915_abc");
        assert_eq!(id.to_string(), "sess_20240915_abc");
    }

    #[test]
    fn session_id_trims_whitespace() {
        let id = SessionId::new("  abc-123\n").unwrap();
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn session_id_rejects_empty() {
        assert_eq!(SessionId::new(""), Err(IdError::Empty));
        assert_eq!(SessionId::new("   "), Err(IdError::Empty));
    }

    #[test]
    fn session_id_serde_rejects_empty() {
        let result: Result<SessionId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());

        let parsed: SessionId = serde_json::from_str("\"s-1\"").unwrap();
        assert_eq!(parsed.as_str(), "s-1");
    }

    #[test]
    fn message_id_unique() {
        let id1 = MessageId::generate();
        let id2 = MessageId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn message_id_parse() {
        let id = MessageId::generate();
        let parsed = MessageId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn message_id_invalid() {
        let result = MessageId::from_str("not-a-uuid");
        assert!(matches!(result, Err(IdError::InvalidUuid)));
    }
}
