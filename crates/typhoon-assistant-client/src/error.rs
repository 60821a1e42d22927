//! Error types for the assistant client.

use std::time::Duration;

use reqwest::StatusCode;
use typhoon_assistant_core::CoreError;

/// Error type for backend operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No usable credentials (missing or expired token).
    #[error("not authenticated")]
    Unauthenticated,

    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// The request or the streamed body exceeded the configured timeout.
    #[error("request timed out after {duration:?}")]
    Timeout {
        /// The timeout that was exceeded.
        duration: Duration,
    },

    /// API returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message from the error envelope.
        message: String,
    },

    /// Failed to parse response.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// The client could not be configured (bad base URL or header value).
    #[error("configuration error: {0}")]
    Config(String),

    /// The response body stream broke mid-answer.
    #[error("stream interrupted: {0}")]
    Stream(String),
}

/// Coarse classification of a failed exchange, used to pick the user notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Credentials were missing, expired or rejected.
    Unauthenticated,
    /// The service did not answer in time.
    Timeout,
    /// Anything else: connection refused, reset, bad status.
    Transport,
}

impl ClientError {
    /// Map a reqwest error, separating timeouts from other transport failures.
    #[must_use]
    pub fn from_transport(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout { duration: timeout }
        } else {
            Self::Http(error)
        }
    }

    /// Classify this error for user-facing reporting.
    #[must_use]
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Unauthenticated => FailureKind::Unauthenticated,
            Self::Api { status, .. } if *status == StatusCode::UNAUTHORIZED.as_u16() => {
                FailureKind::Unauthenticated
            }
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Api { status, .. } if *status == StatusCode::GATEWAY_TIMEOUT.as_u16() => {
                FailureKind::Timeout
            }
            _ => FailureKind::Transport,
        }
    }
}

/// Error type for chat controller operations.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The question was empty after trimming.
    #[error("question is empty")]
    EmptyQuestion,

    /// No session is selected.
    #[error("no chat session is active")]
    NoSession,

    /// An answer is still streaming.
    #[error("an answer is still streaming")]
    ExchangeInProgress,

    /// Credentials are missing or expired; the user has to sign in again.
    #[error("not signed in")]
    Unauthenticated,

    /// Backend call failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl From<CoreError> for ChatError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EmptyQuestion => Self::EmptyQuestion,
            CoreError::InvalidId(_) => Self::NoSession,
        }
    }
}

/// Result type alias for controller operations.
pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_status_is_unauthenticated() {
        let err = ClientError::Api {
            status: 401,
            message: "token expired".into(),
        };
        assert_eq!(err.failure_kind(), FailureKind::Unauthenticated);
        assert_eq!(ClientError::Unauthenticated.failure_kind(), FailureKind::Unauthenticated);
    }

    #[test]
    fn timeout_classification() {
        let err = ClientError::Timeout {
            duration: Duration::from_secs(120),
        };
        assert_eq!(err.failure_kind(), FailureKind::Timeout);
        let gateway = ClientError::Api {
            status: 504,
            message: "upstream timeout".into(),
        };
        assert_eq!(gateway.failure_kind(), FailureKind::Timeout);
    }

    #[test]
    fn other_errors_are_transport() {
        assert_eq!(
            ClientError::Stream("connection reset".into()).failure_kind(),
            FailureKind::Transport
        );
        let server = ClientError::Api {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(server.failure_kind(), FailureKind::Transport);
    }

    #[test]
    fn core_errors_convert() {
        assert!(matches!(ChatError::from(CoreError::EmptyQuestion), ChatError::EmptyQuestion));
    }

    #[test]
    fn error_display() {
        let err = ClientError::Api {
            status: 500,
            message: "internal".into(),
        };
        assert_eq!(err.to_string(), "API error (500): internal");
    }
}
