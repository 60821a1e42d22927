//! User-visible notifications raised by the chat controller.

use crate::error::{ClientError, FailureKind};

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Something degraded but the chat is usable.
    Warning,
    /// An exchange or request failed.
    Error,
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Severity.
    pub level: NoticeLevel,
    /// Display text.
    pub text: String,
}

impl Notice {
    /// Informational notice.
    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    /// Warning notice.
    #[must_use]
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    /// Error notice.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }

    /// Notice for a failure of the given kind.
    #[must_use]
    pub fn for_failure(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Unauthenticated => {
                Self::error("Your sign-in has expired. Please sign in again.")
            }
            FailureKind::Timeout => Self::error(
                "The AI service is responding slowly. Please try again in a moment.",
            ),
            FailureKind::Transport => Self::error(
                "Could not reach the AI service. Please check your connection and try again.",
            ),
        }
    }

    /// Notice for a failed backend call.
    #[must_use]
    pub fn for_error(error: &ClientError) -> Self {
        Self::for_failure(error.failure_kind())
    }

    /// Notice for an error frame reported by the model service.
    #[must_use]
    pub fn upstream(message: &str) -> Self {
        Self::error(format!("AI service error: {message}"))
    }
}
