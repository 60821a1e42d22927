//! Common error types for the assistant chat.

use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the core chat types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] crate::ids::IdError),

    /// The question is empty after trimming.
    #[error("question is empty")]
    EmptyQuestion,
}
