//! Backend abstraction used by the chat controller.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use typhoon_assistant_core::{Message, SessionId};

use crate::credentials::CredentialState;
use crate::error::ClientError;
use crate::sse::StreamFrame;
use crate::types::{ChatRequest, SessionSummary};

/// Boxed stream of decoded frames for one exchange.
pub type FrameStreamBox = Pin<Box<dyn Stream<Item = Result<StreamFrame, ClientError>> + Send>>;

/// Trait for the assistant backend.
///
/// This trait abstracts the HTTP client, allowing for scripted
/// implementations in tests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Current state of the held credentials.
    fn credential_state(&self) -> CredentialState;

    /// Create a new chat session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    async fn create_session(&self) -> Result<SessionId, ClientError>;

    /// List the user's sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ClientError>;

    /// Fetch the stored messages of a session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session is unknown.
    async fn session_history(&self, session_id: &SessionId) -> Result<Vec<Message>, ClientError>;

    /// Fetch suggested questions.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn popular_questions(&self) -> Result<Vec<String>, ClientError>;

    /// Open the answer stream for one question.
    ///
    /// Resolves once response headers arrive with a success status.
    ///
    /// # Errors
    ///
    /// Returns an error for missing credentials, transport failures and
    /// non-success statuses.
    async fn open_stream(&self, request: &ChatRequest) -> Result<FrameStreamBox, ClientError>;
}
