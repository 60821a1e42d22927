//! HTTP client for the assistant backend.
//!
//! This module provides a typed client for the agent chat API, including the
//! streaming answer endpoint.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use typhoon_assistant_core::{Message, SessionId};

use crate::backend::{ChatBackend, FrameStreamBox};
use crate::config::ClientConfig;
use crate::credentials::{CredentialState, Credentials};
use crate::error::ClientError;
use crate::sse::FrameStream;
use crate::types::{
    ApiErrorResponse, ChatRequest, CreateSessionResponse, HistoryMessage, ListSessionsResponse,
    PopularQuestionsResponse, SessionHistoryResponse, SessionSummary,
};

/// Client for the assistant REST API.
#[derive(Debug, Clone)]
pub struct AssistantClient {
    client: Client,
    base_url: String,
    credentials: Credentials,
    request_timeout: Duration,
}

impl AssistantClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, credentials: Credentials) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            credentials,
            request_timeout: config.request_timeout(),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The credentials attached to requests.
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Build headers for authenticated requests.
    fn auth_headers(&self) -> Result<HeaderMap, ClientError> {
        if self.credentials.state(Utc::now()) != CredentialState::Valid {
            return Err(ClientError::Unauthenticated);
        }
        let token = self.credentials.token().ok_or(ClientError::Unauthenticated)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ClientError::Config(format!("invalid token header value: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn transport_error(&self, error: reqwest::Error) -> ClientError {
        ClientError::from_transport(error, self.request_timeout)
    }

    /// Handle API error responses.
    async fn handle_error(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let message = match response.json::<ApiErrorResponse>().await {
            Ok(err) => err.message(),
            Err(_) => "unknown error".to_string(),
        };
        ClientError::Api { status, message }
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    // =========================================================================
    // Session Operations
    // =========================================================================

    /// Create a new chat session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is malformed.
    pub async fn create_session(&self) -> Result<CreateSessionResponse, ClientError> {
        let url = format!("{}/agent/sessions", self.base_url);

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let created: CreateSessionResponse = Self::read_json(response).await?;
        tracing::debug!(session_id = %created.session_id, "created chat session");
        Ok(created)
    }

    /// List the user's sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ClientError> {
        let url = format!("{}/agent/sessions", self.base_url);

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let body: ListSessionsResponse = Self::read_json(response).await?;
        Ok(body.sessions)
    }

    /// Fetch a session's stored messages, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session is unknown.
    pub async fn session_history(&self, session_id: &SessionId) -> Result<Vec<Message>, ClientError> {
        let url = format!("{}/agent/sessions/{}/history", self.base_url, session_id);

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let body: SessionHistoryResponse = Self::read_json(response).await?;
        if body.session_id != *session_id {
            tracing::warn!(
                requested = %session_id,
                returned = %body.session_id,
                "history response names a different session"
            );
        }
        Ok(body
            .messages
            .into_iter()
            .map(HistoryMessage::into_message)
            .collect())
    }

    /// Fetch suggested questions.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn popular_questions(&self) -> Result<Vec<String>, ClientError> {
        let url = format!("{}/agent/popular-questions", self.base_url);

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let body: PopularQuestionsResponse = Self::read_json(response).await?;
        Ok(body.questions)
    }

    // =========================================================================
    // Streaming
    // =========================================================================

    /// Send a question and return the stream of answer frames.
    ///
    /// # Errors
    ///
    /// Returns an error for missing credentials, transport failures and
    /// non-success statuses. Failures after the headers arrive are yielded
    /// by the stream instead.
    pub async fn stream_chat(&self, request: &ChatRequest) -> Result<FrameStreamBox, ClientError> {
        let url = format!("{}/agent/chat/stream", self.base_url);

        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .header(ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        tracing::debug!(status = %status, session_id = %request.session_id, "stream response received");
        if !status.is_success() {
            return Err(Self::handle_error(response).await);
        }

        let timeout = self.request_timeout;
        let bytes = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|e| match ClientError::from_transport(e, timeout) {
                ClientError::Http(e) => ClientError::Stream(e.to_string()),
                other => other,
            })
        });
        Ok(Box::pin(FrameStream::new(bytes)))
    }
}

#[async_trait]
impl ChatBackend for AssistantClient {
    fn credential_state(&self) -> CredentialState {
        self.credentials.state(Utc::now())
    }

    async fn create_session(&self) -> Result<SessionId, ClientError> {
        Ok(AssistantClient::create_session(self).await?.session_id)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ClientError> {
        AssistantClient::list_sessions(self).await
    }

    async fn session_history(&self, session_id: &SessionId) -> Result<Vec<Message>, ClientError> {
        AssistantClient::session_history(self, session_id).await
    }

    async fn popular_questions(&self) -> Result<Vec<String>, ClientError> {
        AssistantClient::popular_questions(self).await
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<FrameStreamBox, ClientError> {
        self.stream_chat(request).await
    }
}
