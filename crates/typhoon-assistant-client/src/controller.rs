//! Streaming session controller.
//!
//! Owns the transcript, the scroll controller and the current session, and
//! turns one question into one streamed answer. Each exchange is identified
//! by the ID of its assistant message; the transcript's open-message pointer
//! is the only record of which exchange is live.
//!
//! There are two ways to drive an exchange:
//!
//! - [`ChatController::submit_question`] awaits the whole exchange inline.
//!   Dropping that future mid-stream closes the open message.
//! - [`ChatController::begin_exchange`] + [`spawn_exchange`] run the
//!   transport in a task and deliver [`ExchangeEvent`]s over a channel. The
//!   event loop feeds them to [`ChatController::handle_event`].

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use typhoon_assistant_core::{
    validate_question, Message, MessageId, ScrollAction, ScrollController, ScrollEvent,
    ScrollState, SessionId, TextField, Transcript,
};

use crate::backend::ChatBackend;
use crate::config::ClientConfig;
use crate::credentials::CredentialState;
use crate::error::{ChatError, ClientError, FailureKind, Result};
use crate::notice::Notice;
use crate::sse::StreamFrame;
use crate::types::{ChatRequest, SessionSummary};

/// A started exchange, ready to be driven by [`spawn_exchange`].
#[derive(Debug, Clone)]
pub struct Exchange {
    id: MessageId,
    request: ChatRequest,
}

impl Exchange {
    /// ID of the assistant message this exchange streams into.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    /// The request sent to the backend.
    #[must_use]
    pub const fn request(&self) -> &ChatRequest {
        &self.request
    }
}

/// Progress of an exchange.
#[derive(Debug)]
pub enum ExchangeUpdate {
    /// A decoded frame.
    Frame(StreamFrame),
    /// The transport failed.
    Failed(ClientError),
    /// The transport ended without the completion sentinel.
    Ended,
}

/// An update tagged with the exchange it belongs to.
#[derive(Debug)]
pub struct ExchangeEvent {
    /// Assistant message ID of the exchange.
    pub id: MessageId,
    /// What happened.
    pub update: ExchangeUpdate,
}

impl ExchangeEvent {
    fn new(id: MessageId, update: ExchangeUpdate) -> Self {
        Self { id, update }
    }
}

/// How an inline exchange ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// The answer completed and is in the transcript.
    Completed,
    /// The exchange failed; the answer was removed and a notice raised.
    Failed,
}

/// Chat state and exchange driver for one user.
#[derive(Debug)]
pub struct ChatController<B: ?Sized> {
    backend: Arc<B>,
    session_id: Option<SessionId>,
    model: String,
    deep_thinking: bool,
    transcript: Transcript,
    scroll: ScrollController,
    notices: Vec<Notice>,
}

impl<B: ChatBackend + ?Sized> ChatController<B> {
    /// Create a controller with no session selected.
    pub fn new(backend: Arc<B>, config: &ClientConfig) -> Self {
        Self {
            backend,
            session_id: None,
            model: config.default_model.clone(),
            deep_thinking: config.deep_thinking,
            transcript: Transcript::new(),
            scroll: ScrollController::new(config.follow_threshold_rows),
            notices: Vec::new(),
        }
    }

    /// The backend this controller talks to.
    #[must_use]
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// The current session, if one is selected.
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Messages of the current session.
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Current scroll state.
    #[must_use]
    pub fn scroll_state(&self) -> ScrollState {
        self.scroll.state()
    }

    /// Whether an answer is streaming.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.transcript.open_id().is_some()
    }

    /// Selected model.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Change the model used for later questions.
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    /// Whether deep-thinking mode is on.
    #[must_use]
    pub const fn deep_thinking(&self) -> bool {
        self.deep_thinking
    }

    /// Turn deep-thinking mode on or off for later questions.
    pub fn set_deep_thinking(&mut self, enabled: bool) {
        self.deep_thinking = enabled;
    }

    /// Drain queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Report a scroll gesture from the view.
    pub fn user_scrolled(&mut self, distance_from_bottom: usize) -> ScrollAction {
        self.scroll.handle(ScrollEvent::UserScrolled {
            distance_from_bottom,
        })
    }

    // =========================================================================
    // Sessions
    // =========================================================================

    /// Return the current session, creating one if none is selected.
    ///
    /// # Errors
    ///
    /// Returns an error if a session has to be created and that fails.
    pub async fn ensure_session(&mut self) -> Result<SessionId> {
        if let Some(id) = &self.session_id {
            return Ok(id.clone());
        }
        self.new_session().await
    }

    /// Create a session, make it current and clear the transcript.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot create a session.
    pub async fn new_session(&mut self) -> Result<SessionId> {
        let id = self.backend.create_session().await.map_err(chat_error)?;
        info!(session_id = %id, "started new chat session");
        self.session_id = Some(id.clone());
        self.transcript.replace_all(Vec::new());
        self.scroll.handle(ScrollEvent::Reset);
        Ok(id)
    }

    /// Load a stored session and make it current.
    ///
    /// An exchange still streaming into the old transcript is detached: its
    /// remaining events are ignored. On failure the current session stays.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be fetched.
    pub async fn switch_session(&mut self, session_id: SessionId) -> Result<()> {
        let history = self
            .backend
            .session_history(&session_id)
            .await
            .map_err(chat_error)?;

        if let Some(detached) = self.transcript.open_id() {
            info!(exchange = %detached, "detaching in-flight exchange on session switch");
        }
        info!(session_id = %session_id, messages = history.len(), "switched chat session");
        self.transcript.replace_all(history);
        self.session_id = Some(session_id);
        self.scroll.handle(ScrollEvent::Reset);
        Ok(())
    }

    /// List the user's sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        self.backend.list_sessions().await.map_err(chat_error)
    }

    /// Fetch suggested questions.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    pub async fn popular_questions(&self) -> Result<Vec<String>> {
        self.backend.popular_questions().await.map_err(chat_error)
    }

    // =========================================================================
    // Exchanges
    // =========================================================================

    /// Start an exchange: record the question and open an empty answer.
    ///
    /// Nothing is sent; drive the returned [`Exchange`] with
    /// [`spawn_exchange`] and feed its events to [`Self::handle_event`].
    ///
    /// # Errors
    ///
    /// - [`ChatError::EmptyQuestion`] if the question is blank
    /// - [`ChatError::ExchangeInProgress`] if an answer is still streaming
    /// - [`ChatError::Unauthenticated`] if credentials are missing or expired
    ///
    /// The transcript is untouched when an error is returned.
    pub fn begin_exchange(
        &mut self,
        session_id: &SessionId,
        question: &str,
        model: &str,
        deep_thinking: bool,
    ) -> Result<Exchange> {
        let question = validate_question(question)?;
        if self.is_streaming() {
            return Err(ChatError::ExchangeInProgress);
        }
        match self.backend.credential_state() {
            CredentialState::Valid => {}
            state => {
                warn!(?state, "refusing to send question without valid credentials");
                return Err(ChatError::Unauthenticated);
            }
        }

        self.transcript.append(Message::user(question));
        self.scroll.handle(ScrollEvent::TranscriptChanged);
        let id = self.transcript.append_open(Message::assistant_placeholder());
        self.scroll.handle(ScrollEvent::StreamStarted);

        debug!(exchange = %id, session_id = %session_id, model, deep_thinking, "exchange started");
        Ok(Exchange {
            id,
            request: ChatRequest {
                session_id: session_id.clone(),
                question: question.to_string(),
                model: model.to_string(),
                deep_thinking,
            },
        })
    }

    /// Start an exchange in the current session with the current settings.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::NoSession`] if no session is selected, otherwise
    /// the errors of [`Self::begin_exchange`].
    pub fn ask(&mut self, question: &str) -> Result<Exchange> {
        let session_id = self.session_id.clone().ok_or(ChatError::NoSession)?;
        let model = self.model.clone();
        self.begin_exchange(&session_id, question, &model, self.deep_thinking)
    }

    /// Apply one event from an exchange.
    ///
    /// Events from an exchange that is no longer open (finished, cancelled
    /// or detached by a session switch) are ignored.
    pub fn handle_event(&mut self, event: ExchangeEvent) -> ScrollAction {
        if !self.transcript.is_open(event.id) {
            debug!(exchange = %event.id, "ignoring event from closed exchange");
            return ScrollAction::Stay;
        }

        match event.update {
            ExchangeUpdate::Frame(StreamFrame::Reasoning(text)) => {
                self.append(TextField::Reasoning, &text)
            }
            ExchangeUpdate::Frame(StreamFrame::Content(text)) => {
                self.append(TextField::Content, &text)
            }
            ExchangeUpdate::Frame(StreamFrame::UpstreamError(message)) => {
                warn!(exchange = %event.id, %message, "model service reported an error");
                self.notices.push(Notice::upstream(&message));
                ScrollAction::Stay
            }
            ExchangeUpdate::Frame(StreamFrame::Done) => {
                self.transcript.finalize_open(Utc::now());
                info!(exchange = %event.id, "answer completed");
                self.finish_stream()
            }
            ExchangeUpdate::Failed(error) => {
                warn!(exchange = %event.id, error = %error, "exchange failed");
                self.fail(Notice::for_error(&error))
            }
            ExchangeUpdate::Ended => {
                warn!(exchange = %event.id, "answer stream ended before completion");
                self.fail(Notice::for_failure(FailureKind::Transport))
            }
        }
    }

    /// Stop the streaming answer, keeping the text received so far.
    ///
    /// An answer that received no text is removed. Returns `false` if
    /// nothing was streaming. The transport itself is not touched; abort the
    /// task from [`spawn_exchange`] separately.
    pub fn cancel(&mut self) -> bool {
        let Some(open) = self.transcript.open_message() else {
            return false;
        };
        let id = open.id;
        if open.content.is_empty() && !open.has_reasoning() {
            self.transcript.discard_open();
        } else {
            self.transcript.finalize_open(Utc::now());
        }
        info!(exchange = %id, "answer cancelled");
        self.notices.push(Notice::info("Answer stopped."));
        self.finish_stream();
        true
    }

    /// Ask a question and stream the answer to completion.
    ///
    /// Failures after the question is recorded are reported through notices
    /// and the returned outcome. If this future is dropped mid-stream the
    /// partial answer is kept and closed.
    ///
    /// # Errors
    ///
    /// Returns the precondition errors of [`Self::begin_exchange`].
    pub async fn submit_question(
        &mut self,
        session_id: &SessionId,
        question: &str,
        model: &str,
        deep_thinking: bool,
    ) -> Result<ExchangeOutcome> {
        let exchange = self.begin_exchange(session_id, question, model, deep_thinking)?;
        let backend = Arc::clone(&self.backend);
        let id = exchange.id;
        let mut guard = CloseOnDrop {
            controller: self,
            id,
        };

        let mut stream = match backend.open_stream(&exchange.request).await {
            Ok(stream) => stream,
            Err(error) => {
                guard
                    .controller
                    .handle_event(ExchangeEvent::new(id, ExchangeUpdate::Failed(error)));
                return Ok(ExchangeOutcome::Failed);
            }
        };

        while let Some(item) = stream.next().await {
            let (update, outcome) = match item {
                Ok(frame) => {
                    let outcome = frame.is_done().then_some(ExchangeOutcome::Completed);
                    (ExchangeUpdate::Frame(frame), outcome)
                }
                Err(error) => (ExchangeUpdate::Failed(error), Some(ExchangeOutcome::Failed)),
            };
            guard.controller.handle_event(ExchangeEvent::new(id, update));
            if let Some(outcome) = outcome {
                return Ok(outcome);
            }
        }

        guard
            .controller
            .handle_event(ExchangeEvent::new(id, ExchangeUpdate::Ended));
        Ok(ExchangeOutcome::Failed)
    }

    fn append(&mut self, field: TextField, text: &str) -> ScrollAction {
        if text.is_empty() || !self.transcript.append_to_open(field, text) {
            return ScrollAction::Stay;
        }
        self.scroll.handle(ScrollEvent::TranscriptChanged)
    }

    fn fail(&mut self, notice: Notice) -> ScrollAction {
        self.transcript.discard_open();
        self.notices.push(notice);
        self.finish_stream()
    }

    fn finish_stream(&mut self) -> ScrollAction {
        let changed = self.scroll.handle(ScrollEvent::TranscriptChanged);
        let finished = self.scroll.handle(ScrollEvent::StreamFinished);
        if changed == ScrollAction::FollowLatest || finished == ScrollAction::FollowLatest {
            ScrollAction::FollowLatest
        } else {
            ScrollAction::Stay
        }
    }
}

/// Closes the open answer if an inline exchange is dropped mid-stream.
struct CloseOnDrop<'a, B: ChatBackend + ?Sized> {
    controller: &'a mut ChatController<B>,
    id: MessageId,
}

impl<B: ChatBackend + ?Sized> Drop for CloseOnDrop<'_, B> {
    fn drop(&mut self) {
        if self.controller.transcript.is_open(self.id) {
            debug!(exchange = %self.id, "inline exchange dropped mid-stream");
            self.controller.cancel();
        }
    }
}

/// Run an exchange's transport in a task, forwarding events in arrival order.
///
/// The task ends after the completion sentinel, a transport failure, the end
/// of the body, or when the receiver is dropped. Abort the returned handle to
/// stop reading early.
pub fn spawn_exchange<B>(
    backend: Arc<B>,
    exchange: Exchange,
    events: mpsc::Sender<ExchangeEvent>,
) -> JoinHandle<()>
where
    B: ChatBackend + ?Sized + 'static,
{
    tokio::spawn(async move {
        let id = exchange.id;
        let mut stream = match backend.open_stream(&exchange.request).await {
            Ok(stream) => stream,
            Err(error) => {
                if events
                    .send(ExchangeEvent::new(id, ExchangeUpdate::Failed(error)))
                    .await
                    .is_err()
                {
                    debug!(exchange = %id, "exchange receiver dropped");
                }
                return;
            }
        };

        while let Some(item) = stream.next().await {
            let (update, terminal) = match item {
                Ok(frame) => {
                    let done = frame.is_done();
                    (ExchangeUpdate::Frame(frame), done)
                }
                Err(error) => (ExchangeUpdate::Failed(error), true),
            };
            if events.send(ExchangeEvent::new(id, update)).await.is_err() {
                debug!(exchange = %id, "exchange receiver dropped");
                return;
            }
            if terminal {
                return;
            }
        }

        if events
            .send(ExchangeEvent::new(id, ExchangeUpdate::Ended))
            .await
            .is_err()
        {
            debug!(exchange = %id, "exchange receiver dropped");
        }
    })
}

fn chat_error(error: ClientError) -> ChatError {
    match error {
        ClientError::Unauthenticated => ChatError::Unauthenticated,
        other => ChatError::Client(other),
    }
}
