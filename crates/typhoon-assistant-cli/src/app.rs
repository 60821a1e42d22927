//! Application state for the terminal chat.
//!
//! Wraps the [`ChatController`] with the view state the UI needs: input
//! buffer, focus, session list and the scroll offset of the chat panel.
//! Answers stream in through a spawned exchange task whose events arrive on
//! the channel passed to [`App::new`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use typhoon_assistant_client::{
    spawn_exchange, AssistantClient, ChatController, ChatError, ExchangeEvent, Notice,
    NoticeLevel, SessionSummary,
};
use typhoon_assistant_core::{ScrollAction, SessionId};

/// Controller type used by the terminal front end.
pub type Controller = ChatController<AssistantClient>;

/// How often the session list is reloaded while idle.
pub const SESSION_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Which UI column has focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    /// Left column: session list.
    Sessions,
    /// Right column: chat and input.
    #[default]
    Chat,
}

impl Focus {
    /// Toggle to the other column.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Sessions => Self::Chat,
            Self::Chat => Self::Sessions,
        }
    }
}

/// Application state.
pub struct App {
    chat: Controller,
    events_tx: mpsc::Sender<ExchangeEvent>,
    exchange_task: Option<JoinHandle<()>>,
    /// Sessions shown in the left column.
    pub sessions: Vec<SessionSummary>,
    /// Highlighted session index.
    pub selected_session: Option<usize>,
    /// Suggested questions.
    pub popular_questions: Vec<String>,
    next_popular: usize,
    /// Current input buffer.
    pub input: String,
    /// Cursor position in input, in characters.
    pub cursor_position: usize,
    /// Which column has focus.
    pub focus: Focus,
    /// Rows between the bottom of the chat view and the end of the content.
    pub chat_scroll: usize,
    max_chat_scroll: usize,
    /// Status message to display.
    pub status_message: Option<String>,
    /// Error message to display.
    pub error_message: Option<String>,
    /// Whether the app should quit.
    pub should_quit: bool,
    /// Animation frame counter for the spinner.
    pub animation_frame: usize,
    sessions_stale: bool,
}

impl App {
    /// Create the app around a controller.
    #[must_use]
    pub fn new(chat: Controller, events_tx: mpsc::Sender<ExchangeEvent>) -> Self {
        Self {
            chat,
            events_tx,
            exchange_task: None,
            sessions: Vec::new(),
            selected_session: None,
            popular_questions: Vec::new(),
            next_popular: 0,
            input: String::new(),
            cursor_position: 0,
            focus: Focus::Chat,
            chat_scroll: 0,
            max_chat_scroll: 0,
            status_message: None,
            error_message: None,
            should_quit: false,
            animation_frame: 0,
            sessions_stale: false,
        }
    }

    /// The chat controller.
    #[must_use]
    pub fn chat(&self) -> &Controller {
        &self.chat
    }

    /// Mutable access to the chat controller.
    #[cfg(test)]
    pub fn chat_mut(&mut self) -> &mut Controller {
        &mut self.chat
    }

    /// Backend URL for display.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.chat.backend().base_url()
    }

    /// Whether an answer is streaming.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.chat.is_streaming()
    }

    /// Check if UI needs high-frequency redraws (during streaming).
    #[must_use]
    pub fn needs_immediate_redraw(&self) -> bool {
        self.is_streaming()
    }

    /// Tick the animation frame (call on each render).
    pub fn tick_animation(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1);
    }

    /// Get current spinner character for loading animation.
    #[must_use]
    pub fn spinner_char(&self) -> &'static str {
        const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
        SPINNER[self.animation_frame % SPINNER.len()]
    }

    /// Set the status message (also clears any error).
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.error_message = None;
    }

    /// Set the error message.
    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error_message = Some(message.into());
    }

    /// Clear the error message.
    pub fn clear_error(&mut self) {
        self.error_message = None;
    }

    fn show_error(&mut self, context: &str, error: &ChatError) {
        tracing::warn!(error = %error, "{context}");
        let detail = match error {
            ChatError::Client(e) => Notice::for_error(e).text,
            ChatError::Unauthenticated => {
                "not signed in. Set TYPHOON_API_TOKEN to a valid token and restart.".to_string()
            }
            other => other.to_string(),
        };
        self.set_error(format!("{context}: {detail}"));
    }

    /// Move controller notices to the status bar. Returns whether any was an error.
    fn drain_notices(&mut self) -> bool {
        let mut had_error = false;
        for notice in self.chat.take_notices() {
            match notice.level {
                NoticeLevel::Error => {
                    had_error = true;
                    self.set_error(notice.text);
                }
                NoticeLevel::Warning => self.set_status(format!("⚠ {}", notice.text)),
                NoticeLevel::Info => self.set_status(notice.text),
            }
        }
        had_error
    }

    // =========================================================================
    // Session List
    // =========================================================================

    /// The highlighted session.
    #[must_use]
    pub fn selected_session(&self) -> Option<&SessionSummary> {
        self.selected_session.and_then(|i| self.sessions.get(i))
    }

    /// Whether `session` is the one shown in the chat.
    #[must_use]
    pub fn is_current_session(&self, session: &SessionSummary) -> bool {
        self.chat.session_id() == Some(&session.session_id)
    }

    /// Move selection up in the session list.
    pub fn select_prev_session(&mut self) {
        if self.sessions.is_empty() {
            return;
        }

        self.selected_session = Some(match self.selected_session {
            Some(0) | None => self.sessions.len() - 1,
            Some(i) => i - 1,
        });
    }

    /// Move selection down in the session list.
    pub fn select_next_session(&mut self) {
        if self.sessions.is_empty() {
            return;
        }

        self.selected_session = Some(match self.selected_session {
            Some(i) if i + 1 >= self.sessions.len() => 0,
            Some(i) => i + 1,
            None => 0,
        });
    }

    fn set_sessions(&mut self, sessions: Vec<SessionSummary>) {
        let keep = self
            .selected_session()
            .map(|s| s.session_id.clone())
            .or_else(|| self.chat.session_id().cloned());
        self.sessions = sessions;
        self.selected_session = keep
            .and_then(|id| self.sessions.iter().position(|s| s.session_id == id))
            .or(if self.sessions.is_empty() { None } else { Some(0) });
    }

    fn select_current_session(&mut self) {
        if let Some(current) = self.chat.session_id() {
            if let Some(i) = self.sessions.iter().position(|s| &s.session_id == current) {
                self.selected_session = Some(i);
            }
        }
    }

    /// Take the "session titles may have changed" flag.
    pub fn take_sessions_stale(&mut self) -> bool {
        std::mem::take(&mut self.sessions_stale)
    }

    // =========================================================================
    // Chat Scrolling
    // =========================================================================

    /// Scroll chat up (view older messages).
    pub fn scroll_chat_up(&mut self, amount: usize) {
        self.chat_scroll = self
            .chat_scroll
            .saturating_add(amount)
            .min(self.max_chat_scroll);
        self.chat.user_scrolled(self.chat_scroll);
    }

    /// Scroll chat down (view newer messages).
    pub fn scroll_chat_down(&mut self, amount: usize) {
        self.chat_scroll = self.chat_scroll.saturating_sub(amount);
        self.chat.user_scrolled(self.chat_scroll);
    }

    /// Record how far the rendered chat can scroll; called after layout.
    pub fn set_chat_scroll_limit(&mut self, max_scroll: usize) {
        self.max_chat_scroll = max_scroll;
        self.chat_scroll = self.chat_scroll.min(max_scroll);
    }

    fn follow(&mut self, action: ScrollAction) {
        if action == ScrollAction::FollowLatest {
            self.chat_scroll = 0;
        }
    }

    // =========================================================================
    // Input Handling
    // =========================================================================

    fn byte_index(&self, char_index: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_index)
            .map_or(self.input.len(), |(i, _)| i)
    }

    fn input_char_count(&self) -> usize {
        self.input.chars().count()
    }

    /// Input text left of the cursor.
    #[must_use]
    pub fn input_before_cursor(&self) -> &str {
        &self.input[..self.byte_index(self.cursor_position)]
    }

    /// Insert a character at the cursor position.
    pub fn insert_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor_position);
        self.input.insert(at, c);
        self.cursor_position += 1;
    }

    /// Delete the character before the cursor.
    pub fn delete_char(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            let at = self.byte_index(self.cursor_position);
            self.input.remove(at);
        }
    }

    /// Delete the character at the cursor.
    pub fn delete_char_forward(&mut self) {
        if self.cursor_position < self.input_char_count() {
            let at = self.byte_index(self.cursor_position);
            self.input.remove(at);
        }
    }

    /// Delete back to the previous space.
    pub fn delete_word(&mut self) {
        while self.cursor_position > 0 {
            self.delete_char();
            let before = self.input_before_cursor();
            if before.is_empty() || before.ends_with(' ') {
                break;
            }
        }
    }

    /// Move cursor left.
    pub fn move_cursor_left(&mut self) {
        self.cursor_position = self.cursor_position.saturating_sub(1);
    }

    /// Move cursor right.
    pub fn move_cursor_right(&mut self) {
        if self.cursor_position < self.input_char_count() {
            self.cursor_position += 1;
        }
    }

    /// Move cursor to the start.
    pub fn move_cursor_start(&mut self) {
        self.cursor_position = 0;
    }

    /// Move cursor to the end.
    pub fn move_cursor_end(&mut self) {
        self.cursor_position = self.input_char_count();
    }

    /// Clear the input.
    pub fn clear_input(&mut self) {
        self.input.clear();
        self.cursor_position = 0;
    }

    /// Replace the input with the next suggested question.
    pub fn insert_popular_question(&mut self) {
        if self.popular_questions.is_empty() {
            self.set_status("No suggested questions available");
            return;
        }
        let question = self.popular_questions[self.next_popular % self.popular_questions.len()].clone();
        self.next_popular = self.next_popular.wrapping_add(1);
        self.input = question;
        self.move_cursor_end();
        self.focus = Focus::Chat;
    }

    /// Flip deep-thinking mode for later questions.
    pub fn toggle_deep_thinking(&mut self) {
        let enabled = !self.chat.deep_thinking();
        self.chat.set_deep_thinking(enabled);
        self.set_status(if enabled {
            "Deep thinking on"
        } else {
            "Deep thinking off"
        });
    }

    // =========================================================================
    // API Operations
    // =========================================================================

    /// Load suggestions and sessions, and open `session` if given.
    pub async fn initialize(&mut self, session: Option<&str>) {
        match self.chat.popular_questions().await {
            Ok(questions) => self.popular_questions = questions,
            Err(e) => tracing::warn!(error = %e, "failed to load suggested questions"),
        }
        self.refresh_sessions().await;

        if let Some(raw) = session {
            match SessionId::new(raw) {
                Ok(id) => {
                    if let Err(e) = self.chat.switch_session(id).await {
                        self.show_error("Failed to open session", &e);
                        return;
                    }
                    self.select_current_session();
                }
                Err(e) => {
                    self.set_error(format!("Invalid session ID: {e}"));
                    return;
                }
            }
        }
        self.set_status("Ready. Type a question and press Enter.");
    }

    /// Reload the session list.
    pub async fn refresh_sessions(&mut self) {
        match self.chat.list_sessions().await {
            Ok(sessions) => self.set_sessions(sessions),
            Err(e) => tracing::warn!(error = %e, "failed to refresh sessions"),
        }
    }

    /// Open the highlighted session.
    pub async fn open_selected_session(&mut self) {
        let Some(session) = self.selected_session().cloned() else {
            return;
        };
        if self.is_current_session(&session) && !self.is_streaming() {
            self.focus = Focus::Chat;
            return;
        }

        match self.chat.switch_session(session.session_id.clone()).await {
            Ok(()) => {
                self.abort_exchange();
                self.chat_scroll = 0;
                self.focus = Focus::Chat;
                self.set_status(format!("Opened \"{}\"", session.label()));
            }
            Err(e) => self.show_error("Failed to open session", &e),
        }
    }

    /// Start a new empty session.
    pub async fn new_session(&mut self) {
        match self.chat.new_session().await {
            Ok(_) => {
                self.abort_exchange();
                self.chat_scroll = 0;
                self.focus = Focus::Chat;
                self.set_status("New conversation");
                self.refresh_sessions().await;
                self.select_current_session();
            }
            Err(e) => self.show_error("Failed to create session", &e),
        }
    }

    /// Send the input as a question.
    pub async fn send_input(&mut self) {
        if self.input.trim().is_empty() {
            return;
        }
        if self.is_streaming() {
            self.set_error("An answer is still streaming. Press Esc to stop it.");
            return;
        }
        if let Err(e) = self.chat.ensure_session().await {
            self.show_error("Failed to start session", &e);
            return;
        }

        match self.chat.ask(&self.input) {
            Ok(exchange) => {
                self.clear_input();
                self.chat_scroll = 0;
                let backend = Arc::clone(self.chat.backend());
                self.exchange_task = Some(spawn_exchange(backend, exchange, self.events_tx.clone()));
                self.set_status("Assistant is answering... (Esc to stop)");
            }
            Err(e) => self.show_error("Failed to send question", &e),
        }
    }

    /// Apply an exchange event. Returns `true` if the UI should be redrawn.
    pub fn handle_exchange_event(&mut self, event: ExchangeEvent) -> bool {
        let was_streaming = self.is_streaming();
        let action = self.chat.handle_event(event);
        self.follow(action);
        let had_error = self.drain_notices();

        if was_streaming && !self.is_streaming() {
            self.exchange_task = None;
            self.sessions_stale = true;
            if !had_error {
                self.set_status("Answer complete");
            }
        }
        true
    }

    /// Stop the streaming answer, keeping what arrived.
    ///
    /// Returns `true` if an answer was streaming.
    pub fn cancel_streaming(&mut self) -> bool {
        self.abort_exchange();
        let cancelled = self.chat.cancel();
        self.follow(ScrollAction::FollowLatest);
        self.drain_notices();
        cancelled
    }

    fn abort_exchange(&mut self) {
        if let Some(task) = self.exchange_task.take() {
            task.abort();
        }
    }

    /// Stop background work before exit.
    pub fn shutdown(&mut self) {
        if self.is_streaming() {
            self.cancel_streaming();
        }
        self.abort_exchange();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typhoon_assistant_client::{ClientConfig, Credentials, ExchangeUpdate, StreamFrame};
    use typhoon_assistant_core::ScrollState;

    fn app() -> App {
        let config = ClientConfig {
            api_base_url: "http://127.0.0.1:9/api".into(),
            ..ClientConfig::default()
        };
        let client = AssistantClient::new(&config, Credentials::bearer("test-token")).unwrap();
        let chat = ChatController::new(Arc::new(client), &config);
        let (tx, _rx) = mpsc::channel(8);
        App::new(chat, tx)
    }

    fn session(id: &str, title: &str) -> SessionSummary {
        SessionSummary {
            session_id: SessionId::new(id).unwrap(),
            title: Some(title.into()),
            created_at: None,
            updated_at: None,
            message_count: None,
        }
    }

    fn frame(id: typhoon_assistant_core::MessageId, frame: StreamFrame) -> ExchangeEvent {
        ExchangeEvent {
            id,
            update: ExchangeUpdate::Frame(frame),
        }
    }

    #[test]
    fn input_editing_with_multibyte_text() {
        let mut app = app();
        for c in "台风路径".chars() {
            app.insert_char(c);
        }
        assert_eq!(app.cursor_position, 4);

        app.move_cursor_left();
        app.delete_char();
        assert_eq!(app.input, "台风径");
        assert_eq!(app.input_before_cursor(), "台风");

        app.move_cursor_start();
        app.delete_char_forward();
        assert_eq!(app.input, "风径");

        app.move_cursor_end();
        app.insert_char('?');
        assert_eq!(app.input, "风径?");
    }

    #[test]
    fn delete_word_stops_at_space() {
        let mut app = app();
        for c in "where is haikui".chars() {
            app.insert_char(c);
        }
        app.delete_word();
        assert_eq!(app.input, "where is ");
    }

    #[test]
    fn scroll_gestures_drive_scroll_state() {
        let mut app = app();
        app.set_chat_scroll_limit(50);

        app.scroll_chat_up(10);
        assert_eq!(app.chat_scroll, 10);
        assert_eq!(app.chat().scroll_state(), ScrollState::ManualScroll);

        app.scroll_chat_down(8);
        assert_eq!(app.chat_scroll, 2);
        assert_eq!(app.chat().scroll_state(), ScrollState::AutoScroll);

        app.scroll_chat_up(100);
        assert_eq!(app.chat_scroll, 50);
    }

    #[test]
    fn streaming_follows_latest_content() {
        let mut app = app();
        let sid = SessionId::new("sess-1").unwrap();
        app.set_chat_scroll_limit(40);
        app.scroll_chat_up(20);

        let exchange = app
            .chat_mut()
            .begin_exchange(&sid, "What is typhoon X?", "deepseek-chat", false)
            .unwrap();
        app.scroll_chat_up(5);
        app.handle_exchange_event(frame(exchange.id(), StreamFrame::Content("It ".into())));
        assert_eq!(app.chat_scroll, 0);

        app.handle_exchange_event(frame(exchange.id(), StreamFrame::Done));
        assert!(!app.is_streaming());
        assert_eq!(app.status_message.as_deref(), Some("Answer complete"));
        assert!(app.take_sessions_stale());
    }

    #[test]
    fn upstream_error_shows_in_status_bar() {
        let mut app = app();
        let sid = SessionId::new("sess-1").unwrap();
        let exchange = app
            .chat_mut()
            .begin_exchange(&sid, "Question", "deepseek-chat", false)
            .unwrap();

        app.handle_exchange_event(frame(
            exchange.id(),
            StreamFrame::UpstreamError("rate limited".into()),
        ));
        assert!(app.is_streaming());
        assert!(app.error_message.as_deref().unwrap().contains("rate limited"));
    }

    #[test]
    fn failed_exchange_keeps_error_visible() {
        let mut app = app();
        let sid = SessionId::new("sess-1").unwrap();
        let exchange = app
            .chat_mut()
            .begin_exchange(&sid, "Question", "deepseek-chat", false)
            .unwrap();

        app.handle_exchange_event(ExchangeEvent {
            id: exchange.id(),
            update: ExchangeUpdate::Ended,
        });
        assert!(!app.is_streaming());
        assert_eq!(app.chat().transcript().len(), 1);
        assert!(app.error_message.is_some());
    }

    #[test]
    fn cancel_keeps_partial_answer() {
        let mut app = app();
        let sid = SessionId::new("sess-1").unwrap();
        let exchange = app
            .chat_mut()
            .begin_exchange(&sid, "Question", "deepseek-chat", false)
            .unwrap();
        app.handle_exchange_event(frame(exchange.id(), StreamFrame::Content("Partial".into())));

        assert!(app.cancel_streaming());
        assert!(!app.is_streaming());
        assert_eq!(app.chat().transcript().messages()[1].content, "Partial");
        assert_eq!(app.status_message.as_deref(), Some("Answer stopped."));
        assert!(!app.cancel_streaming());
    }

    #[test]
    fn popular_questions_cycle() {
        let mut app = app();
        app.focus = Focus::Sessions;
        app.insert_popular_question();
        assert!(app.input.is_empty());

        app.popular_questions = vec!["First?".into(), "Second?".into()];
        app.insert_popular_question();
        assert_eq!(app.input, "First?");
        assert_eq!(app.cursor_position, 6);
        assert_eq!(app.focus, Focus::Chat);

        app.insert_popular_question();
        app.insert_popular_question();
        assert_eq!(app.input, "First?");
    }

    #[test]
    fn session_selection_wraps() {
        let mut app = app();
        app.set_sessions(vec![session("a", "Haikui"), session("b", "Doksuri")]);
        assert_eq!(app.selected_session, Some(0));

        app.select_prev_session();
        assert_eq!(app.selected_session, Some(1));
        app.select_next_session();
        assert_eq!(app.selected_session, Some(0));

        // Selection follows the session across reloads.
        app.select_next_session();
        app.set_sessions(vec![session("c", "New"), session("a", "Haikui"), session("b", "Doksuri")]);
        assert_eq!(app.selected_session().unwrap().session_id.as_str(), "b");
    }

    #[test]
    fn focus_toggles() {
        assert_eq!(Focus::Chat.next(), Focus::Sessions);
        assert_eq!(Focus::Sessions.next(), Focus::Chat);
    }

    #[test]
    fn deep_thinking_toggle() {
        let mut app = app();
        assert!(!app.chat().deep_thinking());
        app.toggle_deep_thinking();
        assert!(app.chat().deep_thinking());
    }
}
