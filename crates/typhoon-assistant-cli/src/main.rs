//! Typhoon Assistant CLI - terminal chat with the typhoon dashboard AI assistant.
//!
//! This is the entry point for the `typhoon-chat` binary. With `--ask` it
//! answers one question on stdout; otherwise it opens the interactive TUI.

#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod app;
mod ui;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use typhoon_assistant_client::{
    AssistantClient, ChatController, ClientConfig, Credentials, ExchangeEvent, ExchangeOutcome,
    NoticeLevel,
};
use typhoon_assistant_core::SessionId;

use app::{App, Controller, Focus, SESSION_REFRESH_INTERVAL};

/// Typhoon Assistant CLI - chat with the typhoon dashboard AI assistant.
#[derive(Parser, Debug)]
#[command(name = "typhoon-chat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bearer token (JWT) for the dashboard API.
    #[arg(long, env = "TYPHOON_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Base URL of the dashboard API.
    #[arg(long, env = "TYPHOON_API_URL", default_value = "http://localhost:8000/api")]
    api_url: String,

    /// Model used for answers.
    #[arg(long, env = "TYPHOON_MODEL", default_value = "deepseek-chat")]
    model: String,

    /// Ask for reasoning before the answer.
    #[arg(long, default_value = "false")]
    deep_thinking: bool,

    /// Request timeout in seconds, including the streamed answer.
    #[arg(long, env = "TYPHOON_REQUEST_TIMEOUT", default_value = "120")]
    timeout: u64,

    /// Resume an existing session.
    #[arg(long, env = "TYPHOON_SESSION_ID")]
    session: Option<String>,

    /// Ask one question, print the answer and exit.
    #[arg(long, value_name = "QUESTION")]
    ask: Option<String>,

    /// Enable debug logging to stderr.
    #[arg(long, default_value = "false")]
    debug: bool,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_base_url: self.api_url.clone(),
            request_timeout_seconds: self.timeout,
            default_model: self.model.clone(),
            deep_thinking: self.deep_thinking,
            ..ClientConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.debug {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("typhoon_assistant_client=debug,typhoon_assistant_core=debug,typhoon_chat=debug,warn")
        });
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init();
    }

    let config = args.client_config();
    let client = AssistantClient::new(&config, Credentials::new(args.token.clone()))
        .context("failed to build HTTP client")?;
    let chat = ChatController::new(Arc::new(client), &config);

    if let Some(question) = &args.ask {
        return run_one_shot(chat, args.session.as_deref(), question).await;
    }

    let (events_tx, events_rx) = mpsc::channel::<ExchangeEvent>(128);
    let mut app = App::new(chat, events_tx);
    app.initialize(args.session.as_deref()).await;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_event_loop(&mut terminal, &mut app, events_rx).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

/// Ask one question and print the answer.
async fn run_one_shot(
    mut chat: Controller,
    session: Option<&str>,
    question: &str,
) -> anyhow::Result<()> {
    let session_id = match session {
        Some(raw) => {
            let id = SessionId::new(raw).context("invalid session ID")?;
            chat.switch_session(id.clone()).await?;
            id
        }
        None => chat.ensure_session().await?,
    };

    let model = chat.model().to_string();
    let deep_thinking = chat.deep_thinking();
    let outcome = chat
        .submit_question(&session_id, question, &model, deep_thinking)
        .await?;

    for notice in chat.take_notices() {
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        eprintln!("{tag}: {}", notice.text);
    }

    if !matches!(outcome, ExchangeOutcome::Completed) {
        bail!("no answer received");
    }

    let mut out = io::stdout().lock();
    if let Some(answer) = chat.transcript().last() {
        if answer.has_reasoning() {
            writeln!(out, "[reasoning]")?;
            writeln!(out, "{}", answer.reasoning)?;
            writeln!(out)?;
        }
        writeln!(out, "{}", answer.content)?;
    }
    eprintln!("session: {session_id}");
    Ok(())
}

/// Main event loop.
///
/// Exchange events trigger an immediate redraw so answers render as they stream.
async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    mut events_rx: mpsc::Receiver<ExchangeEvent>,
) -> anyhow::Result<()> {
    let mut refresh_interval = tokio::time::interval(SESSION_REFRESH_INTERVAL);
    refresh_interval.tick().await;

    loop {
        app.tick_animation();
        terminal.draw(|f| ui::render(f, app))?;

        let tick_rate = if app.needs_immediate_redraw() {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(100)
        };

        tokio::select! {
            () = tokio::time::sleep(tick_rate) => {
                while event::poll(Duration::from_millis(0)).unwrap_or(false) {
                    if let Ok(evt) = event::read() {
                        handle_input(app, evt).await;
                    }
                }
            }

            Some(event) = events_rx.recv() => {
                if app.handle_exchange_event(event) {
                    terminal.draw(|f| ui::render(f, app))?;
                }
            }

            _ = refresh_interval.tick() => {
                if !app.is_streaming() {
                    app.refresh_sessions().await;
                }
            }
        }

        if app.take_sessions_stale() {
            app.refresh_sessions().await;
        }

        if app.should_quit {
            break;
        }
    }

    app.shutdown();
    Ok(())
}

/// Handle a terminal event.
async fn handle_input(app: &mut App, event: Event) {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(app, key).await,
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => app.scroll_chat_up(3),
            MouseEventKind::ScrollDown => app.scroll_chat_down(3),
            _ => {}
        },
        _ => {}
    }
}

/// Keys that work regardless of focus, then per-column keys.
async fn handle_key(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('c') if ctrl => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('n') if ctrl => {
            app.new_session().await;
            return;
        }
        KeyCode::Char('p') if ctrl => {
            app.insert_popular_question();
            return;
        }
        KeyCode::Char('t') if ctrl => {
            app.toggle_deep_thinking();
            return;
        }
        KeyCode::Esc => {
            if app.is_streaming() {
                app.cancel_streaming();
            } else if app.error_message.is_some() {
                app.clear_error();
            } else {
                app.focus = Focus::Sessions;
            }
            return;
        }
        KeyCode::Tab => {
            app.focus = app.focus.next();
            return;
        }
        KeyCode::PageUp => {
            app.scroll_chat_up(10);
            return;
        }
        KeyCode::PageDown => {
            app.scroll_chat_down(10);
            return;
        }
        _ => {}
    }

    match app.focus {
        Focus::Sessions => handle_sessions_key(app, key.code).await,
        Focus::Chat => handle_chat_key(app, key.code, ctrl).await,
    }
}

/// Single-key commands while the session list has focus.
async fn handle_sessions_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('n') => app.new_session().await,
        KeyCode::Char('p') => app.insert_popular_question(),
        KeyCode::Char('t') => app.toggle_deep_thinking(),
        KeyCode::Char('r') => {
            app.refresh_sessions().await;
            app.set_status("Sessions refreshed");
        }
        KeyCode::Char('j') => app.scroll_chat_down(1),
        KeyCode::Char('k') => app.scroll_chat_up(1),
        KeyCode::Up => app.select_prev_session(),
        KeyCode::Down => app.select_next_session(),
        KeyCode::Enter => app.open_selected_session().await,
        KeyCode::Char(c) => {
            // Typing anywhere starts a question
            app.focus = Focus::Chat;
            app.insert_char(c);
        }
        _ => {}
    }
}

/// Input editing while the chat column has focus.
async fn handle_chat_key(app: &mut App, code: KeyCode, ctrl: bool) {
    match code {
        KeyCode::Enter => app.send_input().await,
        KeyCode::Char('w') if ctrl => app.delete_word(),
        KeyCode::Char('u') if ctrl => app.clear_input(),
        KeyCode::Char('a') if ctrl => app.move_cursor_start(),
        KeyCode::Char('e') if ctrl => app.move_cursor_end(),
        KeyCode::Char(c) if !ctrl => app.insert_char(c),
        KeyCode::Backspace => app.delete_char(),
        KeyCode::Delete => app.delete_char_forward(),
        KeyCode::Left => app.move_cursor_left(),
        KeyCode::Right => app.move_cursor_right(),
        KeyCode::Home => app.move_cursor_start(),
        KeyCode::End => app.move_cursor_end(),
        KeyCode::Up => app.scroll_chat_up(1),
        KeyCode::Down => app.scroll_chat_down(1),
        _ => {}
    }
}
