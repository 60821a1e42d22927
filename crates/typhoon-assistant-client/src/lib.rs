//! Streaming chat client for the typhoon assistant.
//!
//! This crate talks to the assistant backend and drives chat exchanges:
//!
//! - **SSE parsing**: [`FrameDecoder`] and [`FrameStream`] turn the streamed
//!   response body into [`StreamFrame`]s
//! - **HTTP client**: [`AssistantClient`] for sessions, history, suggestions
//!   and the answer stream
//! - **Controller**: [`ChatController`] applies frames to the transcript and
//!   the scroll state, and raises [`Notice`]s for failures
//!
//! The [`ChatBackend`] trait sits between the controller and the HTTP client
//! so exchanges can be driven by scripted backends in tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod backend;
pub mod client;
pub mod config;
pub mod controller;
pub mod credentials;
pub mod error;
pub mod notice;
pub mod sse;
pub mod types;

pub use backend::{ChatBackend, FrameStreamBox};
pub use client::AssistantClient;
pub use config::ClientConfig;
pub use controller::{
    spawn_exchange, ChatController, Exchange, ExchangeEvent, ExchangeOutcome, ExchangeUpdate,
};
pub use credentials::{CredentialState, Credentials};
pub use error::{ChatError, ClientError, FailureKind};
pub use notice::{Notice, NoticeLevel};
pub use sse::{FrameDecoder, FrameStream, StreamFrame};
pub use types::{ChatRequest, SessionSummary};
