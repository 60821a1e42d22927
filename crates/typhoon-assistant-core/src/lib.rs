//! Core types for the typhoon assistant chat client.
//!
//! This crate holds the I/O-free state shared by the client and the terminal UI:
//!
//! - **Identifiers**: server-issued session IDs and local message IDs
//! - **Messages**: the transcript entry model
//! - **Transcript**: the ordered message store with a single open (streaming) entry
//! - **Scroll**: the auto-follow state machine for the transcript view
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use typhoon_assistant_core::{Message, TextField, Transcript};
//!
//! let mut transcript = Transcript::new();
//! transcript.append(Message::user("What is typhoon X?"));
//! transcript.append_open(Message::assistant_placeholder());
//!
//! transcript.append_to_open(TextField::Content, "It ");
//! transcript.append_to_open(TextField::Content, "is...");
//! transcript.finalize_open(Utc::now());
//!
//! assert_eq!(transcript.messages()[1].content, "It is...");
//! assert!(transcript.open_id().is_none());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod message;
pub mod scroll;
pub mod transcript;

pub use error::{CoreError, Result};
pub use ids::{IdError, MessageId, SessionId};
pub use message::{validate_question, Message, Role, TextField};
pub use scroll::{ScrollAction, ScrollController, ScrollEvent, ScrollState};
pub use transcript::Transcript;
