//! Transcript state store.
//!
//! An ordered list of messages, at most one of which is "open" (receiving
//! streamed text). Entries are only ever appended at the end; nothing
//! reorders them. Operations on the open message are no-ops when there is
//! none, so duplicate terminal signals are harmless.

use chrono::{DateTime, Utc};

use crate::ids::MessageId;
use crate::message::{Message, TextField};

/// Ordered messages of the current session.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    open: Option<MessageId>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages in chronological order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The most recent message.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append an immutable message.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Append a message and make it the open message.
    ///
    /// A previously open message is closed as-is.
    pub fn append_open(&mut self, message: Message) -> MessageId {
        if let Some(previous) = self.open.take() {
            tracing::warn!(message_id = %previous, "closing open message before opening another");
        }
        let id = message.id;
        self.messages.push(message);
        self.open = Some(id);
        id
    }

    /// ID of the open message, if any.
    #[must_use]
    pub fn open_id(&self) -> Option<MessageId> {
        self.open
    }

    /// The open message, if any.
    #[must_use]
    pub fn open_message(&self) -> Option<&Message> {
        let id = self.open?;
        self.messages.iter().rev().find(|m| m.id == id)
    }

    /// Whether `id` is the open message.
    #[must_use]
    pub fn is_open(&self, id: MessageId) -> bool {
        self.open == Some(id)
    }

    /// Append text to one field of the open message.
    ///
    /// Returns `false` (and changes nothing) when no message is open.
    pub fn append_to_open(&mut self, field: TextField, text: &str) -> bool {
        match self.open_message_mut() {
            Some(message) => {
                message.push_text(field, text);
                true
            }
            None => false,
        }
    }

    /// Close the open message and stamp it with its completion time.
    ///
    /// Returns the ID of the message that was closed, or `None` if nothing was open.
    pub fn finalize_open(&mut self, completed_at: DateTime<Utc>) -> Option<MessageId> {
        let message = self.open_message_mut()?;
        message.created_at = completed_at;
        self.open.take()
    }

    /// Remove the open message from the transcript entirely.
    pub fn discard_open(&mut self) -> Option<Message> {
        let id = self.open.take()?;
        let index = self.messages.iter().rposition(|m| m.id == id)?;
        Some(self.messages.remove(index))
    }

    /// Swap the whole message sequence, e.g. when switching sessions.
    ///
    /// Any open message is dropped along with the old sequence.
    pub fn replace_all(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.open = None;
    }

    fn open_message_mut(&mut self) -> Option<&mut Message> {
        let id = self.open?;
        self.messages.iter_mut().rev().find(|m| m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;
    use proptest::prelude::*;

    #[test]
    fn append_keeps_order() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("first"));
        transcript.append(Message::assistant("second"));
        transcript.append(Message::user("third"));

        let contents: Vec<&str> = transcript.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert!(transcript.open_id().is_none());
    }

    #[test]
    fn append_to_open_without_open_is_noop() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("q"));

        assert!(!transcript.append_to_open(TextField::Content, "ignored"));
        assert_eq!(transcript.messages()[0].content, "q");
    }

    #[test]
    fn finalize_without_open_is_noop() {
        let mut transcript = Transcript::new();
        assert!(transcript.finalize_open(Utc::now()).is_none());
        assert!(transcript.discard_open().is_none());
    }

    #[test]
    fn open_message_receives_fragments() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("What is typhoon X?"));
        let id = transcript.append_open(Message::assistant_placeholder());

        assert!(transcript.is_open(id));
        assert!(transcript.append_to_open(TextField::Content, "It "));
        assert!(transcript.append_to_open(TextField::Content, "is..."));

        let open = transcript.open_message().unwrap();
        assert_eq!(open.content, "It is...");
        assert_eq!(open.role, Role::Assistant);
    }

    #[test]
    fn finalize_closes_and_stamps() {
        let mut transcript = Transcript::new();
        let placeholder = Message::assistant_placeholder();
        let created = placeholder.created_at;
        let id = transcript.append_open(placeholder);

        let completed = created + chrono::Duration::seconds(5);
        assert_eq!(transcript.finalize_open(completed), Some(id));
        assert!(transcript.open_id().is_none());
        assert_eq!(transcript.messages()[0].created_at, completed);

        // A second terminal signal changes nothing.
        assert!(transcript.finalize_open(completed + chrono::Duration::seconds(1)).is_none());
        assert_eq!(transcript.messages()[0].created_at, completed);
        assert!(!transcript.append_to_open(TextField::Content, "late"));
    }

    #[test]
    fn discard_removes_only_open_message() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("question"));
        let id = transcript.append_open(Message::assistant_placeholder());
        transcript.append_to_open(TextField::Content, "partial");

        let removed = transcript.discard_open().unwrap();
        assert_eq!(removed.id, id);
        assert_eq!(transcript.len(), 1);
        assert!(transcript.messages()[0].is_user());
        assert!(transcript.open_id().is_none());
    }

    #[test]
    fn replace_all_swaps_and_drops_open() {
        let mut transcript = Transcript::new();
        transcript.append(Message::user("old question"));
        transcript.append_open(Message::assistant_placeholder());

        let history = vec![Message::user("h1"), Message::assistant("a1")];
        transcript.replace_all(history.clone());

        assert_eq!(transcript.messages(), history.as_slice());
        assert!(transcript.open_id().is_none());
        assert!(!transcript.append_to_open(TextField::Content, "stale"));
        assert_eq!(transcript.messages(), history.as_slice());
    }

    #[test]
    fn append_open_closes_previous() {
        let mut transcript = Transcript::new();
        let first = transcript.append_open(Message::assistant_placeholder());
        let second = transcript.append_open(Message::assistant_placeholder());

        assert!(!transcript.is_open(first));
        assert!(transcript.is_open(second));
        assert_eq!(transcript.len(), 2);
    }

    #[derive(Debug, Clone)]
    enum Fragment {
        Content(String),
        Reasoning(String),
    }

    fn fragment() -> impl Strategy<Value = Fragment> {
        prop_oneof![
            ".{0,12}".prop_map(Fragment::Content),
            ".{0,12}".prop_map(Fragment::Reasoning),
        ]
    }

    proptest! {
        #[test]
        fn fields_are_concatenations_in_arrival_order(fragments in proptest::collection::vec(fragment(), 0..40)) {
            let mut transcript = Transcript::new();
            transcript.append_open(Message::assistant_placeholder());

            let mut expected_content = String::new();
            let mut expected_reasoning = String::new();
            for fragment in &fragments {
                match fragment {
                    Fragment::Content(text) => {
                        expected_content.push_str(text);
                        transcript.append_to_open(TextField::Content, text);
                    }
                    Fragment::Reasoning(text) => {
                        expected_reasoning.push_str(text);
                        transcript.append_to_open(TextField::Reasoning, text);
                    }
                }
            }
            transcript.finalize_open(Utc::now());

            let message = &transcript.messages()[0];
            prop_assert_eq!(&message.content, &expected_content);
            prop_assert_eq!(&message.reasoning, &expected_reasoning);
            prop_assert!(transcript.open_id().is_none());
        }
    }
}
