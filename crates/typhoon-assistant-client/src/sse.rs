//! SSE frame parser for the chat stream.
//!
//! The backend writes one `data: <json>` line per fragment and finishes with
//! `data: [DONE]`. [`FrameDecoder`] turns arbitrarily split byte chunks into
//! [`StreamFrame`]s; [`FrameStream`] wraps a byte stream with it.
//!
//! Lines without the `data: ` prefix (comments, keep-alives, blank
//! separators) are ignored. A line whose payload fails to decode is logged
//! and dropped without ending the stream. Nothing after `[DONE]` is read.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use futures::stream::Stream;
use pin_project_lite::pin_project;

use crate::error::ClientError;
use crate::types::FramePayload;

/// Prefix of lines that carry a payload.
pub const DATA_PREFIX: &str = "data: ";

/// Payload that terminates the stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One decoded chat stream frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Reasoning text fragment.
    Reasoning(String),
    /// Answer text fragment.
    Content(String),
    /// Error reported by the model service.
    UpstreamError(String),
    /// End of the answer.
    Done,
}

impl StreamFrame {
    /// Whether this frame ends the stream.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl From<FramePayload> for StreamFrame {
    fn from(payload: FramePayload) -> Self {
        match payload {
            FramePayload::ReasoningContent { content } => Self::Reasoning(content),
            FramePayload::Content { content } => Self::Content(content),
            FramePayload::Error { message } => Self::UpstreamError(message),
        }
    }
}

/// Decode a single line (without its terminator).
///
/// Returns `None` for lines that carry no frame, including malformed ones.
#[must_use]
pub fn decode_line(line: &str) -> Option<StreamFrame> {
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    if payload == DONE_SENTINEL {
        return Some(StreamFrame::Done);
    }
    match serde_json::from_str::<FramePayload>(payload) {
        Ok(frame) => Some(frame.into()),
        Err(e) => {
            tracing::warn!(payload, error = %e, "dropping malformed stream frame");
            None
        }
    }
}

/// Incremental line decoder.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    finished: bool,
}

impl FrameDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `[DONE]` has been decoded.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether bytes of an unterminated line are buffered.
    #[must_use]
    pub fn has_partial_line(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Feed a chunk and return the frames completed by it, in order.
    ///
    /// After `[DONE]` the rest of the chunk and all later chunks are ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamFrame> {
        let mut frames = Vec::new();
        if self.finished {
            return frames;
        }
        self.buffer.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let raw = &self.buffer[start..end];
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            start = end + 1;

            let frame = match std::str::from_utf8(raw) {
                Ok(line) => decode_line(line),
                Err(e) => {
                    tracing::warn!(error = %e, "dropping stream line that is not UTF-8");
                    None
                }
            };
            if let Some(frame) = frame {
                let done = frame.is_done();
                frames.push(frame);
                if done {
                    self.finished = true;
                    self.buffer.clear();
                    return frames;
                }
            }
        }

        self.buffer.drain(..start);
        frames
    }
}

pin_project! {
    /// Stream of frames decoded from a byte stream.
    ///
    /// Yields `Ok(StreamFrame::Done)` as its last frame when the sentinel
    /// arrives, and never polls the inner stream again afterwards. A transport
    /// error is yielded once and ends the stream. If the inner stream ends
    /// without the sentinel, this stream ends without a `Done` frame.
    pub struct FrameStream<S> {
        #[pin]
        inner: S,
        decoder: FrameDecoder,
        pending: VecDeque<StreamFrame>,
        terminated: bool,
    }
}

impl<S> FrameStream<S> {
    /// Wrap a byte stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
            pending: VecDeque::new(),
            terminated: false,
        }
    }
}

impl<S, B, E> Stream for FrameStream<S>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ClientError>,
{
    type Item = Result<StreamFrame, ClientError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();
        loop {
            if let Some(frame) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(frame)));
            }
            if *this.terminated {
                return Poll::Ready(None);
            }
            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => {
                    this.pending.extend(this.decoder.feed(chunk.as_ref()));
                    if this.decoder.is_finished() {
                        *this.terminated = true;
                    }
                }
                Some(Err(e)) => {
                    *this.terminated = true;
                    return Poll::Ready(Some(Err(e.into())));
                }
                None => {
                    if this.decoder.has_partial_line() {
                        tracing::debug!("stream ended inside a line; discarding it");
                    }
                    *this.terminated = true;
                }
            }
        }
    }
}
