//! Scroll controller for the transcript view.
//!
//! Decides, per state transition, whether the view should jump to the
//! latest message or stay where the user left it. All transitions go through
//! [`transition`], a pure function of the current state, the event and the
//! follow threshold.
//!
//! Policy:
//! - Starting a stream forces auto-follow, overriding manual scrolling.
//! - While streaming, user scroll gestures do not change the state.
//! - When idle, a gesture ending within the threshold of the bottom enables
//!   auto-follow; one ending farther up switches to manual.
//! - Finishing a stream resets to auto-follow.

/// Scroll state of the transcript view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollState {
    /// Nothing has happened yet (or the transcript was replaced). Follows.
    #[default]
    Idle,
    /// A stream is active. Always follows; user gestures are ignored.
    Streaming,
    /// Not streaming, view pinned to the latest content.
    AutoScroll,
    /// Not streaming, user has scrolled away from the bottom.
    ManualScroll,
}

impl ScrollState {
    /// Whether transcript mutations should move the view to the latest content.
    #[must_use]
    pub const fn follows(self) -> bool {
        !matches!(self, Self::ManualScroll)
    }
}

/// Inputs to the scroll state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollEvent {
    /// The user scrolled; the view now ends this many rows above the bottom.
    UserScrolled {
        /// Distance between the bottom of the viewport and the end of the content.
        distance_from_bottom: usize,
    },
    /// A streaming exchange started.
    StreamStarted,
    /// A streaming exchange ended (completed, failed or cancelled).
    StreamFinished,
    /// The transcript changed (message appended or text streamed in).
    TranscriptChanged,
    /// The transcript was replaced wholesale (session switch).
    Reset,
}

/// What the view should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollAction {
    /// Reposition to show the latest content.
    FollowLatest,
    /// Leave the view untouched.
    Stay,
}

/// Compute the next state and the view action for one event.
#[must_use]
pub fn transition(
    state: ScrollState,
    event: ScrollEvent,
    threshold: usize,
) -> (ScrollState, ScrollAction) {
    match (state, event) {
        (_, ScrollEvent::StreamStarted) => (ScrollState::Streaming, ScrollAction::FollowLatest),
        (_, ScrollEvent::StreamFinished) => (ScrollState::AutoScroll, ScrollAction::FollowLatest),
        (_, ScrollEvent::Reset) => (ScrollState::Idle, ScrollAction::FollowLatest),
        (ScrollState::Streaming, ScrollEvent::UserScrolled { .. }) => {
            (ScrollState::Streaming, ScrollAction::Stay)
        }
        (_, ScrollEvent::UserScrolled { distance_from_bottom }) => {
            if distance_from_bottom <= threshold {
                (ScrollState::AutoScroll, ScrollAction::Stay)
            } else {
                (ScrollState::ManualScroll, ScrollAction::Stay)
            }
        }
        (state, ScrollEvent::TranscriptChanged) => {
            let action = if state.follows() {
                ScrollAction::FollowLatest
            } else {
                ScrollAction::Stay
            };
            (state, action)
        }
    }
}

/// Stateful wrapper around [`transition`].
#[derive(Debug, Clone)]
pub struct ScrollController {
    state: ScrollState,
    threshold: usize,
}

impl ScrollController {
    /// Create a controller with the given follow threshold.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            state: ScrollState::Idle,
            threshold,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> ScrollState {
        self.state
    }

    /// Distance from the bottom that still counts as "at the bottom".
    #[must_use]
    pub const fn threshold(&self) -> usize {
        self.threshold
    }

    /// Whether transcript mutations currently move the view.
    #[must_use]
    pub const fn is_following(&self) -> bool {
        self.state.follows()
    }

    /// Feed one event and return what the view should do.
    pub fn handle(&mut self, event: ScrollEvent) -> ScrollAction {
        let (next, action) = transition(self.state, event, self.threshold);
        if next != self.state {
            tracing::trace!(from = ?self.state, to = ?next, ?event, "scroll state changed");
        }
        self.state = next;
        action
    }
}

impl Default for ScrollController {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: usize = 3;

    fn scrolled(distance: usize) -> ScrollEvent {
        ScrollEvent::UserScrolled {
            distance_from_bottom: distance,
        }
    }

    #[test]
    fn initial_state_follows() {
        let mut scroll = ScrollController::new(THRESHOLD);
        assert_eq!(scroll.state(), ScrollState::Idle);
        assert_eq!(scroll.handle(ScrollEvent::TranscriptChanged), ScrollAction::FollowLatest);
    }

    #[test]
    fn scrolling_up_when_idle_goes_manual() {
        let mut scroll = ScrollController::new(THRESHOLD);
        assert_eq!(scroll.handle(scrolled(20)), ScrollAction::Stay);
        assert_eq!(scroll.state(), ScrollState::ManualScroll);
        assert_eq!(scroll.handle(ScrollEvent::TranscriptChanged), ScrollAction::Stay);
    }

    #[test]
    fn scrolling_near_bottom_restores_auto() {
        let mut scroll = ScrollController::new(THRESHOLD);
        scroll.handle(scrolled(20));
        scroll.handle(scrolled(THRESHOLD));
        assert_eq!(scroll.state(), ScrollState::AutoScroll);
        assert_eq!(scroll.handle(ScrollEvent::TranscriptChanged), ScrollAction::FollowLatest);
    }

    #[test]
    fn threshold_boundary() {
        let (state, _) = transition(ScrollState::AutoScroll, scrolled(THRESHOLD + 1), THRESHOLD);
        assert_eq!(state, ScrollState::ManualScroll);
        let (state, _) = transition(ScrollState::ManualScroll, scrolled(0), THRESHOLD);
        assert_eq!(state, ScrollState::AutoScroll);
    }

    #[test]
    fn stream_start_overrides_manual() {
        let mut scroll = ScrollController::new(THRESHOLD);
        scroll.handle(scrolled(50));
        assert_eq!(scroll.handle(ScrollEvent::StreamStarted), ScrollAction::FollowLatest);
        assert_eq!(scroll.state(), ScrollState::Streaming);
    }

    #[test]
    fn gestures_ignored_while_streaming() {
        let mut scroll = ScrollController::new(THRESHOLD);
        scroll.handle(ScrollEvent::StreamStarted);

        assert_eq!(scroll.handle(scrolled(100)), ScrollAction::Stay);
        assert_eq!(scroll.state(), ScrollState::Streaming);
        assert_eq!(scroll.handle(ScrollEvent::TranscriptChanged), ScrollAction::FollowLatest);
    }

    #[test]
    fn stream_finish_resets_to_auto() {
        let mut scroll = ScrollController::new(THRESHOLD);
        scroll.handle(ScrollEvent::StreamStarted);
        scroll.handle(scrolled(100));

        assert_eq!(scroll.handle(ScrollEvent::StreamFinished), ScrollAction::FollowLatest);
        assert_eq!(scroll.state(), ScrollState::AutoScroll);
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut scroll = ScrollController::new(THRESHOLD);
        scroll.handle(scrolled(50));
        assert_eq!(scroll.handle(ScrollEvent::Reset), ScrollAction::FollowLatest);
        assert_eq!(scroll.state(), ScrollState::Idle);
        assert!(scroll.is_following());
    }
}
