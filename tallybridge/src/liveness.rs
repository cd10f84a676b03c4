/// Whether the switcher was reachable on the last poll.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessState {
    /// The switcher hasn't been polled yet.
    #[default]
    Unknown,
    Active,
    Inactive,
}

/// A change in [LivenessState].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessEvent {
    /// The switcher became reachable.
    Opened,
    /// The switcher became unreachable.
    Closed,
}

/// Edge detector for switcher reachability.
///
/// Reports each change of state exactly once, so a switcher which stays
/// unreachable doesn't flood the logs.
#[derive(Default, Debug, Clone)]
pub struct LivenessTracker {
    state: LivenessState,
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of a poll, returning an event if the state
    /// changed.
    pub fn observe(&mut self, success: bool) -> Option<LivenessEvent> {
        let (next, event) = if success {
            (LivenessState::Active, LivenessEvent::Opened)
        } else {
            (LivenessState::Inactive, LivenessEvent::Closed)
        };

        if self.state == next {
            return None;
        }
        self.state = next;
        Some(event)
    }

    #[inline]
    pub const fn state(&self) -> LivenessState {
        self.state
    }
}
