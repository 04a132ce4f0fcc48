//! The request lifecycle shared by the log-in form and the transactions page.
//!
//! Every unit that talks to the backend owns a [RequestCycle]. Starting a
//! request hands out a [RequestToken], and only the holder of the most recent
//! token may record an outcome. Responses that arrive for an older token are
//! stale and are dropped.

use std::sync::{Arc, Mutex, PoisonError};

/// The lifecycle stage of a request-bound unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No request has been made yet, or the last one was abandoned.
    Idle,
    /// A request is in flight.
    Loading,
    /// The last request completed successfully.
    Success,
    /// The last request failed, see [RequestState::error_message].
    Failure,
}

/// The phase of a unit together with the message for a failed request.
///
/// The error message is present if and only if the phase is [Phase::Failure].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestState {
    phase: Phase,
    error_message: Option<String>,
}

impl RequestState {
    /// A unit that has not made a request.
    pub fn idle() -> Self {
        Self {
            phase: Phase::Idle,
            error_message: None,
        }
    }

    /// A unit with a request in flight.
    pub fn loading() -> Self {
        Self {
            phase: Phase::Loading,
            error_message: None,
        }
    }

    /// A unit whose last request succeeded.
    pub fn success() -> Self {
        Self {
            phase: Phase::Success,
            error_message: None,
        }
    }

    /// A unit whose last request failed with `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            phase: Phase::Failure,
            error_message: Some(message.into()),
        }
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The message describing why the last request failed.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Whether a request is in flight.
    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }
}

impl Default for RequestState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Identifies one request started by a [RequestCycle].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestToken(u64);

impl RequestToken {
    /// The sequence number of the request within its unit.
    pub fn epoch(self) -> u64 {
        self.0
    }
}

/// Tracks the state of the current request and which request is current.
#[derive(Debug, Clone, Default)]
pub struct RequestCycle {
    state: RequestState,
    epoch: u64,
}

impl RequestCycle {
    /// Create a cycle that starts in `state`.
    pub fn new(state: RequestState) -> Self {
        Self { state, epoch: 0 }
    }

    /// The state of the most recent request.
    pub fn state(&self) -> &RequestState {
        &self.state
    }

    /// Start a new request, superseding any request still in flight.
    ///
    /// Clears the previous error message.
    pub fn begin(&mut self) -> RequestToken {
        self.epoch += 1;
        self.state = RequestState::loading();

        RequestToken(self.epoch)
    }

    /// Whether any request has been started by this cycle.
    pub fn has_started(&self) -> bool {
        self.epoch > 0
    }

    /// Whether `token` belongs to the most recent request.
    pub fn is_current(&self, token: RequestToken) -> bool {
        token.0 == self.epoch
    }

    /// Record the outcome of the request identified by `token`.
    ///
    /// Returns `false` and leaves the state untouched if the request has been
    /// superseded.
    pub fn finish(&mut self, token: RequestToken, outcome: Result<(), String>) -> bool {
        if !self.is_current(token) {
            return false;
        }

        self.state = match outcome {
            Ok(()) => RequestState::success(),
            Err(message) => RequestState::failure(message),
        };

        true
    }

    /// Return to idle if the request identified by `token` is current and has
    /// not recorded an outcome.
    pub fn abandon(&mut self, token: RequestToken) {
        if self.is_current(token) && self.state.is_loading() {
            self.state = RequestState::idle();
        }
    }
}

/// Clears the loading state of a request on every exit path.
///
/// If the future driving a request is dropped before an outcome is recorded,
/// the guard returns the cycle to [Phase::Idle] so the unit does not show a
/// request that will never finish.
pub(crate) struct LoadingGuard<S>
where
    S: AsMut<RequestCycle>,
{
    state: Arc<Mutex<S>>,
    token: RequestToken,
}

impl<S> LoadingGuard<S>
where
    S: AsMut<RequestCycle>,
{
    pub(crate) fn new(state: Arc<Mutex<S>>, token: RequestToken) -> Self {
        Self { state, token }
    }
}

impl<S> Drop for LoadingGuard<S>
where
    S: AsMut<RequestCycle>,
{
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.as_mut().abandon(self.token);
    }
}
