//! Suggestion scheduling with a generation guard
//!
//! Two halves:
//! - `SuggestionScheduler` is the state machine. Every arm/consume/interrupt
//!   issues a new token; a timer or a response carrying an older token is
//!   ignored. This is the only protection against late or reordered replies.
//! - `Debouncer` owns the single pending timer task. Re-arming aborts the
//!   previous task; a firing that slips past the abort is still rejected by
//!   the token check.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Shown while a request is in flight
pub const PLACEHOLDER: &str = "...";

/// Default quiet period before asking for a suggestion
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuggestionPhase {
    /// Nothing to show
    #[default]
    Idle,
    /// Timer fired, request in flight, placeholder text
    Pending,
    /// Response applied, text can be accepted
    Ready,
}

/// The live suggestion. Only the scheduler mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionState {
    pub text: String,
    pub visible: bool,
    pub request_token: u64,
    pub phase: SuggestionPhase,
}

#[derive(Debug, Default)]
pub struct SuggestionScheduler {
    state: SuggestionState,
}

impl SuggestionScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SuggestionState {
        &self.state
    }

    pub fn token(&self) -> u64 {
        self.state.request_token
    }

    pub fn is_current(&self, token: u64) -> bool {
        token == self.state.request_token
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.state.visible = visible;
    }

    /// Text to draw, if any
    pub fn display_text(&self) -> Option<&str> {
        match self.state.phase {
            SuggestionPhase::Idle => None,
            _ if self.state.text.is_empty() => None,
            _ => Some(&self.state.text),
        }
    }

    /// A qualifying keystroke: drop the current suggestion and return the
    /// token the new debounce timer must carry.
    pub fn arm(&mut self) -> u64 {
        self.invalidate();
        self.state.request_token
    }

    /// Drop the current suggestion so nothing in flight can land.
    pub fn invalidate(&mut self) {
        self.state.request_token += 1;
        self.state.text.clear();
        self.state.phase = SuggestionPhase::Idle;
    }

    /// Debounce expired. Returns the token the request must carry, or `None`
    /// when the timer was superseded.
    pub fn fire(&mut self, token: u64) -> Option<u64> {
        if !self.is_current(token) || self.state.phase != SuggestionPhase::Idle {
            return None;
        }
        self.state.phase = SuggestionPhase::Pending;
        self.state.text = PLACEHOLDER.to_string();
        Some(token)
    }

    /// Apply a response. Returns false (and changes nothing) when stale.
    pub fn resolve(&mut self, token: u64, text: String) -> bool {
        if !self.is_current(token) || self.state.phase != SuggestionPhase::Pending {
            return false;
        }
        if text.is_empty() {
            self.state.phase = SuggestionPhase::Idle;
            self.state.text.clear();
        } else {
            self.state.phase = SuggestionPhase::Ready;
            self.state.text = text;
        }
        true
    }

    /// The request failed: clear the placeholder. Stale failures are ignored.
    pub fn fail(&mut self, token: u64) -> bool {
        if !self.is_current(token) || self.state.phase != SuggestionPhase::Pending {
            return false;
        }
        self.state.phase = SuggestionPhase::Idle;
        self.state.text.clear();
        true
    }

    /// Take a ready suggestion for acceptance. Issues a new token.
    pub fn accept(&mut self) -> Option<String> {
        if self.state.phase != SuggestionPhase::Ready {
            return None;
        }
        let text = std::mem::take(&mut self.state.text);
        self.invalidate();
        Some(text)
    }
}

/// Single pending debounce timer that reports back through a channel.
pub struct Debouncer<T> {
    delay: Duration,
    tx: mpsc::UnboundedSender<T>,
    wrap: fn(u64) -> T,
    pending: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(delay: Duration, tx: mpsc::UnboundedSender<T>, wrap: fn(u64) -> T) -> Self {
        Self {
            delay,
            tx,
            wrap,
            pending: None,
        }
    }

    /// Cancel the outstanding timer and start a new one for `token`.
    pub fn arm(&mut self, token: u64) {
        self.cancel();
        let delay = self.delay;
        let tx = self.tx.clone();
        let wrap = self.wrap;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(wrap(token));
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
