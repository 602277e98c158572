//! Interactive session state
//!
//! `Session` is the single owner of the logical line, the suggestion state,
//! the ghost overlay and the scrollback. Handlers are synchronous and run to
//! completion; the runtime feeds them events and carries out the `Effect`s
//! they return (pty writes and debounce timers).
//!
//! Every handler that touches the line or the suggestion clears the ghost
//! first and only redraws once the new state is in place.

use std::io::{self, Write};

use tracing::{debug, warn};

use crate::completion::{clean_suggestion, CompletionError};
use crate::keys::{split_keys, KeyKind};
use crate::line::LineBuffer;
use crate::overlay::GhostOverlay;
use crate::pty::Utf8Decoder;
use crate::scheduler::{SuggestionScheduler, SuggestionState};
use crate::scrollback::Scrollback;

/// Work the runtime has to do on behalf of the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Bytes for the shell's stdin
    Forward(Vec<u8>),
    /// Restart the debounce timer for this token
    Arm(u64),
    /// Drop the pending debounce timer
    Cancel,
}

/// A completion to request, with the token its reply must carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub token: u64,
    /// Raw scrollback captured when the timer fired
    pub scrollback: String,
}

pub struct Session<W: Write> {
    line: LineBuffer,
    scheduler: SuggestionScheduler,
    overlay: GhostOverlay<W>,
    scrollback: Scrollback,
    decoder: Utf8Decoder,
}

impl<W: Write> Session<W> {
    pub fn new(out: W, scrollback_chars: usize) -> Self {
        Self {
            line: LineBuffer::new(),
            scheduler: SuggestionScheduler::new(),
            overlay: GhostOverlay::new(out),
            scrollback: Scrollback::new(scrollback_chars),
            decoder: Utf8Decoder::new(),
        }
    }

    pub fn line(&self) -> &str {
        self.line.text()
    }

    pub fn suggestion(&self) -> &SuggestionState {
        self.scheduler.state()
    }

    pub fn overlay(&self) -> &GhostOverlay<W> {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut GhostOverlay<W> {
        &mut self.overlay
    }

    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    /// Raw stdin chunk from the user
    pub fn handle_input(&mut self, bytes: &[u8]) -> io::Result<Vec<Effect>> {
        let mut effects = Vec::new();
        for key in split_keys(bytes) {
            self.handle_key(key, &mut effects)?;
        }
        Ok(coalesce(effects))
    }

    fn handle_key(&mut self, key: &[u8], effects: &mut Vec<Effect>) -> io::Result<()> {
        self.hide_ghost()?;

        match KeyKind::classify(key) {
            KeyKind::Interrupt => {
                self.scheduler.invalidate();
                effects.push(Effect::Cancel);
                effects.push(Effect::Forward(key.to_vec()));
            }
            KeyKind::Accept => match self.scheduler.accept() {
                Some(text) => {
                    effects.push(Effect::Cancel);
                    effects.push(Effect::Forward(text.as_bytes().to_vec()));
                    self.line.push(&text);
                    debug!(accepted = %text, line = %self.line.text(), "suggestion accepted");
                }
                None => debug!("nothing to accept"),
            },
            KeyKind::Submit => {
                effects.push(Effect::Forward(key.to_vec()));
                debug!(line = %self.line.text(), "line submitted");
                self.line.reset();
                effects.push(Effect::Arm(self.scheduler.arm()));
            }
            KeyKind::Other => self.type_key(key, effects),
        }
        Ok(())
    }

    fn type_key(&mut self, key: &[u8], effects: &mut Vec<Effect>) {
        effects.push(Effect::Forward(key.to_vec()));
        self.line.push(&String::from_utf8_lossy(key));
        debug!(line = %self.line.text(), cursor = self.line.cursor(), "line updated");
        effects.push(Effect::Arm(self.scheduler.arm()));
    }

    /// Debounce timer expired. Returns the request to send, if still current.
    pub fn handle_debounce(&mut self, token: u64) -> io::Result<Option<CompletionRequest>> {
        if self.scheduler.fire(token).is_none() {
            debug!(token, "superseded debounce timer ignored");
            return Ok(None);
        }
        self.hide_ghost()?;
        self.show_ghost()?;
        Ok(Some(CompletionRequest {
            token,
            scrollback: self.scrollback.contents(),
        }))
    }

    /// Completion finished (or failed). Stale results change nothing.
    pub fn handle_completion(
        &mut self,
        token: u64,
        result: Result<String, CompletionError>,
    ) -> io::Result<()> {
        if !self.scheduler.is_current(token) {
            debug!(token, current = self.scheduler.token(), "stale completion discarded");
            return Ok(());
        }

        self.hide_ghost()?;
        match result {
            Ok(text) => {
                self.scheduler.resolve(token, clean_suggestion(&text));
            }
            Err(e) => {
                warn!(token, error = %e, "completion failed");
                self.scheduler.fail(token);
            }
        }
        self.show_ghost()
    }

    /// Output from the shell: draw it and remember it as context.
    pub fn handle_shell_output(&mut self, bytes: &[u8]) -> io::Result<()> {
        let redraw = self.overlay.is_visible();
        self.hide_ghost()?;
        self.overlay.write_through(bytes)?;
        let text = self.decoder.decode(bytes);
        self.scrollback.push(&text);
        if redraw {
            self.show_ghost()?;
        }
        Ok(())
    }

    fn hide_ghost(&mut self) -> io::Result<()> {
        self.overlay.clear()?;
        self.scheduler.set_visible(false);
        Ok(())
    }

    fn show_ghost(&mut self) -> io::Result<()> {
        if let Some(text) = self.scheduler.display_text() {
            self.overlay.show(text)?;
            self.scheduler.set_visible(self.overlay.is_visible());
        }
        Ok(())
    }
}

/// Merge adjacent forwards and keep only the last timer instruction.
fn coalesce(effects: Vec<Effect>) -> Vec<Effect> {
    let mut forward: Vec<u8> = Vec::new();
    let mut timer: Option<Effect> = None;
    let mut out = Vec::new();

    for effect in effects {
        match effect {
            Effect::Forward(bytes) => forward.extend_from_slice(&bytes),
            other => timer = Some(other),
        }
    }
    if !forward.is_empty() {
        out.push(Effect::Forward(forward));
    }
    out.extend(timer);
    out
}
