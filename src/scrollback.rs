//! Trailing window of shell output
//!
//! Keeps the most recent `max_chars` characters of whatever the shell printed,
//! escape sequences included. Filtering happens when the context is read, so
//! the window always reflects what the pty actually sent.

use std::collections::VecDeque;

/// Default window size in characters
pub const DEFAULT_SCROLLBACK_CHARS: usize = 8000;

/// Ring buffer of output characters
#[derive(Debug)]
pub struct Scrollback {
    chars: VecDeque<char>,
    max_chars: usize,
}

impl Scrollback {
    pub fn new(max_chars: usize) -> Self {
        Self {
            chars: VecDeque::with_capacity(max_chars),
            max_chars,
        }
    }

    /// Append output, dropping the oldest characters past the limit.
    pub fn push(&mut self, text: &str) {
        if self.max_chars == 0 {
            return;
        }
        for ch in text.chars() {
            if self.chars.len() == self.max_chars {
                self.chars.pop_front();
            }
            self.chars.push_back(ch);
        }
    }

    /// Current window as a string
    pub fn contents(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_chars
    }
}

impl Default for Scrollback {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLLBACK_CHARS)
    }
}
