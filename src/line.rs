//! Logical command-line reconstruction
//!
//! The shell owns the real edit buffer; we only see the bytes the user sends
//! it. `LineBuffer` keeps the raw input since the last submit and replays it
//! from scratch to get the line as the user currently sees it:
//!
//! - `\n` ends the line, anything after it is ignored
//! - `\b` moves the cursor left without deleting
//! - DEL (0x7f) deletes the character before the cursor
//! - `\r` returns the cursor to the start (prompt redraw)
//! - anything else is written at the cursor (overwrite inside, append at end)

/// Delete code sent by the backspace key in raw mode
pub const DEL: char = '\u{7f}';

/// Result of replaying input: the line and the cursor offset (in chars)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineState {
    pub text: String,
    pub cursor: usize,
}

impl LineState {
    /// Apply one input character. The cursor always stays in `0..=len`.
    pub fn step(&mut self, ch: char) {
        let mut chars: Vec<char> = self.text.chars().collect();
        match ch {
            '\u{8}' => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            DEL => {
                if self.cursor > 0 {
                    chars.remove(self.cursor - 1);
                    self.cursor -= 1;
                }
            }
            '\r' => {
                self.cursor = 0;
            }
            _ => {
                if self.cursor < chars.len() {
                    chars[self.cursor] = ch;
                } else {
                    chars.push(ch);
                }
                self.cursor += 1;
            }
        }
        self.text = chars.into_iter().collect();
    }

    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Replay raw input from an empty line.
pub fn replay(input: &str) -> LineState {
    let mut state = LineState::default();
    for ch in input.chars() {
        if ch == '\n' {
            break;
        }
        state.step(ch);
    }
    state
}

/// Raw input accumulated since the last submit.
///
/// Replay cost is linear in the history, which stays at command-line length.
#[derive(Debug, Default)]
pub struct LineBuffer {
    history: String,
    current: LineState,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append typed (or accepted) input and recompute the line.
    pub fn push(&mut self, input: &str) {
        self.history.push_str(input);
        self.current = replay(&self.history);
    }

    /// Forget everything, e.g. after the command is submitted.
    pub fn reset(&mut self) {
        self.history.clear();
        self.current = LineState::default();
    }

    pub fn text(&self) -> &str {
        &self.current.text
    }

    pub fn cursor(&self) -> usize {
        self.current.cursor
    }

    pub fn state(&self) -> &LineState {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_typing_appends() {
        let state = replay("ls -la");
        assert_eq!(state.text, "ls -la");
        assert_eq!(state.cursor, 6);
    }

    #[test]
    fn test_delete_removes_before_cursor() {
        let state = replay("abc\u{7f}");
        assert_eq!(state.text, "ab");
        assert_eq!(state.cursor, 2);
    }

    #[test]
    fn test_carriage_return_overwrites_from_start() {
        let state = replay("ab\rX");
        assert_eq!(state.text, "Xb");
        assert_eq!(state.cursor, 1);
    }

    #[test]
    fn test_backspace_moves_without_deleting() {
        let state = replay("abc\u{8}\u{8}");
        assert_eq!(state.text, "abc");
        assert_eq!(state.cursor, 1);

        // move left then delete: removes the character before the new cursor
        let state = replay("abc\u{8}\u{7f}");
        assert_eq!(state.text, "ac");
        assert_eq!(state.cursor, 1);
    }

    #[test]
    fn test_newline_ends_replay() {
        let state = replay("echo hi\nrm -rf");
        assert_eq!(state.text, "echo hi");
    }

    #[test]
    fn test_delete_and_backspace_at_start_clamp() {
        let state = replay("\u{7f}\u{7f}\u{8}a");
        assert_eq!(state.text, "a");
        assert_eq!(state.cursor, 1);
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let alphabet = ['a', 'b', '\u{8}', '\u{7f}', '\r', 'é'];
        // every sequence of length 5 over the alphabet
        let n = alphabet.len();
        for mut code in 0..n.pow(5) {
            let mut state = LineState::default();
            for _ in 0..5 {
                state.step(alphabet[code % n]);
                code /= n;
                assert!(state.cursor <= state.len(), "cursor out of range: {:?}", state);
            }
        }
    }

    #[test]
    fn test_line_buffer_replays_full_history() {
        let mut line = LineBuffer::new();
        line.push("gti");
        line.push("\u{8}\u{8}");
        // "g|ti" -> overwrite 't' with 'i', then 'i' with 't'
        line.push("it");
        assert_eq!(line.text(), "git");
        assert_eq!(line.cursor(), 3);

        line.reset();
        assert_eq!(line.text(), "");
        assert_eq!(line.cursor(), 0);
    }
}
