//! Strip terminal control sequences from shell output
//!
//! Turns raw pty output into plain text that can be embedded in a prompt.
//! Passes run in a fixed order; every pattern needs an ESC or a control byte,
//! and the last pass removes all of those, so the output is a fixed point.

use once_cell::sync::Lazy;
use regex::Regex;

/// Bracketed-paste style private mode set, e.g. `ESC [ ? 2004 h`
static MODE_SET: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[\?[0-9]+h").expect("valid regex"));

/// CSI sequences: colors, cursor movement, erase
static CSI: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[a-zA-Z]").expect("valid regex"));

/// OSC sequences ended by BEL or by ST (`ESC \`), e.g. window titles and cwd reports
static OSC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)").expect("valid regex"));

/// Everything non-printable except newline
static CONTROL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x09\x0B-\x1F\x7F]").expect("valid regex"));

/// Remove escape sequences and control bytes, keeping newlines.
pub fn strip(input: &str) -> String {
    let out = MODE_SET.replace_all(input, "");
    let out = CSI.replace_all(&out, "");
    let out = OSC.replace_all(&out, "");
    CONTROL.replace_all(&out, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        let text = "user@host:~$ ls\nCargo.toml  src\n";
        assert_eq!(strip(text), text);
    }

    #[test]
    fn test_strips_prompt_decorations() {
        let raw = "\x1b[?2004h\x1b]0;user@host: ~\x07\x1b[01;32muser@host\x1b[00m:~$ ";
        assert_eq!(strip(raw), "user@host:~$ ");
    }

    #[test]
    fn test_strips_st_terminated_osc() {
        let raw = "\x1b]7;file://host/home/user\x1b\\$ ";
        assert_eq!(strip(raw), "$ ");
    }

    #[test]
    fn test_strips_control_bytes_but_keeps_newline() {
        let raw = "a\tb\r\nc\x08\x7fd\x07";
        assert_eq!(strip(raw), "ab\ncd");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "plain",
            "\x1b\x1b[0m[0m",
            "\x1b[31mred\x1b[0m\r\n",
            "\x1b]0;title",
            "\x1b[?25l\x1b[?2004h$ \x1b[K",
            "tab\there\x1b",
        ];
        for s in samples {
            let once = strip(s);
            assert_eq!(strip(&once), once, "not idempotent for {:?}", s);
        }
    }
}
