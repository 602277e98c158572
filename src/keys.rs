//! Raw stdin decoding
//!
//! In raw mode a single read can hold several keys (paste, key repeat).
//! `split_keys` cuts a chunk into key units so each one goes through the
//! dispatcher on its own; `KeyKind` says which dispatcher branch it takes.

const ESC: u8 = 0x1b;
const CTRL_C: u8 = 0x03;

/// What a key means to the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Ctrl-C: forwarded untouched, line left alone
    Interrupt,
    /// Tab: take the ghost suggestion
    Accept,
    /// Return / Enter: command submitted
    Submit,
    /// Everything else is typed into the line
    Other,
}

impl KeyKind {
    pub fn classify(key: &[u8]) -> Self {
        match key {
            [CTRL_C] => KeyKind::Interrupt,
            b"\t" => KeyKind::Accept,
            b"\r" | b"\n" | b"\r\n" => KeyKind::Submit,
            _ => KeyKind::Other,
        }
    }
}

/// Split a raw chunk into key units.
pub fn split_keys(bytes: &[u8]) -> Vec<&[u8]> {
    let mut keys = Vec::new();
    let mut rest = bytes;
    while !rest.is_empty() {
        let len = key_len(rest);
        let (key, tail) = rest.split_at(len);
        keys.push(key);
        rest = tail;
    }
    keys
}

fn key_len(bytes: &[u8]) -> usize {
    let len = match bytes[0] {
        ESC => escape_len(bytes),
        b'\r' if bytes.get(1) == Some(&b'\n') => 2,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => 1,
    };
    len.min(bytes.len())
}

fn escape_len(bytes: &[u8]) -> usize {
    match bytes.get(1) {
        // CSI: parameters then a final byte in 0x40..=0x7e
        Some(b'[') => bytes[2..]
            .iter()
            .position(|b| (0x40..=0x7e).contains(b))
            .map(|pos| pos + 3)
            .unwrap_or(bytes.len()),
        // SS3: function keys / application cursor mode
        Some(b'O') => 3,
        // Alt-chord
        Some(_) => 2,
        None => 1,
    }
}
