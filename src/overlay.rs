//! Ghost text drawing
//!
//! `show` writes the suggestion dimmed right after the real cursor; `clear`
//! walks back over exactly the cells `show` wrote with `\b \b`. The overlay
//! also owns the output stream, so shell output and ghost text never
//! interleave behind each other's back.

use std::io::{self, Write};

use crossterm::queue;
use crossterm::style::{Attribute, Print, SetAttribute};
use unicode_width::UnicodeWidthStr;

pub struct GhostOverlay<W: Write> {
    out: W,
    /// Cells written by the last `show`, zero when nothing is drawn
    shown_cells: usize,
}

impl<W: Write> GhostOverlay<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            shown_cells: 0,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.shown_cells > 0
    }

    pub fn shown_cells(&self) -> usize {
        self.shown_cells
    }

    /// Draw `text` dimmed after the cursor. No-op while something is drawn.
    pub fn show(&mut self, text: &str) -> io::Result<()> {
        if self.is_visible() {
            return Ok(());
        }
        let cells = text.width();
        if cells == 0 {
            return Ok(());
        }
        queue!(
            self.out,
            SetAttribute(Attribute::Dim),
            Print(text),
            SetAttribute(Attribute::NormalIntensity)
        )?;
        self.out.flush()?;
        self.shown_cells = cells;
        Ok(())
    }

    /// Erase what `show` drew. Safe to call when nothing is drawn.
    pub fn clear(&mut self) -> io::Result<()> {
        if !self.is_visible() {
            return Ok(());
        }
        self.out.write_all("\u{8} \u{8}".repeat(self.shown_cells).as_bytes())?;
        self.out.flush()?;
        self.shown_cells = 0;
        Ok(())
    }

    /// Pass shell output straight through.
    pub fn write_through(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.out.write_all(bytes)?;
        self.out.flush()
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn erase_count(bytes: &[u8]) -> usize {
        String::from_utf8_lossy(bytes).matches("\u{8} \u{8}").count()
    }

    #[test]
    fn test_show_writes_dimmed_text() {
        let mut overlay = GhostOverlay::new(Vec::new());
        overlay.show("ho hi").unwrap();

        let out = String::from_utf8(overlay.get_ref().clone()).unwrap();
        assert!(out.contains("ho hi"));
        assert!(out.contains("\x1b[2m"));
        assert_eq!(overlay.shown_cells(), 5);
    }

    #[test]
    fn test_clear_erases_exactly_what_was_shown() {
        let mut overlay = GhostOverlay::new(Vec::new());
        overlay.show("status").unwrap();
        overlay.get_mut().clear();

        overlay.clear().unwrap();
        assert_eq!(erase_count(overlay.get_ref()), 6);
        assert!(!overlay.is_visible());
    }

    #[test]
    fn test_clear_when_hidden_is_noop() {
        let mut overlay = GhostOverlay::new(Vec::new());
        overlay.clear().unwrap();
        overlay.clear().unwrap();
        assert!(overlay.get_ref().is_empty());
    }

    #[test]
    fn test_show_twice_draws_once() {
        let mut overlay = GhostOverlay::new(Vec::new());
        overlay.show("abc").unwrap();
        overlay.show("abcdef").unwrap();
        overlay.get_mut().clear();

        overlay.clear().unwrap();
        assert_eq!(erase_count(overlay.get_ref()), 3);
    }

    #[test]
    fn test_wide_chars_measured_in_cells() {
        let mut overlay = GhostOverlay::new(Vec::new());
        overlay.show("日本").unwrap();
        assert_eq!(overlay.shown_cells(), 4);
    }

    #[test]
    fn test_empty_text_is_not_shown() {
        let mut overlay = GhostOverlay::new(Vec::new());
        overlay.show("").unwrap();
        assert!(!overlay.is_visible());
        assert!(overlay.get_ref().is_empty());
    }
}
