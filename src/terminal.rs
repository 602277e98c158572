//! Host terminal setup: raw mode and size
//!
//! Raw mode must be undone on every exit path. The guard restores on drop and
//! the panic hook restores before the panic message is printed.

use anyhow::{Context, Result};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use portable_pty::PtySize;

/// Restores cooked mode when dropped
pub struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        install_panic_hook();
        Ok(Self { active: true })
    }

    /// Restore now instead of waiting for drop
    pub fn restore(&mut self) {
        if self.active {
            let _ = disable_raw_mode();
            self.active = false;
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        self.restore();
    }
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        default_hook(info);
    }));
}

/// Current terminal size, falling back to 80x24 when stdout is not a tty
pub fn size() -> PtySize {
    let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
    PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}
