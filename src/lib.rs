//! ghostshell - inline AI completions for an interactive shell
//!
//! Runs your shell on a pty, reconstructs the command line from keystrokes,
//! and shows a dimmed suggestion after the cursor that Tab accepts.

pub mod app;
pub mod audit;
pub mod completion;
pub mod config;
pub mod escape;
pub mod keys;
pub mod line;
pub mod logging;
pub mod overlay;
pub mod pty;
pub mod scheduler;
pub mod scrollback;
pub mod session;
pub mod terminal;
