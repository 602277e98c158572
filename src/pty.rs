//! Shell process on a pseudo-terminal
//!
//! The shell runs as a login shell in the current directory with our
//! environment. A reader thread forwards its output as events; when the pty
//! reaches EOF the same thread reaps the child and reports the exit code, so
//! the exit event always comes after the last output.

use std::io::{Read, Write};
use std::thread;

use anyhow::{Context, Result};
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::app::Event;

pub struct ShellProcess {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
}

impl ShellProcess {
    /// Spawn `shell -l` sized to `size`, streaming output into `events`.
    pub fn spawn(shell: &str, size: PtySize, events: UnboundedSender<Event>) -> Result<Self> {
        let pty_system = native_pty_system();
        let pair = pty_system.openpty(size).context("Failed to open pty")?;

        let mut cmd = CommandBuilder::new(shell);
        cmd.arg("-l");
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .with_context(|| format!("Failed to spawn {}", shell))?;
        let pid = child.process_id();
        // EOF on the master only arrives once every slave handle is closed
        drop(pair.slave);

        let reader = pair.master.try_clone_reader().context("Failed to clone pty reader")?;
        let writer = pair.master.take_writer().context("Failed to take pty writer")?;

        info!(shell, ?pid, rows = size.rows, cols = size.cols, "shell started");

        thread::Builder::new()
            .name("pty-reader".into())
            .spawn(move || pump_output(reader, child, events))
            .context("Failed to start pty reader thread")?;

        Ok(Self {
            master: pair.master,
            writer,
        })
    }

    /// Forward bytes to the shell's stdin
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn resize(&self, size: PtySize) -> Result<()> {
        self.master.resize(size).context("Failed to resize pty")?;
        debug!(rows = size.rows, cols = size.cols, "pty resized");
        Ok(())
    }
}

fn pump_output(
    mut reader: Box<dyn Read + Send>,
    mut child: Box<dyn Child + Send + Sync>,
    events: UnboundedSender<Event>,
) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if events.send(Event::ShellOutput(buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            // EIO is how Linux reports a closed slave
            Err(e) => {
                debug!(error = %e, "pty read ended");
                break;
            }
        }
    }

    let code = match child.wait() {
        Ok(status) => status.exit_code() as i32,
        Err(e) => {
            warn!(error = %e, "failed to wait for shell");
            1
        }
    };
    let _ = events.send(Event::ShellExited(code));
}

/// Incremental UTF-8 decoding across read boundaries
///
/// A multi-byte character can be split between two pty reads; the tail is
/// carried over instead of being replaced with U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        let mut rest: &[u8] = &self.pending;

        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // valid_up_to always lands on a char boundary
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                        // incomplete sequence at the end: wait for more
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }

        self.pending = rest.to_vec();
        out
    }
}
