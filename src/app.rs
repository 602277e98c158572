//! Runtime event loop
//!
//! Three sources feed one channel: stdin, the shell, and our own timers and
//! completion tasks. A single task drains it and hands each event to the
//! `Session`, so handlers never overlap and no state needs a lock.

use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use crate::completion::{CompletionClient, CompletionError};
use crate::pty::ShellProcess;
use crate::scheduler::Debouncer;
use crate::session::{Effect, Session};
use crate::terminal;

#[derive(Debug)]
pub enum Event {
    /// Raw bytes typed by the user
    Input(Vec<u8>),
    /// Raw bytes printed by the shell
    ShellOutput(Vec<u8>),
    /// Shell is gone; carries its exit code
    ShellExited(i32),
    /// Debounce timer for this token expired
    DebounceElapsed(u64),
    /// Completion task finished
    Completion {
        token: u64,
        result: Result<String, CompletionError>,
    },
    /// Host terminal changed size
    Resize,
}

/// Everything the loop needs besides the session itself
pub struct Runtime {
    pub shell: String,
    pub debounce: Duration,
    pub scrollback_chars: usize,
    pub client: CompletionClient,
}

impl Runtime {
    /// Run until the shell exits; returns its exit code.
    ///
    /// Expects the terminal to already be in raw mode.
    pub async fn run(self) -> Result<i32> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut shell = ShellProcess::spawn(&self.shell, terminal::size(), tx.clone())?;
        spawn_stdin_reader(tx.clone())?;
        spawn_resize_watcher(tx.clone())?;

        let session = Session::new(io::stdout(), self.scrollback_chars);
        let debouncer = Debouncer::new(self.debounce, tx.clone(), Event::DebounceElapsed);

        let code = event_loop(rx, tx, session, debouncer, &mut shell, &self.client).await?;
        info!(code, "shell exited");
        Ok(code)
    }
}

async fn event_loop<W: Write>(
    mut rx: UnboundedReceiver<Event>,
    tx: UnboundedSender<Event>,
    mut session: Session<W>,
    mut debouncer: Debouncer<Event>,
    shell: &mut ShellProcess,
    client: &CompletionClient,
) -> Result<i32> {
    while let Some(event) = rx.recv().await {
        match event {
            Event::Input(bytes) => {
                for effect in session.handle_input(&bytes)? {
                    match effect {
                        Effect::Forward(data) => shell.write(&data)?,
                        Effect::Arm(token) => debouncer.arm(token),
                        Effect::Cancel => debouncer.cancel(),
                    }
                }
            }
            Event::ShellOutput(bytes) => session.handle_shell_output(&bytes)?,
            Event::DebounceElapsed(token) => {
                if let Some(request) = session.handle_debounce(token)? {
                    debug!(token, "requesting completion");
                    let client = client.clone();
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let result = client.suggest(&request.scrollback).await;
                        let _ = tx.send(Event::Completion {
                            token: request.token,
                            result,
                        });
                    });
                }
            }
            Event::Completion { token, result } => session.handle_completion(token, result)?,
            Event::Resize => shell.resize(terminal::size())?,
            Event::ShellExited(code) => return Ok(code),
        }
    }
    anyhow::bail!("event channel closed before the shell exited")
}

fn spawn_stdin_reader(tx: UnboundedSender<Event>) -> Result<()> {
    thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            let mut stdin = io::stdin().lock();
            let mut buf = [0u8; 1024];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(Event::Input(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("stdin closed");
        })
        .context("Failed to start stdin reader thread")?;
    Ok(())
}

fn spawn_resize_watcher(tx: UnboundedSender<Event>) -> Result<()> {
    let mut winch = signal(SignalKind::window_change()).context("Failed to watch SIGWINCH")?;
    tokio::spawn(async move {
        while winch.recv().await.is_some() {
            if tx.send(Event::Resize).is_err() {
                break;
            }
        }
    });
    Ok(())
}
