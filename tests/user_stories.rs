//! User Story Integration Tests
//!
//! These tests trace complete user workflows with logging to verify
//! the system behaves correctly from the user's perspective.
//!
//! Each test drives a `Session` the way the runtime does: keystrokes in,
//! effects out, timers and completions delivered as separate events.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ghostshell::audit::AuditLog;
use ghostshell::completion::{ChatMessage, CompletionBackend, CompletionClient, CompletionError};
use ghostshell::scheduler::{Debouncer, SuggestionPhase};
use ghostshell::session::{Effect, Session};
use tokio::sync::mpsc;

/// Test helper to capture and display trace logs
struct TestTracer {
    name: String,
    logs: Vec<String>,
}

impl TestTracer {
    fn new(name: &str) -> Self {
        eprintln!("\n╔═══════════════════════════════════════════════════════════════");
        eprintln!("║ USER STORY: {}", name);
        eprintln!("╚═══════════════════════════════════════════════════════════════\n");
        Self {
            name: name.to_string(),
            logs: vec![],
        }
    }

    fn step(&mut self, description: &str) {
        let msg = format!("  → {}", description);
        eprintln!("{}", msg);
        self.logs.push(msg);
    }

    fn expect(&mut self, condition: bool, description: &str) {
        let status = if condition { "✓" } else { "✗" };
        let msg = format!("    {} {}", status, description);
        eprintln!("{}", msg);
        self.logs.push(msg);
        assert!(condition, "FAILED: {}", description);
    }

    fn done(&self) {
        eprintln!("\n  ══════════════════════════════════════════════════════");
        eprintln!("  ✓ Story completed: {} ({} steps)", self.name, self.logs.len());
        eprintln!();
    }
}

fn forwarded(effects: &[Effect]) -> Vec<u8> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::Forward(bytes) => Some(bytes.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

fn armed(effects: &[Effect]) -> Option<u64> {
    effects.iter().find_map(|e| match e {
        Effect::Arm(token) => Some(*token),
        _ => None,
    })
}

/// Replies with canned text after an optional delay
struct ScriptedBackend {
    reply: &'static str,
    delay: Duration,
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn chat(&self, _messages: &[ChatMessage]) -> Result<String, CompletionError> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.to_string())
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

// ═══════════════════════════════════════════════════════════════
// STORY: Type, get a suggestion, accept it, submit
// ═══════════════════════════════════════════════════════════════

#[tokio::test]
async fn story_accept_suggestion_then_submit() {
    let mut t = TestTracer::new("Accept a ghost suggestion with Tab, then submit");
    let tmp = tempfile::tempdir().unwrap();
    let audit = AuditLog::open(tmp.path()).unwrap();
    let client = CompletionClient::new(
        Arc::new(ScriptedBackend { reply: "ho hi", delay: Duration::ZERO }),
        Some(audit.clone()),
        Duration::from_secs(5),
    );
    let mut session = Session::new(Vec::new(), 8000);

    t.step("Given the shell printed a prompt");
    session.handle_shell_output(b"\x1b[?2004h\x1b[01;32muser\x1b[00m:~$ ").unwrap();

    t.step("When the user types \"ec\"");
    let effects = session.handle_input(b"ec").unwrap();
    t.expect(forwarded(&effects) == b"ec", "keystrokes forwarded to the shell");
    t.expect(session.line() == "ec", "logical line is \"ec\"");
    let token = armed(&effects);
    t.expect(token.is_some(), "debounce timer armed");
    session.handle_shell_output(b"ec").unwrap();

    t.step("And the debounce timer fires");
    let request = session.handle_debounce(token.unwrap()).unwrap();
    t.expect(request.is_some(), "a completion is requested");
    t.expect(session.suggestion().phase == SuggestionPhase::Pending, "placeholder pending");

    t.step("And the service answers \"ho hi\"");
    let request = request.unwrap();
    let result = client.suggest(&request.scrollback).await;
    session.handle_completion(request.token, result).unwrap();
    t.expect(session.suggestion().text == "ho hi", "suggestion is \"ho hi\"");
    t.expect(session.overlay().shown_cells() == 5, "five ghost cells drawn");

    let records = audit.list().unwrap();
    t.expect(records.len() == 1, "exchange recorded");
    t.expect(
        records[0].messages[1].content == "user:~$ ec<|CURSOR|>",
        "context is filtered scrollback plus cursor marker",
    );

    t.step("When the user presses Tab");
    let effects = session.handle_input(b"\t").unwrap();
    t.expect(forwarded(&effects) == b"ho hi", "suggestion text sent instead of Tab");
    t.expect(armed(&effects).is_none(), "acceptance does not re-arm");
    t.expect(session.line() == "echo hi", "logical line is \"echo hi\"");
    t.expect(!session.overlay().is_visible(), "ghost cleared");

    t.step("When the user presses Return");
    let effects = session.handle_input(b"\r").unwrap();
    t.expect(forwarded(&effects) == b"\r", "Return forwarded");
    t.expect(session.line().is_empty(), "logical line reset");
    t.expect(armed(&effects).is_some(), "scheduler re-armed for the next command");

    t.done();
}

// ═══════════════════════════════════════════════════════════════
// STORY: A slow answer loses to a newer one
// ═══════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn story_slow_response_never_overwrites_newer_one() {
    let mut t = TestTracer::new("Late response is discarded");
    let slow = CompletionClient::new(
        Arc::new(ScriptedBackend { reply: "it status", delay: Duration::from_secs(3) }),
        None,
        Duration::from_secs(10),
    );
    let fast = CompletionClient::new(
        Arc::new(ScriptedBackend { reply: "it", delay: Duration::ZERO }),
        None,
        Duration::from_secs(10),
    );
    let mut session = Session::new(Vec::new(), 8000);

    t.step("Given a request went out after typing \"g\"");
    let first = armed(&session.handle_input(b"g").unwrap()).unwrap();
    let first_request = session.handle_debounce(first).unwrap().unwrap();
    let pending = tokio::spawn({
        let slow = slow.clone();
        async move { slow.suggest(&first_request.scrollback).await }
    });

    t.step("When the user types \"i\" and a second request completes first");
    let second = armed(&session.handle_input(b"i").unwrap()).unwrap();
    let second_request = session.handle_debounce(second).unwrap().unwrap();
    let result = fast.suggest(&second_request.scrollback).await;
    session.handle_completion(second, result).unwrap();
    t.expect(session.suggestion().text == "it", "fresh suggestion shown");
    let state = session.suggestion().clone();
    let written = session.overlay().get_ref().len();

    t.step("And the first response finally arrives");
    let late = pending.await.unwrap();
    t.expect(late.as_deref().ok() == Some("it status"), "slow backend did answer");
    session.handle_completion(first, late).unwrap();

    t.expect(session.suggestion() == &state, "suggestion state untouched");
    t.expect(session.line() == "gi", "logical line untouched");
    t.expect(session.overlay().get_ref().len() == written, "nothing drawn");

    t.done();
}

// ═══════════════════════════════════════════════════════════════
// STORY: Typing fast only asks once
// ═══════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn story_typing_burst_triggers_one_request() {
    let mut t = TestTracer::new("Debounce collapses a burst of keys");
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut debouncer = Debouncer::new(Duration::from_millis(500), tx, |token| token);
    let mut session = Session::new(Vec::new(), 8000);

    t.step("When the user types \"cargo\" with 100ms between keys");
    for key in ["c", "a", "r", "g", "o"] {
        for effect in session.handle_input(key.as_bytes()).unwrap() {
            match effect {
                Effect::Arm(token) => debouncer.arm(token),
                Effect::Cancel => debouncer.cancel(),
                Effect::Forward(_) => {}
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    t.step("And then pauses");
    tokio::time::sleep(Duration::from_secs(1)).await;

    let mut requests = 0;
    while let Ok(token) = rx.try_recv() {
        if session.handle_debounce(token).unwrap().is_some() {
            requests += 1;
        }
    }
    t.expect(requests == 1, "exactly one completion requested");
    t.expect(session.line() == "cargo", "logical line is \"cargo\"");

    t.done();
}

// ═══════════════════════════════════════════════════════════════
// STORY: Editing keys reshape the logical line
// ═══════════════════════════════════════════════════════════════

#[test]
fn story_delete_and_interrupt() {
    let mut t = TestTracer::new("Delete edits the logical line, Ctrl-C leaves it alone");
    let mut session = Session::new(Vec::new(), 8000);

    t.step("When the user types \"lss\" and presses backspace (DEL)");
    session.handle_input(b"lss\x7f").unwrap();
    t.expect(session.line() == "ls", "line is \"ls\"");

    t.step("When the user keeps typing \"ab\"");
    session.handle_input(b"ab").unwrap();
    t.expect(session.line() == "lsab", "line is \"lsab\"");

    t.step("And Ctrl-C is pressed");
    let effects = session.handle_input(&[0x03]).unwrap();
    t.expect(forwarded(&effects) == [0x03], "interrupt forwarded untouched");
    t.expect(session.line() == "lsab", "line untouched by interrupt");

    t.done();
}
