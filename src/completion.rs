//! Completion client
//!
//! Sends the terminal context to an OpenAI-compatible Chat Completions
//! endpoint and returns a single-line continuation for the cursor position.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::audit::{AuditLog, CompletionExchange};
use crate::escape;

/// Marks where the suggestion should be inserted
pub const CURSOR_MARKER: &str = "<|CURSOR|>";

const SYSTEM_PROMPT: &str = "You complete the user's terminal session. Reply with ONLY the text \
to insert at the cursor position, marked <|CURSOR|>. Do not repeat what is already typed and \
do not add explanations: only the remaining characters of the current command line.";

#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("response had no choices")]
    EmptyResponse,
}

/// A role-tagged chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self { role: "system".into(), content: content.into() }
    }

    pub fn user(content: &str) -> Self {
        Self { role: "user".into(), content: content.into() }
    }

    pub fn assistant(content: &str) -> Self {
        Self { role: "assistant".into(), content: content.into() }
    }
}

/// Build the request: fixed instruction + filtered scrollback with cursor marker
pub fn build_messages(scrollback: &str) -> Vec<ChatMessage> {
    let context = format!("{}{}", escape::strip(scrollback), CURSOR_MARKER);
    vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(&context)]
}

/// Keep only the first line of a generation
pub fn first_line(text: &str) -> &str {
    text.split(&['\n', '\r'][..]).next().unwrap_or("")
}

/// First line of a generation with escapes and control characters removed,
/// so every char left occupies the cells its width says it does.
pub fn clean_suggestion(text: &str) -> String {
    escape::strip(first_line(text))
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

/// Where completions come from
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, CompletionError>;

    fn model(&self) -> &str;
}

/// Chat Completions over HTTP
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenAiBackend {
    pub fn new(api_base: &str, api_key: &str, model: &str, max_tokens: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            max_tokens,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api_base)
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        if self.api_key.is_empty() {
            return Err(CompletionError::MissingApiKey);
        }

        let request = ChatRequest {
            model: &self.model,
            messages,
            stop: "\n",
            max_tokens: Some(self.max_tokens),
            temperature: Some(0.0),
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status { status, body });
        }

        let data: ChatResponse = response.json().await?;
        data.choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or(CompletionError::EmptyResponse)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Backend + timeout + audit trail
#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
    audit: Option<AuditLog>,
    timeout: Duration,
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, audit: Option<AuditLog>, timeout: Duration) -> Self {
        Self { backend, audit, timeout }
    }

    /// Ask for a continuation of `scrollback` at the cursor.
    pub async fn suggest(&self, scrollback: &str) -> Result<String, CompletionError> {
        let messages = build_messages(scrollback);
        let started = Instant::now();

        let reply = tokio::time::timeout(self.timeout, self.backend.chat(&messages))
            .await
            .map_err(|_| CompletionError::Timeout(self.timeout))??;
        let suggestion = clean_suggestion(&reply);
        let latency_ms = started.elapsed().as_millis() as u64;
        debug!(latency_ms, suggestion = %suggestion, "completion received");

        if let Some(audit) = &self.audit {
            let exchange =
                CompletionExchange::new(self.backend.model(), messages, suggestion.clone(), latency_ms);
            if let Err(e) = audit.record(&exchange) {
                warn!(error = %e, "failed to record completion exchange");
            }
        }

        Ok(suggestion)
    }
}

// ═══════════════════════════════════════════════════════════════
// API Types
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stop: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}
