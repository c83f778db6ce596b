//! The conversation core: owns the transcript, replays it to the completion
//! endpoint on every exchange, and keeps the on-disk copy in step.
//!
//! Every API-level failure is rendered into a plain reply string so callers
//! have a single path for displaying results. The fixed literals are exported
//! so a caller can still recognise a failed exchange.
//!
//! The core does no locking. Only one exchange may be in flight at a time and
//! enforcing that is up to the caller, which is also responsible for trimming
//! and rejecting empty input before calling [`ConversationCore::send_message`].

use std::error::Error as StdError;
use std::fmt;
use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tracing::{debug, error, info, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::api::{endpoint_url, ChatMessage, ChatRequest, ChatResponse, CHAT_COMPLETIONS_ENDPOINT};
use crate::core::config::ChatConfig;
use crate::core::history::{ConversationHistory, HistoryStore};
use crate::core::log_sink::LogSink;
use crate::core::message::Message;

/// Sampling temperature sent with every request.
pub const TEMPERATURE: f32 = 0.7;

pub const AUTH_ERROR_REPLY: &str = "Error: Invalid API Key.";
pub const RATE_LIMIT_REPLY: &str = "Error: Rate limit exceeded.";
pub const CONNECTION_ERROR_PREFIX: &str = "Error connecting to API:";

/// Number of grapheme clusters of the outgoing text shown in the activity log.
const PREVIEW_GRAPHEMES: usize = 40;

/// Whether `reply` is one of the fixed failure renderings rather than model
/// output. A model that happens to answer with the same text is
/// indistinguishable.
pub fn is_error_reply(reply: &str) -> bool {
    reply == AUTH_ERROR_REPLY
        || reply == RATE_LIMIT_REPLY
        || reply.starts_with(CONNECTION_ERROR_PREFIX)
}

/// Why an exchange did not produce an assistant reply.
#[derive(Debug)]
pub enum ExchangeError {
    /// HTTP 401.
    Unauthorized,
    /// HTTP 429.
    RateLimited,
    /// No response within the configured timeout.
    Timeout(Duration),
    /// Connection, DNS or TLS failure.
    Network(reqwest::Error),
    /// Any other non-success status.
    Status { status: StatusCode, body: String },
    /// A success status whose body has no `choices[0].message.content`.
    MalformedResponse(String),
}

impl ExchangeError {
    /// The string handed back to the caller in place of a model reply.
    pub fn reply_text(&self) -> String {
        match self {
            ExchangeError::Unauthorized => AUTH_ERROR_REPLY.to_string(),
            ExchangeError::RateLimited => RATE_LIMIT_REPLY.to_string(),
            other => format!("{CONNECTION_ERROR_PREFIX} {other}"),
        }
    }
}

impl fmt::Display for ExchangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExchangeError::Unauthorized => write!(f, "invalid API key (HTTP 401)"),
            ExchangeError::RateLimited => write!(f, "rate limit exceeded (HTTP 429)"),
            ExchangeError::Timeout(limit) => {
                write!(f, "request timed out after {}s", limit.as_secs_f32())
            }
            ExchangeError::Network(err) => write!(f, "{}", describe_error_chain(err)),
            ExchangeError::Status { status, body } => match summarize_error_body(body) {
                Some(summary) => write!(f, "HTTP {status}: {summary}"),
                None => write!(f, "HTTP {status}"),
            },
            ExchangeError::MalformedResponse(detail) => {
                write!(f, "unexpected response from API: {detail}")
            }
        }
    }
}

impl StdError for ExchangeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ExchangeError::Network(err) => Some(err),
            _ => None,
        }
    }
}

/// `reqwest` keeps the useful part of a connection failure (refused, DNS,
/// certificate) in the source chain rather than in its own message.
fn describe_error_chain(err: &dyn StdError) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !parts.iter().any(|part| part.contains(&text)) {
            parts.push(text);
        }
        source = inner.source();
    }
    parts.join(": ")
}

/// Pull a one-line message out of an error body such as
/// `{"error":{"message":"..."}}`. Non-JSON bodies are returned trimmed.
fn summarize_error_body(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(collapse_whitespace(trimmed));
    };

    value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("error").and_then(|v| v.as_str()))
        .or_else(|| value.get("message").and_then(|v| v.as_str()))
        .map(collapse_whitespace)
        .filter(|summary| !summary.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Single-line preview of outgoing text for the activity log.
fn preview(text: &str) -> String {
    let flattened = collapse_whitespace(text);
    let mut graphemes = flattened.graphemes(true);
    let head: String = graphemes.by_ref().take(PREVIEW_GRAPHEMES).collect();
    if graphemes.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

pub struct ConversationCore {
    config: ChatConfig,
    client: reqwest::Client,
    history: ConversationHistory,
    store: HistoryStore,
}

impl ConversationCore {
    /// Build the core and load any persisted history.
    pub fn new(config: ChatConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(config, client))
    }

    /// Like [`ConversationCore::new`] but with a caller-built HTTP client. The
    /// client is expected to enforce `config.timeout` itself.
    pub fn with_client(config: ChatConfig, client: reqwest::Client) -> Self {
        let store = HistoryStore::new(config.history_path.clone());
        let mut core = Self {
            config,
            client,
            history: ConversationHistory::new(),
            store,
        };
        core.load_history();
        core
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Replace the in-memory history with the persisted one. A missing or
    /// unreadable file yields an empty history and is never reported to the
    /// caller.
    pub fn load_history(&mut self) {
        self.history = match self.store.read() {
            Ok(history) => {
                debug!(
                    messages = history.len(),
                    path = %self.store.path().display(),
                    "Loaded conversation history"
                );
                history
            }
            Err(err) => {
                warn!("Starting with empty history: {err}");
                ConversationHistory::new()
            }
        };
    }

    /// Persist the full history. Failures go to diagnostic output only.
    pub fn save_history(&self) {
        match self.store.write(&self.history) {
            Ok(()) => debug!(messages = self.history.len(), "Saved conversation history"),
            Err(err) => error!("{err}"),
        }
    }

    /// Forget every turn and delete the persisted file. Safe to call
    /// repeatedly.
    pub fn clear_history(&mut self) {
        self.history.clear();
        if let Err(err) = self.store.remove() {
            error!("{err}");
        }
        info!("Conversation history cleared");
    }

    /// Message list for the next request: the system prompt followed by every
    /// stored turn, oldest first.
    pub fn build_request_messages(&self) -> Vec<ChatMessage> {
        std::iter::once(ChatMessage::from(&Message::system(
            self.config.system_prompt.as_str(),
        )))
        .chain(self.history.iter().map(ChatMessage::from))
        .collect()
    }

    /// Run one exchange and return the text to show as the assistant's turn.
    ///
    /// The user turn is recorded before the request goes out and stays in the
    /// history whatever happens next. On success the reply is appended and the
    /// history is saved; on failure the returned string is one of the fixed
    /// error renderings and nothing else changes.
    ///
    /// `sink` always receives a `>>> Sending request: ...` line, followed by
    /// either `<<< Response received (N.Ns)` or `[ERROR] <detail>`. The error
    /// line is written for every failure, including 401 and 429, where the
    /// returned reply is still the bare fixed literal.
    pub async fn send_message<S>(&mut self, user_text: &str, sink: &S) -> String
    where
        S: LogSink + ?Sized,
    {
        self.history.push_user(user_text);
        let messages = self.build_request_messages();

        sink.write_line(&format!(">>> Sending request: {}", preview(user_text)));
        let started = Instant::now();
        let outcome = self.request_completion(messages).await;
        let elapsed = started.elapsed().as_secs_f64();

        match outcome {
            Ok(reply) => {
                self.history.push_assistant(reply.as_str());
                self.save_history();
                sink.write_line(&format!("<<< Response received ({elapsed:.1}s)"));
                reply
            }
            Err(err) => {
                warn!(elapsed_secs = elapsed, "Exchange failed: {err}");
                sink.write_line(&format!("[ERROR] {err}"));
                err.reply_text()
            }
        }
    }

    async fn request_completion(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<String, ExchangeError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: TEMPERATURE,
        };
        let url = endpoint_url(&self.config.base_url, CHAT_COMPLETIONS_ENDPOINT);
        debug!(%url, messages = request.messages.len(), "Posting chat completion");

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => return Err(ExchangeError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => return Err(ExchangeError::RateLimited),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(ExchangeError::Status { status, body });
            }
            _ => {}
        }

        let body = response.text().await.map_err(|err| self.classify(err))?;
        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|err| ExchangeError::MalformedResponse(err.to_string()))?;
        parsed
            .first_content()
            .map(str::to_owned)
            .ok_or_else(|| {
                ExchangeError::MalformedResponse(
                    "no choices[0].message.content in response".to_string(),
                )
            })
    }

    fn classify(&self, err: reqwest::Error) -> ExchangeError {
        if err.is_timeout() {
            ExchangeError::Timeout(self.config.timeout)
        } else {
            ExchangeError::Network(err)
        }
    }
}
