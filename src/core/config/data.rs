use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Contents of `config.toml`. Every key is optional; unset keys fall back to
/// environment variables and then to built-in defaults when resolved into a
/// [`ChatConfig`].
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Model identifier sent with every request (e.g., "llama-3.3-70b-versatile")
    pub model: Option<String>,
    /// Base URL of an OpenAI-compatible API, without the endpoint path
    pub base_url: Option<String>,
    /// Static bearer credential
    pub api_key: Option<String>,
    /// Instruction prepended to every request, never stored in history
    pub system_prompt: Option<String>,
    /// Where the conversation transcript is persisted
    pub history_file: Option<PathBuf>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Settings the conversation core runs with. Resolved once at startup and
/// never changed afterwards.
#[derive(Clone, PartialEq)]
pub struct ChatConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: String,
    pub system_prompt: String,
    pub history_path: PathBuf,
    pub timeout: Duration,
}

impl ChatConfig {
    /// Configuration with built-in defaults for everything except the
    /// credential and the history location.
    pub fn new(api_key: impl Into<String>, history_path: impl Into<PathBuf>) -> Self {
        Self {
            model: super::defaults::DEFAULT_MODEL.to_string(),
            base_url: super::defaults::DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            system_prompt: super::defaults::DEFAULT_SYSTEM_PROMPT.to_string(),
            history_path: history_path.into(),
            timeout: Duration::from_secs(super::defaults::DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &mask_secret(&self.api_key))
            .field("system_prompt", &self.system_prompt)
            .field("history_path", &self.history_path)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Hide all but the first four characters of a credential.
pub fn mask_secret(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.local/share/parley/chat_history.json` → `~/.local/share/parley/chat_history.json`
/// - Windows: paths are shown unchanged
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
