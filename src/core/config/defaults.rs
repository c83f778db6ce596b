use crate::core::config::data::{ChatConfig, Config};
use crate::core::config::io::ConfigError;
use directories::ProjectDirs;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
pub const DEFAULT_TIMEOUT_SECS: u64 = 45;
pub const HISTORY_FILE_NAME: &str = "chat_history.json";

pub const ENV_API_KEY: &str = "PARLEY_API_KEY";
pub const ENV_API_KEY_FALLBACK: &str = "GROQ_API_KEY";
pub const ENV_BASE_URL: &str = "PARLEY_BASE_URL";

/// Keys accepted by `parley set` and `parley unset`.
pub const SETTABLE_KEYS: &[&str] = &[
    "model",
    "base-url",
    "api-key",
    "system-prompt",
    "history-file",
    "timeout",
];

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "parley", "parley")
}

/// History location used when neither the config file nor the command line
/// names one. Falls back to the working directory when the platform has no
/// data directory.
pub fn default_history_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join(HISTORY_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(HISTORY_FILE_NAME))
}

/// Command-line values that take precedence over both the file and the
/// environment.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub history_file: Option<PathBuf>,
}

impl Config {
    /// Resolve against the process environment.
    pub fn resolve(&self, overrides: &ConfigOverrides) -> Result<ChatConfig, ConfigError> {
        self.resolve_with_env(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve the file contents, environment and overrides into the
    /// immutable configuration the core runs with.
    ///
    /// Precedence: overrides, then environment, then file, then defaults.
    pub fn resolve_with_env<F>(
        &self,
        overrides: &ConfigOverrides,
        env: F,
    ) -> Result<ChatConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        let api_key = non_empty(env(ENV_API_KEY))
            .or_else(|| non_empty(env(ENV_API_KEY_FALLBACK)))
            .or_else(|| non_empty(self.api_key.clone()))
            .ok_or(ConfigError::MissingApiKey)?;

        let base_url = non_empty(env(ENV_BASE_URL))
            .or_else(|| self.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "base-url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        let model = non_empty(overrides.model.clone())
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }

        let history_path = self.history_path(overrides);

        Ok(ChatConfig {
            model,
            base_url,
            api_key,
            system_prompt: self
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            history_path,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// History location without resolving the rest of the configuration, for
    /// commands that never talk to the API.
    pub fn history_path(&self, overrides: &ConfigOverrides) -> PathBuf {
        overrides
            .history_file
            .clone()
            .or_else(|| self.history_file.clone())
            .unwrap_or_else(default_history_path)
    }

    /// Apply `parley set <key> <value>`.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                reason: "value must not be empty".to_string(),
            });
        }

        match key {
            "model" => self.model = Some(value.to_string()),
            "base-url" => self.base_url = Some(value.to_string()),
            "api-key" => self.api_key = Some(value.to_string()),
            "system-prompt" => self.system_prompt = Some(value.to_string()),
            "history-file" => self.history_file = Some(PathBuf::from(value)),
            "timeout" => {
                let secs = value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: key.to_string(),
                        reason: format!("expected a positive number of seconds, got '{value}'"),
                    })?;
                self.timeout_secs = Some(secs);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Apply `parley unset <key>`.
    pub fn unset_value(&mut self, key: &str) -> Result<(), ConfigError> {
        match key {
            "model" => self.model = None,
            "base-url" => self.base_url = None,
            "api-key" => self.api_key = None,
            "system-prompt" => self.system_prompt = None,
            "history-file" => self.history_file = None,
            "timeout" => self.timeout_secs = None,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}
