use super::data::{ChatConfig, Config};
use super::defaults::{
    ConfigOverrides, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, ENV_API_KEY,
    ENV_API_KEY_FALLBACK, ENV_BASE_URL,
};
use super::io::ConfigError;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.set_value("model", "mixtral-8x7b").unwrap();
    config.set_value("timeout", "90").unwrap();
    config.set_value("system-prompt", "пиши на русском языке").unwrap();
    config.save_to_path(&config_path).expect("Failed to save config");

    let loaded = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(loaded.model.as_deref(), Some("mixtral-8x7b"));
    assert_eq!(loaded.timeout_secs, Some(90));
    assert_eq!(loaded.system_prompt.as_deref(), Some("пиши на русском языке"));

    let mut loaded = loaded;
    loaded.unset_value("model").unwrap();
    loaded.save_to_path(&config_path).expect("Failed to save config");

    let reloaded = Config::load_from_path(&config_path).expect("Failed to load config");
    assert_eq!(reloaded.model, None);
    assert_eq!(reloaded.timeout_secs, Some(90));
}

#[test]
fn test_invalid_toml_is_a_parse_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "model = [unterminated").unwrap();

    let err = Config::load_from_path(&config_path).unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().starts_with("Failed to parse config at "));
}

#[test]
fn test_resolve_uses_defaults() {
    let config = Config {
        api_key: Some("file-key".to_string()),
        ..Default::default()
    };

    let resolved = config
        .resolve_with_env(&ConfigOverrides::default(), env_from(&[]))
        .unwrap();

    assert_eq!(resolved.api_key, "file-key");
    assert_eq!(resolved.model, DEFAULT_MODEL);
    assert_eq!(resolved.base_url, DEFAULT_BASE_URL);
    assert_eq!(resolved.system_prompt, DEFAULT_SYSTEM_PROMPT);
    assert_eq!(resolved.timeout, Duration::from_secs(45));
    assert!(resolved.history_path.ends_with("chat_history.json"));
}

#[test]
fn test_resolve_precedence() {
    let config = Config {
        model: Some("file-model".to_string()),
        base_url: Some("https://file.example/v1".to_string()),
        api_key: Some("file-key".to_string()),
        history_file: Some(PathBuf::from("/file/history.json")),
        ..Default::default()
    };
    let overrides = ConfigOverrides {
        model: Some("flag-model".to_string()),
        history_file: Some(PathBuf::from("/flag/history.json")),
    };
    let env = env_from(&[
        (ENV_API_KEY, "env-key"),
        (ENV_BASE_URL, "https://env.example/v1"),
    ]);

    let resolved = config.resolve_with_env(&overrides, env).unwrap();

    assert_eq!(resolved.api_key, "env-key");
    assert_eq!(resolved.base_url, "https://env.example/v1");
    assert_eq!(resolved.model, "flag-model");
    assert_eq!(resolved.history_path, PathBuf::from("/flag/history.json"));
}

#[test]
fn test_resolve_falls_back_to_groq_key() {
    let resolved = Config::default()
        .resolve_with_env(
            &ConfigOverrides::default(),
            env_from(&[(ENV_API_KEY, "  "), (ENV_API_KEY_FALLBACK, "gsk_fallback")]),
        )
        .unwrap();

    assert_eq!(resolved.api_key, "gsk_fallback");
}

#[test]
fn test_resolve_without_key_fails() {
    let err = Config::default()
        .resolve_with_env(&ConfigOverrides::default(), env_from(&[]))
        .unwrap_err();

    assert!(matches!(err, ConfigError::MissingApiKey));
    assert!(err.to_string().contains(ENV_API_KEY));
}

#[test]
fn test_resolve_rejects_zero_timeout() {
    let config = Config {
        api_key: Some("k".to_string()),
        timeout_secs: Some(0),
        ..Default::default()
    };

    let err = config
        .resolve_with_env(&ConfigOverrides::default(), env_from(&[]))
        .unwrap_err();

    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}

#[test]
fn test_set_value_validation() {
    let mut config = Config::default();

    assert!(matches!(
        config.set_value("theme", "dark"),
        Err(ConfigError::UnknownKey(_))
    ));
    assert!(matches!(
        config.set_value("timeout", "soon"),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        config.set_value("model", "   "),
        Err(ConfigError::InvalidValue { .. })
    ));
    assert!(matches!(
        config.unset_value("colour"),
        Err(ConfigError::UnknownKey(_))
    ));
    assert_eq!(config, Config::default());
}

#[test]
fn test_describe_masks_api_key() {
    let config = Config {
        api_key: Some("gsk_verysecret".to_string()),
        ..Default::default()
    };

    let lines = config.describe();

    assert!(lines.iter().any(|line| line == "  api-key: gsk_****"));
    assert!(lines.iter().all(|line| !line.contains("verysecret")));
    assert!(lines.iter().any(|line| line.ends_with("(default)")));
}

#[test]
fn test_chat_config_builders() {
    let config = ChatConfig::new("key", "/tmp/h.json")
        .with_model("m")
        .with_base_url("http://127.0.0.1:1")
        .with_system_prompt("be brief")
        .with_timeout(Duration::from_millis(250));

    assert_eq!(config.model, "m");
    assert_eq!(config.base_url, "http://127.0.0.1:1");
    assert_eq!(config.system_prompt, "be brief");
    assert_eq!(config.timeout, Duration::from_millis(250));
}
