use crate::core::config::data::{mask_secret, path_display, Config};
use crate::core::config::defaults::{
    default_history_path, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};

impl Config {
    pub fn print_all(&self) {
        for line in self.describe() {
            println!("{line}");
        }
    }

    /// Lines shown by `parley set` with no arguments. Defaults are marked so
    /// it is obvious which values come from the file.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec!["Current configuration:".to_string()];
        lines.push(match &self.model {
            Some(model) => format!("  model: {model}"),
            None => format!("  model: {DEFAULT_MODEL} (default)"),
        });
        lines.push(match &self.base_url {
            Some(url) => format!("  base-url: {url}"),
            None => format!("  base-url: {DEFAULT_BASE_URL} (default)"),
        });
        lines.push(match &self.api_key {
            Some(key) => format!("  api-key: {}", mask_secret(key)),
            None => "  api-key: (unset)".to_string(),
        });
        lines.push(match &self.system_prompt {
            Some(prompt) => format!("  system-prompt: {prompt}"),
            None => "  system-prompt: (default)".to_string(),
        });
        lines.push(match &self.history_file {
            Some(path) => format!("  history-file: {}", path_display(path)),
            None => format!(
                "  history-file: {} (default)",
                path_display(default_history_path())
            ),
        });
        lines.push(match self.timeout_secs {
            Some(secs) => format!("  timeout: {secs}s"),
            None => format!("  timeout: {DEFAULT_TIMEOUT_SECS}s (default)"),
        });
        lines
    }
}
