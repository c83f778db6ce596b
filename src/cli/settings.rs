//! `parley set` and `parley unset`.

use std::error::Error;
use std::path::Path;

use crate::core::config::data::mask_secret;
use crate::core::config::{Config, ConfigError};

pub fn run_set(
    config_path: &Path,
    key: Option<&str>,
    value: &[String],
) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load_from_path(config_path)?;

    let Some(key) = key else {
        config.print_all();
        return Ok(());
    };

    if value.is_empty() {
        eprintln!("⚠️  Missing value for '{key}'");
        eprintln!("Example: parley set {key} <value>");
        std::process::exit(1);
    }

    match set_message(&mut config, key, &value.join(" ")) {
        Ok(message) => {
            config.save_to_path(config_path)?;
            println!("{message}");
            Ok(())
        }
        Err(err) => exit_with(&err),
    }
}

pub fn run_unset(config_path: &Path, key: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load_from_path(config_path)?;
    match config.unset_value(key) {
        Ok(()) => {
            config.save_to_path(config_path)?;
            println!("✅ Unset {key} (will use default)");
            Ok(())
        }
        Err(err) => exit_with(&err),
    }
}

fn set_message(config: &mut Config, key: &str, value: &str) -> Result<String, ConfigError> {
    config.set_value(key, value)?;
    let shown = if key == "api-key" {
        mask_secret(value.trim())
    } else {
        value.trim().to_string()
    };
    Ok(format!("✅ Set {key} to: {shown}"))
}

fn exit_with(err: &ConfigError) -> ! {
    eprintln!("❌ {err}");
    std::process::exit(1);
}
