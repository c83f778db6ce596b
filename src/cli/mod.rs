//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments, resolves configuration, and
//! dispatches to the interactive chat loop or one of the one-shot commands.

pub mod chat;
pub mod say;
pub mod settings;
pub mod transcript;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::core::config::{Config, ConfigOverrides};
use crate::core::conversation::ConversationCore;
use crate::utils::logging::ActivityLog;

#[derive(Parser)]
#[command(name = "parley")]
#[command(version)]
#[command(about = "A terminal chat client with a persistent conversation")]
#[command(
    long_about = "Parley sends your messages to an OpenAI-compatible chat completions API \
(Groq by default) and keeps the whole conversation on disk, so every request carries the \
full history and the next session picks up where the last one ended.\n\n\
Environment Variables:\n\
  PARLEY_API_KEY    API key (falls back to GROQ_API_KEY, then the config file)\n\
  PARLEY_BASE_URL   Custom API base URL (optional, defaults to https://api.groq.com/openai/v1)\n\
  RUST_LOG          Diagnostic log filter (defaults to warn)\n\n\
Commands inside the chat:\n\
  /help             Show the command list\n\
  /clear            Start a new conversation (asks for confirmation)\n\
  /history          Print the conversation so far\n\
  /log <filename>   Enable activity logging to the specified file\n\
  /log              Toggle activity logging pause/resume\n\
  /quit             Save and exit"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use for chat
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Read configuration from this file instead of the platform default
    #[arg(short = 'c', long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Persist the conversation to this file
    #[arg(long, global = true, value_name = "FILE")]
    pub history_file: Option<PathBuf>,

    /// Enable activity logging to specified file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Echo activity lines to stderr
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive chat (default)
    Chat,
    /// Send one message, print the reply and exit
    Say {
        /// Message text (multiple words are joined with spaces)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Print the saved conversation
    History,
    /// Delete the saved conversation
    Clear {
        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Set a configuration value, or print the configuration when no key is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key (can be multiple words for system-prompt)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

impl Args {
    fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::get_config_path)
    }

    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            model: self.model.clone(),
            history_file: self.history_file.clone(),
        }
    }

    fn load_config(&self) -> Result<Config, Box<dyn Error>> {
        Ok(Config::load_from_path(&self.config_path())?)
    }

    fn open_core(&self) -> Result<ConversationCore, Box<dyn Error>> {
        let chat_config = self.load_config()?.resolve(&self.overrides())?;
        info!(
            model = %chat_config.model,
            base_url = %chat_config.base_url,
            history = %chat_config.history_path.display(),
            "Starting conversation core"
        );
        Ok(ConversationCore::new(chat_config)?)
    }

    fn activity_log(&self) -> Result<ActivityLog, Box<dyn Error>> {
        Ok(ActivityLog::new(self.log.clone(), self.verbose)?)
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    match args.command.as_ref().unwrap_or(&Commands::Chat) {
        Commands::Chat => {
            let core = args.open_core()?;
            let log = args.activity_log()?;
            chat::run_chat(core, log).await
        }
        Commands::Say { prompt } => {
            let core = args.open_core()?;
            let log = args.activity_log()?;
            say::run_say(core, prompt, &log).await
        }
        Commands::History => {
            let config = args.load_config()?;
            transcript::run_history(&config.history_path(&args.overrides()))
        }
        Commands::Clear { yes } => {
            let config = args.load_config()?;
            transcript::run_clear(&config.history_path(&args.overrides()), *yes).await
        }
        Commands::Set { key, value } => {
            settings::run_set(&args.config_path(), key.as_deref(), value)
        }
        Commands::Unset { key } => settings::run_unset(&args.config_path(), key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_chat_without_subcommand() {
        let args = Args::try_parse_from(["parley"]).unwrap();
        assert!(args.command.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn say_collects_all_words() {
        let args = Args::try_parse_from(["parley", "say", "hello", "-there", "friend"]).unwrap();
        match args.command {
            Some(Commands::Say { prompt }) => assert_eq!(prompt, vec!["hello", "-there", "friend"]),
            _ => panic!("expected say"),
        }
    }

    #[test]
    fn global_flags_feed_overrides() {
        let args = Args::try_parse_from([
            "parley",
            "history",
            "--model",
            "mixtral",
            "--history-file",
            "/tmp/h.json",
        ])
        .unwrap();

        let overrides = args.overrides();
        assert_eq!(overrides.model.as_deref(), Some("mixtral"));
        assert_eq!(overrides.history_file, Some(PathBuf::from("/tmp/h.json")));
    }

    #[test]
    fn set_without_key_is_allowed() {
        let args = Args::try_parse_from(["parley", "set"]).unwrap();
        match args.command {
            Some(Commands::Set { key, value }) => {
                assert!(key.is_none());
                assert!(value.is_empty());
            }
            _ => panic!("expected set"),
        }
    }
}
