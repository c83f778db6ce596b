//! Interactive chat loop.
//!
//! Reads one line at a time from stdin. Lines starting with a known slash
//! command are handled locally, everything else goes to the assistant. The
//! loop waits for each exchange to finish before reading the next line.

use std::error::Error;
use std::path::PathBuf;

use chrono::Local;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::oneshot;

use crate::cli::transcript::{is_affirmative, opening_text, render_history, render_turn};
use crate::core::conversation::{is_error_reply, ConversationCore};
use crate::core::message::Role;
use crate::utils::logging::ActivityLog;
use crate::utils::tokens::estimate_tokens;

pub const TYPING_INDICATOR: &str = "Assistant is typing...";

pub struct CommandUsage {
    pub syntax: &'static str,
    pub description: &'static str,
}

pub const COMMANDS: &[CommandUsage] = &[
    CommandUsage {
        syntax: "/help",
        description: "Show this list",
    },
    CommandUsage {
        syntax: "/clear",
        description: "Start a new conversation (asks for confirmation)",
    },
    CommandUsage {
        syntax: "/history",
        description: "Print the conversation so far",
    },
    CommandUsage {
        syntax: "/log <filename>",
        description: "Enable activity logging to the specified file",
    },
    CommandUsage {
        syntax: "/log",
        description: "Toggle activity logging pause/resume",
    },
    CommandUsage {
        syntax: "/quit",
        description: "Save and exit",
    },
];

#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Handled locally; print the text (if any) and read the next line.
    Continue(Option<String>),
    /// Not a command. Send the text as a message.
    ProcessAsMessage(String),
    /// Ask before clearing the conversation.
    ConfirmClear,
    Quit,
}

/// Result of [`ChatSession::exchange`]. `tokens` is absent for error
/// renderings.
pub struct ExchangeOutcome {
    pub session: ChatSession,
    pub reply: String,
    pub tokens: Option<usize>,
}

/// Front-end state around the core.
pub struct ChatSession {
    core: ConversationCore,
    log: ActivityLog,
}

impl ChatSession {
    pub fn new(core: ConversationCore, log: ActivityLog) -> Self {
        Self { core, log }
    }

    pub fn core(&self) -> &ConversationCore {
        &self.core
    }

    /// Classify one input line. Blank input is ignored and unknown slash
    /// commands are sent as ordinary messages.
    pub fn process_input(&mut self, input: &str) -> CommandResult {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return CommandResult::Continue(None);
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            return CommandResult::ProcessAsMessage(trimmed.to_string());
        };

        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default();
        let args = parts.next().unwrap_or_default().trim();

        match name {
            "help" => CommandResult::Continue(Some(help_text(&self.log.get_status_string()))),
            "clear" => CommandResult::ConfirmClear,
            "history" => {
                let history = self.core.history();
                if history.is_empty() {
                    CommandResult::Continue(Some("No messages yet.".to_string()))
                } else {
                    CommandResult::Continue(Some(render_history(history, Local::now())))
                }
            }
            "log" => CommandResult::Continue(Some(self.handle_log(args))),
            "quit" | "exit" => CommandResult::Quit,
            _ => CommandResult::ProcessAsMessage(trimmed.to_string()),
        }
    }

    fn handle_log(&self, args: &str) -> String {
        if args.is_empty() {
            return match self.log.toggle_logging() {
                Ok(message) => message,
                Err(err) => format!("Log error: {err}"),
            };
        }
        match self.log.set_log_file(PathBuf::from(args)) {
            Ok(message) => message,
            Err(err) => format!("Error setting log file: {err}"),
        }
    }

    /// Run one exchange on a worker task. The session moves into the task
    /// and comes back with the reply over a oneshot channel, so the caller
    /// cannot touch the conversation while the request is in flight.
    pub async fn exchange(self, text: String) -> Result<ExchangeOutcome, Box<dyn Error>> {
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            let mut session = self;
            let reply = session.core.send_message(&text, &session.log).await;
            let _ = tx.send((session, reply));
        });

        let (session, reply) = rx
            .await
            .map_err(|_| "exchange task ended without a reply")?;
        let tokens = (!is_error_reply(&reply)).then(|| estimate_tokens(&reply));
        Ok(ExchangeOutcome {
            session,
            reply,
            tokens,
        })
    }

    pub fn clear(&mut self) {
        self.core.clear_history();
        self.log.log("Conversation cleared");
    }

    pub fn shutdown(&self) {
        self.core.save_history();
        self.log.log("Session ended");
    }
}

pub fn help_text(log_status: &str) -> String {
    let mut text = String::from("Commands:");
    for usage in COMMANDS {
        text.push_str(&format!("\n  {:<16} {}", usage.syntax, usage.description));
    }
    text.push_str(&format!("\n\nActivity log: {log_status}"));
    text
}

pub async fn run_chat(core: ConversationCore, log: ActivityLog) -> Result<(), Box<dyn Error>> {
    let mut session = ChatSession::new(core, log);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!("{}", opening_text(session.core().history(), Local::now()));

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match session.process_input(&line) {
            CommandResult::Continue(None) => {}
            CommandResult::Continue(Some(text)) => println!("{text}"),
            CommandResult::Quit => break,
            CommandResult::ConfirmClear => {
                if confirm(&mut lines, "Clear the whole conversation? [y/N] ").await? {
                    session.clear();
                    println!(
                        "{}",
                        render_turn(Local::now(), Role::Assistant, "Conversation cleared.")
                    );
                } else {
                    println!("Kept the conversation.");
                }
            }
            CommandResult::ProcessAsMessage(text) => {
                println!("{}", render_turn(Local::now(), Role::User, &text));
                println!("{TYPING_INDICATOR}");

                let outcome = session.exchange(text).await?;
                session = outcome.session;
                println!("{}", render_turn(Local::now(), Role::Assistant, &outcome.reply));
                if let Some(tokens) = outcome.tokens {
                    println!("Tokens approx: {tokens}");
                }
            }
        }
    }

    session.shutdown();
    Ok(())
}

async fn confirm(
    lines: &mut Lines<BufReader<Stdin>>,
    prompt: &str,
) -> Result<bool, Box<dyn Error>> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(prompt.as_bytes()).await?;
    stdout.flush().await?;
    Ok(lines
        .next_line()
        .await?
        .is_some_and(|answer| is_affirmative(&answer)))
}
