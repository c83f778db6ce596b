//! Rendering of conversation turns for the terminal, plus the `history` and
//! `clear` commands that work on the stored file without an API key.

use std::error::Error;
use std::path::Path;

use chrono::{DateTime, Local};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use crate::core::config::data::path_display;
use crate::core::history::{ConversationHistory, HistoryStore};
use crate::core::message::Role;

pub const WELCOME: &str = "Hello! How can I help you today? (type /help for commands)";

/// `[HH:MM] You:` followed by the content on the next line.
pub fn render_turn(at: DateTime<Local>, role: Role, content: &str) -> String {
    format!("[{}] {}:\n{}", at.format("%H:%M"), role.display_name(), content)
}

/// Every stored turn, separated by blank lines. Stored turns carry no time,
/// so all headers use `at`.
pub fn render_history(history: &ConversationHistory, at: DateTime<Local>) -> String {
    history
        .iter()
        .map(|msg| render_turn(at, msg.role, &msg.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// What the chat shows on start: the replayed conversation, or a welcome line.
pub fn opening_text(history: &ConversationHistory, at: DateTime<Local>) -> String {
    if history.is_empty() {
        render_turn(at, Role::Assistant, WELCOME)
    } else {
        render_history(history, at)
    }
}

/// `y` or `yes`, any case. Everything else, including an empty answer, is no.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Print the stored conversation. An unreadable file is shown as empty, the
/// same way the chat loop loads it.
pub fn run_history(path: &Path) -> Result<(), Box<dyn Error>> {
    let history = HistoryStore::new(path).read().unwrap_or_else(|err| {
        warn!("Showing empty history: {err}");
        ConversationHistory::new()
    });
    if history.is_empty() {
        println!("No saved conversation at {}", path_display(path));
        return Ok(());
    }

    println!("{}", render_history(&history, Local::now()));
    println!();
    println!(
        "{} messages ({} from you, {} from the assistant)",
        history.len(),
        history.count_role(Role::User),
        history.count_role(Role::Assistant)
    );
    Ok(())
}

pub async fn run_clear(path: &Path, skip_confirmation: bool) -> Result<(), Box<dyn Error>> {
    let store = HistoryStore::new(path);
    if !store.exists() {
        println!("No saved conversation at {}", path_display(path));
        return Ok(());
    }

    if !skip_confirmation {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(b"Clear the saved conversation? [y/N] ")
            .await?;
        stdout.flush().await?;

        let mut answer = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut answer)
            .await?;
        if !is_affirmative(&answer) {
            println!("Kept the conversation.");
            return Ok(());
        }
    }

    store.remove()?;
    println!("✅ Cleared {}", path_display(path));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Message;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 5, 4, 14, 7, 0).unwrap()
    }

    #[test]
    fn turns_have_time_and_sender() {
        assert_eq!(render_turn(at(), Role::User, "Hi"), "[14:07] You:\nHi");
        assert_eq!(
            render_turn(at(), Role::Assistant, "Hello"),
            "[14:07] Assistant:\nHello"
        );
    }

    #[test]
    fn empty_history_opens_with_welcome() {
        let text = opening_text(&ConversationHistory::new(), at());
        assert_eq!(text, format!("[14:07] Assistant:\n{WELCOME}"));
    }

    #[test]
    fn stored_history_is_replayed_in_order() {
        let history = ConversationHistory::from_messages(vec![
            Message::user("Hi"),
            Message::assistant("Hello!"),
        ])
        .unwrap();

        assert_eq!(
            opening_text(&history, at()),
            "[14:07] You:\nHi\n\n[14:07] Assistant:\nHello!"
        );
    }

    #[test]
    fn only_yes_confirms() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative("yep"));
    }

    #[tokio::test]
    async fn clear_with_yes_removes_the_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chat_history.json");
        let store = HistoryStore::new(&path);
        let history = ConversationHistory::from_messages(vec![Message::user("Hi")]).unwrap();
        store.write(&history).unwrap();

        run_clear(&path, true).await.unwrap();
        assert!(!path.exists());

        // Nothing left to clear is not an error.
        run_clear(&path, true).await.unwrap();
    }

    #[test]
    fn history_of_missing_file_is_not_an_error() {
        let temp_dir = TempDir::new().unwrap();
        run_history(&temp_dir.path().join("none.json")).unwrap();
    }

    #[test]
    fn history_of_corrupt_file_reads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chat_history.json");
        std::fs::write(&path, "{not json").unwrap();

        run_history(&path).unwrap();
        // The file is left for the next successful save to replace.
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");
    }
}
