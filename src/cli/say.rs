//! One-shot "say" command

use std::error::Error;

use crate::core::conversation::{is_error_reply, ConversationCore};
use crate::core::log_sink::LogSink;

pub async fn run_say(
    mut core: ConversationCore,
    prompt: &[String],
    log: &dyn LogSink,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: parley say <prompt>");
        std::process::exit(1);
    }

    match exchange(&mut core, &prompt, log).await {
        Ok(reply) => {
            println!("{reply}");
            Ok(())
        }
        Err(reply) => {
            eprintln!("❌ {reply}");
            std::process::exit(1);
        }
    }
}

/// Run the exchange, splitting the reply into a real answer or one of the
/// fixed error renderings. The core persists a successful exchange itself.
async fn exchange(
    core: &mut ConversationCore,
    prompt: &str,
    log: &dyn LogSink,
) -> Result<String, String> {
    let reply = core.send_message(prompt, log).await;
    if is_error_reply(&reply) {
        Err(reply)
    } else {
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::conversation::AUTH_ERROR_REPLY;
    use crate::core::history::HistoryStore;
    use crate::core::log_sink::NullSink;
    use crate::utils::test_utils::{test_config, test_core, MockCompletionServer, MockReply};
    use tempfile::TempDir;

    #[tokio::test]
    async fn say_exchange_is_persisted() {
        let server = MockCompletionServer::start(vec![MockReply::completion("Hi there")]).await;
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chat_history.json");
        let mut core = test_core(test_config(&server.base_url, &path));

        let reply = exchange(&mut core, "hello", &NullSink).await;
        assert_eq!(reply.as_deref(), Ok("Hi there"));

        let stored = HistoryStore::new(&path).read().unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn say_surfaces_error_literals() {
        let server = MockCompletionServer::start(vec![MockReply::status(401, "{}")]).await;
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("chat_history.json");
        let mut core = test_core(test_config(&server.base_url, &path));

        let reply = exchange(&mut core, "hello", &NullSink).await;
        assert_eq!(reply, Err(AUTH_ERROR_REPLY.to_string()));
    }
}
