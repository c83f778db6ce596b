//! Conversation history and its on-disk JSON store.
//!
//! The history holds user and assistant turns only. The system prompt is
//! injected when a request is built and is never part of what gets stored.
//! The store is a single pretty-printed JSON array that mirrors the in-memory
//! order exactly.

use crate::core::config::data::path_display;
use crate::core::message::{Message, Role};
use serde::Serialize;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const JSON_INDENT: &[u8] = b"    ";

/// Ordered user/assistant turns exchanged so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a history from already-ordered messages, rejecting system entries.
    pub fn from_messages(messages: Vec<Message>) -> Result<Self, usize> {
        match messages.iter().position(|msg| msg.role.is_system()) {
            Some(index) => Err(index),
            None => Ok(Self { messages }),
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Count of turns spoken by `role`.
    pub fn count_role(&self, role: Role) -> usize {
        self.messages.iter().filter(|msg| msg.role == role).count()
    }
}

impl<'a> IntoIterator for &'a ConversationHistory {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Errors raised by [`HistoryStore`].
#[derive(Debug)]
pub enum HistoryError {
    /// The history file exists but could not be read.
    Read { path: PathBuf, source: io::Error },

    /// The history file is not a JSON array of `{role, content}` objects.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The history file contains a system entry, which is never persisted.
    SystemEntry { path: PathBuf, index: usize },

    /// Writing or replacing the history file failed.
    Write { path: PathBuf, source: io::Error },

    /// Removing the history file failed.
    Remove { path: PathBuf, source: io::Error },

    /// Serializing the history to JSON failed.
    Encode(serde_json::Error),
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::Read { path, source } => {
                write!(f, "Failed to read history at {}: {}", path_display(path), source)
            }
            HistoryError::Parse { path, source } => {
                write!(f, "Failed to parse history at {}: {}", path_display(path), source)
            }
            HistoryError::SystemEntry { path, index } => write!(
                f,
                "History at {} contains a system message at position {}",
                path_display(path),
                index
            ),
            HistoryError::Write { path, source } => {
                write!(f, "Failed to write history to {}: {}", path_display(path), source)
            }
            HistoryError::Remove { path, source } => {
                write!(f, "Failed to remove history at {}: {}", path_display(path), source)
            }
            HistoryError::Encode(source) => write!(f, "Failed to encode history: {source}"),
        }
    }
}

impl StdError for HistoryError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            HistoryError::Read { source, .. }
            | HistoryError::Write { source, .. }
            | HistoryError::Remove { source, .. } => Some(source),
            HistoryError::Parse { source, .. } => Some(source),
            HistoryError::Encode(source) => Some(source),
            HistoryError::SystemEntry { .. } => None,
        }
    }
}

/// File-backed persistence for a [`ConversationHistory`].
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    #[cfg(test)]
    writes: WriteCounter,
}

/// Test-only write counter; atomic so the store stays `Send + Sync`.
#[cfg(test)]
#[derive(Debug, Default)]
struct WriteCounter(std::sync::atomic::AtomicUsize);

#[cfg(test)]
impl WriteCounter {
    fn get(&self) -> usize {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn set(&self, value: usize) {
        self.0.store(value, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clone for WriteCounter {
    fn clone(&self) -> Self {
        Self(std::sync::atomic::AtomicUsize::new(self.get()))
    }
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            #[cfg(test)]
            writes: WriteCounter::default(),
        }
    }

    /// Number of successful [`HistoryStore::write`] calls on this store.
    #[cfg(test)]
    pub(crate) fn write_count(&self) -> usize {
        self.writes.get()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the stored history. A missing file is an empty history.
    pub fn read(&self) -> Result<ConversationHistory, HistoryError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(ConversationHistory::new())
            }
            Err(source) => {
                return Err(HistoryError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let messages: Vec<Message> =
            serde_json::from_str(&contents).map_err(|source| HistoryError::Parse {
                path: self.path.clone(),
                source,
            })?;

        ConversationHistory::from_messages(messages).map_err(|index| HistoryError::SystemEntry {
            path: self.path.clone(),
            index,
        })
    }

    /// Replace the stored history. The new document is written to a sibling
    /// temp file first so a crash never leaves a truncated array behind.
    pub fn write(&self, history: &ConversationHistory) -> Result<(), HistoryError> {
        let encoded = encode_history(history)?;

        let parent = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(|source| self.write_error(source))?;
        }

        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new_in("."),
        }
        .map_err(|source| self.write_error(source))?;

        temp_file
            .write_all(&encoded)
            .map_err(|source| self.write_error(source))?;
        temp_file
            .as_file_mut()
            .sync_all()
            .map_err(|source| self.write_error(source))?;
        temp_file
            .persist(&self.path)
            .map_err(|err| self.write_error(err.error))?;
        #[cfg(test)]
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    /// Delete the stored history. Removing a file that is already gone succeeds.
    pub fn remove(&self) -> Result<(), HistoryError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(HistoryError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write_error(&self, source: io::Error) -> HistoryError {
        HistoryError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

fn encode_history(history: &ConversationHistory) -> Result<Vec<u8>, HistoryError> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    history
        .messages()
        .serialize(&mut serializer)
        .map_err(HistoryError::Encode)?;
    Ok(buffer)
}
