//! Parley is a terminal chat client for OpenAI-compatible completion APIs
//! that keeps the conversation on disk between sessions.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation: history and its JSON store, resolved
//!   configuration, and the request/response exchange with the API.
//! - [`api`] defines the chat completion payloads sent over the wire.
//! - [`cli`] parses arguments and runs the interactive loop and the one-shot
//!   commands on top of [`core::conversation::ConversationCore`].
//! - [`utils`] holds the activity log and the token estimate.
//!
//! The binary (`src/main.rs`) routes straight into [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
