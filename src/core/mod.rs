pub mod config;
pub mod conversation;
pub mod history;
pub mod log_sink;
pub mod message;
