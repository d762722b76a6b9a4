//! Conversation session management.
//!
//! A `ChatSession` owns the session identifier, message history, and the
//! pending flag, and performs the request/response exchange for each turn.
//! Identity and history are persisted through a `SessionStore` so a relaunch
//! within the inactivity window resumes the same conversation.

mod chat;
mod manager;
mod types;
mod watcher;

#[cfg(test)]
pub(crate) mod testing;

pub use manager::{ChatSession, SessionBuilder};
pub use types::{SessionReset, SessionSettings, SessionStart, SubmitOutcome};
pub use watcher::ExpiryWatcher;
