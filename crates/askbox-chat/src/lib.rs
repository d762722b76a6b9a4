//! Conversation session engine for askbox.
//!
//! Provides the chat session lifecycle against a remote question-answering
//! service:
//! - Session identity with inactivity expiry and a cancellable expiry watcher
//! - Message history persisted through an injected `SessionStore`
//! - HTTP answering client and topic suggestions client
//! - Source citation display helpers

pub mod client;
pub mod clock;
pub mod session;
pub mod source;
pub mod store;
pub mod topics;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};

pub use client::{AnswerClientConfig, HttpAnswerClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use session::{
    ChatSession, ExpiryWatcher, SessionBuilder, SessionReset, SessionSettings, SessionStart,
    SubmitOutcome,
};
pub use source::{display_name, render_markup, SourceRef};
pub use store::{FileStore, MemoryStore, SessionStore};
pub use topics::{Topic, TopicSuggestions, TopicsClient, TopicsResponse};

/// A remote service that answers questions within a session.
#[async_trait]
pub trait AnswerClient: Send + Sync {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, ChatError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in a conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub document_types: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub is_error: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
            document_types: Vec::new(),
            suggestions: Vec::new(),
            is_error: false,
        }
    }

    /// Assistant reply built from a successful answer.
    pub fn assistant(response: AskResponse) -> Self {
        Self {
            role: Role::Assistant,
            content: response.answer,
            sources: response.sources,
            document_types: response.document_types,
            suggestions: response.suggestions,
            is_error: false,
        }
    }

    /// Synthesized assistant reply for a failed request.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            sources: Vec::new(),
            document_types: Vec::new(),
            suggestions: Vec::new(),
            is_error: true,
        }
    }

    pub fn source_refs(&self) -> impl Iterator<Item = SourceRef<'_>> {
        self.sources.iter().map(|s| SourceRef::new(s))
    }
}

/// Body of the POST sent to the answering service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AskRequest {
    pub question: String,
    pub session_id: String,
    pub use_memory: bool,
    pub use_routing: bool,
}

impl AskRequest {
    pub fn new(question: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            session_id: session_id.into(),
            use_memory: true,
            use_routing: true,
        }
    }
}

/// Answering service reply. `answer` is required; a body without it is
/// rejected as malformed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub sources: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub document_types: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub suggestions: Vec<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Vec<String>>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Timeout")]
    Timeout,
    #[error("Session is busy with another request")]
    Busy,
    #[error("Store error: {0}")]
    Store(String),
}

impl From<ChatError> for askbox_common::AskboxError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::Store(msg) => Self::Store(msg),
            other => Self::Chat(other.to_string()),
        }
    }
}
