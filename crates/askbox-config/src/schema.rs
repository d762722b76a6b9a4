//! Configuration schema types for askbox.
//!
//! All structs use `serde(default)` so partial configs work correctly.

use std::path::PathBuf;

use serde::Deserialize;

/// Fallback text shown when the answering service cannot be reached.
pub const DEFAULT_ERROR_MESSAGE: &str = "Sorry, an error occurred";

/// Root configuration for askbox.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AskboxConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

// =============================================================================
// API Config
// =============================================================================

/// Remote endpoints the chat client talks to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Question-answering endpoint (POST).
    pub answer_url: String,
    /// Topic suggestions endpoint (GET).
    pub topics_url: String,
    /// Whole-request timeout for answer calls.
    pub request_timeout_secs: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            answer_url: "http://localhost:8000/ask".into(),
            topics_url: "http://localhost:8000/topics".into(),
            request_timeout_secs: 60,
        }
    }
}

// =============================================================================
// Session Config
// =============================================================================

/// Where session identity and history are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// JSON file; survives relaunches.
    File,
    /// Process memory only.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time after which the session identifier is replaced.
    pub inactivity_timeout_secs: u32,
    /// How often the background expiry check runs.
    pub check_interval_secs: u32,
    /// Assistant message text used when a request fails.
    pub error_message: String,
    pub store: StoreKind,
    /// Override for the session file location (file store only).
    pub store_path: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_secs: 600,
            check_interval_secs: 60,
            error_message: DEFAULT_ERROR_MESSAGE.into(),
            store: StoreKind::File,
            store_path: None,
        }
    }
}

// =============================================================================
// Logging Config
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `askbox=debug`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "askbox=info".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_widget_behavior() {
        let config = AskboxConfig::default();
        assert_eq!(config.session.inactivity_timeout_secs, 600);
        assert_eq!(config.session.check_interval_secs, 60);
        assert_eq!(config.session.error_message, "Sorry, an error occurred");
        assert_eq!(config.session.store, StoreKind::File);
        assert!(config.session.store_path.is_none());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AskboxConfig = toml::from_str(
            r#"
[api]
answer_url = "https://qa.example.com/ask"
"#,
        )
        .unwrap();
        assert_eq!(config.api.answer_url, "https://qa.example.com/ask");
        assert_eq!(config.api.topics_url, "http://localhost:8000/topics");
        assert_eq!(config.api.request_timeout_secs, 60);
        assert_eq!(config.logging.level, "askbox=info");
    }

    #[test]
    fn store_kind_parses_lowercase() {
        let config: AskboxConfig = toml::from_str(
            r#"
[session]
store = "memory"
"#,
        )
        .unwrap();
        assert_eq!(config.session.store, StoreKind::Memory);
    }
}
