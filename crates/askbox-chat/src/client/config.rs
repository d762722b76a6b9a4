//! Answering client configuration.

use std::time::Duration;

/// Answering client configuration.
#[derive(Debug, Clone)]
pub struct AnswerClientConfig {
    pub url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl AnswerClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
