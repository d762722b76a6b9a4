//! Answering client struct and transport error mapping.

use crate::ChatError;

use super::config::AnswerClientConfig;

/// Longest slice of an error body kept in `ChatError::Api`.
pub(crate) const ERROR_BODY_LIMIT: usize = 200;

/// HTTP answering client.
pub struct HttpAnswerClient {
    pub(crate) config: AnswerClientConfig,
    pub(crate) http: reqwest::Client,
}

impl HttpAnswerClient {
    pub fn new(config: AnswerClientConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ChatError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

/// Map a reqwest transport failure onto the chat error taxonomy.
pub(crate) fn transport_error(err: reqwest::Error) -> ChatError {
    if err.is_timeout() {
        ChatError::Timeout
    } else {
        ChatError::Network(err.to_string())
    }
}

/// Turn a non-success status plus body into an error, truncating the body.
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str) -> ChatError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return ChatError::RateLimited;
    }
    let text = body.chars().take(ERROR_BODY_LIMIT).collect::<String>();
    ChatError::Api(format!("HTTP {status}: {text}"))
}
