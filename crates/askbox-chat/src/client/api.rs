//! AnswerClient trait implementation for HttpAnswerClient.

use async_trait::async_trait;
use tracing::debug;

use crate::{AnswerClient, AskRequest, AskResponse, ChatError};

use super::http::{status_error, transport_error, HttpAnswerClient};

#[async_trait]
impl AnswerClient for HttpAnswerClient {
    async fn ask(&self, request: &AskRequest) -> Result<AskResponse, ChatError> {
        debug!(
            url = %self.config.url,
            session_id = %request.session_id,
            "answer request"
        );

        let response = self
            .http
            .post(&self.config.url)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let body = response.text().await.map_err(transport_error)?;
        let parsed: AskResponse =
            serde_json::from_str(&body).map_err(|e| ChatError::Parse(e.to_string()))?;

        debug!(
            sources = parsed.sources.len(),
            suggestions = parsed.suggestions.len(),
            "answer received"
        );
        Ok(parsed)
    }
}
