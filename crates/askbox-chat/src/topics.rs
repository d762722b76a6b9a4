//! Topic suggestions shown before the first question.
//!
//! The topics service returns a list of topics; each one contributes a
//! single clickable prompt. If the service is unavailable the built-in
//! defaults are used instead.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{status_error, transport_error};
use crate::ChatError;

/// Prompts offered when the topics service cannot be reached.
pub const DEFAULT_TOPICS: [&str; 3] = ["Code of Discipline", "DTR Violations", "Leave Filing"];

/// How many prompts the compact dialog layout shows.
pub const COMPACT_TOPIC_COUNT: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Topic {
    pub topic: String,
    pub category: String,
    pub description: String,
    pub examples: Vec<String>,
    pub icon: String,
}

impl Topic {
    /// The first non-empty example, else the topic name.
    pub fn prompt(&self) -> &str {
        self.examples
            .first()
            .map(String::as_str)
            .filter(|e| !e.is_empty())
            .unwrap_or(&self.topic)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TopicsResponse {
    pub topics: Vec<Topic>,
    pub total: u64,
    pub document_count: u64,
    pub message: String,
}

/// Prompts ready for display, plus the reason defaults were used (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicSuggestions {
    pub prompts: Vec<String>,
    pub error: Option<String>,
}

impl TopicSuggestions {
    pub fn defaults(error: Option<String>) -> Self {
        Self {
            prompts: DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
            error,
        }
    }

    pub fn from_topics(topics: &[Topic]) -> Self {
        let prompts: Vec<String> = topics.iter().map(|t| t.prompt().to_string()).collect();
        if prompts.is_empty() {
            return Self::defaults(None);
        }
        Self {
            prompts,
            error: None,
        }
    }

    /// At most `n` prompts, in service order.
    pub fn top(&self, n: usize) -> &[String] {
        &self.prompts[..self.prompts.len().min(n)]
    }

    pub fn compact(&self) -> &[String] {
        self.top(COMPACT_TOPIC_COUNT)
    }
}

pub struct TopicsClient {
    url: String,
    http: reqwest::Client,
}

impl TopicsClient {
    pub fn new(url: impl Into<String>) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| ChatError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: url.into(),
            http,
        })
    }

    pub async fn fetch(&self) -> Result<TopicsResponse, ChatError> {
        debug!(url = %self.url, "topics request");

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        response
            .json::<TopicsResponse>()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))
    }

    /// Fetch topics, falling back to the defaults on any failure.
    pub async fn load_suggestions(&self) -> TopicSuggestions {
        match self.fetch().await {
            Ok(response) => TopicSuggestions::from_topics(&response.topics),
            Err(e) => {
                warn!(error = %e, "Failed to fetch topics, using defaults");
                TopicSuggestions::defaults(Some(format!(
                    "Failed to load topics, using defaults: {e}"
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn topic(name: &str, examples: &[&str]) -> Topic {
        Topic {
            topic: name.into(),
            examples: examples.iter().map(|e| e.to_string()).collect(),
            ..Topic::default()
        }
    }

    #[test]
    fn prompt_prefers_first_example() {
        assert_eq!(
            topic("Leave", &["How do I file leave?", "Other"]).prompt(),
            "How do I file leave?"
        );
        assert_eq!(topic("Leave", &[]).prompt(), "Leave");
        assert_eq!(topic("Leave", &[""]).prompt(), "Leave");
    }

    #[test]
    fn empty_topic_list_uses_defaults() {
        let suggestions = TopicSuggestions::from_topics(&[]);
        assert_eq!(suggestions.prompts, DEFAULT_TOPICS);
        assert!(suggestions.error.is_none());
    }

    #[test]
    fn compact_shows_at_most_three() {
        let topics: Vec<Topic> = ["a", "b", "c", "d"].iter().map(|n| topic(n, &[])).collect();
        let suggestions = TopicSuggestions::from_topics(&topics);
        assert_eq!(suggestions.prompts.len(), 4);
        assert_eq!(suggestions.compact(), ["a", "b", "c"]);
        assert_eq!(suggestions.top(10).len(), 4);
    }

    #[tokio::test]
    async fn loads_prompts_from_service() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/topics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "topics": [
                    {
                        "topic": "Leave Filing",
                        "category": "HR",
                        "description": "Filing leave",
                        "examples": ["How do I file sick leave?"],
                        "icon": "calendar"
                    },
                    { "topic": "Overtime", "examples": [] }
                ],
                "total": 2,
                "document_count": 14,
                "message": "ok"
            })))
            .mount(&server)
            .await;

        let client = TopicsClient::new(format!("{}/topics", server.uri())).unwrap();
        let suggestions = client.load_suggestions().await;

        assert_eq!(
            suggestions.prompts,
            vec!["How do I file sick leave?", "Overtime"]
        );
        assert!(suggestions.error.is_none());
    }

    #[tokio::test]
    async fn service_failure_falls_back_to_defaults() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = TopicsClient::new(format!("{}/topics", server.uri())).unwrap();
        let suggestions = client.load_suggestions().await;

        assert_eq!(suggestions.prompts, DEFAULT_TOPICS);
        assert!(suggestions.error.is_some());
    }
}
