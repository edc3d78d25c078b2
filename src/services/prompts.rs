use std::sync::Arc;

use super::events::PickerEvent;
use crate::api::{ApiError, ChatBackend};
use crate::models::topic::{DEFAULT_TOPIC, DEFAULT_TOPICS};

pub const TOPICS_FAILED_MESSAGE: &str = "Failed to load topics";
pub const STARTERS_FAILED_MESSAGE: &str = "Failed to load conversation starters";

pub const DEFAULT_STARTERS: [&str; 3] = [
    "Hello! How can I help you today?",
    "What would you like to talk about?",
    "I'm here to assist you with any questions.",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartersRequest {
    pub topic: String,
}

/// Topic and starter state. Starters only ever pre-fill the composer; the
/// picker never sends anything itself.
#[derive(Debug)]
pub struct PromptPicker {
    topics: Vec<String>,
    selected_topic: String,
    starters: Vec<String>,
    loading_starters: bool,
    error: Option<String>,
}

impl Default for PromptPicker {
    fn default() -> Self {
        Self {
            topics: Vec::new(),
            selected_topic: DEFAULT_TOPIC.to_string(),
            starters: Vec::new(),
            loading_starters: true,
            error: None,
        }
    }
}

impl PromptPicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    pub fn selected_topic(&self) -> &str {
        &self.selected_topic
    }

    pub fn starters(&self) -> &[String] {
        &self.starters
    }

    pub fn is_loading_starters(&self) -> bool {
        self.loading_starters
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Store the topic list. When it does not offer the selected topic, the
    /// first listed topic becomes selected and its starters must be fetched.
    pub fn finish_topics(
        &mut self,
        result: Result<Vec<String>, ApiError>,
    ) -> Option<(StartersRequest, PickerEvent)> {
        match result {
            Ok(topics) => {
                tracing::info!("Loaded {} topics", topics.len());
                self.topics = topics;
            }
            Err(e) => {
                tracing::warn!("Failed to load topics, using defaults: {}", e);
                self.topics = DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect();
                self.error = Some(TOPICS_FAILED_MESSAGE.to_string());
            }
        }

        if self.topics.iter().any(|t| *t == self.selected_topic) {
            return None;
        }
        let first = self.topics.first()?.clone();
        tracing::debug!("Topic {} not offered, switching to {}", self.selected_topic, first);
        Some(self.select_topic(&first))
    }

    pub fn select_topic(&mut self, topic: &str) -> (StartersRequest, PickerEvent) {
        self.selected_topic = topic.to_string();
        self.loading_starters = true;
        self.error = None;
        (
            StartersRequest {
                topic: topic.to_string(),
            },
            PickerEvent::TopicChanged(topic.to_string()),
        )
    }

    /// Apply starters fetched for `topic`. Returns false when the user has
    /// picked another topic in the meantime and the result was dropped.
    pub fn finish_starters(&mut self, topic: &str, result: Result<String, ApiError>) -> bool {
        if topic != self.selected_topic {
            tracing::debug!("Dropping starters for previously selected topic {}", topic);
            return false;
        }

        self.loading_starters = false;
        match result {
            Ok(raw) => {
                self.starters = parse_starters(&raw);
                tracing::info!("Loaded {} starters for {}", self.starters.len(), topic);
            }
            Err(e) => {
                tracing::warn!("Failed to load starters for {}, using defaults: {}", topic, e);
                self.starters = DEFAULT_STARTERS.iter().map(|s| s.to_string()).collect();
                self.error = Some(STARTERS_FAILED_MESSAGE.to_string());
            }
        }
        true
    }

    pub fn choose_starter(&self, text: &str) -> PickerEvent {
        PickerEvent::StarterChosen(text.to_string())
    }
}

/// Split a newline-delimited starters string into trimmed, non-empty entries.
pub fn parse_starters(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn fetch_starters(
    backend: Arc<dyn ChatBackend>,
    request: StartersRequest,
) -> (String, Result<String, ApiError>) {
    tracing::debug!("Fetching starters for topic {}", request.topic);
    let result = backend.list_starters(&request.topic).await;
    (request.topic, result)
}

/// Topics and the first topic's starters, fetched concurrently.
pub async fn load_initial(
    backend: Arc<dyn ChatBackend>,
    topic: String,
) -> (Result<Vec<String>, ApiError>, Result<String, ApiError>) {
    futures::join!(backend.list_topics(), backend.list_starters(&topic))
}
