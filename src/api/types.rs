use serde::Deserialize;

use crate::models::{ImageAttachment, Message};

/// What the composer hands to the backend.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub content: String,
    pub image: Option<ImageAttachment>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageList {
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub user_message: Option<Message>,
    #[serde(default)]
    pub ai_message: Option<Message>,
    #[serde(default)]
    pub agent_error: Option<serde_json::Value>,
    #[serde(default)]
    pub agent_error_details: Option<serde_json::Value>,
}

impl SendMessageResponse {
    pub fn has_agent_error(&self) -> bool {
        match &self.agent_error {
            None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) => false,
            Some(serde_json::Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        }
    }

    /// The authoritative messages in the order the thread shows them: the
    /// user echo first, then the reply.
    pub fn into_messages(self) -> Vec<Message> {
        self.user_message
            .into_iter()
            .chain(self.ai_message)
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopicsResponse {
    #[serde(default)]
    pub available_topics: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartersResponse {
    pub starters: StartersField,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StartersField {
    Joined(String),
    List(Vec<String>),
}

impl StartersField {
    pub fn into_joined(self) -> String {
        match self {
            StartersField::Joined(s) => s,
            StartersField::List(items) => items.join("\n"),
        }
    }
}
