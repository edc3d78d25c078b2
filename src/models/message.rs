use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::attachment::ImageAttachment;

/// Content the backend substitutes when the agent fails to answer.
pub const AGENT_FAILURE_CONTENT: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    User,
    #[serde(alias = "ai")]
    Assistant,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::User => "user",
            MessageType::Assistant => "assistant",
        }
    }
}

/// Identity of a message in the visible thread.
///
/// `Pending` ids are generated locally for optimistic messages and never come
/// from the wire; anything deserialized is a `Server` id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    Pending { created_ms: i64 },
    Server(String),
}

impl MessageId {
    pub fn pending_at(now: DateTime<Utc>) -> Self {
        MessageId::Pending {
            created_ms: now.timestamp_millis(),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, MessageId::Pending { .. })
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageId::Pending { created_ms } => write!(f, "temp-{}", created_ms),
            MessageId::Server(id) => f.write_str(id),
        }
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        super::conversation::string_or_number(deserializer).map(MessageId::Server)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub message_type: MessageType,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build the local stand-in shown while a send is in flight.
    pub fn pending_user(
        content: &str,
        image: Option<&ImageAttachment>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::pending_at(now),
            message_type: MessageType::User,
            content: content.to_string(),
            image_url: image.map(ImageAttachment::to_data_url),
            timestamp: now,
        }
    }

    pub fn is_user(&self) -> bool {
        self.message_type == MessageType::User
    }

    pub fn is_agent_failure(&self) -> bool {
        self.message_type == MessageType::Assistant && self.content == AGENT_FAILURE_CONTENT
    }
}
