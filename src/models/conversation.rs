use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Short excerpt of the most recent message, as shown in the conversation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePreview {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub message_count: u32,
    #[serde(default)]
    pub last_message: Option<MessagePreview>,
}

impl Conversation {
    pub fn preview(&self) -> Option<&str> {
        self.last_message
            .as_ref()
            .map(|m| m.content.as_str())
            .filter(|c| !c.trim().is_empty())
    }

    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "Untitled conversation"
        } else {
            &self.title
        }
    }
}

/// Backend ids may arrive as JSON strings or integers; both become strings.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Uint(u64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Uint(n) => n.to_string(),
    })
}
