use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::api::{ApiError, ChatBackend, OutgoingMessage, SendMessageResponse};
use crate::models::{Conversation, Message, MessageId, MessageType};

/// A backend call the fake observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListConversations,
    DeleteConversation(String),
    ListMessages(String),
    SendMessage {
        conversation_id: String,
        content: String,
        has_image: bool,
    },
    ListTopics,
    ListStarters(String),
}

/// In-memory `ChatBackend` that replays queued results in order.
///
/// An empty queue answers with `ApiError::Network`. When `hang` is set every
/// call waits forever, which is how cancellation is exercised.
#[derive(Default)]
pub struct ScriptedBackend {
    conversations: Mutex<VecDeque<Result<Vec<Conversation>, ApiError>>>,
    deletes: Mutex<VecDeque<Result<(), ApiError>>>,
    histories: Mutex<VecDeque<Result<Vec<Message>, ApiError>>>,
    sends: Mutex<VecDeque<Result<SendMessageResponse, ApiError>>>,
    topics: Mutex<VecDeque<Result<Vec<String>, ApiError>>>,
    starters: Mutex<VecDeque<Result<String, ApiError>>>,
    calls: Mutex<Vec<Call>>,
    hang: AtomicBool,
}

fn next<T>(queue: &Mutex<VecDeque<Result<T, ApiError>>>) -> Result<T, ApiError> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(ApiError::Network("no scripted response".to_string())))
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_conversations(self, result: Result<Vec<Conversation>, ApiError>) -> Self {
        self.conversations.lock().unwrap().push_back(result);
        self
    }

    pub fn with_delete(self, result: Result<(), ApiError>) -> Self {
        self.deletes.lock().unwrap().push_back(result);
        self
    }

    pub fn with_history(self, result: Result<Vec<Message>, ApiError>) -> Self {
        self.histories.lock().unwrap().push_back(result);
        self
    }

    pub fn with_send(self, result: Result<SendMessageResponse, ApiError>) -> Self {
        self.sends.lock().unwrap().push_back(result);
        self
    }

    pub fn with_topics(self, result: Result<Vec<String>, ApiError>) -> Self {
        self.topics.lock().unwrap().push_back(result);
        self
    }

    pub fn with_starters(self, result: Result<String, ApiError>) -> Self {
        self.starters.lock().unwrap().push_back(result);
        self
    }

    pub fn hanging(self) -> Self {
        self.hang.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.record(Call::ListConversations).await;
        next(&self.conversations)
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ApiError> {
        self.record(Call::DeleteConversation(conversation_id.to_string()))
            .await;
        next(&self.deletes)
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError> {
        self.record(Call::ListMessages(conversation_id.to_string()))
            .await;
        next(&self.histories)
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        message: OutgoingMessage,
    ) -> Result<SendMessageResponse, ApiError> {
        self.record(Call::SendMessage {
            conversation_id: conversation_id.to_string(),
            content: message.content,
            has_image: message.image.is_some(),
        })
        .await;
        next(&self.sends)
    }

    async fn list_topics(&self) -> Result<Vec<String>, ApiError> {
        self.record(Call::ListTopics).await;
        next(&self.topics)
    }

    async fn list_starters(&self, topic: &str) -> Result<String, ApiError> {
        self.record(Call::ListStarters(topic.to_string())).await;
        next(&self.starters)
    }
}

pub fn server_message(id: &str, message_type: MessageType, content: &str) -> Message {
    Message {
        id: MessageId::Server(id.to_string()),
        message_type,
        content: content.to_string(),
        image_url: None,
        timestamp: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
    }
}

pub fn conversation(id: &str, title: &str) -> Conversation {
    Conversation {
        id: id.to_string(),
        title: title.to_string(),
        updated_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
        message_count: 0,
        last_message: None,
    }
}
