use async_trait::async_trait;

use super::error::ApiError;
use super::types::{OutgoingMessage, SendMessageResponse};
use crate::models::{Conversation, Message};

/// The remote service that owns conversations, messages and topics.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError>;

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ApiError>;

    /// A conversation the backend has never seen yields `ApiError::NotFound`.
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError>;

    async fn send_message(
        &self,
        conversation_id: &str,
        message: OutgoingMessage,
    ) -> Result<SendMessageResponse, ApiError>;

    async fn list_topics(&self) -> Result<Vec<String>, ApiError>;

    /// Starters for `topic` as a single newline-delimited string.
    async fn list_starters(&self, topic: &str) -> Result<String, ApiError>;
}
