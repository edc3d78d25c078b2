use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use uuid::Uuid;

use super::events::SelectionEvent;
use crate::api::{ApiError, ChatBackend, Operation};
use crate::models::Conversation;

pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete conversation. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListStatus {
    Loading,
    Ready,
    Failed(String),
}

/// What a finished delete did to the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed { selection: Option<SelectionEvent> },
    /// The list is unchanged; the message is meant for a toast.
    Failed(String),
}

/// The conversation selector's state. Deletes are never optimistic: an item
/// leaves the list only after the backend confirms.
#[derive(Debug)]
pub struct ConversationList {
    conversations: Vec<Conversation>,
    status: ListStatus,
    selected: Option<String>,
    pending_delete: Option<String>,
}

impl Default for ConversationList {
    fn default() -> Self {
        Self {
            conversations: Vec::new(),
            status: ListStatus::Loading,
            selected: None,
            pending_delete: None,
        }
    }
}

impl ConversationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn status(&self) -> &ListStatus {
        &self.status
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    pub fn begin_load(&mut self) {
        self.status = ListStatus::Loading;
    }

    pub fn finish_load(&mut self, result: Result<Vec<Conversation>, ApiError>) {
        match result {
            Ok(conversations) => {
                tracing::info!("Loaded {} conversations", conversations.len());
                self.conversations = conversations;
                self.status = ListStatus::Ready;
            }
            Err(e) => {
                tracing::error!("Failed to load conversations: {}", e);
                self.status = ListStatus::Failed(e.user_message(Operation::ListConversations));
            }
        }
    }

    pub fn select(&mut self, id: &str) -> SelectionEvent {
        self.selected = Some(id.to_string());
        SelectionEvent::Selected(id.to_string())
    }

    pub fn set_selected(&mut self, id: Option<String>) {
        self.selected = id;
    }

    /// Remember `id` as the delete candidate. Returns false for unknown ids.
    pub fn request_delete(&mut self, id: &str) -> bool {
        if !self.conversations.iter().any(|c| c.id == id) {
            return false;
        }
        self.pending_delete = Some(id.to_string());
        true
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
    }

    pub fn confirm_delete(&mut self) -> Option<String> {
        self.pending_delete.take()
    }

    pub fn finish_delete(&mut self, id: &str, result: Result<(), ApiError>) -> DeleteOutcome {
        if let Err(e) = result {
            tracing::error!("Failed to delete conversation {}: {}", id, e);
            return DeleteOutcome::Failed(DELETE_FAILED_MESSAGE.to_string());
        }

        self.conversations.retain(|c| c.id != id);
        let selection = if self.selected.as_deref() == Some(id) {
            self.selected = None;
            Some(SelectionEvent::Cleared)
        } else {
            None
        };
        DeleteOutcome::Removed { selection }
    }
}

pub async fn fetch_conversations(
    backend: Arc<dyn ChatBackend>,
) -> Result<Vec<Conversation>, ApiError> {
    tracing::debug!("Fetching conversation list");
    backend.list_conversations().await
}

pub async fn delete_conversation(
    backend: Arc<dyn ChatBackend>,
    id: String,
) -> (String, Result<(), ApiError>) {
    tracing::debug!("Deleting conversation {}", id);
    let result = backend.delete_conversation(&id).await;
    (id, result)
}

/// Id for a conversation the backend has not seen yet. It is created
/// server-side on the first message.
pub fn new_conversation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Coarse age of a conversation as shown in the list.
pub fn relative_day_label(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed_ms = (now - updated_at).num_milliseconds().unsigned_abs();
    let day_ms = 24 * 60 * 60 * 1000;
    let days = elapsed_ms.div_ceil(day_ms);

    match days {
        0 | 1 => "Today".to_string(),
        2 => "Yesterday".to_string(),
        3..=7 => format!("{} days ago", days - 1),
        _ => updated_at
            .with_timezone(&Local)
            .format("%b %-d, %Y")
            .to_string(),
    }
}

/// Local wall-clock time of a message, e.g. `14:05`.
pub fn format_message_time(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{conversation, Call, ScriptedBackend};
    use chrono::{Duration, TimeZone};

    fn loaded() -> ConversationList {
        let mut list = ConversationList::new();
        list.finish_load(Ok(vec![conversation("a", "First"), conversation("b", "Second")]));
        list
    }

    #[test]
    fn test_load_success_and_failure() {
        let mut list = ConversationList::new();
        assert_eq!(list.status(), &ListStatus::Loading);

        list.finish_load(Err(ApiError::Timeout));
        match list.status() {
            ListStatus::Failed(msg) => assert!(msg.contains("check if the server is running")),
            other => panic!("unexpected status {:?}", other),
        }

        list.begin_load();
        list.finish_load(Ok(vec![conversation("a", "First")]));
        assert_eq!(list.status(), &ListStatus::Ready);
        assert_eq!(list.conversations().len(), 1);
    }

    #[test]
    fn test_http_failure_shows_status_line() {
        let mut list = ConversationList::new();
        list.finish_load(Err(ApiError::Server {
            status: 503,
            error: Some("maintenance".to_string()),
        }));
        assert_eq!(
            list.status(),
            &ListStatus::Failed("Server error: 503 Service Unavailable".to_string())
        );
    }

    #[test]
    fn test_select_raises_event() {
        let mut list = loaded();
        assert_eq!(list.select("b"), SelectionEvent::Selected("b".to_string()));
        assert_eq!(list.selected(), Some("b"));
    }

    #[test]
    fn test_cancel_delete_keeps_list() {
        let mut list = loaded();
        assert!(list.request_delete("a"));
        assert_eq!(list.pending_delete(), Some("a"));

        list.cancel_delete();
        assert!(list.pending_delete().is_none());
        assert!(list.confirm_delete().is_none());
        assert_eq!(list.conversations().len(), 2);
    }

    #[test]
    fn test_unknown_delete_is_ignored() {
        let mut list = loaded();
        assert!(!list.request_delete("zzz"));
        assert!(list.pending_delete().is_none());
    }

    #[test]
    fn test_delete_waits_for_backend() {
        let mut list = loaded();
        list.select("a");
        list.request_delete("a");
        let id = list.confirm_delete().unwrap();
        assert_eq!(list.conversations().len(), 2);

        let outcome = list.finish_delete(&id, Ok(()));
        assert_eq!(
            outcome,
            DeleteOutcome::Removed {
                selection: Some(SelectionEvent::Cleared)
            }
        );
        assert_eq!(list.conversations().len(), 1);
        assert!(list.selected().is_none());
    }

    #[test]
    fn test_delete_unselected_keeps_selection() {
        let mut list = loaded();
        list.select("b");
        let outcome = list.finish_delete("a", Ok(()));
        assert_eq!(outcome, DeleteOutcome::Removed { selection: None });
        assert_eq!(list.selected(), Some("b"));
    }

    #[test]
    fn test_failed_delete_keeps_item() {
        let mut list = loaded();
        let outcome = list.finish_delete("a", Err(ApiError::Timeout));
        assert_eq!(
            outcome,
            DeleteOutcome::Failed(DELETE_FAILED_MESSAGE.to_string())
        );
        assert_eq!(list.conversations().len(), 2);
    }

    #[test]
    fn test_relative_day_label() {
        let now = Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap();
        assert_eq!(relative_day_label(now, now), "Today");
        assert_eq!(relative_day_label(now - Duration::hours(5), now), "Today");
        assert_eq!(relative_day_label(now - Duration::hours(30), now), "Yesterday");
        assert_eq!(relative_day_label(now - Duration::hours(4 * 24 + 1), now), "4 days ago");
        assert_eq!(relative_day_label(now - Duration::hours(6 * 24 + 1), now), "6 days ago");

        let old = Utc.with_ymd_and_hms(2024, 7, 4, 12, 0, 0).unwrap();
        let label = relative_day_label(old, now);
        assert!(label.starts_with("Jul "));
        assert!(label.ends_with(", 2024"));
    }

    #[test]
    fn test_new_conversation_ids_are_unique() {
        assert_ne!(new_conversation_id(), new_conversation_id());
    }

    #[tokio::test]
    async fn test_drivers_use_backend() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_conversations(Ok(vec![conversation("a", "First")]))
                .with_delete(Ok(())),
        );

        let mut list = ConversationList::new();
        list.finish_load(fetch_conversations(backend.clone()).await);
        assert_eq!(list.status(), &ListStatus::Ready);

        let (id, result) = delete_conversation(backend.clone(), "a".to_string()).await;
        list.finish_delete(&id, result);
        assert!(list.conversations().is_empty());
        assert_eq!(
            backend.calls(),
            vec![
                Call::ListConversations,
                Call::DeleteConversation("a".to_string())
            ]
        );
    }
}
