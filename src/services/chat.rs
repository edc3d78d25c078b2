use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, ChatBackend, ErrorKind, Operation, OutgoingMessage, SendMessageResponse};
use crate::models::{ImageAttachment, Message, MessageId};

/// A classified failure, ready for the error banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ChatError {
    fn from_api(err: &ApiError, op: Operation) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message(op),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SendRejected {
    #[error("Nothing to send")]
    Empty,
    #[error("No conversation is open")]
    NoConversation,
    #[error("A request is already in flight")]
    Busy,
}

/// A send that never started. The draft comes back untouched so the composer
/// can restore both the text and the attachment.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct RejectedSend {
    pub reason: SendRejected,
    pub draft: OutgoingMessage,
}

/// Whether a finished request was applied to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// The session moved on to another conversation since the request was issued.
    Stale,
}

/// The result of a backend call made through a cancellable driver.
#[derive(Debug)]
pub enum Completion<T> {
    Finished(Result<T, ApiError>),
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub conversation_id: String,
    pub epoch: u64,
}

#[derive(Debug)]
pub struct HistoryResponse {
    pub request: HistoryRequest,
    pub completion: Completion<Vec<Message>>,
}

/// Identifies the optimistic message a send is waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTicket {
    pub conversation_id: String,
    pub epoch: u64,
    pub temp_id: MessageId,
}

#[derive(Debug, Clone)]
pub struct PendingSend {
    pub ticket: SendTicket,
    pub message: OutgoingMessage,
}

#[derive(Debug)]
pub struct SendResponse {
    pub ticket: SendTicket,
    pub completion: Completion<SendMessageResponse>,
}

/// State of the message thread for the open conversation.
#[derive(Debug, Default)]
pub struct ChatSession {
    conversation_id: Option<String>,
    epoch: u64,
    messages: Vec<Message>,
    initializing: bool,
    sending: bool,
    error: Option<ChatError>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_initializing(&self) -> bool {
        self.initializing
    }

    pub fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn error(&self) -> Option<&ChatError> {
        self.error.as_ref()
    }

    pub fn can_send(&self) -> bool {
        self.conversation_id.is_some() && !self.initializing && !self.sending
    }

    /// Switch to `conversation_id` and start loading its history. Anything
    /// still in flight for the previous conversation becomes stale.
    pub fn open(&mut self, conversation_id: &str) -> HistoryRequest {
        self.epoch += 1;
        self.conversation_id = Some(conversation_id.to_string());
        self.messages.clear();
        self.error = None;
        self.sending = false;
        self.initializing = true;

        HistoryRequest {
            conversation_id: conversation_id.to_string(),
            epoch: self.epoch,
        }
    }

    pub fn close(&mut self) {
        self.epoch += 1;
        self.conversation_id = None;
        self.messages.clear();
        self.error = None;
        self.sending = false;
        self.initializing = false;
    }

    fn is_current(&self, conversation_id: &str, epoch: u64) -> bool {
        self.epoch == epoch && self.conversation_id.as_deref() == Some(conversation_id)
    }

    pub fn finish_history(&mut self, response: HistoryResponse) -> Outcome {
        let HistoryResponse {
            request,
            completion,
        } = response;
        if !self.is_current(&request.conversation_id, request.epoch) {
            tracing::debug!(
                "Dropping stale history for conversation {}",
                request.conversation_id
            );
            return Outcome::Stale;
        }

        self.initializing = false;
        match completion {
            Completion::Finished(Ok(messages)) => {
                tracing::info!(
                    "Loaded {} messages for conversation {}",
                    messages.len(),
                    request.conversation_id
                );
                self.messages = messages;
            }
            Completion::Finished(Err(e)) if e.is_not_found() => {
                // Not created on the backend until the first message is sent
                tracing::debug!(
                    "Conversation {} does not exist yet, starting empty",
                    request.conversation_id
                );
                self.messages.clear();
            }
            Completion::Finished(Err(e)) => {
                tracing::error!("Failed to load conversation: {}", e);
                self.error = Some(ChatError::from_api(&e, Operation::LoadHistory));
            }
            Completion::Cancelled => {}
        }
        Outcome::Applied
    }

    pub fn begin_send(
        &mut self,
        text: &str,
        image: Option<ImageAttachment>,
    ) -> Result<PendingSend, RejectedSend> {
        self.begin_send_at(text, image, Utc::now())
    }

    /// Append the optimistic message and hand back what the driver needs.
    pub fn begin_send_at(
        &mut self,
        text: &str,
        image: Option<ImageAttachment>,
        now: DateTime<Utc>,
    ) -> Result<PendingSend, RejectedSend> {
        let content = text.trim();
        let reject = |reason, image| RejectedSend {
            reason,
            draft: OutgoingMessage {
                content: content.to_string(),
                image,
            },
        };
        if content.is_empty() && image.is_none() {
            return Err(reject(SendRejected::Empty, image));
        }
        let Some(conversation_id) = self.conversation_id.clone() else {
            return Err(reject(SendRejected::NoConversation, image));
        };
        if self.sending || self.initializing {
            return Err(reject(SendRejected::Busy, image));
        }

        let pending = Message::pending_user(content, image.as_ref(), now);
        let ticket = SendTicket {
            conversation_id,
            epoch: self.epoch,
            temp_id: pending.id.clone(),
        };
        self.messages.push(pending);
        self.sending = true;
        self.error = None;

        Ok(PendingSend {
            ticket,
            message: OutgoingMessage {
                content: content.to_string(),
                image,
            },
        })
    }

    pub fn finish_send(&mut self, response: SendResponse) -> Outcome {
        let SendResponse { ticket, completion } = response;
        if !self.is_current(&ticket.conversation_id, ticket.epoch) {
            tracing::debug!(
                "Dropping stale send result for conversation {}",
                ticket.conversation_id
            );
            return Outcome::Stale;
        }

        self.messages.retain(|m| m.id != ticket.temp_id);
        self.sending = false;

        match completion {
            Completion::Finished(Ok(reply)) => {
                if reply.has_agent_error() {
                    tracing::warn!(
                        "Agent error in conversation {}: {:?}",
                        ticket.conversation_id,
                        reply.agent_error_details
                    );
                }
                self.messages.extend(reply.into_messages());
            }
            Completion::Finished(Err(e)) => {
                tracing::error!("Failed to send message: {}", e);
                self.error = Some(ChatError::from_api(&e, Operation::SendMessage));
            }
            Completion::Cancelled => {}
        }
        Outcome::Applied
    }

    /// Clear the banner, reloading the history when there is nothing to show.
    pub fn retry(&mut self) -> Option<HistoryRequest> {
        self.error = None;
        if !self.messages.is_empty() || self.sending {
            return None;
        }
        let conversation_id = self.conversation_id.clone()?;
        Some(self.open(&conversation_id))
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }
}

pub async fn load_history(
    backend: Arc<dyn ChatBackend>,
    request: HistoryRequest,
    cancel: CancellationToken,
) -> HistoryResponse {
    tracing::debug!("Loading history for conversation {}", request.conversation_id);
    let completion = tokio::select! {
        _ = cancel.cancelled() => Completion::Cancelled,
        result = backend.list_messages(&request.conversation_id) => Completion::Finished(result),
    };
    HistoryResponse {
        request,
        completion,
    }
}

pub async fn dispatch_send(
    backend: Arc<dyn ChatBackend>,
    pending: PendingSend,
    cancel: CancellationToken,
) -> SendResponse {
    let PendingSend { ticket, message } = pending;
    let completion = tokio::select! {
        _ = cancel.cancelled() => Completion::Cancelled,
        result = backend.send_message(&ticket.conversation_id, message) => Completion::Finished(result),
    };
    SendResponse { ticket, completion }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageType;
    use crate::test_support::{server_message, Call, ScriptedBackend};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_736_000_000_000).unwrap()
    }

    fn history_ok(request: HistoryRequest, messages: Vec<Message>) -> HistoryResponse {
        HistoryResponse {
            request,
            completion: Completion::Finished(Ok(messages)),
        }
    }

    fn opened_with(messages: Vec<Message>) -> ChatSession {
        let mut session = ChatSession::new();
        let request = session.open("c1");
        session.finish_history(history_ok(request, messages));
        session
    }

    fn send_reply(user_id: &str, ai_id: &str) -> SendMessageResponse {
        SendMessageResponse {
            user_message: Some(server_message(user_id, MessageType::User, "hello")),
            ai_message: Some(server_message(ai_id, MessageType::Assistant, "Hi there")),
            ..Default::default()
        }
    }

    #[test]
    fn test_open_sets_initializing() {
        let mut session = ChatSession::new();
        assert!(!session.can_send());

        let request = session.open("c1");
        assert_eq!(request.conversation_id, "c1");
        assert!(session.is_initializing());
        assert!(!session.can_send());

        session.finish_history(history_ok(request, vec![]));
        assert!(!session.is_initializing());
        assert!(session.can_send());
    }

    #[test]
    fn test_history_not_found_is_empty_without_error() {
        let mut session = ChatSession::new();
        let request = session.open("fresh");
        let outcome = session.finish_history(HistoryResponse {
            request,
            completion: Completion::Finished(Err(ApiError::NotFound)),
        });
        assert_eq!(outcome, Outcome::Applied);
        assert!(session.messages().is_empty());
        assert!(session.error().is_none());
        assert!(!session.is_initializing());
    }

    #[test]
    fn test_history_failure_is_classified() {
        let mut session = ChatSession::new();
        let request = session.open("c1");
        session.finish_history(HistoryResponse {
            request,
            completion: Completion::Finished(Err(ApiError::Timeout)),
        });
        let error = session.error().unwrap();
        assert_eq!(error.kind, ErrorKind::Timeout);
        assert!(error.message.starts_with("Request timeout"));
    }

    #[test]
    fn test_send_reconciles_in_order() {
        let existing = server_message("0", MessageType::Assistant, "Welcome");
        let mut session = opened_with(vec![existing]);

        let pending = session.begin_send_at("  hello  ", None, now()).unwrap();
        assert_eq!(pending.message.content, "hello");
        assert!(session.is_sending());
        let last = session.messages().last().unwrap();
        assert_eq!(last.id.to_string(), "temp-1736000000000");
        assert_eq!(last.content, "hello");

        let outcome = session.finish_send(SendResponse {
            ticket: pending.ticket,
            completion: Completion::Finished(Ok(send_reply("1", "2"))),
        });
        assert_eq!(outcome, Outcome::Applied);

        let ids: Vec<String> = session.messages().iter().map(|m| m.id.to_string()).collect();
        assert_eq!(ids, vec!["0", "1", "2"]);
        assert!(session.messages().iter().all(|m| !m.id.is_pending()));
        assert!(!session.is_sending());
    }

    #[test]
    fn test_failed_send_rolls_back() {
        let mut session = opened_with(vec![]);
        let pending = session.begin_send_at("hello", None, now()).unwrap();
        assert_eq!(session.messages().len(), 1);

        session.finish_send(SendResponse {
            ticket: pending.ticket,
            completion: Completion::Finished(Err(ApiError::Network("reset".to_string()))),
        });

        assert!(session.messages().is_empty());
        assert!(!session
            .messages()
            .iter()
            .any(|m| m.id.to_string().starts_with("temp-")));
        let error = session.error().unwrap();
        assert_eq!(error.kind, ErrorKind::Connectivity);
        assert!(!session.is_sending());
    }

    #[test]
    fn test_agent_error_still_appends_reply() {
        let mut session = opened_with(vec![]);
        let pending = session.begin_send_at("hello", None, now()).unwrap();

        let mut reply = send_reply("1", "2");
        reply.ai_message = Some(server_message(
            "2",
            MessageType::Assistant,
            crate::models::message::AGENT_FAILURE_CONTENT,
        ));
        reply.agent_error = Some(serde_json::Value::Bool(true));
        session.finish_send(SendResponse {
            ticket: pending.ticket,
            completion: Completion::Finished(Ok(reply)),
        });

        assert_eq!(session.messages().len(), 2);
        assert!(session.messages()[1].is_agent_failure());
        assert!(session.error().is_none());
    }

    #[test]
    fn test_send_rejections() {
        let mut session = ChatSession::new();
        assert_eq!(
            session.begin_send_at("hi", None, now()).unwrap_err().reason,
            SendRejected::NoConversation
        );

        session.open("c1");
        assert_eq!(
            session.begin_send_at("   ", None, now()).unwrap_err().reason,
            SendRejected::Empty
        );
        assert_eq!(
            session.begin_send_at("hi", None, now()).unwrap_err().reason,
            SendRejected::Busy
        );

        let mut session = opened_with(vec![]);
        session.begin_send_at("first", None, now()).unwrap();
        assert_eq!(
            session.begin_send_at("second", None, now()).unwrap_err().reason,
            SendRejected::Busy
        );
    }

    #[test]
    fn test_rejected_send_returns_draft_with_image() {
        let mut session = opened_with(vec![]);
        session.begin_send_at("first", None, now()).unwrap();

        let image = ImageAttachment::new("image/png", None, vec![1u8, 2, 3]);
        let rejected = session
            .begin_send_at("  look at this  ", Some(image.clone()), now())
            .unwrap_err();

        assert_eq!(rejected.reason, SendRejected::Busy);
        assert_eq!(rejected.draft.content, "look at this");
        assert_eq!(rejected.draft.image, Some(image));
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_image_only_send_carries_preview() {
        let mut session = opened_with(vec![]);
        let image = ImageAttachment::new("image/png", None, vec![1u8, 2, 3]);
        let pending = session.begin_send_at("", Some(image), now()).unwrap();

        assert!(pending.message.image.is_some());
        let preview = session.messages()[0].image_url.as_deref().unwrap();
        assert!(preview.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_stale_history_is_dropped() {
        let mut session = ChatSession::new();
        let first = session.open("c1");
        let second = session.open("c2");

        let outcome = session.finish_history(history_ok(
            first,
            vec![server_message("x", MessageType::User, "old")],
        ));
        assert_eq!(outcome, Outcome::Stale);
        assert!(session.messages().is_empty());
        assert!(session.is_initializing());

        session.finish_history(history_ok(second, vec![]));
        assert!(!session.is_initializing());
    }

    #[test]
    fn test_stale_send_is_dropped() {
        let mut session = opened_with(vec![]);
        let pending = session.begin_send_at("hello", None, now()).unwrap();

        let request = session.open("c2");
        session.finish_history(history_ok(
            request,
            vec![server_message("9", MessageType::User, "other")],
        ));

        let outcome = session.finish_send(SendResponse {
            ticket: pending.ticket,
            completion: Completion::Finished(Ok(send_reply("1", "2"))),
        });
        assert_eq!(outcome, Outcome::Stale);
        let ids: Vec<String> = session.messages().iter().map(|m| m.id.to_string()).collect();
        assert_eq!(ids, vec!["9"]);
    }

    #[test]
    fn test_retry_reloads_only_when_empty() {
        let mut session = ChatSession::new();
        let request = session.open("c1");
        session.finish_history(HistoryResponse {
            request,
            completion: Completion::Finished(Err(ApiError::Timeout)),
        });

        let retry = session.retry().unwrap();
        assert_eq!(retry.conversation_id, "c1");
        assert!(session.error().is_none());
        assert!(session.is_initializing());

        let mut session = opened_with(vec![server_message("1", MessageType::User, "hi")]);
        let pending = session.begin_send_at("again", None, now()).unwrap();
        session.finish_send(SendResponse {
            ticket: pending.ticket,
            completion: Completion::Finished(Err(ApiError::Timeout)),
        });
        assert!(session.error().is_some());
        assert!(session.retry().is_none());
        assert!(session.error().is_none());
        assert_eq!(session.messages().len(), 1);
    }

    #[test]
    fn test_close_clears_everything() {
        let mut session = opened_with(vec![server_message("1", MessageType::User, "hi")]);
        session.close();
        assert!(session.conversation_id().is_none());
        assert!(session.messages().is_empty());
        assert!(!session.can_send());
    }

    #[tokio::test]
    async fn test_drivers_round_trip() {
        let backend = Arc::new(
            ScriptedBackend::new()
                .with_history(Err(ApiError::NotFound))
                .with_send(Ok(send_reply("1", "2"))),
        );
        let mut session = ChatSession::new();

        let request = session.open("c1");
        let response = load_history(backend.clone(), request, CancellationToken::new()).await;
        session.finish_history(response);
        assert!(session.error().is_none());

        let pending = session.begin_send("hello", None).unwrap();
        let response = dispatch_send(backend.clone(), pending, CancellationToken::new()).await;
        session.finish_send(response);

        let ids: Vec<String> = session.messages().iter().map(|m| m.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(
            backend.calls(),
            vec![
                Call::ListMessages("c1".to_string()),
                Call::SendMessage {
                    conversation_id: "c1".to_string(),
                    content: "hello".to_string(),
                    has_image: false,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_cancelled_send_leaves_no_ghost() {
        let backend = Arc::new(ScriptedBackend::new().hanging());
        let mut session = opened_with(vec![]);

        let pending = session.begin_send("hello", None).unwrap();
        let cancel = CancellationToken::new();
        let driver = tokio::spawn(dispatch_send(backend, pending, cancel.clone()));
        cancel.cancel();
        let response = driver.await.unwrap();
        assert!(matches!(response.completion, Completion::Cancelled));

        session.finish_send(response);
        assert!(session.messages().is_empty());
        assert!(session.error().is_none());
        assert!(!session.is_sending());
    }
}
