use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use url::Url;

use super::error::ApiError;
use super::traits::ChatBackend;
use super::types::{
    MessageList, OutgoingMessage, SendMessageResponse, StartersResponse, TopicsResponse,
};
use crate::config::ApiConfig;
use crate::models::{Conversation, Message};

/// HTTP implementation of [`ChatBackend`].
pub struct BackendClient {
    http: Client,
    config: ApiConfig,
}

impl BackendClient {
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let http = Client::builder()
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: ApiConfig, http: Client) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Append path segments to the base URL, keeping the trailing slash the
    /// backend routes expect.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.config.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments)
            .push("");
        Ok(url)
    }

    fn get(&self, url: Url, timeout: Duration) -> RequestBuilder {
        self.http
            .get(url)
            .header("Content-Type", "application/json")
            .timeout(timeout)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_transport(e, &self.config.display_base()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!("Backend returned HTTP {}: {}", status.as_u16(), body);
        Err(ApiError::from_status(status, &body))
    }

    async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T, ApiError> {
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::from_transport(e, &self.config.display_base()))?;
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ChatBackend for BackendClient {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        let url = self.endpoint(&["conversations"])?;
        tracing::debug!("Loading conversations from {}", url);

        let response = self
            .execute(self.get(url, self.config.timeouts.list_conversations))
            .await?;
        self.read_json(response).await
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["conversations", conversation_id])?;
        tracing::debug!("Deleting conversation at {}", url);

        let request = self
            .http
            .delete(url)
            .header("Content-Type", "application/json")
            .timeout(self.config.timeouts.delete_conversation);
        self.execute(request).await?;
        Ok(())
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, ApiError> {
        let url = self.endpoint(&["conversations", conversation_id, "messages", "list"])?;
        tracing::debug!("Loading messages from {}", url);

        let response = self
            .execute(self.get(url, self.config.timeouts.load_history))
            .await?;
        let list: MessageList = self.read_json(response).await?;
        Ok(list.messages)
    }

    async fn send_message(
        &self,
        conversation_id: &str,
        message: OutgoingMessage,
    ) -> Result<SendMessageResponse, ApiError> {
        let url = self.endpoint(&["conversations", conversation_id, "messages"])?;
        tracing::debug!(
            "Sending message to {} (has image: {})",
            url,
            message.image.is_some()
        );

        let mut form = Form::new().text("content", message.content);
        if let Some(image) = message.image {
            let part = Part::bytes(image.data.to_vec())
                .file_name(image.upload_name())
                .mime_str(&image.mime_type)
                .map_err(|e| ApiError::InvalidResponse(format!("Invalid MIME type: {}", e)))?;
            form = form.part("image", part);
        }

        let request = self
            .http
            .post(url)
            .multipart(form)
            .timeout(self.config.timeouts.send_message);
        let response = self.execute(request).await?;
        self.read_json(response).await
    }

    async fn list_topics(&self) -> Result<Vec<String>, ApiError> {
        let url = self.endpoint(&["conversation-starters"])?;
        tracing::debug!("Loading topics from {}", url);

        let response = self
            .execute(self.get(url, self.config.timeouts.starters))
            .await?;
        let topics: TopicsResponse = self.read_json(response).await?;
        Ok(topics.available_topics)
    }

    async fn list_starters(&self, topic: &str) -> Result<String, ApiError> {
        let mut url = self.endpoint(&["conversation-starters"])?;
        url.query_pairs_mut().append_pair("topic", topic);
        tracing::debug!("Loading starters from {}", url);

        let response = self
            .execute(self.get(url, self.config.timeouts.starters))
            .await?;
        let starters: StartersResponse = self.read_json(response).await?;
        Ok(starters.starters.into_joined())
    }
}
