use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Coarse classification of a failed backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response at all: connection refused, reset, DNS failure.
    Connectivity,
    Timeout,
    /// 4xx other than 404.
    ClientError,
    NotFound,
    /// 5xx.
    ServerError,
    InvalidResponse,
}

/// The backend call an error came from. Only used to pick the wording shown
/// to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListConversations,
    DeleteConversation,
    LoadHistory,
    SendMessage,
    LoadTopics,
    LoadStarters,
}

#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Cannot connect to {base_url}")]
    Connect { base_url: String },

    #[error("Request timed out")]
    Timeout,

    #[error("Bad request: {}", .error.as_deref().unwrap_or("no detail"))]
    BadRequest {
        error: Option<String>,
        details: Option<String>,
    },

    #[error("Not found")]
    NotFound,

    #[error("Server error (HTTP {status})")]
    Server { status: u16, error: Option<String> },

    #[error("HTTP {status} {reason}")]
    Status {
        status: u16,
        reason: String,
        error: Option<String>,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

/// Error payload the backend attaches to non-2xx responses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<serde_json::Value>,
}

impl ErrorBody {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    fn details_text(&self) -> Option<String> {
        match self.details.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl ApiError {
    /// Classify a non-success HTTP status together with its response body.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let parsed = ErrorBody::parse(body);
        match status {
            StatusCode::BAD_REQUEST => ApiError::BadRequest {
                details: parsed.details_text(),
                error: parsed.error,
            },
            StatusCode::NOT_FOUND => ApiError::NotFound,
            s if s.is_server_error() => ApiError::Server {
                status: s.as_u16(),
                error: parsed.error,
            },
            s => ApiError::Status {
                status: s.as_u16(),
                reason: s.canonical_reason().unwrap_or("Unknown").to_string(),
                error: parsed.error,
            },
        }
    }

    /// Classify a transport failure, i.e. one where no HTTP status was received.
    pub fn from_transport(err: reqwest::Error, base_url: &str) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() || err.is_request() {
            ApiError::Connect {
                base_url: base_url.to_string(),
            }
        } else if err.is_decode() {
            ApiError::InvalidResponse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Connect { .. } | ApiError::Network(_) => ErrorKind::Connectivity,
            ApiError::Timeout => ErrorKind::Timeout,
            ApiError::BadRequest { .. } | ApiError::Status { .. } | ApiError::InvalidUrl(_) => {
                ErrorKind::ClientError
            }
            ApiError::NotFound => ErrorKind::NotFound,
            ApiError::Server { .. } => ErrorKind::ServerError,
            ApiError::InvalidResponse(_) => ErrorKind::InvalidResponse,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }

    /// The HTTP status the backend answered with, if it answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        let code = match self {
            ApiError::BadRequest { .. } => 400,
            ApiError::NotFound => 404,
            ApiError::Server { status, .. } | ApiError::Status { status, .. } => *status,
            _ => return None,
        };
        StatusCode::from_u16(code).ok()
    }

    /// Text shown to the user for this failure.
    pub fn user_message(&self, op: Operation) -> String {
        // The conversation list reports every HTTP failure by status line
        if op == Operation::ListConversations {
            if let Some(status) = self.status() {
                return format!(
                    "Server error: {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                );
            }
        }

        match self {
            ApiError::Connect { base_url } => format!(
                "Cannot connect to server. Please check if the backend is running at {}.",
                base_url
            ),
            ApiError::Network(msg) => format!("Network error: {}", msg),
            ApiError::Timeout => match op {
                Operation::SendMessage => {
                    "Request timeout - the agent is taking too long to respond".to_string()
                }
                Operation::ListConversations => {
                    "Request timeout - please check if the server is running".to_string()
                }
                _ => "Request timeout - server is taking too long to respond".to_string(),
            },
            ApiError::BadRequest { error, details } => {
                let fallback = match op {
                    Operation::SendMessage => "Invalid message format",
                    _ => "Invalid request format",
                };
                let mut text = format!("Bad request: {}", error.as_deref().unwrap_or(fallback));
                if let Some(details) = details {
                    text.push_str(" - ");
                    text.push_str(details);
                }
                text
            }
            ApiError::NotFound => "Server error (404): Not Found".to_string(),
            ApiError::Server { error, .. } => format!(
                "Server error: {}",
                error.as_deref().unwrap_or("Internal server error")
            ),
            ApiError::Status {
                status,
                reason,
                error,
            } => format!(
                "Server error ({}): {}",
                status,
                error.as_deref().unwrap_or(reason)
            ),
            ApiError::InvalidResponse(msg) => format!("Invalid response from server: {}", msg),
            ApiError::InvalidUrl(msg) => format!("Invalid request URL: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_request_with_detail() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"error": "Content is required", "details": "content: blank"}"#,
        );
        assert_eq!(err.kind(), ErrorKind::ClientError);
        assert_eq!(
            err.user_message(Operation::SendMessage),
            "Bad request: Content is required - content: blank"
        );
    }

    #[test]
    fn test_bad_request_without_body() {
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, "<html>oops</html>");
        assert_eq!(
            err.user_message(Operation::SendMessage),
            "Bad request: Invalid message format"
        );
        assert_eq!(
            err.user_message(Operation::LoadHistory),
            "Bad request: Invalid request format"
        );
    }

    #[test]
    fn test_structured_details_are_flattened() {
        let err = ApiError::from_status(
            StatusCode::BAD_REQUEST,
            r#"{"error": "Invalid", "details": {"image": ["too large"]}}"#,
        );
        assert_eq!(
            err.user_message(Operation::SendMessage),
            r#"Bad request: Invalid - {"image":["too large"]}"#
        );
    }

    #[test]
    fn test_not_found() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, "");
        assert!(err.is_not_found());
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_server_errors() {
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "");
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(
            err.user_message(Operation::SendMessage),
            "Server error: Internal server error"
        );

        let err = ApiError::from_status(
            StatusCode::BAD_GATEWAY,
            r#"{"error": "Upstream agent unavailable"}"#,
        );
        assert_eq!(err.kind(), ErrorKind::ServerError);
        assert_eq!(
            err.user_message(Operation::LoadHistory),
            "Server error: Upstream agent unavailable"
        );
    }

    #[test]
    fn test_other_status_uses_reason_phrase() {
        let err = ApiError::from_status(StatusCode::FORBIDDEN, "");
        assert_eq!(err.kind(), ErrorKind::ClientError);
        assert_eq!(
            err.user_message(Operation::LoadHistory),
            "Server error (403): Forbidden"
        );
    }

    #[test]
    fn test_list_conversations_reports_status_line() {
        let err = ApiError::from_status(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error": "database is down"}"#,
        );
        assert_eq!(
            err.user_message(Operation::ListConversations),
            "Server error: 500 Internal Server Error"
        );

        let err = ApiError::from_status(StatusCode::FORBIDDEN, "");
        assert_eq!(
            err.user_message(Operation::ListConversations),
            "Server error: 403 Forbidden"
        );

        let err = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"error": "nope"}"#);
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(
            err.user_message(Operation::ListConversations),
            "Server error: 400 Bad Request"
        );

        // No status: transport wording still applies
        assert!(ApiError::Timeout
            .user_message(Operation::ListConversations)
            .contains("check if the server is running"));
    }

    #[test]
    fn test_timeout_wording_depends_on_operation() {
        let err = ApiError::Timeout;
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err
            .user_message(Operation::SendMessage)
            .contains("the agent is taking too long"));
        assert!(err
            .user_message(Operation::LoadHistory)
            .contains("server is taking too long"));
    }

    #[test]
    fn test_connect_message_names_server() {
        let err = ApiError::Connect {
            base_url: "http://localhost:8000/chatbot".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert!(err
            .user_message(Operation::LoadHistory)
            .starts_with("Cannot connect to server."));
    }
}
