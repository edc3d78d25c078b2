use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const APP_ID: &str = "com.confab.Confab";
pub const APP_NAME: &str = "Confab";

/// Environment variable that overrides the backend base URL.
pub const API_URL_ENV: &str = "CONFAB_API_URL";
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/chatbot";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid backend URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported URL scheme '{0}': expected http or https")]
    UnsupportedScheme(String),

    #[error("Backend URL '{0}' cannot be used as a base")]
    NotABase(String),
}

/// Per-operation request timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub list_conversations: Duration,
    pub delete_conversation: Duration,
    pub load_history: Duration,
    pub send_message: Duration,
    pub starters: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            list_conversations: Duration::from_secs(10),
            delete_conversation: Duration::from_secs(10),
            load_history: Duration::from_secs(15),
            // The agent may take a while to answer
            send_message: Duration::from_secs(120),
            starters: Duration::from_secs(10),
        }
    }
}

impl Timeouts {
    /// Same timeout for every operation. Mostly useful in tests.
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            list_conversations: timeout,
            delete_conversation: timeout,
            load_history: timeout,
            send_message: timeout,
            starters: timeout,
        }
    }
}

/// Connection settings for the chat backend, passed explicitly into the
/// client at construction.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
    pub timeouts: Timeouts,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim();
        let url = Url::parse(trimmed).map_err(|source| ConfigError::InvalidUrl {
            url: trimmed.to_string(),
            source,
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }
        if url.cannot_be_a_base() {
            return Err(ConfigError::NotABase(trimmed.to_string()));
        }

        Ok(Self {
            base_url: url,
            timeouts: Timeouts::default(),
        })
    }

    /// Read the base URL from `CONFAB_API_URL`, falling back to the local
    /// development server.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(API_URL_ENV) {
            Ok(value) if !value.trim().is_empty() => Self::new(&value),
            _ => Self::new(DEFAULT_API_BASE_URL),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Base URL without a trailing slash, for display in messages.
    pub fn display_base(&self) -> String {
        self.base_url.as_str().trim_end_matches('/').to_string()
    }
}
