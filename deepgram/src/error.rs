//! Error types for the Deepgram API client.

use thiserror::Error;

/// Result type alias for Deepgram operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Deepgram API operations.
#[derive(Error, Debug)]
pub enum Error {
    /// API error returned by Deepgram.
    #[error("deepgram: {message} (status={http_status}, code={code}, request_id={request_id})")]
    Api {
        code: String,
        message: String,
        request_id: String,
        http_status: u16,
    },

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Invalid URL.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Live session already closed.
    #[error("session closed")]
    SessionClosed,

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates a new API error.
    pub fn api(http_status: u16, message: impl Into<String>) -> Self {
        Error::Api {
            code: String::new(),
            message: message.into(),
            request_id: String::new(),
            http_status,
        }
    }

    /// Returns the HTTP status for API errors.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Error::Api { http_status, .. } => Some(*http_status),
            _ => None,
        }
    }

    /// Returns true if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self.http_status(), Some(401 | 403))
    }

    /// Returns true if this is a rate limit error.
    pub fn is_rate_limit(&self) -> bool {
        self.http_status() == Some(429)
    }

    /// Returns true if this is an invalid parameter error.
    pub fn is_invalid_param(&self) -> bool {
        self.http_status() == Some(400)
    }

    /// Returns true if this is a server-side error.
    pub fn is_server_error(&self) -> bool {
        matches!(self.http_status(), Some(s) if s >= 500)
    }
}
