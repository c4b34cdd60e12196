//! Deepgram API client.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    error::{Error, Result},
    http::HttpClient,
    live::LiveService,
    prerecorded::PrerecordedService,
};

/// Default Deepgram API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.deepgram.com";

/// Default Deepgram WebSocket URL.
pub const DEFAULT_WS_URL: &str = "wss://api.deepgram.com";

/// Default HTTP request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Deepgram API client.
///
/// Cloning is cheap; all clones share one connection pool.
///
/// # Example
///
/// ```rust,no_run
/// use speechdesk_deepgram::Client;
///
/// let client = Client::builder("your-api-key").build()?;
/// let prerecorded = client.prerecorded();
/// # Ok::<(), speechdesk_deepgram::Error>(())
/// ```
#[derive(Clone)]
pub struct Client {
    http: Arc<HttpClient>,
}

impl Client {
    /// Creates a new client builder.
    pub fn builder(api_key: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(api_key)
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Returns the configured WebSocket URL.
    pub fn ws_url(&self) -> &str {
        self.http.ws_url()
    }

    /// Returns the prerecorded (batch) transcription service.
    pub fn prerecorded(&self) -> PrerecordedService {
        PrerecordedService::new(self.http.clone())
    }

    /// Returns the live (streaming) transcription service.
    pub fn live(&self) -> LiveService {
        LiveService::new(self.http.clone())
    }

    /// Returns a reference to the internal HTTP client.
    pub fn http(&self) -> &Arc<HttpClient> {
        &self.http
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.http.base_url())
            .field("ws_url", &self.http.ws_url())
            .finish_non_exhaustive()
    }
}

/// Builder for creating a Deepgram API client.
pub struct ClientBuilder {
    api_key: String,
    base_url: String,
    ws_url: String,
    timeout: Duration,
}

impl ClientBuilder {
    /// Creates a new client builder.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets a custom base URL for the API.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets a custom WebSocket URL.
    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.ws_url = url.into();
        self
    }

    /// Sets the HTTP request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<Client> {
        if self.api_key.is_empty() {
            return Err(Error::Config("api_key must be non-empty".to_string()));
        }

        let http = HttpClient::new(
            self.base_url.trim_end_matches('/').to_string(),
            self.ws_url.trim_end_matches('/').to_string(),
            self.api_key,
            self.timeout,
        )?;

        Ok(Client {
            http: Arc::new(http),
        })
    }
}
