//! HTTP client implementation for the Deepgram API.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT},
    Client as ReqwestClient, Response,
};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

/// Header carrying the request ID on every Deepgram response.
pub const REQUEST_ID_HEADER: &str = "dg-request-id";

const USER_AGENT_VALUE: &str = "speechdesk-deepgram-rust/1.0";

/// HTTP client for the Deepgram API.
pub struct HttpClient {
    client: ReqwestClient,
    base_url: String,
    ws_url: String,
    api_key: String,
}

/// Request body for the listen endpoint.
#[derive(Debug, Clone)]
pub enum Body {
    /// JSON document, used for `{"url": ...}` sources.
    Json(serde_json::Value),
    /// Raw audio bytes sent with the given content type.
    Binary { content_type: String, data: Bytes },
}

impl HttpClient {
    /// Creates a new HTTP client.
    pub fn new(base_url: String, ws_url: String, api_key: String, timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            ws_url,
            api_key,
        })
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the WebSocket URL.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Returns the `Authorization` header value (`Token {api_key}`).
    pub fn auth_value(&self) -> Result<HeaderValue> {
        HeaderValue::from_str(&format!("Token {}", self.api_key))
            .map_err(|e| Error::Config(format!("api_key is not a valid header value: {}", e)))
    }

    /// Builds an endpoint URL under `root` with the given query pairs.
    pub fn endpoint(&self, root: &str, path: &str, query: &[(String, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", root, path))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    /// POSTs `body` to `path` and returns the JSON response verbatim.
    pub async fn post(
        &self,
        path: &str,
        query: &[(String, String)],
        body: Body,
    ) -> Result<serde_json::Value> {
        let url = self.endpoint(&self.base_url, path, query)?;
        tracing::debug!(%url, "deepgram request");

        let mut headers = self.default_headers()?;
        let request = match body {
            Body::Json(value) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                self.client.post(url).headers(headers).json(&value)
            }
            Body::Binary { content_type, data } => {
                let value = HeaderValue::from_str(&content_type)
                    .map_err(|e| Error::Other(format!("invalid mimetype {:?}: {}", content_type, e)))?;
                headers.insert(CONTENT_TYPE, value);
                self.client.post(url).headers(headers).body(data)
            }
        };

        let response = request.send().await?;
        self.handle_response(response).await
    }

    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, self.auth_value()?);
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        Ok(headers)
    }

    async fn handle_response(&self, response: Response) -> Result<serde_json::Value> {
        let status = response.status();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(parse_error(&body, status.as_u16(), &request_id));
        }

        serde_json::from_slice(&body).map_err(Error::from)
    }
}

/// Error body shapes returned by Deepgram.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    err_code: Option<String>,
    #[serde(default)]
    err_msg: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
}

/// Parses an error response body.
pub(crate) fn parse_error(body: &[u8], http_status: u16, request_id: &str) -> Error {
    if let Ok(api) = serde_json::from_slice::<ApiErrorBody>(body) {
        let message = api
            .err_msg
            .or(api.message)
            .or(api.details)
            .unwrap_or_default();
        if !message.is_empty() {
            return Error::Api {
                code: api.err_code.or(api.category).unwrap_or_default(),
                message,
                request_id: api.request_id.unwrap_or_else(|| request_id.to_string()),
                http_status,
            };
        }
    }

    Error::Api {
        code: String::new(),
        message: String::from_utf8_lossy(body).to_string(),
        request_id: request_id.to_string(),
        http_status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpClient {
        HttpClient::new(
            "https://api.deepgram.com".into(),
            "wss://api.deepgram.com".into(),
            "secret".into(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_query() {
        let http = client();
        let url = http
            .endpoint(
                http.base_url(),
                "/v1/listen",
                &[
                    ("model".into(), "nova".into()),
                    ("keywords".into(), "a b".into()),
                ],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.deepgram.com/v1/listen?model=nova&keywords=a+b"
        );
    }

    #[test]
    fn test_auth_value() {
        assert_eq!(client().auth_value().unwrap(), "Token secret");
    }

    #[test]
    fn test_parse_error_v1_shape() {
        let body = br#"{"err_code":"INVALID_AUTH","err_msg":"Invalid credentials.","request_id":"r-1"}"#;
        match parse_error(body, 401, "") {
            Error::Api {
                code,
                message,
                request_id,
                http_status,
            } => {
                assert_eq!(code, "INVALID_AUTH");
                assert_eq!(message, "Invalid credentials.");
                assert_eq!(request_id, "r-1");
                assert_eq!(http_status, 401);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_category_shape() {
        let body = br#"{"category":"INVALID_QUERY_PARAMETER","message":"bad tier","details":"tier"}"#;
        match parse_error(body, 400, "hdr-id") {
            Error::Api {
                code, request_id, ..
            } => {
                assert_eq!(code, "INVALID_QUERY_PARAMETER");
                assert_eq!(request_id, "hdr-id");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_error_plain_text() {
        let err = parse_error(b"upstream exploded", 502, "");
        assert!(err.is_server_error());
        assert!(err.to_string().contains("upstream exploded"));
    }
}
