//! Prerecorded (batch) transcription.
//!
//! # Endpoint
//!
//! - POST `/v1/listen` - one request, one JSON response
//!
//! The source is either a JSON document `{"url": ...}` or the raw audio
//! bytes with their MIME type as `Content-Type`. Features travel as query
//! parameters.

use std::sync::Arc;

use bytes::Bytes;

use crate::{
    error::Result,
    http::{Body, HttpClient},
    options::{encode_features, Features},
};

const LISTEN_PATH: &str = "/v1/listen";

/// Audio to transcribe.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptionSource {
    /// Remote audio fetched by the service.
    Url { url: String },
    /// Uploaded audio bytes.
    Buffer { mimetype: String, buffer: Bytes },
}

impl TranscriptionSource {
    /// Creates a remote URL source.
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url { url: url.into() }
    }

    /// Creates an in-memory buffer source.
    pub fn buffer(mimetype: impl Into<String>, buffer: impl Into<Bytes>) -> Self {
        Self::Buffer {
            mimetype: mimetype.into(),
            buffer: buffer.into(),
        }
    }

    fn into_body(self) -> Body {
        match self {
            Self::Url { url } => Body::Json(serde_json::json!({ "url": url })),
            Self::Buffer { mimetype, buffer } => Body::Binary {
                content_type: mimetype,
                data: buffer,
            },
        }
    }
}

/// Prerecorded transcription service.
pub struct PrerecordedService {
    http: Arc<HttpClient>,
}

impl PrerecordedService {
    pub(crate) fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// Transcribes `source` with the given features.
    ///
    /// The vendor response is returned unmodified.
    pub async fn transcribe(
        &self,
        source: &TranscriptionSource,
        features: &Features,
    ) -> Result<serde_json::Value> {
        let query = encode_features(features);
        if let TranscriptionSource::Buffer { mimetype, buffer } = source {
            tracing::debug!(mimetype = %mimetype, bytes = buffer.len(), "transcribing buffer");
        }
        self.http
            .post(LISTEN_PATH, &query, source.clone().into_body())
            .await
    }
}
