//! Prerecorded transcription form.
//!
//! The form takes an uploaded file or a remote URL plus a JSON feature map,
//! and sends exactly one request when the input is usable.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use speechdesk_deepgram::{Features, PrerecordedService, TranscriptionSource};

use crate::error::{Error, Result};
use crate::surface::Surface;

/// Remote URLs must start with this prefix unless configured otherwise.
pub const DEFAULT_ALLOWED_URL_PREFIX: &str = "https://res.cloudinary.com/deepgram";

/// Shown when neither a file nor an accepted URL was given.
pub const NO_INPUT_MESSAGE: &str = "You need to choose a file or provide a valid URL.";

/// Sends one prerecorded transcription request.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(
        &self,
        source: &TranscriptionSource,
        features: &Features,
    ) -> speechdesk_deepgram::Result<Value>;
}

#[async_trait]
impl Transcriber for PrerecordedService {
    async fn transcribe(
        &self,
        source: &TranscriptionSource,
        features: &Features,
    ) -> speechdesk_deepgram::Result<Value> {
        PrerecordedService::transcribe(self, source, features).await
    }
}

/// Transcription model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Model {
    #[default]
    Nova,
    Whisper,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::Nova => "nova",
            Model::Whisper => "whisper",
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nova" => Ok(Model::Nova),
            "whisper" => Ok(Model::Whisper),
            other => Err(Error::InvalidInput(format!(
                "model '{}' (expected nova or whisper)",
                other
            ))),
        }
    }
}

/// Whisper tier. Ignored for other models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tier {
    #[default]
    Base,
    Enhanced,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Base => "base",
            Tier::Enhanced => "enhanced",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base" => Ok(Tier::Base),
            "enhanced" => Ok(Tier::Enhanced),
            other => Err(Error::InvalidInput(format!(
                "tier '{}' (expected base or enhanced)",
                other
            ))),
        }
    }
}

/// An uploaded audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub name: String,
    pub mimetype: String,
    pub data: Bytes,
}

impl UploadedFile {
    /// Creates an upload, guessing the MIME type from the file name.
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let name = name.into();
        let mimetype = guess_mimetype(&name).to_string();
        Self {
            name,
            mimetype,
            data: data.into(),
        }
    }

    /// Overrides the MIME type, e.g. with the one a browser reported.
    /// Empty and generic binary types keep the guess.
    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        let mimetype = mimetype.into();
        if !mimetype.is_empty() && mimetype != "application/octet-stream" {
            self.mimetype = mimetype;
        }
        self
    }
}

fn guess_mimetype(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        _ => "application/octet-stream",
    }
}

/// The inputs of one batch transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionForm {
    pub file: Option<UploadedFile>,
    pub url: Option<String>,
    /// Feature map as JSON text.
    pub features_json: String,
    pub model: Model,
    pub version: Option<String>,
    pub tier: Option<Tier>,
}

impl Default for TranscriptionForm {
    fn default() -> Self {
        Self {
            file: None,
            url: None,
            features_json: "{}".to_string(),
            model: Model::default(),
            version: None,
            tier: None,
        }
    }
}

/// Picks the audio source. An uploaded file wins over a URL; a URL is only
/// accepted when it starts with `allowed_url_prefix`.
pub fn build_source(form: &TranscriptionForm, allowed_url_prefix: &str) -> Option<TranscriptionSource> {
    if let Some(file) = &form.file {
        return Some(TranscriptionSource::buffer(
            file.mimetype.clone(),
            file.data.clone(),
        ));
    }
    form.url
        .as_deref()
        .filter(|url| !url.is_empty() && url.starts_with(allowed_url_prefix))
        .map(TranscriptionSource::url)
}

/// Parses the feature map and applies the model selectors.
pub fn build_features(form: &TranscriptionForm) -> Result<Features> {
    let value: Value = serde_json::from_str(&form.features_json)
        .map_err(|e| Error::InvalidFeatures(e.to_string()))?;
    let Value::Object(mut features) = value else {
        return Err(Error::InvalidFeatures(
            "features must be a JSON object".to_string(),
        ));
    };

    features.insert("model".to_string(), Value::from(form.model.as_str()));
    if let Some(version) = form.version.as_deref().filter(|v| !v.is_empty()) {
        features.insert("version".to_string(), Value::from(version));
    }
    if form.model == Model::Whisper {
        if let Some(tier) = form.tier {
            features.insert("tier".to_string(), Value::from(tier.as_str()));
        }
    }
    Ok(features)
}

/// Runs the batch form: renders the vendor response as JSON, or one error.
///
/// Returns the response when a request was sent and succeeded.
pub async fn transcribe_file(
    transcriber: &dyn Transcriber,
    form: &TranscriptionForm,
    allowed_url_prefix: &str,
    surface: &mut dyn Surface,
) -> Option<Value> {
    let source = build_source(form, allowed_url_prefix);

    let features = match build_features(form) {
        Ok(f) => f,
        Err(e) => {
            surface.error(&format!("Error: {}", e));
            return None;
        }
    };

    let Some(source) = source else {
        surface.error(NO_INPUT_MESSAGE);
        return None;
    };

    match transcriber.transcribe(&source, &features).await {
        Ok(response) => {
            surface.json(&response);
            Some(response)
        }
        Err(e) => {
            tracing::warn!(error = %e, "transcription failed");
            surface.error(&format!("Error: {}", e));
            None
        }
    }
}
