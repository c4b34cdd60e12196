use thiserror::Error;

/// Result type alias for synthesis operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the synthesis pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("a reference audio clip is required")]
    MissingReference,

    #[error("unsupported language: {0} (expected en-us, es-es or fr-fr)")]
    UnsupportedLanguage(String),

    #[error("unsupported audio format: {0}")]
    UnsupportedAudio(String),

    #[error("audio contains no samples")]
    EmptyAudio,

    #[error("wav error: {0}")]
    Wav(#[from] hound::Error),

    #[error("mp3 error: {0}")]
    Mp3(String),

    #[error("model error: {message} (status={status})")]
    Model { status: u16, message: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<minimp3::Error> for Error {
    fn from(e: minimp3::Error) -> Self {
        Error::Mp3(format!("{:?}", e))
    }
}
