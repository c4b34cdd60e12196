use thiserror::Error;

/// Result type alias for application operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the applications.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Deepgram(#[from] speechdesk_deepgram::Error),

    #[error(transparent)]
    Synth(#[from] speechdesk_synth::Error),

    #[error("{0}")]
    InvalidFeatures(String),

    #[error("invalid value: {0}")]
    InvalidInput(String),

    #[error("no live session is running")]
    NotConnected,
}
