//! Deepgram speech-to-text API SDK for Rust.
//!
//! # Features
//!
//! - Prerecorded: one request/response transcription of a remote URL or an
//!   in-memory audio buffer, with a free-form feature map
//! - Live: streaming transcription over a WebSocket session whose events are
//!   delivered through a bounded queue
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use speechdesk_deepgram::{Client, Features, TranscriptionSource};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder("your-api-key").build()?;
//!
//!     let mut features = Features::new();
//!     features.insert("model".to_string(), "nova".into());
//!     features.insert("punctuate".to_string(), true.into());
//!
//!     let response = client
//!         .prerecorded()
//!         .transcribe(
//!             &TranscriptionSource::url("https://res.cloudinary.com/deepgram/video/upload/v1/demo.mp3"),
//!             &features,
//!         )
//!         .await?;
//!
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!     Ok(())
//! }
//! ```
//!
//! # Live transcription
//!
//! ```rust,no_run
//! use speechdesk_deepgram::{Client, LiveEvent, LiveOptions};
//!
//! # async fn example(audio: &[u8]) -> speechdesk_deepgram::Result<()> {
//! let client = Client::builder("your-api-key").build()?;
//! let mut session = client.live().connect(&LiveOptions::default()).await?;
//!
//! session.send_audio(audio).await?;
//! session.finalize().await?;
//!
//! while let Some(event) = session.recv().await {
//!     if let LiveEvent::Transcript(result) = &event {
//!         println!("{}", result.transcript());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod events;
pub mod http;
mod live;
mod options;
mod prerecorded;

pub use client::{Client, ClientBuilder, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, DEFAULT_WS_URL};
pub use error::{Error, Result};
pub use events::{
    Alternative, Channel, CloseEvent, ErrorEvent, LiveEvent, LiveEventKind, LiveResult,
    OpenEvent, Word,
};
pub use live::{
    LiveOptions, LiveService, LiveSession, DEFAULT_EVENT_CAPACITY, DEFAULT_LIVE_LANGUAGE,
    DEFAULT_LIVE_MODEL, KEEPALIVE_INTERVAL,
};
pub use options::{encode_features, Features};
pub use prerecorded::{PrerecordedService, TranscriptionSource};
