//! Reference-voice speech synthesis.
//!
//! # Pipeline
//!
//! 1. [`audio::decode_reference`]: WAV/MP3 bytes -> mono [`Waveform`]
//! 2. [`SpeechModel::make_speaker_embedding`]: waveform -> [`SpeakerEmbedding`]
//! 3. [`SpeechModel::prepare_conditioning`]: ([`CondDict`]) -> [`Conditioning`]
//! 4. [`SpeechModel::generate`]: conditioning -> [`Codes`]
//! 5. [`SpeechModel::decode`]: codes -> samples at [`SpeechModel::sampling_rate`]
//! 6. [`audio::encode_wav`]: samples -> 16-bit PCM WAV written to the output path
//!
//! [`Synthesizer`] runs the whole pipeline; [`ModelLoader`] loads the model
//! once per process and hands out shared references.
//!
//! # Example
//!
//! ```rust,no_run
//! use speechdesk_synth::{Language, ModelLoader, SynthesisRequest, Synthesizer};
//!
//! # async fn example() -> speechdesk_synth::Result<()> {
//! let loader = ModelLoader::remote("http://127.0.0.1:7860", "Zyphra/Zonos-v0.1-transformer");
//! let synth = Synthesizer::new(loader.get().await?);
//!
//! let output = synth
//!     .synthesize(&SynthesisRequest {
//!         text: "Hello, world!".to_string(),
//!         reference: Some(std::fs::read("voice.wav")?.into()),
//!         reference_name: Some("voice.wav".to_string()),
//!         language: Language::EnUs,
//!     })
//!     .await?;
//! println!("wrote {}", output.path.display());
//! # Ok(())
//! # }
//! ```

pub mod audio;
mod error;
mod loader;
mod model;
mod remote;
mod synthesizer;
mod types;

pub use error::{Error, Result};
pub use loader::ModelLoader;
pub use model::SpeechModel;
pub use remote::{ModelInfo, RemoteModel};
pub use synthesizer::{
    SynthesisOutput, SynthesisRequest, Synthesizer, DEFAULT_OUTPUT_PATH, DOWNLOAD_FILE_NAME,
    DOWNLOAD_MIME_TYPE,
};
pub use types::{Codes, CondDict, Conditioning, Language, SpeakerEmbedding, Waveform};
