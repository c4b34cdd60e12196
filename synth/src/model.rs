use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Codes, CondDict, Conditioning, SpeakerEmbedding, Waveform};

/// A pretrained reference-voice speech model.
///
/// The stages mirror how such models are driven: embed the reference
/// speaker, prepare conditioning, generate codes, decode to audio.
///
/// # Thread Safety
///
/// Implementations must be safe for concurrent use; one loaded model is
/// shared across every synthesis request.
#[async_trait]
pub trait SpeechModel: Send + Sync {
    /// Derives a speaker embedding from a reference clip.
    async fn make_speaker_embedding(&self, wav: &Waveform) -> Result<SpeakerEmbedding>;

    /// Turns a conditioning dictionary into model conditioning.
    async fn prepare_conditioning(&self, cond: &CondDict) -> Result<Conditioning>;

    /// Runs one generation pass.
    async fn generate(&self, conditioning: &Conditioning) -> Result<Codes>;

    /// Decodes codes to mono samples at [`SpeechModel::sampling_rate`].
    async fn decode(&self, codes: &Codes) -> Result<Vec<f32>>;

    /// Native sample rate of the decoder.
    fn sampling_rate(&self) -> u32;
}
