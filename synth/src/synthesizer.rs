use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::audio::{decode_reference, write_wav};
use crate::error::{Error, Result};
use crate::model::SpeechModel;
use crate::types::{CondDict, Language, Waveform};

/// File the generated audio is written to, overwritten on every run.
pub const DEFAULT_OUTPUT_PATH: &str = "output.wav";

/// File name offered when the generated audio is downloaded.
pub const DOWNLOAD_FILE_NAME: &str = "generated_speech.wav";

/// MIME type of the generated audio.
pub const DOWNLOAD_MIME_TYPE: &str = "audio/wav";

/// One synthesis job.
#[derive(Debug, Clone, Default)]
pub struct SynthesisRequest {
    pub text: String,
    /// Reference clip bytes (WAV or MP3).
    pub reference: Option<Bytes>,
    /// Original file name of the clip, used for format detection.
    pub reference_name: Option<String>,
    pub language: Language,
}

/// Result of a synthesis job.
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    /// Where the WAV file was written.
    pub path: PathBuf,
    /// The WAV file contents.
    pub wav: Bytes,
    pub duration: Duration,
}

/// Drives a [`SpeechModel`] from text plus a reference clip to a WAV file.
pub struct Synthesizer {
    model: Arc<dyn SpeechModel>,
    output_path: PathBuf,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn SpeechModel>) -> Self {
        Self {
            model,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
        }
    }

    /// Sets where the WAV file is written.
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Runs the full pipeline and writes the result to the output path.
    pub async fn synthesize(&self, req: &SynthesisRequest) -> Result<SynthesisOutput> {
        let reference = req.reference.as_ref().ok_or(Error::MissingReference)?;
        let clip = decode_reference(reference, req.reference_name.as_deref())?;
        tracing::debug!(
            language = %req.language,
            chars = req.text.chars().count(),
            reference_secs = clip.duration().as_secs_f32(),
            "synthesizing"
        );

        let speaker = self.model.make_speaker_embedding(&clip).await?;
        let cond = CondDict::new(req.text.clone(), speaker, req.language);
        let conditioning = self.model.prepare_conditioning(&cond).await?;
        let codes = self.model.generate(&conditioning).await?;
        let samples = self.model.decode(&codes).await?;

        let out = Waveform::new(samples, self.model.sampling_rate());
        let wav = Bytes::from(write_wav(&self.output_path, &out).await?);
        tracing::info!(
            path = %self.output_path.display(),
            frames = codes.frames(),
            secs = out.duration().as_secs_f32(),
            "wrote generated speech"
        );

        Ok(SynthesisOutput {
            path: self.output_path.clone(),
            wav,
            duration: out.duration(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encode_wav;
    use crate::types::{Codes, Conditioning, SpeakerEmbedding};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Emits `frames` samples of a constant level derived from the text length.
    struct EchoModel {
        seen: Mutex<Vec<CondDict>>,
    }

    #[async_trait]
    impl SpeechModel for EchoModel {
        async fn make_speaker_embedding(&self, wav: &Waveform) -> Result<SpeakerEmbedding> {
            Ok(SpeakerEmbedding(vec![wav.sample_rate as f32]))
        }
        async fn prepare_conditioning(&self, cond: &CondDict) -> Result<Conditioning> {
            self.seen.lock().unwrap().push(cond.clone());
            Ok(Conditioning(serde_json::json!({"len": cond.text.len()})))
        }
        async fn generate(&self, c: &Conditioning) -> Result<Codes> {
            let len = c.0["len"].as_u64().unwrap_or(0) as usize;
            Ok(Codes(vec![vec![0; len * 100]]))
        }
        async fn decode(&self, codes: &Codes) -> Result<Vec<f32>> {
            Ok(vec![0.25; codes.frames()])
        }
        fn sampling_rate(&self) -> u32 {
            44100
        }
    }

    fn reference_clip() -> Bytes {
        Bytes::from(encode_wav(&Waveform::new(vec![0.1; 1600], 16000)).unwrap())
    }

    fn model() -> Arc<EchoModel> {
        Arc::new(EchoModel {
            seen: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn test_synthesize_writes_wav_at_model_rate() {
        let dir = tempfile::tempdir().unwrap();
        let model = model();
        let synth = Synthesizer::new(model.clone()).with_output_path(dir.path().join(DEFAULT_OUTPUT_PATH));

        let out = synth
            .synthesize(&SynthesisRequest {
                text: "hola".to_string(),
                reference: Some(reference_clip()),
                reference_name: Some("me.wav".to_string()),
                language: Language::EsEs,
            })
            .await
            .unwrap();

        let on_disk = std::fs::read(&out.path).unwrap();
        assert_eq!(on_disk, out.wav.to_vec());
        let reader = hound::WavReader::new(std::io::Cursor::new(on_disk)).unwrap();
        assert_eq!(reader.spec().sample_rate, 44100);
        assert_eq!(reader.spec().bits_per_sample, 16);
        assert_eq!(reader.len(), 400);

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].language, Language::EsEs);
        assert_eq!(seen[0].speaker, SpeakerEmbedding(vec![16000.0]));
    }

    #[tokio::test]
    async fn test_synthesize_overwrites_previous_output() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Synthesizer::new(model()).with_output_path(dir.path().join("out.wav"));

        let mut req = SynthesisRequest {
            text: "a much longer sentence".to_string(),
            reference: Some(reference_clip()),
            ..Default::default()
        };
        let first = synth.synthesize(&req).await.unwrap();

        req.text = "hi".to_string();
        let second = synth.synthesize(&req).await.unwrap();
        assert!(second.wav.len() < first.wav.len());
        assert_eq!(std::fs::read(&second.path).unwrap(), second.wav.to_vec());
    }

    #[tokio::test]
    async fn test_synthesize_requires_reference() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let synth = Synthesizer::new(model()).with_output_path(&path);

        let err = synth
            .synthesize(&SynthesisRequest {
                text: "hello".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingReference));
        assert!(!path.exists());
    }
}
