//! Reference-voice speech synthesis.

use speechdesk_synth::{
    SynthesisOutput, SynthesisRequest, Synthesizer, DOWNLOAD_FILE_NAME, DOWNLOAD_MIME_TYPE,
};

use crate::error::Result;
use crate::surface::Surface;

/// Generates speech and offers it for playback and download.
///
/// Pipeline errors are returned to the caller, which decides how to show them.
pub async fn synthesize_speech(
    synthesizer: &Synthesizer,
    request: &SynthesisRequest,
    surface: &mut dyn Surface,
) -> Result<SynthesisOutput> {
    let output = synthesizer.synthesize(request).await?;
    surface.audio(&output.path, DOWNLOAD_MIME_TYPE);
    surface.download(DOWNLOAD_FILE_NAME, DOWNLOAD_MIME_TYPE, &output.wav);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::surface::{Recorder, Rendered};
    use async_trait::async_trait;
    use bytes::Bytes;
    use speechdesk_synth::{
        audio::encode_wav, Codes, CondDict, Conditioning, Language, SpeakerEmbedding,
        SpeechModel, Waveform, DEFAULT_OUTPUT_PATH,
    };
    use std::sync::Arc;

    /// Deterministic model: one sample per character at a fixed level.
    struct FixedModel;

    #[async_trait]
    impl SpeechModel for FixedModel {
        async fn make_speaker_embedding(&self, _wav: &Waveform) -> speechdesk_synth::Result<SpeakerEmbedding> {
            Ok(SpeakerEmbedding(vec![1.0; 4]))
        }
        async fn prepare_conditioning(&self, cond: &CondDict) -> speechdesk_synth::Result<Conditioning> {
            Ok(Conditioning(serde_json::json!({"text": cond.text})))
        }
        async fn generate(&self, c: &Conditioning) -> speechdesk_synth::Result<Codes> {
            let len = c.0["text"].as_str().map(str::len).unwrap_or(0);
            Ok(Codes(vec![vec![7; len * 10]]))
        }
        async fn decode(&self, codes: &Codes) -> speechdesk_synth::Result<Vec<f32>> {
            Ok(vec![0.5; codes.frames()])
        }
        fn sampling_rate(&self) -> u32 {
            24000
        }
    }

    fn request(text: &str) -> SynthesisRequest {
        let clip = encode_wav(&Waveform::new(vec![0.2; 800], 16000)).unwrap();
        SynthesisRequest {
            text: text.to_string(),
            reference: Some(Bytes::from(clip)),
            reference_name: Some("reference.wav".to_string()),
            language: Language::FrFr,
        }
    }

    #[tokio::test]
    async fn test_synthesis_overwrites_output_every_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_OUTPUT_PATH);
        std::fs::write(&path, b"previous run").unwrap();
        let synth = Synthesizer::new(Arc::new(FixedModel)).with_output_path(&path);

        for _ in 0..2 {
            let mut rec = Recorder::new();
            let out = synthesize_speech(&synth, &request("bonjour"), &mut rec).await.unwrap();
            assert_eq!(out.path, path);
            assert_eq!(std::fs::read(&path).unwrap(), out.wav.to_vec());

            match rec.items() {
                [Rendered::Audio { path: audio, mime }, Rendered::Download { file_name, mime: dl_mime, data, .. }] => {
                    assert_eq!(audio, &path);
                    assert_eq!(mime, "audio/wav");
                    assert_eq!(file_name, "generated_speech.wav");
                    assert_eq!(dl_mime, "audio/wav");
                    assert_eq!(data, &out.wav);
                }
                other => panic!("unexpected items: {other:?}"),
            }
        }

        let mut rec = Recorder::new();
        let shorter = synthesize_speech(&synth, &request("oui"), &mut rec).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), shorter.wav.to_vec());
    }

    #[tokio::test]
    async fn test_missing_reference_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let synth = Synthesizer::new(Arc::new(FixedModel)).with_output_path(dir.path().join("out.wav"));
        let mut rec = Recorder::new();

        let req = SynthesisRequest {
            reference: None,
            ..request("hello")
        };
        let err = synthesize_speech(&synth, &req, &mut rec).await.unwrap_err();
        assert!(matches!(err, Error::Synth(speechdesk_synth::Error::MissingReference)));
        assert!(rec.is_empty());
    }
}
