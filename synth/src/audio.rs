//! Reference clip decoding and WAV output.
//!
//! Reference clips may be WAV (integer or float, any channel count) or MP3.
//! Everything is downmixed to mono `f32`. Output is always 16-bit PCM mono.

use std::io::Cursor;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Waveform;

/// Container formats accepted for reference clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioKind {
    Wav,
    Mp3,
}

impl AudioKind {
    /// Detects the container from magic bytes, falling back to the file name.
    pub fn detect(data: &[u8], name_hint: Option<&str>) -> Option<AudioKind> {
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WAVE" {
            return Some(AudioKind::Wav);
        }
        if data.starts_with(b"ID3") || (data.len() >= 2 && data[0] == 0xFF && data[1] & 0xE0 == 0xE0) {
            return Some(AudioKind::Mp3);
        }

        let ext = name_hint
            .and_then(|n| Path::new(n).extension())
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("wav") => Some(AudioKind::Wav),
            Some("mp3") => Some(AudioKind::Mp3),
            _ => None,
        }
    }

    /// MIME type for the container.
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioKind::Wav => "audio/wav",
            AudioKind::Mp3 => "audio/mpeg",
        }
    }
}

/// Decodes a reference clip to a mono waveform.
pub fn decode_reference(data: &[u8], name_hint: Option<&str>) -> Result<Waveform> {
    let kind = AudioKind::detect(data, name_hint).ok_or_else(|| {
        Error::UnsupportedAudio(name_hint.unwrap_or("unnamed clip").to_string())
    })?;

    let wav = match kind {
        AudioKind::Wav => decode_wav(data)?,
        AudioKind::Mp3 => decode_mp3(data)?,
    };

    if wav.samples.is_empty() {
        return Err(Error::EmptyAudio);
    }
    tracing::debug!(
        kind = ?kind,
        sample_rate = wav.sample_rate,
        samples = wav.samples.len(),
        "decoded reference clip"
    );
    Ok(wav)
}

fn decode_wav(data: &[u8]) -> Result<Waveform> {
    let mut reader = hound::WavReader::new(Cursor::new(data))?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<std::result::Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()?
        }
    };

    Ok(Waveform::new(
        downmix(&interleaved, spec.channels as usize),
        spec.sample_rate,
    ))
}

fn decode_mp3(data: &[u8]) -> Result<Waveform> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(data));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = frame.sample_rate as u32;
                }
                let pcm: Vec<f32> = frame
                    .data
                    .iter()
                    .map(|&s| s as f32 / i16::MAX as f32)
                    .collect();
                samples.extend(downmix(&pcm, frame.channels));
            }
            Err(minimp3::Error::Eof) => break,
            Err(minimp3::Error::SkippedData) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(Waveform::new(samples, sample_rate))
}

/// Averages interleaved channels into one.
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Encodes a waveform as a 16-bit PCM mono WAV file.
pub fn encode_wav(wav: &Waveform) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: wav.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + wav.samples.len() * 2));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in &wav.samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer.write_sample((clamped * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Encodes `wav` and writes it to `path`, replacing any existing file.
pub async fn write_wav(path: impl AsRef<Path>, wav: &Waveform) -> Result<Vec<u8>> {
    let data = encode_wav(wav)?;
    tokio::fs::write(path.as_ref(), &data).await?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (i as f32 * 440.0 * 2.0 * std::f32::consts::PI / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    fn wav_bytes(spec: hound::WavSpec, write: impl Fn(&mut hound::WavWriter<&mut Cursor<Vec<u8>>>)) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            write(&mut writer);
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_encode_then_decode_preserves_rate_and_length() {
        let wav = Waveform::new(sine(24000, 2400), 24000);
        let bytes = encode_wav(&wav).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");

        let decoded = decode_reference(&bytes, None).unwrap();
        assert_eq!(decoded.sample_rate, 24000);
        assert_eq!(decoded.samples.len(), 2400);
        for (a, b) in wav.samples.iter().zip(&decoded.samples) {
            assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn test_decode_stereo_int_downmixes() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, |w| {
            for _ in 0..100 {
                w.write_sample(16384i16).unwrap();
                w.write_sample(0i16).unwrap();
            }
        });

        let decoded = decode_reference(&bytes, Some("voice.wav")).unwrap();
        assert_eq!(decoded.samples.len(), 100);
        assert!((decoded.samples[0] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_decode_float_wav() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let bytes = wav_bytes(spec, |w| {
            for _ in 0..10 {
                w.write_sample(-0.75f32).unwrap();
            }
        });

        let decoded = decode_reference(&bytes, None).unwrap();
        assert_eq!(decoded.sample_rate, 44100);
        assert_eq!(decoded.samples, vec![-0.75; 10]);
    }

    #[test]
    fn test_decode_empty_wav() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, |_| {});
        assert!(matches!(decode_reference(&bytes, None), Err(Error::EmptyAudio)));
    }

    #[tokio::test]
    async fn test_write_wav_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        std::fs::write(&path, b"stale").unwrap();

        let data = write_wav(&path, &Waveform::new(vec![0.0; 10], 8000)).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), data);
        assert_eq!(data.len(), 44 + 20);
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(AudioKind::detect(b"ID3\x04rest", None), Some(AudioKind::Mp3));
        assert_eq!(AudioKind::detect(&[0xFF, 0xFB, 0x90, 0x00], None), Some(AudioKind::Mp3));
        assert_eq!(AudioKind::detect(b"????", Some("clip.MP3")), Some(AudioKind::Mp3));
        assert_eq!(AudioKind::detect(b"????", Some("notes.txt")), None);
        assert!(matches!(
            decode_reference(b"plain text", Some("notes.txt")),
            Err(Error::UnsupportedAudio(_))
        ));
    }
}
