//! Pipeline value types.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Languages accepted by the synthesis model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "en-us")]
    EnUs,
    #[serde(rename = "es-es")]
    EsEs,
    #[serde(rename = "fr-fr")]
    FrFr,
}

impl Language {
    /// All supported languages, default first.
    pub const ALL: [Language; 3] = [Language::EnUs, Language::EsEs, Language::FrFr];

    /// Returns the language tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::EnUs => "en-us",
            Language::EsEs => "es-es",
            Language::FrFr => "fr-fr",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnsupportedLanguage(s.to_string()))
    }
}

/// Mono audio, samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Returns the playback duration.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Fixed-size vector describing a speaker's voice.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpeakerEmbedding(pub Vec<f32>);

impl SpeakerEmbedding {
    pub fn dimension(&self) -> usize {
        self.0.len()
    }
}

/// Inputs that parameterize one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CondDict {
    pub text: String,
    pub speaker: SpeakerEmbedding,
    pub language: Language,
    /// Phonemes per second.
    pub speaking_rate: f32,
    /// Pitch variation in Hz.
    pub pitch_std: f32,
    /// Maximum output frequency in Hz.
    pub fmax: f32,
}

impl CondDict {
    /// Builds a conditioning dictionary with the model's default prosody.
    pub fn new(text: impl Into<String>, speaker: SpeakerEmbedding, language: Language) -> Self {
        Self {
            text: text.into(),
            speaker,
            language,
            speaking_rate: 15.0,
            pitch_std: 20.0,
            fmax: 22050.0,
        }
    }
}

/// Model-prepared conditioning. Opaque to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conditioning(pub serde_json::Value);

/// Discrete audio codes produced by generation, one row per codebook.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Codes(pub Vec<Vec<u32>>);

impl Codes {
    /// Number of frames (length of the longest codebook row).
    pub fn frames(&self) -> usize {
        self.0.iter().map(Vec::len).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_parse() {
        assert_eq!("en-us".parse::<Language>().unwrap(), Language::EnUs);
        assert_eq!("ES-ES".parse::<Language>().unwrap(), Language::EsEs);
        assert_eq!(" fr-fr ".parse::<Language>().unwrap(), Language::FrFr);
        assert!(matches!(
            "de-de".parse::<Language>(),
            Err(Error::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_language_serde() {
        assert_eq!(serde_json::to_string(&Language::FrFr).unwrap(), "\"fr-fr\"");
        let lang: Language = serde_json::from_str("\"es-es\"").unwrap();
        assert_eq!(lang, Language::EsEs);
    }

    #[test]
    fn test_waveform_duration() {
        let wav = Waveform::new(vec![0.0; 12000], 24000);
        assert_eq!(wav.duration(), Duration::from_millis(500));
        assert_eq!(Waveform::default().duration(), Duration::ZERO);
    }

    #[test]
    fn test_cond_dict_defaults() {
        let cond = CondDict::new("hi", SpeakerEmbedding(vec![0.5; 4]), Language::EnUs);
        assert_eq!(cond.speaking_rate, 15.0);
        assert_eq!(cond.speaker.dimension(), 4);
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(json["language"], "en-us");
        assert_eq!(json["speaker"], serde_json::json!([0.5, 0.5, 0.5, 0.5]));
    }

    #[test]
    fn test_codes_frames() {
        assert_eq!(Codes(vec![vec![1, 2, 3], vec![4, 5]]).frames(), 3);
        assert_eq!(Codes::default().frames(), 0);
    }
}
