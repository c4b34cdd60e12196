//! Live transcription events.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Event kinds emitted by a live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiveEventKind {
    Open,
    Transcript,
    Metadata,
    UtteranceEnd,
    SpeechStarted,
    Close,
    Error,
}

/// An event delivered by a live session, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveEvent {
    /// Session established.
    Open(OpenEvent),
    /// A recognized chunk (interim or final).
    Transcript(LiveResult),
    /// Stream metadata, sent once the server finishes.
    Metadata(serde_json::Value),
    /// End of an utterance (requires `utterance_end_ms`).
    UtteranceEnd(serde_json::Value),
    /// Voice activity detected (requires `vad_events`).
    SpeechStarted(serde_json::Value),
    /// Session torn down.
    Close(CloseEvent),
    /// Transport or protocol error. Informational only.
    Error(ErrorEvent),
}

impl LiveEvent {
    /// Returns the kind of this event.
    pub fn kind(&self) -> LiveEventKind {
        match self {
            LiveEvent::Open(_) => LiveEventKind::Open,
            LiveEvent::Transcript(_) => LiveEventKind::Transcript,
            LiveEvent::Metadata(_) => LiveEventKind::Metadata,
            LiveEvent::UtteranceEnd(_) => LiveEventKind::UtteranceEnd,
            LiveEvent::SpeechStarted(_) => LiveEventKind::SpeechStarted,
            LiveEvent::Close(_) => LiveEventKind::Close,
            LiveEvent::Error(_) => LiveEventKind::Error,
        }
    }

    /// Parses a server text frame.
    ///
    /// Unknown message types yield `None`; malformed JSON yields an
    /// [`LiveEvent::Error`] describing the frame.
    pub fn parse(text: &str) -> Option<LiveEvent> {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                return Some(LiveEvent::Error(ErrorEvent {
                    description: format!("malformed server message: {}", e),
                    message: text.to_string(),
                    variant: "Parse".to_string(),
                }));
            }
        };

        let kind = value.get("type").and_then(|t| t.as_str()).unwrap_or_default();
        match kind {
            "Results" => match serde_json::from_value::<LiveResult>(value) {
                Ok(result) => Some(LiveEvent::Transcript(result)),
                Err(e) => Some(LiveEvent::Error(ErrorEvent {
                    description: format!("malformed results message: {}", e),
                    message: text.to_string(),
                    variant: "Parse".to_string(),
                })),
            },
            "Metadata" => Some(LiveEvent::Metadata(value)),
            "UtteranceEnd" => Some(LiveEvent::UtteranceEnd(value)),
            "SpeechStarted" => Some(LiveEvent::SpeechStarted(value)),
            "Error" => Some(LiveEvent::Error(
                serde_json::from_value(value).unwrap_or_else(|_| ErrorEvent {
                    description: text.to_string(),
                    ..Default::default()
                }),
            )),
            _ => None,
        }
    }
}

impl fmt::Display for LiveEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveEvent::Open(e) => fmt::Display::fmt(e, f),
            LiveEvent::Transcript(r) => f.write_str(r.transcript()),
            LiveEvent::Metadata(v) | LiveEvent::UtteranceEnd(v) | LiveEvent::SpeechStarted(v) => {
                fmt::Display::fmt(v, f)
            }
            LiveEvent::Close(e) => fmt::Display::fmt(e, f),
            LiveEvent::Error(e) => fmt::Display::fmt(e, f),
        }
    }
}

/// Session opened.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenEvent {
    /// Request ID assigned by the server on upgrade.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl fmt::Display for OpenEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_described(f, &Described::Open(self))
    }
}

/// Session closed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseEvent {
    /// WebSocket close code, when the server sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    /// Close reason.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,
}

impl fmt::Display for CloseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_described(f, &Described::Close(self))
    }
}

/// Error reported by the server or the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEvent {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub variant: String,
}

impl fmt::Display for ErrorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_described(f, &Described::Error(self))
    }
}

/// Lifecycle events as the server would describe them, tagged by `type`.
#[derive(Serialize)]
#[serde(tag = "type")]
enum Described<'a> {
    Open(&'a OpenEvent),
    Close(&'a CloseEvent),
    Error(&'a ErrorEvent),
}

fn write_described(f: &mut fmt::Formatter<'_>, event: &Described<'_>) -> fmt::Result {
    let text = serde_json::to_string(event).map_err(|_| fmt::Error)?;
    f.write_str(&text)
}

/// A `Results` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveResult {
    #[serde(default)]
    pub channel_index: Vec<u32>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub speech_final: bool,
    #[serde(default)]
    pub from_finalize: bool,
    #[serde(default)]
    pub channel: Channel,
}

impl LiveResult {
    /// Returns the first (highest-confidence) alternative's transcript.
    pub fn transcript(&self) -> &str {
        self.channel
            .alternatives
            .first()
            .map(|a| a.transcript.as_str())
            .unwrap_or("")
    }
}

/// Recognition alternatives for one channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

/// One recognition hypothesis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub words: Vec<Word>,
}

/// A recognized word with timing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub word: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub punctuated_word: Option<String>,
}
