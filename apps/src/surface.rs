//! Output surfaces.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

/// Where an application renders its output.
///
/// Methods are infallible; a surface that cannot render something logs it.
pub trait Surface: Send {
    /// Appends a line of text.
    fn write(&mut self, text: &str);

    /// Shows an error message.
    fn error(&mut self, text: &str);

    /// Shows a JSON document.
    fn json(&mut self, value: &Value);

    /// Offers an audio file for playback.
    fn audio(&mut self, path: &Path, mime: &str);

    /// Offers bytes for download under `file_name`.
    fn download(&mut self, file_name: &str, mime: &str, data: &Bytes);
}

/// One item rendered to a [`Recorder`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rendered {
    Text { text: String },
    Error { text: String },
    Json { value: Value },
    Audio { path: PathBuf, mime: String },
    Download {
        file_name: String,
        mime: String,
        size: usize,
        #[serde(skip)]
        data: Bytes,
    },
}

/// A [`Surface`] that keeps everything in memory.
#[derive(Debug, Default)]
pub struct Recorder {
    items: Vec<Rendered>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Rendered] {
        &self.items
    }

    /// Removes and returns everything rendered so far.
    pub fn take(&mut self) -> Vec<Rendered> {
        std::mem::take(&mut self.items)
    }

    /// Returns the text items in order.
    pub fn texts(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Rendered::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Returns the error items in order.
    pub fn errors(&self) -> Vec<&str> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Rendered::Error { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Surface for Recorder {
    fn write(&mut self, text: &str) {
        self.items.push(Rendered::Text {
            text: text.to_string(),
        });
    }

    fn error(&mut self, text: &str) {
        self.items.push(Rendered::Error {
            text: text.to_string(),
        });
    }

    fn json(&mut self, value: &Value) {
        self.items.push(Rendered::Json {
            value: value.clone(),
        });
    }

    fn audio(&mut self, path: &Path, mime: &str) {
        self.items.push(Rendered::Audio {
            path: path.to_path_buf(),
            mime: mime.to_string(),
        });
    }

    fn download(&mut self, file_name: &str, mime: &str, data: &Bytes) {
        self.items.push(Rendered::Download {
            file_name: file_name.to_string(),
            mime: mime.to_string(),
            size: data.len(),
            data: data.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_recorder_keeps_order() {
        let mut rec = Recorder::new();
        rec.write("one");
        rec.error("bad");
        rec.write("two");
        assert_eq!(rec.texts(), vec!["one", "two"]);
        assert_eq!(rec.errors(), vec!["bad"]);

        let taken = rec.take();
        assert_eq!(taken.len(), 3);
        assert!(rec.is_empty());
    }

    #[test]
    fn test_rendered_serializes_without_payload() {
        let mut rec = Recorder::new();
        rec.download("a.wav", "audio/wav", &Bytes::from_static(b"RIFF"));
        let value = serde_json::to_value(rec.items()).unwrap();
        assert_eq!(
            value,
            json!([{"kind": "download", "file_name": "a.wav", "mime": "audio/wav", "size": 4}])
        );
    }
}
