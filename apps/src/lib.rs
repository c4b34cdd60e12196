//! The speechdesk applications, independent of any front end.
//!
//! - [`transcribe`]: prerecorded transcription of an uploaded file or a URL
//! - [`live`]: live transcription sessions and their event rendering
//! - [`synthesize`]: reference-voice speech synthesis
//!
//! Every operation renders through a [`Surface`]. Front ends supply their
//! own; [`Recorder`] collects the rendered items in memory.

mod error;
pub mod live;
pub mod surface;
pub mod synthesize;
pub mod transcribe;

pub use error::{Error, Result};
pub use live::{
    drain, initialize_connection, pump, render_event, LiveConnector, LiveHandle, SessionSlot,
    FAILED_TO_START,
};
pub use surface::{Recorder, Rendered, Surface};
pub use synthesize::synthesize_speech;
pub use transcribe::{
    build_features, build_source, transcribe_file, Model, Tier, Transcriber, TranscriptionForm,
    UploadedFile, DEFAULT_ALLOWED_URL_PREFIX, NO_INPUT_MESSAGE,
};
