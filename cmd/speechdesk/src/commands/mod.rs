//! CLI commands module.

mod config;
mod live;
mod serve;
mod synthesize;
mod transcribe;
mod util;

pub use config::ConfigCommand;
pub use live::LiveCommand;
pub use serve::ServeCommand;
pub use synthesize::SynthesizeCommand;
pub use transcribe::TranscribeCommand;

pub(crate) use util::*;
