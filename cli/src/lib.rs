//! CLI utilities for speechdesk.
//!
//! Context-based configuration, credential lookup and output formatting
//! shared by the `speechdesk` command.

pub mod config;
pub mod env;
pub mod output;

pub use config::{mask_api_key, Config, Context};
pub use env::{load_dotenv, resolve_api_key, API_KEY_ENV};
pub use output::{Output, OutputFormat};
