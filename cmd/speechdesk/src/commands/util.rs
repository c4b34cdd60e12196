//! Utility functions for CLI commands.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use serde_json::Value;
use speechdesk_apps::{Surface, DEFAULT_ALLOWED_URL_PREFIX};
use speechdesk_cli::config::{Config, Context};
use speechdesk_cli::output::{print_success, write_binary, Output, OutputFormat};
use speechdesk_cli::resolve_api_key;
use speechdesk_deepgram::Client;
use speechdesk_synth::ModelLoader;

use crate::Cli;

/// Model server used when no context names one.
pub const DEFAULT_MODEL_SERVER: &str = "http://127.0.0.1:7860";

/// Pretrained synthesis model used when no context names one.
pub const DEFAULT_MODEL_ID: &str = "Zyphra/Zonos-v0.1-transformer";

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    Config::load(cli.config.as_deref().map(Path::new))
}

/// Gets the context to use, if any.
///
/// A context named with `-c` must exist. Without `-c` the current context
/// is used when set; otherwise settings come from flags and the environment.
pub fn get_context(cli: &Cli) -> anyhow::Result<Option<Context>> {
    let cfg = get_config(cli)?;
    Ok(cfg.context(cli.context.as_deref())?.cloned())
}

/// Creates a transcription client from flags, context and environment.
pub fn create_client(cli: &Cli, ctx: Option<&Context>) -> anyhow::Result<Client> {
    let api_key = resolve_api_key(cli.api_key.as_deref(), ctx).ok_or_else(|| {
        anyhow::anyhow!(
            "no API key found. Use --api-key, configure a context with 'speechdesk config set', or set {}",
            speechdesk_cli::API_KEY_ENV
        )
    })?;

    let mut builder = Client::builder(api_key);
    if let Some(ctx) = ctx {
        if let Some(url) = ctx.base_url.as_deref().filter(|u| !u.is_empty()) {
            builder = builder.base_url(url);
        }
        if let Some(timeout) = ctx.timeout() {
            builder = builder.timeout(timeout);
        }
    }

    Ok(builder.build()?)
}

/// Returns the prefix remote audio URLs must start with.
pub fn allowed_url_prefix(ctx: Option<&Context>) -> String {
    ctx.and_then(|c| non_empty(&c.allowed_url_prefix))
        .unwrap_or(DEFAULT_ALLOWED_URL_PREFIX)
        .to_string()
}

/// Builds the synthesis model loader. Flags win over the context.
pub fn model_loader(
    ctx: Option<&Context>,
    server: Option<&str>,
    model_id: Option<&str>,
) -> ModelLoader {
    let server = server
        .or_else(|| ctx.and_then(|c| non_empty(&c.model_server)))
        .unwrap_or(DEFAULT_MODEL_SERVER);
    let model_id = model_id
        .or_else(|| ctx.and_then(|c| non_empty(&c.model_id)))
        .unwrap_or(DEFAULT_MODEL_ID);
    tracing::debug!(server, model_id, "using synthesis model");
    ModelLoader::remote(server, model_id)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Prints error message.
pub fn print_error(msg: &str) {
    eprintln!("\x1b[31m✗\x1b[0m {}", msg);
}

/// Prints info message.
pub fn print_info(msg: &str) {
    eprintln!("\x1b[34mℹ\x1b[0m {}", msg);
}

/// Renders application output to the terminal.
///
/// Text goes to stdout, errors and notices to stderr. Downloads are saved
/// under `download_dir` when one is set.
pub struct ConsoleSurface {
    output: Output,
    download_dir: Option<PathBuf>,
    errors: usize,
}

impl ConsoleSurface {
    pub fn new(cli: &Cli) -> Self {
        Self {
            output: Output::new(OutputFormat::from_json_flag(cli.json), None),
            download_dir: None,
            errors: 0,
        }
    }

    pub fn with_download_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.download_dir = dir;
        self
    }

    /// Number of errors rendered so far.
    pub fn errors(&self) -> usize {
        self.errors
    }
}

impl Surface for ConsoleSurface {
    fn write(&mut self, text: &str) {
        println!("{}", text);
    }

    fn error(&mut self, text: &str) {
        self.errors += 1;
        print_error(text);
    }

    fn json(&mut self, value: &Value) {
        if let Err(e) = self.output.write(value) {
            tracing::warn!(error = %e, "failed to print response");
        }
    }

    fn audio(&mut self, path: &Path, mime: &str) {
        print_info(&format!("Audio ready: {} ({})", path.display(), mime));
    }

    fn download(&mut self, file_name: &str, _mime: &str, data: &Bytes) {
        let Some(dir) = &self.download_dir else {
            return;
        };
        let path = dir.join(file_name);
        match write_binary(&path, data) {
            Ok(()) => print_success(&format!(
                "Saved {} ({})",
                path.display(),
                speechdesk_cli::output::format_bytes(data.len())
            )),
            Err(e) => {
                self.errors += 1;
                print_error(&format!("failed to save {}: {}", path.display(), e));
            }
        }
    }
}
