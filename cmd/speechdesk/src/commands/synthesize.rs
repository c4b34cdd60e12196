//! Speech synthesis command.

use std::path::PathBuf;

use clap::Args;

use speechdesk_apps::synthesize_speech;
use speechdesk_synth::{Language, SynthesisRequest, Synthesizer, DEFAULT_OUTPUT_PATH};

use super::{get_context, model_loader, print_info, ConsoleSurface};
use crate::Cli;

/// Generate speech in the voice of a reference clip.
///
/// The result is written to the output path, replacing any previous file.
#[derive(Args)]
pub struct SynthesizeCommand {
    /// Reference audio (wav, mp3)
    #[arg(short = 'r', long)]
    reference: PathBuf,
    /// Text to synthesize
    #[arg(short = 't', long, default_value = "Hello, world!")]
    text: String,
    /// Language (en-us, es-es, fr-fr)
    #[arg(short = 'l', long, default_value = "en-us")]
    language: Language,
    /// Output WAV file
    #[arg(short = 'o', long, default_value = DEFAULT_OUTPUT_PATH)]
    output: PathBuf,
    /// Also save a copy as generated_speech.wav in this directory
    #[arg(long)]
    download: Option<PathBuf>,
    /// Speech model server URL
    #[arg(long)]
    model_server: Option<String>,
    /// Pretrained speech model ID
    #[arg(long)]
    model_id: Option<String>,
}

impl SynthesizeCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let reference = tokio::fs::read(&self.reference).await?;

        let loader = model_loader(
            ctx.as_ref(),
            self.model_server.as_deref(),
            self.model_id.as_deref(),
        );
        print_info("Loading model...");
        let model = loader.get().await?;

        let synthesizer = Synthesizer::new(model).with_output_path(&self.output);
        let request = SynthesisRequest {
            text: self.text.clone(),
            reference: Some(reference.into()),
            reference_name: self
                .reference
                .file_name()
                .map(|n| n.to_string_lossy().to_string()),
            language: self.language,
        };

        let mut surface = ConsoleSurface::new(cli).with_download_dir(self.download.clone());
        print_info("Generating speech...");
        let output = synthesize_speech(&synthesizer, &request, &mut surface).await?;

        if cli.json {
            println!(
                "{}",
                serde_json::json!({
                    "path": output.path,
                    "bytes": output.wav.len(),
                    "duration_secs": output.duration.as_secs_f64(),
                })
            );
        }
        Ok(())
    }
}
