//! Prerecorded transcription command.

use std::path::PathBuf;

use clap::Args;

use speechdesk_apps::{transcribe_file, Model, Tier, TranscriptionForm, UploadedFile};

use super::{allowed_url_prefix, create_client, get_context, ConsoleSurface};
use crate::Cli;

/// Transcribe an audio file or a remote URL.
///
/// An audio file takes precedence over a URL. URLs are only accepted when
/// they start with the allowed prefix (see `config set`).
#[derive(Args)]
pub struct TranscribeCommand {
    /// Audio file (mp3, wav, m4a)
    #[arg(short = 'a', long)]
    audio: Option<PathBuf>,
    /// Remote audio URL
    #[arg(long)]
    url: Option<String>,
    /// Features as a JSON object
    #[arg(long, default_value = "{}", conflicts_with = "features_file")]
    features: String,
    /// File holding the features JSON object
    #[arg(long)]
    features_file: Option<PathBuf>,
    /// Model (nova, whisper)
    #[arg(short = 'm', long, default_value = "nova")]
    model: Model,
    /// Model version
    #[arg(long)]
    version: Option<String>,
    /// Whisper tier (base, enhanced), ignored for other models
    #[arg(long, default_value = "base")]
    tier: Tier,
}

impl TranscribeCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let client = create_client(cli, ctx.as_ref())?;
        let prefix = allowed_url_prefix(ctx.as_ref());

        let file = match &self.audio {
            Some(path) => {
                let data = tokio::fs::read(path).await?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                tracing::debug!(file = %path.display(), bytes = data.len(), "read audio");
                Some(UploadedFile::new(name, data))
            }
            None => None,
        };

        let features_json = match &self.features_file {
            Some(path) => tokio::fs::read_to_string(path).await?,
            None => self.features.clone(),
        };

        let form = TranscriptionForm {
            file,
            url: self.url.clone(),
            features_json,
            model: self.model,
            version: self.version.clone(),
            tier: Some(self.tier),
        };

        let mut surface = ConsoleSurface::new(cli);
        if transcribe_file(&client.prerecorded(), &form, &prefix, &mut surface)
            .await
            .is_none()
        {
            anyhow::bail!("transcription failed");
        }
        Ok(())
    }
}
