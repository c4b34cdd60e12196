//! Live transcription command.

use std::time::Duration;

use clap::Args;
use tokio::io::{AsyncRead, AsyncReadExt};

use speechdesk_apps::{drain, initialize_connection, pump, SessionSlot};
use speechdesk_deepgram::{LiveOptions, DEFAULT_LIVE_LANGUAGE, DEFAULT_LIVE_MODEL};

use super::{create_client, get_context, ConsoleSurface};
use crate::Cli;

/// Stream audio for live transcription.
///
/// Audio is read from a file, or from stdin with `-a -`, and sent in chunks
/// at a steady pace. Transcripts print as they arrive.
#[derive(Args)]
pub struct LiveCommand {
    /// Audio file, or - for stdin
    #[arg(short = 'a', long, default_value = "-")]
    audio: String,
    /// Live model
    #[arg(short = 'm', long, default_value = DEFAULT_LIVE_MODEL)]
    model: String,
    /// Language
    #[arg(short = 'l', long, default_value = DEFAULT_LIVE_LANGUAGE)]
    language: String,
    /// Raw audio encoding (linear16, mulaw, ...); omit for containerized audio
    #[arg(long)]
    encoding: Option<String>,
    /// Sample rate of raw audio
    #[arg(short = 's', long)]
    sample_rate: Option<u32>,
    /// Also print interim results
    #[arg(long)]
    interim_results: bool,
    /// Bytes per chunk
    #[arg(long, default_value_t = 8192)]
    chunk_size: usize,
    /// Delay between chunks in milliseconds
    #[arg(long, default_value_t = 100)]
    chunk_ms: u64,
}

impl LiveCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let ctx = get_context(cli)?;
        let client = create_client(cli, ctx.as_ref())?;

        let options = LiveOptions {
            model: self.model.clone(),
            language: self.language.clone(),
            encoding: self.encoding.clone(),
            sample_rate: self.sample_rate,
            interim_results: self.interim_results.then_some(true),
            ..Default::default()
        };

        let mut reader: Box<dyn AsyncRead + Unpin + Send> = if self.audio == "-" {
            Box::new(tokio::io::stdin())
        } else {
            Box::new(tokio::fs::File::open(&self.audio).await?)
        };

        let mut surface = ConsoleSurface::new(cli);
        let mut slot = SessionSlot::new();
        if !initialize_connection(&client.live(), &options, &mut slot, &mut surface).await {
            anyhow::bail!("live session did not start");
        }

        let mut buf = vec![0u8; self.chunk_size.max(1)];
        let mut sent = 0usize;
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            if let Err(e) = slot.send_audio(&buf[..n]).await {
                tracing::warn!(error = %e, "stopped sending audio");
                break;
            }
            sent += n;
            drain(&mut slot, &mut surface);
            if !slot.is_active() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(self.chunk_ms)).await;
        }
        tracing::debug!(bytes = sent, "audio sent");

        if slot.is_active() {
            slot.finish().await?;
            pump(&mut slot, &mut surface).await;
        }
        slot.close().await?;
        Ok(())
    }
}
