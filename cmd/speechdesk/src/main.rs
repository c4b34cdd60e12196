//! speechdesk - transcription and speech synthesis from the command line.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ConfigCommand, LiveCommand, ServeCommand, SynthesizeCommand, TranscribeCommand};

/// speechdesk - transcription and speech synthesis from the command line.
///
/// Services:
///   - transcribe: prerecorded transcription of a file or URL
///   - live: streaming transcription of a file or stdin
///   - synthesize: speech generated in the voice of a reference clip
///   - serve: the same tools behind a local web page
///
/// The API key comes from --api-key, the selected context, or the
/// DEEPGRAM_API_KEY environment variable (a .env file is read if present).
/// Contexts are stored in ~/.speechdesk/config.yaml.
#[derive(Parser)]
#[command(name = "speechdesk")]
#[command(about = "Transcription and speech synthesis CLI tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.speechdesk/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Context name to use
    #[arg(short = 'c', long, global = true)]
    pub context: Option<String>,

    /// API key (overrides context and environment)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage CLI configuration
    Config(ConfigCommand),
    /// Transcribe an audio file or URL
    Transcribe(TranscribeCommand),
    /// Stream audio for live transcription
    Live(LiveCommand),
    /// Generate speech from text and a reference voice
    Synthesize(SynthesizeCommand),
    /// Serve the web front end
    Serve(ServeCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Several TLS stacks may be linked; pin one provider for all of them.
    let _ = rustls::crypto::ring::default_provider().install_default();

    speechdesk_cli::load_dotenv()?;

    match &cli.command {
        Commands::Config(cmd) => cmd.run(&cli).await,
        Commands::Transcribe(cmd) => cmd.run(&cli).await,
        Commands::Live(cmd) => cmd.run(&cli).await,
        Commands::Synthesize(cmd) => cmd.run(&cli).await,
        Commands::Serve(cmd) => cmd.run(&cli).await,
    }
}
